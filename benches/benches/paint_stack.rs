// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_region::{IntRect, Region};
use understory_view::{Background, Color, RecordingSurface, ViewTree};

const SCREEN: IntRect = IntRect::new(0, 0, 320, 200);

/// Overlapping windows cascading from the top-left corner.
fn cascade(n: i32) -> ViewTree {
    let mut tree = ViewTree::new();
    let root = tree.create_group(SCREEN, Background(Color::BLACK));
    tree.set_root(root);
    for i in 0..n {
        let w = tree.create_group(
            IntRect::from_origin_size(i * 4, i * 3, 120, 80),
            Background(Color::rgb(0, 0, (i * 7) as u8)),
        );
        let body = tree.create_view(IntRect::new(1, 1, 119, 79), Background(Color::WHITE));
        tree.insert(w, body);
        tree.insert(root, w);
    }
    tree
}

/// Non-overlapping panes covering the whole screen.
fn tiles(cols: i32, rows: i32) -> ViewTree {
    let mut tree = ViewTree::new();
    let root = tree.create_group(SCREEN, Background(Color::BLACK));
    tree.set_root(root);
    let (w, h) = (SCREEN.width() / cols, SCREEN.height() / rows);
    for y in 0..rows {
        for x in 0..cols {
            let pane = tree.create_view(
                IntRect::from_origin_size(x * w, y * h, w, h),
                Background(Color::WHITE),
            );
            tree.insert(root, pane);
        }
    }
    tree
}

fn bench_full_repaint(c: &mut Criterion) {
    let mut group = c.benchmark_group("paint_full");
    let damage = Region::from_rect(SCREEN);
    for &n in &[4, 16, 48] {
        let mut tree = cascade(n);
        let mut surface = RecordingSurface::new();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("cascade_{n}"), |b| {
            b.iter(|| {
                surface.clear();
                tree.paint(&mut surface, black_box(&damage));
            });
        });
    }
    let mut tree = tiles(8, 5);
    let mut surface = RecordingSurface::new();
    group.bench_function("tiled_40", |b| {
        b.iter(|| {
            surface.clear();
            tree.paint(&mut surface, black_box(&damage));
        });
    });
    group.finish();
}

fn bench_partial_repaint(c: &mut Criterion) {
    let mut group = c.benchmark_group("paint_partial");
    let damage = Region::from_rects([IntRect::new(30, 20, 50, 30), IntRect::new(150, 90, 200, 120)]);
    for &n in &[16, 48] {
        let mut tree = cascade(n);
        let mut surface = RecordingSurface::new();
        group.bench_function(format!("cascade_{n}"), |b| {
            b.iter(|| {
                surface.clear();
                tree.paint(&mut surface, black_box(&damage));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_full_repaint, bench_partial_repaint);
criterion_main!(benches);

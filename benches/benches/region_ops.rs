// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_region::{IntRect, Region};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn below(&mut self, n: i32) -> i32 {
        (self.next_u64() % n as u64) as i32
    }
}

fn gen_windows(n: usize, screen: i32, seed: u64) -> Vec<IntRect> {
    let mut rng = Rng::new(seed);
    (0..n)
        .map(|_| {
            let x = rng.below(screen);
            let y = rng.below(screen);
            let w = 8 + rng.below(screen / 3);
            let h = 4 + rng.below(screen / 4);
            IntRect::from_origin_size(x, y, w, h)
        })
        .collect()
}

fn gen_grid(n: i32, cell: i32) -> Vec<IntRect> {
    let mut out = Vec::with_capacity((n * n) as usize);
    for y in 0..n {
        for x in 0..n {
            out.push(IntRect::from_origin_size(x * cell, y * cell, cell, cell));
        }
    }
    out
}

fn bench_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_union");
    for &n in &[16_usize, 64, 256] {
        let windows = gen_windows(n, 200, 0x9e37_79b9);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("random_{n}"), |b| {
            b.iter(|| black_box(Region::from_rects(windows.iter().copied())));
        });
    }
    let grid = gen_grid(16, 10);
    group.throughput(Throughput::Elements(grid.len() as u64));
    group.bench_function("tiled_grid_256", |b| {
        b.iter(|| {
            let mut r = Region::from_rects(grid.iter().copied());
            r.optimize();
            black_box(r)
        });
    });
    group.finish();
}

fn bench_occlusion_walk(c: &mut Criterion) {
    // The painter's inner loop: subtract each window from what is still exposed.
    let mut group = c.benchmark_group("region_occlusion_walk");
    let screen = IntRect::new(0, 0, 200, 200);
    for &n in &[8_usize, 32, 128] {
        let windows = gen_windows(n, 200, 0x2545_f491);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("front_to_back_{n}"), |b| {
            b.iter_batched(
                || Region::from_rect(screen),
                |mut exposed| {
                    let mut occluding = Region::new();
                    for &w in &windows {
                        let mut clip = exposed.clone();
                        clip.intersect_rect(w);
                        clip.subtract(&occluding);
                        occluding.union_rect(w);
                        black_box(&clip);
                    }
                    exposed.subtract(&occluding);
                    exposed
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_queries");
    let mut exposed = Region::from_rect(IntRect::new(0, 0, 200, 200));
    for w in gen_windows(64, 200, 0xdead_beef) {
        exposed.subtract_rect(w);
    }
    exposed.optimize();
    let probes = gen_windows(256, 200, 0x1234_5678);
    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function("contains_rect", |b| {
        b.iter(|| probes.iter().filter(|&&r| exposed.contains_rect(r)).count());
    });
    group.bench_function("includes_point", |b| {
        b.iter(|| probes.iter().filter(|r| exposed.includes(r.x0, r.y0)).count());
    });
    group.finish();
}

criterion_group!(benches, bench_union, bench_occlusion_walk, bench_queries);
criterion_main!(benches);

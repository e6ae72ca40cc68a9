// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlapping windows on a character screen.
//!
//! Paints a desktop with three windows, then cycles the focus with Tab. Each
//! focus change brings the window to the front, and only the cells it uncovers or
//! restyles are redrawn.
//!
//! Run:
//! - `cargo run -p understory_demos --example desktop`
//! - `RUST_LOG=understory_view=trace cargo run -p understory_demos --example desktop`

use tracing_subscriber::EnvFilter;
use understory_view::{
    Background, Color, DrawCx, Event, IntRect, Key, KeyEvent, OptionFlags, Program, StateFlags,
    Surface, View,
};

const WIDTH: i32 = 40;
const HEIGHT: i32 = 12;

const DESKTOP: Color = Color::rgb(0, 0, 128);
const BODY: Color = Color::rgb(192, 192, 192);
const FRAME: Color = Color::rgb(128, 128, 128);
const FRAME_FOCUSED: Color = Color::WHITE;

fn glyph(color: Color) -> char {
    match color {
        DESKTOP => '.',
        FRAME => '-',
        FRAME_FOCUSED => '=',
        _ => ' ',
    }
}

/// A grid of characters standing in for a terminal.
struct TextScreen {
    cells: Vec<char>,
    clip: IntRect,
    touched: usize,
}

impl TextScreen {
    fn new() -> Self {
        Self {
            cells: vec![' '; (WIDTH * HEIGHT) as usize],
            clip: IntRect::ZERO,
            touched: 0,
        }
    }

    fn put(&mut self, x: i32, y: i32, ch: char) {
        if self.clip.contains(x, y) {
            self.cells[(y * WIDTH + x) as usize] = ch;
            self.touched += 1;
        }
    }

    fn take_touched(&mut self) -> usize {
        std::mem::take(&mut self.touched)
    }

    fn render(&self) -> String {
        self.cells
            .chunks(WIDTH as usize)
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Surface for TextScreen {
    fn set_clip_rect(&mut self, rect: IntRect) {
        self.clip = rect.intersect(IntRect::new(0, 0, WIDTH, HEIGHT));
    }

    fn fill_rect(&mut self, rect: IntRect, color: Color) {
        let ch = glyph(color);
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                self.put(x, y, ch);
            }
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, _color: Color) {
        for (dx, ch) in (0..).zip(text.chars()) {
            self.put(x + dx, y, ch);
        }
    }

    fn blit(&mut self, src: IntRect, x: i32, y: i32) {
        let copy = self.cells.clone();
        for sy in src.y0..src.y1 {
            for sx in src.x0..src.x1 {
                if IntRect::new(0, 0, WIDTH, HEIGHT).contains(sx, sy) {
                    let ch = copy[(sy * WIDTH + sx) as usize];
                    self.put(x + sx - src.x0, y + sy - src.y0, ch);
                }
            }
        }
    }
}

#[derive(Debug)]
struct Window {
    title: &'static str,
}

impl View for Window {
    fn draw(&mut self, cx: &mut DrawCx<'_>, dirty: IntRect) {
        cx.fill_rect(dirty, BODY);
        let frame = if cx.state().contains(StateFlags::FOCUSED) {
            FRAME_FOCUSED
        } else {
            FRAME
        };
        let title_bar = IntRect::new(0, 0, cx.extent().x1, 1);
        cx.fill_rect(title_bar.intersect(dirty), frame);
        cx.draw_text(2, 0, self.title, Color::BLACK);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut program = Program::new(
        IntRect::new(0, 0, WIDTH, HEIGHT),
        Background(DESKTOP),
        TextScreen::new(),
    );
    for (title, rect) in [
        (" one ", IntRect::new(2, 1, 20, 7)),
        (" two ", IntRect::new(12, 3, 32, 9)),
        (" three ", IntRect::new(22, 5, 38, 11)),
    ] {
        let tree = program.tree_mut();
        let window = tree.create_group(rect, Window { title });
        tree.set_options(window, OptionFlags::SELECTABLE | OptionFlags::TOP_SELECT);
        program.insert(window);
        program.tree_mut().focus(window);
    }

    program.paint();
    let cells = program.surface_mut().take_touched();
    println!("== Initial paint ({cells} cells) ==");
    println!("{}\n", program.surface().render());

    for step in 1..=3 {
        let mut tab = Event::KeyDown(KeyEvent::plain(Key::Tab));
        program.handle_event(&mut tab);
        program.paint();
        let cells = program.surface_mut().take_touched();
        println!("== After Tab {step} ({cells} cells repainted) ==");
        println!("{}\n", program.surface().render());
    }
}

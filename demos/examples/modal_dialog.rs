// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Modal dialogs driven by a scripted input source.
//!
//! A menu view opens a confirmation dialog when it receives its command. While
//! the dialog runs, clicks outside it only raise an alert, and the dialog refuses
//! to close on Enter until its checkbox is ticked. The menu receives the dialog's
//! answer once the session ends.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example modal_dialog`

use kurbo::Point;
use tracing_subscriber::EnvFilter;
use understory_view::{
    Background, Color, Command, Event, EventCx, IntRect, Key, KeyEvent, Phase, PointerEvent,
    Program, RecordingSurface, Script, View, ViewId,
};

const CMD_DELETE: Command = Command::user(1);

#[derive(Debug)]
struct Menu {
    confirm: ViewId,
    answers: Vec<Command>,
}

impl View for Menu {
    fn handle_event(&mut self, cx: &mut EventCx<'_>, event: &mut Event, _phase: Phase) {
        match *event {
            Event::Command(c) if c.command == CMD_DELETE => {
                cx.exec(self.confirm);
                event.clear();
            }
            Event::Command(c) if c.sender == Some(self.confirm) => {
                println!("menu: dialog answered {:?}", c.command);
                self.answers.push(c.command);
                event.clear();
            }
            _ => {}
        }
    }
}

#[derive(Debug, Default)]
struct Confirm {
    ticked: bool,
}

impl View for Confirm {
    fn handle_event(&mut self, cx: &mut EventCx<'_>, event: &mut Event, _phase: Phase) {
        let Event::KeyDown(k) = *event else {
            return;
        };
        match k.key {
            Key::Char(' ') => {
                self.ticked = !self.ticked;
                println!("dialog: checkbox ticked = {}", self.ticked);
                cx.invalidate();
            }
            Key::Enter => cx.end_modal(Command::OK),
            Key::Escape => cx.end_modal(Command::CANCEL),
            _ => return,
        }
        event.clear();
    }

    fn valid(&self, command: Command) -> bool {
        command != Command::OK || self.ticked
    }
}

fn key(key: Key) -> Event {
    Event::KeyDown(KeyEvent::plain(key))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut program = Program::new(
        IntRect::new(0, 0, 80, 25),
        Background(Color::BLACK),
        RecordingSurface::new(),
    );
    let tree = program.tree_mut();
    let confirm = tree.create_group(IntRect::new(20, 8, 60, 16), Confirm::default());
    let menu = tree.create_view(
        IntRect::new(0, 0, 80, 1),
        Menu {
            confirm,
            answers: Vec::new(),
        },
    );
    program.insert(menu);
    program.tree_mut().focus(menu);

    let mut input = Script::new([
        Event::command(CMD_DELETE),
        // Outside the dialog: alert only.
        Event::MouseDown(PointerEvent::primary(Point::new(2.0, 2.0))),
        // Refused until the box is ticked.
        key(Key::Enter),
        key(Key::Char(' ')),
        key(Key::Enter),
        // Second round, dismissed.
        Event::command(CMD_DELETE),
        key(Key::Escape),
        Event::command(Command::QUIT),
    ]);
    let result = program.run(&mut input);

    let alerts = program.tree_mut().context_mut().take_alerts();
    let answers = program
        .tree()
        .behavior::<Menu>(menu)
        .map(|m| m.answers.clone())
        .unwrap_or_default();
    println!("program ended with {result:?}");
    println!("answers: {answers:?}, alerts: {alerts}");
    println!("paint operations: {}", program.surface().ops().len());
}

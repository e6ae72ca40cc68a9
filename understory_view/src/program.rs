// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The program: root group, surface, and event loop.
//!
//! ## Overview
//!
//! A [`Program`] owns a [`ViewTree`] whose root group covers the screen, and the
//! [`Surface`] it paints on. Input comes from an [`EventSource`], which the
//! program polls whenever its own queue is empty.
//!
//! Routing: a [`Event::Repaint`](understory_event::Event::Repaint) paints the
//! accumulated damage; pointer events go to the capturing view if there is one;
//! everything else goes to the innermost view executing modally (the root when
//! none is). An unhandled [`Command::QUIT`] ends the innermost session.
//!
//! ## Modal execution
//!
//! [`Program::exec_view`] runs a nested loop until the executing view ends it with
//! a command its [`View::valid`](crate::View::valid) accepts. Handlers cannot call
//! it directly while the tree is borrowed; they use
//! [`EventCx::exec`](crate::EventCx::exec) instead, and the program starts the
//! session as soon as the handler returns.

use alloc::collections::VecDeque;

use understory_event::{Command, CommandEvent, EventMask, Phase};
use understory_region::IntRect;

use crate::Event;
use crate::memory::DEFAULT_SAFETY_POOL_BYTES;
use crate::surface::Surface;
use crate::tree::ViewTree;
use crate::types::{CursorId, StateFlags, ViewId};
use crate::view::View;

/// Program construction parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramConfig {
    /// Maximum number of pending events; the oldest is dropped beyond that.
    pub queue_capacity: usize,
    /// Size of the reserve released on allocation failure.
    pub safety_pool_bytes: usize,
    /// Cursor shown where no view supplies one.
    pub default_cursor: Option<CursorId>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            queue_capacity: understory_event::DEFAULT_CAPACITY,
            safety_pool_bytes: DEFAULT_SAFETY_POOL_BYTES,
            default_cursor: None,
        }
    }
}

/// What an [`EventSource`] has to offer.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    /// An input event.
    Event(Event),
    /// Nothing pending right now.
    Idle,
    /// No more input will arrive; every running session ends with [`Command::CANCEL`].
    Closed,
}

/// Producer of input events, typically a platform driver.
pub trait EventSource {
    /// Return the next input, without blocking.
    fn poll(&mut self) -> Input;

    /// Called when there is nothing to do. Must return promptly.
    fn idle(&mut self, tree: &mut ViewTree) {
        let _ = tree;
    }
}

/// [`EventSource`] that replays a fixed sequence, then reports [`Input::Closed`].
#[derive(Clone, Debug, Default)]
pub struct Script {
    inputs: VecDeque<Input>,
    idle_calls: usize,
}

impl Script {
    /// Replay `events` in order.
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            inputs: events.into_iter().map(Input::Event).collect(),
            idle_calls: 0,
        }
    }

    /// Append an input.
    pub fn push(&mut self, input: Input) {
        self.inputs.push_back(input);
    }

    /// Number of inputs not yet replayed.
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }

    /// Number of times the program went idle.
    pub fn idle_calls(&self) -> usize {
        self.idle_calls
    }
}

impl EventSource for Script {
    fn poll(&mut self) -> Input {
        self.inputs.pop_front().unwrap_or(Input::Closed)
    }

    fn idle(&mut self, _tree: &mut ViewTree) {
        self.idle_calls += 1;
    }
}

/// A view tree bound to a surface, with its event loop.
#[derive(Debug)]
pub struct Program<S> {
    tree: ViewTree,
    root: ViewId,
    surface: S,
}

impl<S: Surface> Program<S> {
    /// Create a program covering `bounds`, drawing `background` behind everything.
    pub fn new(bounds: IntRect, background: impl View, surface: S) -> Self {
        Self::with_config(bounds, background, surface, ProgramConfig::default())
    }

    /// Create a program with explicit limits.
    pub fn with_config(
        bounds: IntRect,
        background: impl View,
        surface: S,
        config: ProgramConfig,
    ) -> Self {
        let mut tree = ViewTree::with_limits(config.queue_capacity, config.safety_pool_bytes);
        tree.context.default_cursor = config.default_cursor;
        let root = tree.create_group(bounds, background);
        tree.set_root(root);
        tracing::debug!(?bounds, ?config, "program created");
        Self {
            tree,
            root,
            surface,
        }
    }

    /// The view tree.
    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    /// The view tree, mutably.
    pub fn tree_mut(&mut self) -> &mut ViewTree {
        &mut self.tree
    }

    /// The root group.
    pub fn root(&self) -> ViewId {
        self.root
    }

    /// The surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The surface, mutably.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Returns `true` once an allocation failure spent the safety reserve.
    pub fn low_memory(&self) -> bool {
        self.tree.low_memory()
    }

    /// Insert `view` at the front of the root group.
    pub fn insert(&mut self, view: ViewId) {
        self.tree.insert(self.root, view);
    }

    /// Paint the damage accumulated so far.
    pub fn paint(&mut self) {
        let damage = self.tree.queue.take_damage();
        if damage.is_empty() {
            return;
        }
        self.tree.paint(&mut self.surface, &damage);
    }

    /// Repaint the whole screen.
    pub fn redraw(&mut self) {
        self.tree.invalidate(self.root);
        self.paint();
    }

    /// Route one event.
    pub fn handle_event(&mut self, event: &mut Event) {
        match *event {
            Event::Nothing => return,
            Event::Repaint => {
                self.paint();
                event.clear();
                return;
            }
            Event::MouseMove(p) => self.tree.update_cursor(p.position),
            _ => {}
        }
        let captured = self
            .tree
            .context
            .capture
            .filter(|c| self.tree.is_alive(*c));
        let target = match captured {
            Some(c) if event.matches(EventMask::POSITIONAL) => c,
            _ => self.tree.modal_view().unwrap_or(self.root),
        };
        self.tree.handle_event(target, event, Phase::Focused);
        if event.is_command(Command::QUIT) {
            self.tree.end_modal(Command::QUIT);
            event.clear();
        }
    }

    /// Let the event source do background work and try to refill the safety reserve.
    pub fn idle(&mut self, source: &mut dyn EventSource) {
        source.idle(&mut self.tree);
        self.tree.memory.refill();
    }

    /// Run the main loop until it ends with a command the root accepts.
    pub fn run(&mut self, source: &mut dyn EventSource) -> Command {
        tracing::info!("program running");
        self.tree.modal.push(self.root);
        let result = self.execute(self.root, source);
        self.tree.modal.pop();
        tracing::info!(?result, "program finished");
        result
    }

    /// Execute `view` modally and return the command that ended the session.
    ///
    /// A view that is not yet in the tree is inserted into the root for the
    /// duration. Returns [`Command::CANCEL`] without running if the view rejects
    /// [`Command::VALID`].
    pub fn exec_view(&mut self, view: ViewId, source: &mut dyn EventSource) -> Command {
        if !self.tree.is_alive(view) || !self.tree.valid(view, Command::VALID) {
            tracing::debug!(?view, "modal execution refused");
            return Command::CANCEL;
        }
        let inserted = self.tree.owner(view).is_none() && self.tree.root() != Some(view);
        if inserted {
            self.tree.insert(self.root, view);
        }
        let owner = self.tree.owner(view);
        let saved_selection = owner.and_then(|o| self.tree.selected(o));
        let saved_capture = self.tree.context.capture.take();

        self.tree.set_state(view, StateFlags::MODAL, true);
        self.tree.focus(view);
        self.tree.modal.push(view);
        let mut grab = Event::broadcast(Command::GRAB_MODAL, Some(view));
        self.tree.handle_event(view, &mut grab, Phase::Focused);
        tracing::debug!(?view, depth = self.tree.modal.len(), "modal session started");

        let result = self.execute(view, source);

        let mut release = Event::broadcast(Command::RELEASE_MODAL, Some(view));
        self.tree.handle_event(view, &mut release, Phase::Focused);
        self.tree.modal.pop();
        if self.tree.is_alive(view) {
            self.tree.set_state(view, StateFlags::MODAL, false);
        }
        if let (Some(o), Some(s)) = (owner, saved_selection)
            && self.tree.is_alive(s)
            && self.tree.owner(s) == Some(o)
        {
            self.tree.select(o, Some(s));
        }
        self.tree.context.capture = saved_capture.filter(|c| self.tree.is_alive(*c));
        if inserted && self.tree.is_alive(view) && self.tree.owner(view).is_some() {
            self.tree.remove(view);
        }
        tracing::debug!(?view, ?result, "modal session ended");

        if result == Command::QUIT {
            // Let the enclosing session see the quit too.
            self.tree.post(Event::command(Command::QUIT));
        }
        result
    }

    fn execute(&mut self, view: ViewId, source: &mut dyn EventSource) -> Command {
        self.tree.end_state = None;
        loop {
            let input = match self.tree.queue.get_next(EventMask::all()) {
                Some(event) => Input::Event(event),
                None => source.poll(),
            };
            match input {
                Input::Event(mut event) => self.handle_event(&mut event),
                Input::Idle => self.idle(source),
                Input::Closed => {
                    tracing::debug!(?view, "event source closed");
                    self.tree.end_state = None;
                    return Command::CANCEL;
                }
            }
            self.run_exec_requests(source);
            if let Some(command) = self.tree.end_state.take() {
                if self.tree.valid(view, command) {
                    return command;
                }
                tracing::debug!(?view, ?command, "session end rejected");
            }
        }
    }

    fn run_exec_requests(&mut self, source: &mut dyn EventSource) {
        while let Some(request) = self.tree.exec_requests.pop_front() {
            let command = self.exec_view(request.view, source);
            if let Some(to) = request.reply_to {
                let mut reply = Event::Command(CommandEvent {
                    command,
                    sender: Some(request.view),
                });
                self.tree.handle_event(to, &mut reply, Phase::Focused);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Color, RecordingSurface};
    use crate::testing::{Entry, Probe, deliveries, new_log};
    use crate::types::OptionFlags;
    use crate::view::{Background, EventCx};
    use kurbo::Point;
    use understory_event::{Key, KeyEvent, PointerEvent};
    use understory_region::Region;

    fn program() -> Program<RecordingSurface> {
        Program::new(
            IntRect::new(0, 0, 80, 25),
            Background(Color::BLACK),
            RecordingSurface::new(),
        )
    }

    fn press(x: f64, y: f64) -> Event {
        Event::MouseDown(PointerEvent::primary(Point::new(x, y)))
    }

    #[test]
    fn run_paints_and_quits() {
        let mut p = program();
        let mut script = Script::new([
            Event::KeyDown(KeyEvent::plain(Key::Char('a'))),
            Event::command(Command::QUIT),
        ]);
        assert_eq!(p.run(&mut script), Command::QUIT);
        assert_eq!(script.remaining(), 0);
        // The initial damage was painted before the key was handled.
        assert_eq!(
            p.surface().covered_by(Color::BLACK),
            Region::from_rect(IntRect::new(0, 0, 80, 25))
        );
    }

    #[test]
    fn closed_source_cancels() {
        let mut p = program();
        let mut script = Script::default();
        assert_eq!(p.run(&mut script), Command::CANCEL);
    }

    #[test]
    fn idle_is_forwarded_to_source() {
        let mut p = program();
        let mut script = Script::default();
        script.push(Input::Idle);
        script.push(Input::Idle);
        script.push(Input::Event(Event::command(Command::QUIT)));
        assert_eq!(p.run(&mut script), Command::QUIT);
        assert_eq!(script.idle_calls(), 2);
        assert!(!p.low_memory());
    }

    #[test]
    fn exec_view_runs_until_dialog_ends() {
        let log = new_log();
        let mut p = program();
        let dialog = p.tree_mut().create_group(
            IntRect::new(10, 5, 70, 20),
            Probe::new("dialog", &log).ending_modal(),
        );
        let mut script = Script::new([
            Event::KeyDown(KeyEvent::plain(Key::Char('x'))),
            Event::command(Command::OK),
            Event::command(Command::CANCEL),
        ]);

        assert_eq!(p.exec_view(dialog, &mut script), Command::OK);
        assert_eq!(script.remaining(), 1);
        let tree = p.tree();
        assert_eq!(tree.owner(dialog), None);
        assert_eq!(tree.modal_state(dialog), 0);
        assert!(!tree.state(dialog).contains(StateFlags::MODAL));
        assert_eq!(tree.modal_view(), None);
        assert!(
            log.borrow()
                .iter()
                .any(|e| e.is_broadcast("dialog", Command::GRAB_MODAL, dialog))
        );
        assert!(
            log.borrow()
                .iter()
                .any(|e| e.is_broadcast("dialog", Command::RELEASE_MODAL, dialog))
        );
    }

    #[test]
    fn invalid_view_is_not_executed() {
        let log = new_log();
        let mut p = program();
        let dialog = p.tree_mut().create_group(
            IntRect::new(10, 5, 70, 20),
            Probe::new("dialog", &log).rejecting(Command::VALID),
        );
        let mut script = Script::new([Event::command(Command::OK)]);
        assert_eq!(p.exec_view(dialog, &mut script), Command::CANCEL);
        assert_eq!(script.remaining(), 1);
        assert_eq!(p.tree().owner(dialog), None);
    }

    #[test]
    fn rejected_end_keeps_session_running() {
        let log = new_log();
        let mut p = program();
        let dialog = p.tree_mut().create_group(
            IntRect::new(10, 5, 70, 20),
            Probe::new("dialog", &log)
                .ending_modal()
                .rejecting(Command::OK),
        );
        let mut script = Script::new([
            Event::command(Command::OK),
            Event::command(Command::CANCEL),
        ]);
        assert_eq!(p.exec_view(dialog, &mut script), Command::CANCEL);
    }

    #[test]
    fn pointer_outside_modal_view_alerts_and_stays_inside() {
        let log = new_log();
        let mut p = program();
        let behind = p
            .tree_mut()
            .create_view(IntRect::new(0, 0, 80, 25), Probe::new("behind", &log));
        p.insert(behind);
        let dialog = p.tree_mut().create_group(
            IntRect::new(10, 5, 70, 20),
            Probe::new("dialog", &log).ending_modal(),
        );
        let button = p
            .tree_mut()
            .create_view(IntRect::new(0, 0, 10, 1), Probe::new("button", &log));
        p.tree_mut().insert(dialog, button);

        let mut script = Script::new([press(1.0, 1.0), press(11.0, 5.0), Event::command(Command::OK)]);
        assert_eq!(p.exec_view(dialog, &mut script), Command::OK);
        assert_eq!(p.tree_mut().context_mut().take_alerts(), 1);
        let pressed = deliveries(&log, EventMask::MOUSE_DOWN);
        assert!(!pressed.iter().any(|(n, _)| *n == "behind"));
        assert!(pressed.contains(&("button", Phase::Focused)));
    }

    #[test]
    fn captured_view_gets_all_pointer_events() {
        #[derive(Debug)]
        struct Grabber;
        impl View for Grabber {
            fn handle_event(&mut self, cx: &mut EventCx<'_>, event: &mut Event, _phase: Phase) {
                match event {
                    Event::MouseDown(_) => cx.capture_mouse(),
                    Event::MouseUp(_) => cx.release_mouse(),
                    _ => return,
                }
                event.clear();
            }
        }

        let log = new_log();
        let mut p = program();
        let grabber = p.tree_mut().create_view(IntRect::new(0, 0, 10, 10), Grabber);
        let other = p
            .tree_mut()
            .create_view(IntRect::new(40, 0, 80, 25), Probe::new("other", &log));
        p.insert(grabber);
        p.insert(other);

        p.handle_event(&mut press(5.0, 5.0));
        assert_eq!(p.tree().context().capture(), Some(grabber));
        p.handle_event(&mut Event::MouseMove(PointerEvent::hover(Point::new(50.0, 5.0))));
        p.handle_event(&mut Event::MouseUp(PointerEvent::primary(Point::new(50.0, 5.0))));
        assert_eq!(p.tree().context().capture(), None);
        assert!(deliveries(&log, EventMask::MOUSE).is_empty());

        p.handle_event(&mut press(50.0, 5.0));
        assert_eq!(
            deliveries(&log, EventMask::MOUSE),
            [("other", Phase::Focused)]
        );
    }

    #[test]
    fn handler_requested_exec_replies_to_requester() {
        #[derive(Debug)]
        struct Opener {
            dialog: ViewId,
            answer: Option<Command>,
        }
        impl View for Opener {
            fn handle_event(&mut self, cx: &mut EventCx<'_>, event: &mut Event, _phase: Phase) {
                if event.is_command(Command::user(1)) {
                    cx.exec(self.dialog);
                    event.clear();
                } else if let Event::Command(c) = *event
                    && c.sender == Some(self.dialog)
                {
                    self.answer = Some(c.command);
                    event.clear();
                }
            }
        }

        let log = new_log();
        let mut p = program();
        let dialog = p.tree_mut().create_group(
            IntRect::new(10, 5, 70, 20),
            Probe::new("dialog", &log).ending_modal(),
        );
        let opener = p.tree_mut().create_view(
            IntRect::new(0, 0, 10, 1),
            Opener {
                dialog,
                answer: None,
            },
        );
        p.tree_mut().set_options(opener, OptionFlags::SELECTABLE);
        p.insert(opener);
        p.tree_mut().focus(opener);

        let mut script = Script::new([
            Event::command(Command::user(1)),
            Event::command(Command::YES),
            Event::command(Command::QUIT),
        ]);
        assert_eq!(p.run(&mut script), Command::QUIT);
        assert_eq!(
            p.tree().behavior::<Opener>(opener).and_then(|o| o.answer),
            Some(Command::YES)
        );
        assert_eq!(p.tree().owner(dialog), None);
    }

    #[test]
    fn quit_in_nested_session_reaches_outer_loop() {
        let log = new_log();
        let mut p = program();
        let dialog = p
            .tree_mut()
            .create_group(IntRect::new(10, 5, 70, 20), Probe::new("dialog", &log));
        let mut script = Script::new([Event::command(Command::QUIT)]);
        assert_eq!(p.exec_view(dialog, &mut script), Command::QUIT);
        // The outer loop picks the re-posted quit up from the queue.
        let mut rest = Script::default();
        assert_eq!(p.run(&mut rest), Command::QUIT);
    }

    #[test]
    fn pointer_moves_update_cursor() {
        let log = new_log();
        let mut p = Program::with_config(
            IntRect::new(0, 0, 80, 25),
            (),
            RecordingSurface::new(),
            ProgramConfig {
                default_cursor: Some(CursorId(0)),
                ..ProgramConfig::default()
            },
        );
        let text = p.tree_mut().create_view(
            IntRect::new(0, 0, 10, 10),
            Probe::new("text", &log).with_cursor(CursorId(5)),
        );
        p.insert(text);

        p.handle_event(&mut Event::MouseMove(PointerEvent::hover(Point::new(5.0, 5.0))));
        assert_eq!(
            p.tree_mut().context_mut().take_cursor_change(),
            Some(Some(CursorId(5)))
        );
        p.handle_event(&mut Event::MouseMove(PointerEvent::hover(Point::new(50.0, 5.0))));
        assert_eq!(p.tree().context().cursor(), Some(CursorId(0)));
        assert!(
            log.borrow()
                .iter()
                .any(|e| matches!(e, Entry::Event("text", _, Event::MouseMove(_))))
        );
    }
}

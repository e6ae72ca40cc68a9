// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared test behaviors.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::Point;
use understory_event::{Command, EventMask, Phase};
use understory_region::IntRect;

use crate::Event;
use crate::surface::Color;
use crate::types::{CursorId, ViewId};
use crate::view::{DrawCx, EventCx, View};

pub(crate) type Log = Rc<RefCell<Vec<Entry>>>;

pub(crate) fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Entry {
    Draw(&'static str, IntRect),
    Event(&'static str, Phase, Event),
}

impl Entry {
    pub(crate) fn is_broadcast(&self, name: &str, command: Command, sender: ViewId) -> bool {
        matches!(self, Self::Event(n, _, e)
            if *n == name && e.is_broadcast_of(command) && e.sender() == Some(sender))
    }
}

/// Names of the views that drew, in order.
pub(crate) fn draws(log: &Log) -> Vec<&'static str> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Entry::Draw(n, _) => Some(*n),
            Entry::Event(..) => None,
        })
        .collect()
}

/// `(name, phase)` for every delivery of an event of the given kind.
pub(crate) fn deliveries(log: &Log, mask: EventMask) -> Vec<(&'static str, Phase)> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Entry::Event(n, p, ev) if ev.matches(mask) => Some((*n, *p)),
            _ => None,
        })
        .collect()
}

#[derive(Debug)]
pub(crate) struct Probe {
    name: &'static str,
    log: Log,
    color: Color,
    clears: EventMask,
    ends_modal: bool,
    rejects: Option<Command>,
    cursor: Option<CursorId>,
}

impl Probe {
    pub(crate) fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            color: Color::WHITE,
            clears: EventMask::empty(),
            ends_modal: false,
            rejects: None,
            cursor: None,
        }
    }

    pub(crate) fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Clear every delivered event matching `mask`.
    pub(crate) fn clearing(mut self, mask: EventMask) -> Self {
        self.clears = mask;
        self
    }

    /// End the modal session with any command delivered to it.
    pub(crate) fn ending_modal(mut self) -> Self {
        self.ends_modal = true;
        self
    }

    pub(crate) fn rejecting(mut self, command: Command) -> Self {
        self.rejects = Some(command);
        self
    }

    pub(crate) fn with_cursor(mut self, cursor: CursorId) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

impl View for Probe {
    fn draw(&mut self, cx: &mut DrawCx<'_>, dirty: IntRect) {
        self.log.borrow_mut().push(Entry::Draw(self.name, dirty));
        cx.fill_rect(dirty, self.color);
    }

    fn handle_event(&mut self, cx: &mut EventCx<'_>, event: &mut Event, phase: Phase) {
        self.log
            .borrow_mut()
            .push(Entry::Event(self.name, phase, *event));
        if self.ends_modal
            && let Event::Command(c) = *event
        {
            cx.end_modal(c.command);
            event.clear();
        } else if event.matches(self.clears) {
            event.clear();
        }
    }

    fn cursor(&self, _point: Point) -> Option<CursorId> {
        self.cursor
    }

    fn valid(&self, command: Command) -> bool {
        self.rejects != Some(command)
    }
}

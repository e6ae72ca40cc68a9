// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The event value.

use kurbo::Point;

use crate::types::{Command, CommandEvent, EventMask, KeyEvent, PointerEvent};

/// An input or control occurrence.
///
/// Events are small `Copy` values. They are passed by `&mut` reference down a
/// dispatch chain so that a handler can [`clear`](Event::clear) one to stop further
/// delivery; they are never retained past a single delivery.
///
/// `K` is the opaque sender reference carried by commands (typically a view id).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Event<K> {
    /// No event; what a handled event becomes after [`Event::clear`].
    Nothing,
    /// A pointer button was pressed.
    MouseDown(PointerEvent),
    /// A pointer button was released.
    MouseUp(PointerEvent),
    /// The pointer moved.
    MouseMove(PointerEvent),
    /// A pointer button is being held (repeat tick).
    MouseAuto(PointerEvent),
    /// A key was pressed.
    KeyDown(KeyEvent),
    /// A key is being held (repeat).
    KeyAuto(KeyEvent),
    /// A command routed along the focus chain.
    Command(CommandEvent<K>),
    /// A command delivered to every view of a group.
    Broadcast(CommandEvent<K>),
    /// Pending damage must be painted.
    Repaint,
}

impl<K> Default for Event<K> {
    fn default() -> Self {
        Self::Nothing
    }
}

impl<K: Copy> Event<K> {
    /// A focused command without a sender.
    pub fn command(command: Command) -> Self {
        Self::Command(CommandEvent {
            command,
            sender: None,
        })
    }

    /// A broadcast command from `sender`.
    pub fn broadcast(command: Command, sender: Option<K>) -> Self {
        Self::Broadcast(CommandEvent { command, sender })
    }

    /// The kind bit of this event; empty for [`Event::Nothing`].
    pub fn mask(&self) -> EventMask {
        match self {
            Self::Nothing => EventMask::empty(),
            Self::MouseDown(_) => EventMask::MOUSE_DOWN,
            Self::MouseUp(_) => EventMask::MOUSE_UP,
            Self::MouseMove(_) => EventMask::MOUSE_MOVE,
            Self::MouseAuto(_) => EventMask::MOUSE_AUTO,
            Self::KeyDown(_) => EventMask::KEY_DOWN,
            Self::KeyAuto(_) => EventMask::KEY_AUTO,
            Self::Command(_) => EventMask::COMMAND,
            Self::Broadcast(_) => EventMask::BROADCAST,
            Self::Repaint => EventMask::REPAINT,
        }
    }

    /// Returns true if this event's kind is in `mask`.
    pub fn matches(&self, mask: EventMask) -> bool {
        self.mask().intersects(mask)
    }

    /// Returns true if the event has been handled (or never was anything).
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Mark the event as handled; later observers in the chain are skipped.
    pub fn clear(&mut self) {
        *self = Self::Nothing;
    }

    /// The pointer payload of a positional event.
    pub fn pointer(&self) -> Option<&PointerEvent> {
        match self {
            Self::MouseDown(p) | Self::MouseUp(p) | Self::MouseMove(p) | Self::MouseAuto(p) => {
                Some(p)
            }
            _ => None,
        }
    }

    /// The location of a positional event, in root coordinates.
    pub fn position(&self) -> Option<Point> {
        self.pointer().map(|p| p.position)
    }

    /// The key payload of a keyboard event.
    pub fn key(&self) -> Option<&KeyEvent> {
        match self {
            Self::KeyDown(k) | Self::KeyAuto(k) => Some(k),
            _ => None,
        }
    }

    /// The command code of a command or broadcast.
    pub fn command_code(&self) -> Option<Command> {
        match self {
            Self::Command(c) | Self::Broadcast(c) => Some(c.command),
            _ => None,
        }
    }

    /// The sender of a command or broadcast.
    pub fn sender(&self) -> Option<K> {
        match self {
            Self::Command(c) | Self::Broadcast(c) => c.sender,
            _ => None,
        }
    }

    /// Returns true for a broadcast carrying `command`.
    pub fn is_broadcast_of(&self, command: Command) -> bool {
        matches!(self, Self::Broadcast(c) if c.command == command)
    }

    /// Returns true for a focused command carrying `command`.
    pub fn is_command(&self, command: Command) -> bool {
        matches!(self, Self::Command(c) if c.command == command)
    }
}

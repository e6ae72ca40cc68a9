// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_view --heading-base-level=0

//! Understory View: a retained-mode view tree for character-cell and pixel UIs.
//!
//! A [`ViewTree`] owns rectangular views arranged in groups. Children of a group are
//! ordered front to back; painting and hit testing respect that order.
//!
//! - Painting: [`ViewTree::paint`] computes, for every view, the part of the damage
//!   that is not hidden by siblings in front of it, and asks the view to draw only
//!   there. Groups paint their background where no child covers them.
//! - Damage: [`ViewTree::invalidate`] and friends post rectangles to the event queue,
//!   coalesced into a single pending [`Event::Repaint`](understory_event::Event::Repaint).
//! - Dispatch: keyboard and command events reach the focused chain, with optional
//!   pre- and post-process phases for siblings; pointer events reach the frontmost
//!   view under the pointer; broadcasts reach every child.
//! - Focus: each group has at most one selected child; Tab and Shift-Tab cycle it.
//! - Modal execution: [`Program::exec_view`] runs a nested loop until the executing
//!   view ends it with a command it accepts.
//!
//! Behaviors are supplied by implementing [`View`]; a view that is a group also gets
//! its children's events first.
//!
//! # Example
//!
//! ```rust
//! use understory_view::{
//!     Background, Color, Command, Event, IntRect, Program, RecordingSurface, Script,
//! };
//!
//! let mut program = Program::new(
//!     IntRect::new(0, 0, 80, 25),
//!     Background(Color::BLACK),
//!     RecordingSurface::new(),
//! );
//! let window = program
//!     .tree_mut()
//!     .create_group(IntRect::new(10, 5, 50, 15), Background(Color::WHITE));
//! program.insert(window);
//!
//! let mut input = Script::new([Event::command(Command::QUIT)]);
//! assert_eq!(program.run(&mut input), Command::QUIT);
//!
//! // The desktop was painted only around the window.
//! let desktop = program.surface().covered_by(Color::BLACK);
//! assert_eq!(desktop.area(), 80 * 25 - 40 * 10);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod context;
mod dispatch;
mod group;
mod memory;
mod paint;
mod program;
mod surface;
mod tree;
mod types;
mod view;

#[cfg(test)]
mod testing;

pub use context::DispatchContext;
pub use memory::{DEFAULT_SAFETY_POOL_BYTES, SafetyPool};
pub use program::{EventSource, Input, Program, ProgramConfig, Script};
pub use surface::{Color, RecordingSurface, Surface, SurfaceOp};
pub use tree::{Children, ViewTree};
pub use types::{CursorId, OptionFlags, StateFlags, ViewId};
pub use view::{Background, DrawCx, EventCx, View};

pub use understory_event::{
    Buttons, Command, CommandEvent, EventMask, Key, KeyEvent, Modifiers, Phase, PointerEvent,
};
pub use understory_region::{IntRect, Region};

/// An event addressed with [`ViewId`] senders.
pub type Event = understory_event::Event<ViewId>;

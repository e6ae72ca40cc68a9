// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_event --heading-base-level=0

//! Understory Event: UI event values and a bounded, masked event queue.
//!
//! ## Overview
//!
//! An [`Event`] is a small `Copy` value: a kind plus a payload (pointer location and
//! buttons, key and modifiers, or a [`Command`] with an opaque sender `K`).
//! Each kind belongs to a routing family exposed as an [`EventMask`] constant:
//!
//! - [`EventMask::POSITIONAL`]: routed by hit-testing (pointer events).
//! - [`EventMask::FOCUSED`]: routed down the focus chain, with [`Phase::PreProcess`]
//!   observers before and [`Phase::PostProcess`] observers after the addressee
//!   (keyboard events and commands).
//! - [`EventMask::BROADCASTS`]: delivered to every sibling.
//!
//! Handling is signalled by [`Event::clear`]; a cleared event is no longer delivered.
//!
//! ## Queue
//!
//! [`EventQueue`] is bounded (overflow drops the oldest event), retrieval is masked
//! ([`EventQueue::get_next`] skips non-matching events without consuming them), and
//! repaint requests are coalesced: damage posted with [`EventQueue::post_damage`]
//! accumulates into one region behind a single pending [`Event::Repaint`].
//!
//! ```
//! use understory_event::{Event, EventMask, EventQueue, Key, KeyEvent};
//! use understory_region::IntRect;
//!
//! let mut q: EventQueue<u32> = EventQueue::new();
//! q.post(Event::KeyDown(KeyEvent::plain(Key::Tab)));
//! q.post_damage(IntRect::new(0, 0, 10, 10));
//! q.post_damage(IntRect::new(10, 0, 20, 10));
//!
//! // One repaint for both rectangles.
//! assert_eq!(q.len(), 2);
//! assert!(q.get_next(EventMask::KEYBOARD).is_some());
//! assert_eq!(q.get_next(EventMask::all()), Some(Event::Repaint));
//! assert_eq!(q.take_damage().area(), 200);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod event;
pub mod queue;
pub mod types;

pub use event::Event;
pub use queue::{DEFAULT_CAPACITY, EventQueue};
pub use types::{
    Buttons, Command, CommandEvent, EventMask, Key, KeyEvent, Modifiers, Phase, PointerEvent,
};

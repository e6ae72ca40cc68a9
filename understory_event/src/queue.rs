// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded event queue.
//!
//! ## Overview
//!
//! [`EventQueue`] is a FIFO with a fixed capacity chosen at construction. Posting to a
//! full queue drops the oldest pending event instead of failing.
//!
//! Retrieval is masked: [`EventQueue::get_next`] removes the first pending event whose
//! kind intersects the mask and leaves non-matching events in place for a later call
//! with a broader mask.
//!
//! ## Repaint coalescing
//!
//! Damage is not queued as individual events. [`EventQueue::post_damage`] unions the
//! rectangle into a single accumulated [`Region`] and makes sure exactly one
//! [`Event::Repaint`] is pending. The consumer of that event calls
//! [`EventQueue::take_damage`] to obtain everything accumulated so far.

use alloc::collections::{TryReserveError, VecDeque};

use understory_region::{IntRect, Region};

use crate::event::Event;
use crate::types::EventMask;

/// Capacity used by [`EventQueue::new`].
pub const DEFAULT_CAPACITY: usize = 16;

/// Bounded FIFO of pending events with coalesced repaint requests.
#[derive(Clone, Debug)]
pub struct EventQueue<K> {
    events: VecDeque<Event<K>>,
    capacity: usize,
    damage: Region,
    repaint_pending: bool,
    dropped: u64,
}

impl<K: Copy> Default for EventQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy> EventQueue<K> {
    /// Create a queue holding up to [`DEFAULT_CAPACITY`] events.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a queue holding up to `capacity` events.
    ///
    /// The capacity is at least 2 so that a pending repaint never has to be evicted.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            damage: Region::new(),
            repaint_pending: false,
            dropped: 0,
        }
    }

    /// Maximum number of pending events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Returns true if an [`Event::Repaint`] is pending.
    pub fn repaint_pending(&self) -> bool {
        self.repaint_pending
    }

    /// Append an event, evicting the oldest pending non-repaint event when full.
    ///
    /// [`Event::Nothing`] is ignored, and a [`Event::Repaint`] is coalesced with any
    /// repaint already pending.
    pub fn post(&mut self, event: Event<K>) {
        match event {
            Event::Nothing => {}
            Event::Repaint => self.request_repaint(),
            _ => self.push(event),
        }
    }

    /// Accumulate damage and make sure a repaint is pending.
    ///
    /// If the damage region cannot grow, it degrades to its bounding box.
    pub fn post_damage(&mut self, rect: IntRect) {
        if self.try_post_damage(rect).is_err() {
            tracing::warn!(?rect, "damage region allocation failed; coarsening");
            self.coarsen_damage(rect);
        }
    }

    /// Replace the damage with the bounding box of itself and `rect`.
    pub(crate) fn coarsen_damage(&mut self, rect: IntRect) {
        let bounds = self.damage.bounds().union(rect);
        self.damage = Region::from_rect(bounds);
        self.request_repaint();
    }

    /// Fallible [`EventQueue::post_damage`]; nothing changes on error.
    pub fn try_post_damage(&mut self, rect: IntRect) -> Result<(), TryReserveError> {
        if rect.is_empty() {
            return Ok(());
        }
        self.damage.try_union_rect(rect)?;
        self.request_repaint();
        Ok(())
    }

    /// Remove `rect` from the accumulated damage.
    ///
    /// When no damage remains, the pending repaint event is withdrawn.
    pub fn validate(&mut self, rect: IntRect) {
        self.damage.subtract_rect(rect);
        if self.damage.is_empty() && self.repaint_pending {
            self.events.retain(|e| !matches!(e, Event::Repaint));
            self.repaint_pending = false;
        }
    }

    /// The damage accumulated since the last [`EventQueue::take_damage`].
    pub fn damage(&self) -> &Region {
        &self.damage
    }

    /// Take the accumulated damage, leaving it empty.
    pub fn take_damage(&mut self) -> Region {
        core::mem::take(&mut self.damage)
    }

    /// Remove and return the first pending event whose kind intersects `mask`.
    pub fn get_next(&mut self, mask: EventMask) -> Option<Event<K>> {
        let idx = self.events.iter().position(|e| e.matches(mask))?;
        let event = self.events.remove(idx)?;
        if matches!(event, Event::Repaint) {
            self.repaint_pending = false;
        }
        Some(event)
    }

    /// Return the first pending event whose kind intersects `mask`, without removing it.
    pub fn peek_next(&self, mask: EventMask) -> Option<&Event<K>> {
        self.events.iter().find(|e| e.matches(mask))
    }

    /// Drop every pending event and all accumulated damage.
    pub fn clear(&mut self) {
        self.events.clear();
        self.damage.clear();
        self.repaint_pending = false;
    }

    fn request_repaint(&mut self) {
        if !self.repaint_pending {
            self.push(Event::Repaint);
            self.repaint_pending = true;
        }
    }

    fn push(&mut self, event: Event<K>) {
        if self.events.len() >= self.capacity {
            // At most one repaint is pending and the capacity is at least 2, so
            // there is always something else to evict.
            if let Some(idx) = self
                .events
                .iter()
                .position(|e| !matches!(e, Event::Repaint))
            {
                let _ = self.events.remove(idx);
                self.dropped += 1;
                tracing::debug!(dropped = self.dropped, "event queue full; dropped oldest");
            }
        }
        self.events.push_back(event);
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Group operations: selection, focus, tab order, validation.

use alloc::vec::Vec;

use understory_event::Command;

use crate::tree::ViewTree;
use crate::types::{OptionFlags, StateFlags, ViewId};

impl ViewTree {
    /// Make `view` the selected child of `group`, or clear the selection with `None`.
    ///
    /// The previous selection loses `SELECTED`, `ACTIVE`, and `FOCUSED`. The new one
    /// gains `SELECTED` and `ACTIVE`, and `FOCUSED` if the group is focused. A view
    /// with [`OptionFlags::TOP_SELECT`] is also brought to the front.
    ///
    /// Panics if `view` is not a child of `group`.
    #[track_caller]
    pub fn select(&mut self, group: ViewId, view: Option<ViewId>) {
        let prev = self.group_data(group).selected;
        if prev == view {
            return;
        }
        if let Some(v) = view {
            assert!(
                self.node(v).owner == Some(group),
                "select: view is not a child of this group"
            );
        }
        self.group_data_mut(group).selected = view;
        if let Some(p) = prev
            && self.is_alive(p)
        {
            self.set_state(p, StateFlags::FOCUSED, false);
            self.set_state(p, StateFlags::SELECTED | StateFlags::ACTIVE, false);
        }
        // Focus handlers run above may have destroyed or moved `v`.
        if let Some(v) = view
            && self.node_opt(v).is_some_and(|n| n.owner == Some(group))
        {
            self.set_state(v, StateFlags::SELECTED | StateFlags::ACTIVE, true);
            if self.state(group).contains(StateFlags::FOCUSED) {
                self.set_state(v, StateFlags::FOCUSED, true);
            }
            if self.is_alive(v) && self.options(v).contains(OptionFlags::TOP_SELECT) {
                self.make_first(v);
            }
        }
        tracing::trace!(?group, ?prev, ?view, "selection changed");
    }

    /// Put `id` on the focus chain by selecting it, and each of its ancestors, in
    /// its owner.
    ///
    /// Returns `false` for a disabled view.
    pub fn focus(&mut self, id: ViewId) -> bool {
        if self.state(id).contains(StateFlags::DISABLED) {
            return false;
        }
        let mut chain = Vec::new();
        let mut cur = id;
        while let Some(owner) = self.node(cur).owner {
            chain.push((owner, cur));
            cur = owner;
        }
        for (owner, child) in chain.into_iter().rev() {
            // A focus handler may have moved things around.
            if !self.is_alive(child) || self.node(child).owner != Some(owner) {
                return false;
            }
            self.select(owner, Some(child));
        }
        true
    }

    /// Select the next eligible child behind the current selection, wrapping around.
    ///
    /// Skips children that are disabled, hidden, or not selectable. Clears the
    /// selection if no child is eligible. Without a selection, starts at the front.
    pub fn select_next(&mut self, group: ViewId) -> Option<ViewId> {
        self.step_selection(group, true)
    }

    /// Select the previous eligible child, wrapping around.
    ///
    /// Without a selection, starts at the back.
    pub fn select_prev(&mut self, group: ViewId) -> Option<ViewId> {
        self.step_selection(group, false)
    }

    fn step_selection(&mut self, group: ViewId, forward: bool) -> Option<ViewId> {
        let data = self.group_data(group);
        let (len, first, last) = (data.len, data.first, data.last);
        let mut cur = data.selected;
        for _ in 0..len {
            let step = match cur {
                Some(c) if forward => self.node(c).next,
                Some(c) => self.node(c).prev,
                None => None,
            };
            let Some(candidate) = step.or(if forward { first } else { last }) else {
                break;
            };
            if self.can_select(candidate) {
                self.select(group, Some(candidate));
                return Some(candidate);
            }
            cur = Some(candidate);
        }
        tracing::debug!(?group, "no selectable child");
        self.select(group, None);
        None
    }

    pub(crate) fn can_select(&self, id: ViewId) -> bool {
        let n = self.node(id);
        n.options.contains(OptionFlags::SELECTABLE)
            && n.state.contains(StateFlags::VISIBLE)
            && !n.state.contains(StateFlags::DISABLED)
    }

    /// Whether `id` accepts `command` as a terminating (or, for
    /// [`Command::VALID`], starting) command.
    ///
    /// A group is valid only if every child is.
    pub fn valid(&self, id: ViewId, command: Command) -> bool {
        let Some(n) = self.node_opt(id) else {
            return false;
        };
        if n.group.is_some() && !self.children(id).all(|c| self.valid(c, command)) {
            return false;
        }
        n.behavior.as_deref().is_none_or(|b| b.valid(command))
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event dispatch: base view handling, phased group delivery, hit-testing, cursors.
//!
//! ## Delivery order
//!
//! For a view receiving an event, [`ViewTree::handle_event`]:
//!
//! 1. Selects the view on a primary-button press if it is selectable, not yet
//!    focused, and not disabled. The press is consumed unless the view has
//!    [`OptionFlags::FIRST_CLICK`].
//! 2. For a group:
//!    - while modal, counts [`Command::GRAB_MODAL`] / [`Command::RELEASE_MODAL`]
//!      broadcasts;
//!    - focused-family events (keys, commands) go to `PRE_PROCESS` children, then
//!      the selected child, then `POST_PROCESS` children, stopping as soon as
//!      one clears the event;
//!    - positional events go to the frontmost visible child under the pointer (a
//!      miss while modal raises an alert);
//!    - everything else goes to every child.
//! 3. Runs the view's own [`View::handle_event`](crate::View::handle_event) if the
//!    event is still uncleared.
//! 4. For a group, turns an unhandled Tab, Shift-Tab, [`Command::NEXT`], or
//!    [`Command::PREV`] into a tab-order step.
//!
//! Disabled children receive nothing. Children are walked from a snapshot and each
//! is re-checked for membership before delivery, so handlers may restructure the
//! tree while an event is in flight.

use kurbo::Point;
use understory_event::{Buttons, Command, EventMask, Key, Modifiers, Phase};
use understory_region::IntRect;

use crate::Event;
use crate::tree::ViewTree;
use crate::types::{CursorId, OptionFlags, StateFlags, ViewId};
use crate::view::EventCx;

impl ViewTree {
    /// Deliver `event` to `id` in `phase`.
    ///
    /// Cleared events and stale ids are ignored.
    pub fn handle_event(&mut self, id: ViewId, event: &mut Event, phase: Phase) {
        if event.is_nothing() || !self.is_alive(id) {
            return;
        }
        self.select_on_press(id, event);
        if event.is_nothing() {
            return;
        }
        let group = self.is_group(id);
        if group {
            self.dispatch_to_children(id, event);
            if event.is_nothing() {
                return;
            }
        }
        self.run_handler(id, event, phase);
        if group && !event.is_nothing() && self.is_alive(id) {
            self.step_on_tab(id, event);
        }
    }

    fn select_on_press(&mut self, id: ViewId, event: &mut Event) {
        let Event::MouseDown(p) = *event else {
            return;
        };
        let n = self.node(id);
        if !p.buttons.contains(Buttons::PRIMARY)
            || !n.options.contains(OptionFlags::SELECTABLE)
            || n.state.intersects(StateFlags::FOCUSED | StateFlags::DISABLED)
        {
            return;
        }
        let first_click = n.options.contains(OptionFlags::FIRST_CLICK);
        self.focus(id);
        if !first_click {
            event.clear();
        }
    }

    fn dispatch_to_children(&mut self, group: ViewId, event: &mut Event) {
        let state = self.node(group).state;
        if state.contains(StateFlags::MODAL)
            && let Event::Broadcast(c) = *event
        {
            self.count_modal(group, c.command);
        }

        let mask = event.mask();
        let children = self.child_snapshot(group);
        if mask.intersects(EventMask::FOCUSED) {
            if !state.contains(StateFlags::FOCUSED) {
                return;
            }
            for &child in &children {
                if event.is_nothing() {
                    return;
                }
                if self.subscribed(group, child, OptionFlags::PRE_PROCESS) {
                    self.deliver(group, child, event, Phase::PreProcess);
                }
            }
            // A pre-process handler may have destroyed the group.
            let Some(selected) = self.node_opt(group).and_then(|n| n.group.as_ref()?.selected)
            else {
                return;
            };
            if !event.is_nothing() {
                self.deliver(group, selected, event, Phase::Focused);
            }
            for &child in &children {
                if event.is_nothing() || !self.is_alive(group) {
                    return;
                }
                if self.subscribed(group, child, OptionFlags::POST_PROCESS) {
                    self.deliver(group, child, event, Phase::PostProcess);
                }
            }
        } else if mask.intersects(EventMask::POSITIONAL) {
            let Some(point) = event.position() else {
                return;
            };
            let local = self.to_local(group, point);
            match self.child_at(group, local) {
                Some(child) => self.deliver(group, child, event, Phase::Focused),
                None if state.contains(StateFlags::MODAL) => {
                    tracing::debug!(?group, ?point, "pointer outside modal view");
                    self.context.alert();
                }
                None => {}
            }
        } else {
            for &child in &children {
                if event.is_nothing() {
                    return;
                }
                self.deliver(group, child, event, Phase::Focused);
            }
        }
    }

    #[track_caller]
    fn count_modal(&mut self, group: ViewId, command: Command) {
        let data = self.group_data_mut(group);
        if command == Command::GRAB_MODAL {
            data.modal_state += 1;
        } else if command == Command::RELEASE_MODAL {
            assert!(
                data.modal_state > 0,
                "modal release without a matching grab"
            );
            data.modal_state -= 1;
        } else {
            return;
        }
        tracing::trace!(?group, depth = data.modal_state, "modal state");
    }

    fn subscribed(&self, group: ViewId, child: ViewId, flag: OptionFlags) -> bool {
        self.node_opt(child)
            .is_some_and(|n| n.owner == Some(group) && n.options.contains(flag))
    }

    fn deliver(&mut self, group: ViewId, child: ViewId, event: &mut Event, phase: Phase) {
        let Some(n) = self.node_opt(child) else {
            return;
        };
        if n.owner != Some(group) || n.state.contains(StateFlags::DISABLED) {
            return;
        }
        self.handle_event(child, event, phase);
    }

    fn run_handler(&mut self, id: ViewId, event: &mut Event, phase: Phase) {
        let Some(mut behavior) = self.take_behavior(id) else {
            tracing::trace!(?id, "handler already running; skipped");
            return;
        };
        behavior.handle_event(&mut EventCx::new(self, id), event, phase);
        self.restore_behavior(id, behavior);
    }

    fn step_on_tab(&mut self, group: ViewId, event: &mut Event) {
        let forward = match *event {
            Event::KeyDown(k) | Event::KeyAuto(k) if k.key == Key::Tab => {
                !k.modifiers.contains(Modifiers::SHIFT)
            }
            Event::Command(c) if c.command == Command::NEXT => true,
            Event::Command(c) if c.command == Command::PREV => false,
            _ => return,
        };
        // Leave the key to the owner when nothing here can take the focus.
        if !self.children(group).any(|c| self.can_select(c)) {
            return;
        }
        if forward {
            self.select_next(group);
        } else {
            self.select_prev(group);
        }
        event.clear();
    }

    /// The area of `child` that shows within `group`, in the group's coordinates.
    pub(crate) fn visible_rect(&self, group: ViewId, child: ViewId) -> IntRect {
        let n = self.node(child);
        if n.options.contains(OptionFlags::CLIP_TO_OWNER) {
            n.bounds.intersect(self.client_rect(group))
        } else {
            n.bounds
        }
    }

    /// Frontmost visible child of `group` under `local` (group coordinates).
    ///
    /// Disabled children are returned too: they still cover what is behind them.
    pub fn child_at(&self, group: ViewId, local: Point) -> Option<ViewId> {
        self.children(group).find(|&c| {
            self.node(c).state.contains(StateFlags::VISIBLE)
                && self.visible_rect(group, c).contains_point(local)
        })
    }

    /// The deepest exposed view under a root-space point.
    pub fn view_at(&self, point: Point) -> Option<ViewId> {
        let root = self.root()?;
        let n = self.node(root);
        if !n.state.contains(StateFlags::EXPOSED) || !n.bounds.contains_point(point) {
            return None;
        }
        let mut cur = root;
        while self.is_group(cur) {
            match self.child_at(cur, self.to_local(cur, point)) {
                Some(child) => cur = child,
                None => break,
            }
        }
        Some(cur)
    }

    /// The cursor for a root-space point.
    ///
    /// Asks the view under the point, then its owners, and falls back to the
    /// default cursor.
    pub fn cursor_at(&self, point: Point) -> Option<CursorId> {
        let mut cur = self.view_at(point);
        while let Some(id) = cur {
            let n = self.node(id);
            if let Some(behavior) = n.behavior.as_deref()
                && let Some(cursor) = behavior.cursor(self.to_local(id, point))
            {
                return Some(cursor);
            }
            cur = n.owner;
        }
        self.context.default_cursor
    }

    /// Recompute the cursor for a pointer at `point`, recording a change if any.
    pub fn update_cursor(&mut self, point: Point) {
        let cursor = self.cursor_at(point);
        self.context.set_cursor(cursor);
    }
}

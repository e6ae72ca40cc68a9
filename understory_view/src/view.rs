// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`View`] capability trait and the contexts handed to it.
//!
//! ## Overview
//!
//! A view's geometry, state, and place in the tree live in the
//! [`ViewTree`]; its behavior is a boxed [`View`] attached to the node. The tree
//! calls into the behavior to draw, to handle events, to pick a cursor, and to
//! validate a terminating command. Each hook has a default, so a behavior only
//! implements what it needs. `()` is the behavior with no output at all.
//!
//! Drawing receives a [`DrawCx`] that translates local coordinates to the
//! surface and nothing else: the tree cannot be mutated while painting.
//! Event handling receives an [`EventCx`] with full access to the tree.

use core::any::Any;
use core::fmt::Debug;

use kurbo::Point;
use understory_event::{Command, Phase};
use understory_region::IntRect;

use crate::Event;
use crate::surface::{Color, Surface};
use crate::tree::ViewTree;
use crate::types::{CursorId, StateFlags, ViewId};

/// Behavior attached to a node of a [`ViewTree`].
pub trait View: Any + Debug {
    /// Draw the part of the view covered by `dirty`, in local coordinates.
    ///
    /// The surface clip is already restricted to `dirty`; drawing outside it is
    /// harmless but wasted.
    fn draw(&mut self, cx: &mut DrawCx<'_>, dirty: IntRect) {
        let _ = (cx, dirty);
    }

    /// Handle an event delivered to this view.
    ///
    /// Call [`Event::clear`](understory_event::Event::clear) to mark it handled. For
    /// a group, this runs after the children had their turn and only if none of
    /// them cleared the event.
    fn handle_event(&mut self, cx: &mut EventCx<'_>, event: &mut Event, phase: Phase) {
        let _ = (cx, event, phase);
    }

    /// The cursor to show over `point` (local coordinates), or `None` to defer to
    /// the owner.
    fn cursor(&self, point: Point) -> Option<CursorId> {
        let _ = point;
        None
    }

    /// Whether the view accepts ending (or, for [`Command::VALID`], starting) a
    /// modal session with `command`.
    fn valid(&self, command: Command) -> bool {
        let _ = command;
        true
    }
}

impl View for () {}

/// Fills its whole area with a single color.
///
/// Typically the behavior of a group whose background shows between children.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Background(pub Color);

impl View for Background {
    fn draw(&mut self, cx: &mut DrawCx<'_>, dirty: IntRect) {
        cx.fill_rect(dirty, self.0);
    }
}

/// Drawing context for one view.
///
/// Translates local coordinates to surface coordinates.
pub struct DrawCx<'a> {
    pub(crate) surface: &'a mut dyn Surface,
    pub(crate) id: ViewId,
    pub(crate) origin: (i32, i32),
    pub(crate) extent: IntRect,
    pub(crate) state: StateFlags,
}

impl Debug for DrawCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DrawCx")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("extent", &self.extent)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DrawCx<'_> {
    /// The view being drawn.
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// The view's extent: its bounds moved to the local origin.
    pub fn extent(&self) -> IntRect {
        self.extent
    }

    /// The view's state at paint time.
    pub fn state(&self) -> StateFlags {
        self.state
    }

    /// Surface position of the local origin.
    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    /// Fill a local rectangle.
    pub fn fill_rect(&mut self, rect: IntRect, color: Color) {
        let (x, y) = self.origin;
        self.surface.fill_rect(rect.translate(x, y), color);
    }

    /// Draw text anchored at a local point.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        let (ox, oy) = self.origin;
        self.surface.draw_text(ox + x, oy + y, text, color);
    }

    /// Copy a local rectangle so its top-left lands at local (`x`, `y`).
    pub fn blit(&mut self, src: IntRect, x: i32, y: i32) {
        let (ox, oy) = self.origin;
        self.surface.blit(src.translate(ox, oy), ox + x, oy + y);
    }

    pub(crate) fn install_clip(&mut self, local: IntRect) {
        let (x, y) = self.origin;
        self.surface.set_clip_rect(local.translate(x, y));
    }
}

/// Event handling context for one view.
///
/// Gives the handler mutable access to the whole tree. Structural changes made
/// here are safe: dispatch re-validates membership before each delivery.
pub struct EventCx<'a> {
    tree: &'a mut ViewTree,
    id: ViewId,
}

impl Debug for EventCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventCx")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<'a> EventCx<'a> {
    pub(crate) fn new(tree: &'a mut ViewTree, id: ViewId) -> Self {
        Self { tree, id }
    }

    /// The view handling the event.
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// The tree.
    pub fn tree(&self) -> &ViewTree {
        self.tree
    }

    /// The tree, mutably.
    pub fn tree_mut(&mut self) -> &mut ViewTree {
        self.tree
    }

    /// Current state of the view.
    pub fn state(&self) -> StateFlags {
        self.tree.state(self.id)
    }

    /// The view's bounds in its owner's coordinates.
    pub fn bounds(&self) -> IntRect {
        self.tree.bounds(self.id)
    }

    /// Convert a root-space point (as carried by pointer events) to local coordinates.
    pub fn local_point(&self, point: Point) -> Point {
        self.tree.to_local(self.id, point)
    }

    /// Request a repaint of the whole view.
    pub fn invalidate(&mut self) {
        self.tree.invalidate(self.id);
    }

    /// Request a repaint of a local rectangle.
    pub fn invalid_rect(&mut self, rect: IntRect) {
        self.tree.invalid_rect(self.id, rect);
    }

    /// Post an event for later dispatch.
    pub fn post(&mut self, event: Event) {
        self.tree.post(event);
    }

    /// End the innermost modal session with `command`.
    pub fn end_modal(&mut self, command: Command) {
        self.tree.end_modal(command);
    }

    /// Route pointer events to this view until released.
    pub fn capture_mouse(&mut self) {
        self.tree.capture_mouse(self.id);
    }

    /// Stop routing pointer events to the capturing view.
    pub fn release_mouse(&mut self) {
        self.tree.release_mouse();
    }

    /// Ask the program to execute `view` modally once this handler returns.
    ///
    /// The terminating command comes back to this view as an
    /// [`Event::Command`](understory_event::Event::Command) whose sender is `view`.
    pub fn exec(&mut self, view: ViewId) {
        self.tree.request_exec(view, Some(self.id));
    }
}

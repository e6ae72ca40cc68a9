// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: storage, structure, state, and damage.

use alloc::boxed::Box;
use alloc::collections::{TryReserveError, VecDeque};
use alloc::vec::Vec;

use kurbo::Point;
use understory_event::{Command, EventQueue, Phase};
use understory_region::{IntRect, Region};

use crate::Event;
use crate::context::DispatchContext;
use crate::memory::SafetyPool;
use crate::types::{OptionFlags, StateFlags, ViewId};
use crate::view::View;

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Arena of views with their z-ordered group structure.
///
/// The tree owns every view's geometry, state, and behavior, plus the pending
/// [`EventQueue`], the [`DispatchContext`], and the [`SafetyPool`] shared by all
/// of them. Views are addressed by [`ViewId`].
pub struct ViewTree {
    nodes: Vec<Option<Node>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: Option<ViewId>,
    pub(crate) queue: EventQueue<ViewId>,
    pub(crate) context: DispatchContext,
    pub(crate) memory: SafetyPool,
    pub(crate) modal: Vec<ViewId>,
    pub(crate) end_state: Option<Command>,
    pub(crate) exec_requests: VecDeque<ExecRequest>,
}

impl core::fmt::Debug for ViewTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("ViewTree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("root", &self.root)
            .field("queue", &self.queue.len())
            .field("modal", &self.modal)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ExecRequest {
    pub(crate) view: ViewId,
    pub(crate) reply_to: Option<ViewId>,
}

#[derive(Debug)]
pub(crate) struct GroupData {
    pub(crate) first: Option<ViewId>,
    pub(crate) last: Option<ViewId>,
    pub(crate) len: usize,
    pub(crate) selected: Option<ViewId>,
    pub(crate) modal_state: u32,
    /// `None` follows the group's extent.
    pub(crate) client: Option<IntRect>,
    /// Cached: children's visible areas are pairwise disjoint and inside the extent.
    pub(crate) tiled: Option<bool>,
}

impl GroupData {
    fn new() -> Self {
        Self {
            first: None,
            last: None,
            len: 0,
            selected: None,
            modal_state: 0,
            client: None,
            tiled: None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) owner: Option<ViewId>,
    pub(crate) prev: Option<ViewId>,
    pub(crate) next: Option<ViewId>,
    pub(crate) bounds: IntRect,
    // Owner coordinates, like `bounds`: clip ⊆ visible ⊆ bounds.
    pub(crate) visible: Region,
    pub(crate) clip: Region,
    /// Local damage held back by a repaint lock.
    pub(crate) pending: Region,
    pub(crate) state: StateFlags,
    pub(crate) options: OptionFlags,
    pub(crate) group: Option<GroupData>,
    pub(crate) behavior: Option<Box<dyn View>>,
}

impl Node {
    fn new(generation: u32, bounds: IntRect, group: bool, behavior: Box<dyn View>) -> Self {
        Self {
            generation,
            owner: None,
            prev: None,
            next: None,
            bounds,
            visible: Region::from_rect(bounds),
            clip: Region::new(),
            pending: Region::new(),
            state: StateFlags::default(),
            options: OptionFlags::default(),
            group: group.then(GroupData::new),
            behavior: Some(behavior),
        }
    }
}

/// Front-to-back iterator over a group's children.
#[derive(Clone, Debug)]
pub struct Children<'a> {
    tree: &'a ViewTree,
    next: Option<ViewId>,
}

impl Iterator for Children<'_> {
    type Item = ViewId;

    fn next(&mut self) -> Option<ViewId> {
        let id = self.next?;
        self.next = self.tree.node(id).next;
        Some(id)
    }
}

impl ViewTree {
    /// Create an empty tree with default queue capacity and safety reserve.
    pub fn new() -> Self {
        Self::with_limits(
            understory_event::DEFAULT_CAPACITY,
            crate::memory::DEFAULT_SAFETY_POOL_BYTES,
        )
    }

    /// Create an empty tree with the given queue capacity and safety reserve size.
    pub fn with_limits(queue_capacity: usize, safety_pool_bytes: usize) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: None,
            queue: EventQueue::with_capacity(queue_capacity),
            context: DispatchContext::default(),
            memory: SafetyPool::new(safety_pool_bytes),
            modal: Vec::new(),
            end_state: None,
            exec_requests: VecDeque::new(),
        }
    }

    // --- storage ---

    /// Create a detached leaf view with `bounds` (in its future owner's coordinates).
    ///
    /// Aborts if the arena cannot grow even after spending the safety reserve; see
    /// [`ViewTree::try_create_view`].
    pub fn create_view(&mut self, bounds: IntRect, behavior: impl View) -> ViewId {
        self.alloc(Node::new(0, bounds, false, Box::new(behavior)))
    }

    /// Create a detached group with `bounds` (in its future owner's coordinates).
    ///
    /// Aborts like [`ViewTree::create_view`] on allocation failure.
    pub fn create_group(&mut self, bounds: IntRect, behavior: impl View) -> ViewId {
        self.alloc(Node::new(0, bounds, true, Box::new(behavior)))
    }

    /// Create a detached leaf view, or return `None` if the arena cannot grow.
    ///
    /// A failure leaves [`ViewTree::low_memory`] set.
    pub fn try_create_view(&mut self, bounds: IntRect, behavior: impl View) -> Option<ViewId> {
        self.try_alloc(
            Node::new(0, bounds, false, Box::new(behavior)),
            Self::grow_arena,
        )
    }

    /// Create a detached group, or return `None` if the arena cannot grow.
    pub fn try_create_group(&mut self, bounds: IntRect, behavior: impl View) -> Option<ViewId> {
        self.try_alloc(
            Node::new(0, bounds, true, Box::new(behavior)),
            Self::grow_arena,
        )
    }

    fn grow_arena(
        nodes: &mut Vec<Option<Node>>,
        generations: &mut Vec<u32>,
    ) -> Result<(), TryReserveError> {
        nodes.try_reserve(1)?;
        generations.try_reserve(1)
    }

    fn reserve_slot(
        &mut self,
        mut grow: impl FnMut(&mut Vec<Option<Node>>, &mut Vec<u32>) -> Result<(), TryReserveError>,
    ) -> bool {
        if !self.free_list.is_empty() {
            return true;
        }
        let nodes = &mut self.nodes;
        let generations = &mut self.generations;
        self.memory
            .attempt(|| grow(&mut *nodes, &mut *generations))
            .is_some()
    }

    fn alloc(&mut self, node: Node) -> ViewId {
        // On failure the push below aborts.
        let _ = self.reserve_slot(Self::grow_arena);
        self.place(node)
    }

    fn try_alloc(
        &mut self,
        node: Node,
        grow: impl FnMut(&mut Vec<Option<Node>>, &mut Vec<u32>) -> Result<(), TryReserveError>,
    ) -> Option<ViewId> {
        if !self.reserve_slot(grow) {
            tracing::warn!("view arena cannot grow");
            return None;
        }
        Some(self.place(node))
    }

    fn place(&mut self, mut node: Node) -> ViewId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            node.generation = generation;
            self.nodes[idx] = Some(node);
            (idx, generation)
        } else {
            node.generation = 1;
            self.nodes.push(Some(node));
            self.generations.push(1);
            (self.nodes.len() - 1, 1)
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ViewId uses 32-bit indices by design."
        )]
        let id = ViewId::new(idx as u32, generation);
        tracing::trace!(?id, "view created");
        id
    }

    /// Destroy a view and its whole subtree, detaching it from its owner first.
    ///
    /// Ids of destroyed views become stale. Destroying a stale id does nothing.
    #[track_caller]
    pub fn destroy(&mut self, id: ViewId) {
        if !self.is_alive(id) {
            return;
        }
        assert!(
            !self.modal.contains(&id),
            "destroy: view is executing modally"
        );
        if self.node(id).owner.is_some() {
            self.remove(id);
        }
        if self.root == Some(id) {
            self.invalidate(id);
            self.root = None;
        }
        self.free_subtree(id);
        self.memory.refill();
    }

    fn free_subtree(&mut self, id: ViewId) {
        for child in self.child_snapshot(id) {
            self.free_subtree(child);
        }
        if self.context.capture == Some(id) {
            self.context.capture = None;
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
        tracing::trace!(?id, "view destroyed");
    }

    /// Returns `true` if `id` refers to a live view.
    pub fn is_alive(&self, id: ViewId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    /// Access a node; panics if `id` is stale.
    #[track_caller]
    pub(crate) fn node(&self, id: ViewId) -> &Node {
        self.node_opt(id).expect("dangling ViewId")
    }

    /// Access a node mutably; panics if `id` is stale.
    #[track_caller]
    pub(crate) fn node_mut(&mut self, id: ViewId) -> &mut Node {
        self.node_opt_mut(id).expect("dangling ViewId")
    }

    pub(crate) fn node_opt(&self, id: ViewId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    pub(crate) fn node_opt_mut(&mut self, id: ViewId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    #[track_caller]
    pub(crate) fn group_data(&self, id: ViewId) -> &GroupData {
        self.node(id)
            .group
            .as_ref()
            .expect("view is not a group")
    }

    #[track_caller]
    pub(crate) fn group_data_mut(&mut self, id: ViewId) -> &mut GroupData {
        self.node_mut(id)
            .group
            .as_mut()
            .expect("view is not a group")
    }

    /// Children of `id` front-to-back, copied so the tree can change during a walk.
    pub(crate) fn child_snapshot(&self, id: ViewId) -> Vec<ViewId> {
        match self.node(id).group {
            Some(_) => self.children(id).collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn take_behavior(&mut self, id: ViewId) -> Option<Box<dyn View>> {
        self.node_opt_mut(id)?.behavior.take()
    }

    pub(crate) fn restore_behavior(&mut self, id: ViewId, behavior: Box<dyn View>) {
        // The view may have destroyed itself while its behavior was out.
        if let Some(n) = self.node_opt_mut(id) {
            n.behavior = Some(behavior);
        }
    }

    // --- queries ---

    /// The root view, if set.
    pub fn root(&self) -> Option<ViewId> {
        self.root
    }

    /// Make `id` the root: the topmost view, exposed whenever it is visible.
    #[track_caller]
    pub fn set_root(&mut self, id: ViewId) {
        assert!(
            self.node(id).owner.is_none(),
            "set_root: view has an owner"
        );
        self.root = Some(id);
        self.update_exposed(id);
        self.set_state(
            id,
            StateFlags::SELECTED | StateFlags::ACTIVE | StateFlags::FOCUSED,
            true,
        );
        self.invalidate(id);
    }

    /// Returns `true` if `id` is a group.
    pub fn is_group(&self, id: ViewId) -> bool {
        self.node_opt(id).is_some_and(|n| n.group.is_some())
    }

    /// Bounds in the owner's coordinates.
    pub fn bounds(&self, id: ViewId) -> IntRect {
        self.node(id).bounds
    }

    /// Visible region, in the owner's coordinates.
    ///
    /// Recomputed by every paint of the owner; always within [`ViewTree::bounds`].
    pub fn visible_region(&self, id: ViewId) -> &Region {
        &self.node(id).visible
    }

    /// Clip region from the last paint, in the owner's coordinates.
    ///
    /// Always within [`ViewTree::visible_region`].
    pub fn clip_region(&self, id: ViewId) -> &Region {
        &self.node(id).clip
    }

    /// State flags.
    pub fn state(&self, id: ViewId) -> StateFlags {
        self.node(id).state
    }

    /// Option flags.
    pub fn options(&self, id: ViewId) -> OptionFlags {
        self.node(id).options
    }

    /// Replace the option flags.
    pub fn set_options(&mut self, id: ViewId, options: OptionFlags) {
        let n = self.node_mut(id);
        let clip_changed = (n.options ^ options).contains(OptionFlags::CLIP_TO_OWNER);
        n.options = options;
        if clip_changed && let Some(owner) = n.owner {
            self.group_data_mut(owner).tiled = None;
        }
    }

    /// The owning group.
    pub fn owner(&self, id: ViewId) -> Option<ViewId> {
        self.node(id).owner
    }

    /// The selected child of a group.
    pub fn selected(&self, group: ViewId) -> Option<ViewId> {
        self.group_data(group).selected
    }

    /// Depth of modal nesting observed by a group.
    pub fn modal_state(&self, group: ViewId) -> u32 {
        self.group_data(group).modal_state
    }

    /// Area used to center children, in the group's local coordinates.
    pub fn client_rect(&self, group: ViewId) -> IntRect {
        let n = self.node(group);
        let data = n.group.as_ref().expect("view is not a group");
        data.client.unwrap_or(n.bounds.extent())
    }

    /// Set the area used to center and clip children; `None` follows the extent.
    pub fn set_client_rect(&mut self, group: ViewId, client: Option<IntRect>) {
        let data = self.group_data_mut(group);
        data.client = client;
        data.tiled = None;
    }

    /// Children front-to-back.
    pub fn children(&self, group: ViewId) -> Children<'_> {
        Children {
            tree: self,
            next: self.group_data(group).first,
        }
    }

    /// Number of children.
    pub fn child_count(&self, group: ViewId) -> usize {
        self.group_data(group).len
    }

    /// Frontmost child.
    pub fn first_child(&self, group: ViewId) -> Option<ViewId> {
        self.group_data(group).first
    }

    /// Backmost child.
    pub fn last_child(&self, group: ViewId) -> Option<ViewId> {
        self.group_data(group).last
    }

    /// The sibling directly behind `id`.
    pub fn next_sibling(&self, id: ViewId) -> Option<ViewId> {
        self.node(id).next
    }

    /// The sibling directly in front of `id`.
    pub fn prev_sibling(&self, id: ViewId) -> Option<ViewId> {
        self.node(id).prev
    }

    /// Downcast the behavior of `id`.
    ///
    /// Returns `None` while the behavior is running (for example from inside its own handler).
    pub fn behavior<T: View>(&self, id: ViewId) -> Option<&T> {
        let b: &dyn core::any::Any = self.node_opt(id)?.behavior.as_deref()?;
        b.downcast_ref()
    }

    /// Downcast the behavior of `id` mutably.
    pub fn behavior_mut<T: View>(&mut self, id: ViewId) -> Option<&mut T> {
        let b: &mut dyn core::any::Any = self.node_opt_mut(id)?.behavior.as_deref_mut()?;
        b.downcast_mut()
    }

    /// Root-space position of the local origin of `id`.
    pub fn global_origin(&self, id: ViewId) -> (i32, i32) {
        let (mut x, mut y) = (0, 0);
        let mut cur = Some(id);
        while let Some(c) = cur {
            let n = self.node(c);
            x += n.bounds.x0;
            y += n.bounds.y0;
            cur = n.owner;
        }
        (x, y)
    }

    /// Convert a root-space point to the local coordinates of `id`.
    pub fn to_local(&self, id: ViewId, point: Point) -> Point {
        let (x, y) = self.global_origin(id);
        Point::new(point.x - f64::from(x), point.y - f64::from(y))
    }

    /// Returns `true` if `ancestor` is `id` or one of its owners.
    pub fn is_ancestor_or_self(&self, ancestor: ViewId, id: ViewId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.node(c).owner;
        }
        false
    }

    // --- queue, context, memory ---

    /// Pending events and damage.
    pub fn queue(&self) -> &EventQueue<ViewId> {
        &self.queue
    }

    /// Pending events and damage, mutably.
    pub fn queue_mut(&mut self) -> &mut EventQueue<ViewId> {
        &mut self.queue
    }

    /// Post an event for later dispatch.
    pub fn post(&mut self, event: Event) {
        self.queue.post(event);
    }

    /// Capture, cursor, and alert state.
    pub fn context(&self) -> &DispatchContext {
        &self.context
    }

    /// Capture, cursor, and alert state, mutably.
    pub fn context_mut(&mut self) -> &mut DispatchContext {
        &mut self.context
    }

    /// The safety reserve.
    pub fn safety_pool(&mut self) -> &mut SafetyPool {
        &mut self.memory
    }

    /// Returns `true` once an allocation failure spent the safety reserve.
    pub fn low_memory(&self) -> bool {
        self.memory.low_memory()
    }

    /// Route every pointer event to `id` until [`ViewTree::release_mouse`].
    pub fn capture_mouse(&mut self, id: ViewId) {
        tracing::trace!(?id, "pointer captured");
        self.context.capture = Some(id);
    }

    /// End pointer capture.
    pub fn release_mouse(&mut self) {
        self.context.capture = None;
    }

    /// The innermost view executing modally.
    pub fn modal_view(&self) -> Option<ViewId> {
        self.modal.last().copied()
    }

    /// Ask the innermost modal session to end with `command`.
    ///
    /// The session ends once the executing view accepts `command` through
    /// [`View::valid`].
    pub fn end_modal(&mut self, command: Command) {
        tracing::debug!(?command, "end modal requested");
        self.end_state = Some(command);
    }

    /// Queue `view` for modal execution by the program once the current dispatch returns.
    ///
    /// The terminating command is delivered to `reply_to` as a command event whose
    /// sender is `view`.
    pub fn request_exec(&mut self, view: ViewId, reply_to: Option<ViewId>) {
        self.exec_requests.push_back(ExecRequest { view, reply_to });
    }

    // --- structure ---

    /// Insert `view` in front of every other child of `group`.
    #[track_caller]
    pub fn insert(&mut self, group: ViewId, view: ViewId) {
        let before = self.group_data(group).first;
        self.link(group, view, before);
    }

    /// Insert `view` behind every other child of `group`.
    #[track_caller]
    pub fn insert_back(&mut self, group: ViewId, view: ViewId) {
        self.link(group, view, None);
    }

    /// Insert `view` directly in front of `sibling`.
    #[track_caller]
    pub fn insert_before(&mut self, view: ViewId, sibling: ViewId) {
        let Some(group) = self.node(sibling).owner else {
            panic!("insert_before: sibling has no owner");
        };
        self.link(group, view, Some(sibling));
    }

    /// Insert `view` directly behind `sibling`.
    #[track_caller]
    pub fn insert_after(&mut self, view: ViewId, sibling: ViewId) {
        let n = self.node(sibling);
        let Some(group) = n.owner else {
            panic!("insert_after: sibling has no owner");
        };
        let before = n.next;
        self.link(group, view, before);
    }

    #[track_caller]
    fn link(&mut self, group: ViewId, view: ViewId, before: Option<ViewId>) {
        assert!(self.is_group(group), "insert: owner is not a group");
        assert!(
            self.node(view).owner.is_none() && self.root != Some(view),
            "insert: view is already inserted"
        );
        assert!(
            !self.is_ancestor_or_self(view, group),
            "insert: view would contain itself"
        );

        let options = self.node(view).options;
        if options.intersects(OptionFlags::CENTERED) {
            let client = self.client_rect(group);
            let b = self.node(view).bounds;
            let (mut x, mut y) = b.origin();
            if options.contains(OptionFlags::CENTER_X) {
                x = client.x0 + (client.width() - b.width()) / 2;
            }
            if options.contains(OptionFlags::CENTER_Y) {
                y = client.y0 + (client.height() - b.height()) / 2;
            }
            self.set_bounds(view, IntRect::from_origin_size(x, y, b.width(), b.height()));
        }

        self.splice(group, view, before);
        tracing::debug!(?group, ?view, "view inserted");

        self.update_exposed(view);
        self.invalidate(view);
    }

    fn splice(&mut self, group: ViewId, view: ViewId, before: Option<ViewId>) {
        let prev = match before {
            Some(b) => self.node(b).prev,
            None => self.group_data(group).last,
        };
        {
            let n = self.node_mut(view);
            n.owner = Some(group);
            n.prev = prev;
            n.next = before;
        }
        match prev {
            Some(p) => self.node_mut(p).next = Some(view),
            None => self.group_data_mut(group).first = Some(view),
        }
        match before {
            Some(b) => self.node_mut(b).prev = Some(view),
            None => self.group_data_mut(group).last = Some(view),
        }
        let data = self.group_data_mut(group);
        data.len += 1;
        data.tiled = None;
    }

    fn unlink(&mut self, view: ViewId) -> ViewId {
        let n = self.node_mut(view);
        let group = n.owner.take().expect("unlink: view has no owner");
        let (prev, next) = (n.prev.take(), n.next.take());
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.group_data_mut(group).first = next,
        }
        match next {
            Some(nx) => self.node_mut(nx).prev = prev,
            None => self.group_data_mut(group).last = prev,
        }
        let data = self.group_data_mut(group);
        data.len -= 1;
        data.tiled = None;
        group
    }

    /// Detach `view` from its owner.
    ///
    /// The area it covered is invalidated, the owner's selection is cleared if it
    /// pointed at `view`, and pointer capture inside the subtree is released.
    /// Panics if `view` has no owner.
    #[track_caller]
    pub fn remove(&mut self, view: ViewId) {
        let Some(group) = self.node(view).owner else {
            panic!("remove: view has no owner");
        };
        self.invalidate(view);
        if self.group_data(group).selected == Some(view) {
            self.select(group, None);
        }
        self.unlink(view);
        if let Some(c) = self.context.capture
            && self.is_ancestor_or_self(view, c)
        {
            self.context.capture = None;
        }
        self.node_mut(view).clip.clear();
        self.update_exposed(view);
        tracing::debug!(?group, ?view, "view removed");
    }

    /// Move `view` in front of its siblings.
    pub fn make_first(&mut self, view: ViewId) {
        let Some(group) = self.node(view).owner else {
            return;
        };
        let first = self.group_data(group).first;
        if first == Some(view) {
            return;
        }
        self.relink(view, first);
    }

    /// Move `view` directly behind `sibling`.
    ///
    /// Panics if the two are not children of the same group.
    #[track_caller]
    pub fn put_behind(&mut self, view: ViewId, sibling: ViewId) {
        let owner = self.node(view).owner;
        assert!(
            owner.is_some() && owner == self.node(sibling).owner,
            "put_behind: views are not siblings"
        );
        let before = self.node(sibling).next;
        if view == sibling || before == Some(view) {
            return;
        }
        self.relink(view, before);
    }

    /// Move `view` within its owner so it sits in front of `before` (at the back for `None`).
    fn relink(&mut self, view: ViewId, before: Option<ViewId>) {
        let group = self.unlink(view);
        self.splice(group, view, before);
        tracing::trace!(?group, ?view, "view reordered");
        self.invalidate(view);
    }

    // --- geometry ---

    /// Change the bounds of a view.
    ///
    /// Resets the visible region to the new bounds and clips the clip region to it.
    /// Does not request a repaint; see [`ViewTree::locate`].
    pub fn set_bounds(&mut self, id: ViewId, bounds: IntRect) {
        let n = self.node_mut(id);
        n.bounds = bounds;
        n.visible = Region::from_rect(bounds);
        n.clip.intersect_rect(bounds);
        if let Some(owner) = n.owner {
            self.group_data_mut(owner).tiled = None;
        }
    }

    /// Move or resize a view, repainting both the old and the new area.
    pub fn locate(&mut self, id: ViewId, bounds: IntRect) {
        let old = self.node(id).bounds;
        if old == bounds {
            return;
        }
        self.invalidate(id);
        self.set_bounds(id, bounds);
        self.invalidate(id);
        tracing::trace!(?id, ?old, ?bounds, "view located");
    }

    // --- state ---

    /// Set (`on`) or clear state `flags`, applying their side effects.
    ///
    /// - `ACTIVE` is never set on a disabled view.
    /// - A `FOCUSED` change broadcasts [`Command::RECEIVED_FOCUS`] or
    ///   [`Command::RELEASED_FOCUS`] to the owner and, for a group, follows into
    ///   its selected child.
    /// - A `VISIBLE` change updates `EXPOSED` over the subtree and repaints the area.
    /// - Changes to `ACTIVE`, `FOCUSED`, `DISABLED`, or `EXPOSED` repaint the view.
    ///
    /// `EXPOSED` itself is maintained by the tree and ignored here.
    pub fn set_state(&mut self, id: ViewId, flags: StateFlags, on: bool) {
        let mut flags = flags - StateFlags::EXPOSED;
        let old = self.node(id).state;
        if on && (old | flags).contains(StateFlags::DISABLED) {
            flags.remove(StateFlags::ACTIVE);
        }
        let mut new = old;
        new.set(flags, on);
        if new == old {
            return;
        }
        self.node_mut(id).state = new;
        let changed = old ^ new;

        if changed.contains(StateFlags::VISIBLE) {
            if !on {
                // Hidden views do not reach the screen; damage the area they covered.
                self.invalidate_in_owner(id);
            }
            self.update_exposed(id);
            if !on
                && let Some(owner) = self.node(id).owner
                && self.group_data(owner).selected == Some(id)
            {
                self.select_next(owner);
            }
        }

        if changed.contains(StateFlags::FOCUSED) {
            if let Some(sel) = self.node_opt(id).and_then(|n| n.group.as_ref()?.selected) {
                self.set_state(sel, StateFlags::FOCUSED, on);
            }
            if let Some(owner) = self.node_opt(id).and_then(|n| n.owner) {
                let command = if on {
                    Command::RECEIVED_FOCUS
                } else {
                    Command::RELEASED_FOCUS
                };
                let mut event = Event::broadcast(command, Some(id));
                self.handle_event(owner, &mut event, Phase::Focused);
            }
        }

        if changed.intersects(
            StateFlags::ACTIVE | StateFlags::FOCUSED | StateFlags::DISABLED | StateFlags::VISIBLE,
        ) && self.is_alive(id)
        {
            self.invalidate(id);
        }
    }

    /// Show a view.
    pub fn show(&mut self, id: ViewId) {
        self.set_state(id, StateFlags::VISIBLE, true);
    }

    /// Hide a view.
    pub fn hide(&mut self, id: ViewId) {
        self.set_state(id, StateFlags::VISIBLE, false);
    }

    fn update_exposed(&mut self, id: ViewId) {
        let n = self.node(id);
        let owner_exposed = match n.owner {
            Some(o) => self.node(o).state.contains(StateFlags::EXPOSED),
            None => self.root == Some(id),
        };
        let exposed = owner_exposed && n.state.contains(StateFlags::VISIBLE);
        if n.state.contains(StateFlags::EXPOSED) == exposed {
            return;
        }
        let n = self.node_mut(id);
        n.state.set(StateFlags::EXPOSED, exposed);
        if !exposed {
            n.clip.clear();
        }
        for child in self.child_snapshot(id) {
            self.update_exposed(child);
        }
    }

    // --- damage ---

    /// Request a repaint of the whole view.
    pub fn invalidate(&mut self, id: ViewId) {
        let extent = self.node(id).bounds.extent();
        self.invalid_rect(id, extent);
    }

    /// Request a repaint of `rect`, in the local coordinates of `id`.
    ///
    /// The rectangle is clipped to each ancestor on the way up. Views that are not
    /// exposed produce no damage. A repaint-locked view holds the damage back
    /// until [`ViewTree::unlock_repaint`].
    pub fn invalid_rect(&mut self, id: ViewId, rect: IntRect) {
        let mut cur = id;
        let mut rect = rect;
        loop {
            let Some(n) = self.node_opt_mut(cur) else {
                return;
            };
            if !n.state.contains(StateFlags::EXPOSED) {
                return;
            }
            rect = rect.intersect(n.bounds.extent());
            if rect.is_empty() {
                return;
            }
            if n.state.contains(StateFlags::REPAINT_LOCKED) {
                n.pending.union_rect(rect);
                return;
            }
            let (x, y) = n.bounds.origin();
            rect = rect.translate(x, y);
            let owner = n.owner;
            match owner {
                Some(owner) => cur = owner,
                None => {
                    self.post_damage(rect);
                    return;
                }
            }
        }
    }

    /// Withdraw damage for `rect`, in the local coordinates of `id`.
    ///
    /// Call after drawing an area outside of a repaint.
    pub fn valid_rect(&mut self, id: ViewId, rect: IntRect) {
        let mut cur = id;
        let mut rect = rect;
        loop {
            let Some(n) = self.node_opt_mut(cur) else {
                return;
            };
            rect = rect.intersect(n.bounds.extent());
            if rect.is_empty() {
                return;
            }
            if n.state.contains(StateFlags::REPAINT_LOCKED) {
                n.pending.subtract_rect(rect);
            }
            let (x, y) = n.bounds.origin();
            rect = rect.translate(x, y);
            let owner = n.owner;
            match owner {
                Some(owner) => cur = owner,
                None => {
                    self.queue.validate(rect);
                    return;
                }
            }
        }
    }

    fn invalidate_in_owner(&mut self, id: ViewId) {
        let n = self.node(id);
        let bounds = n.bounds;
        match n.owner {
            Some(owner) => self.invalid_rect(owner, bounds),
            None if self.root == Some(id) => self.post_damage(bounds),
            None => {}
        }
    }

    fn post_damage(&mut self, rect: IntRect) {
        let queue = &mut self.queue;
        if self
            .memory
            .attempt(|| queue.try_post_damage(rect))
            .is_none()
        {
            self.queue.post_damage(rect);
        }
    }

    /// Hold back damage for `id` and its subtree.
    pub fn lock_repaint(&mut self, id: ViewId) {
        self.node_mut(id).state.insert(StateFlags::REPAINT_LOCKED);
    }

    /// Release a repaint lock, posting the damage collected while it was held.
    pub fn unlock_repaint(&mut self, id: ViewId) {
        let n = self.node_mut(id);
        if !n.state.contains(StateFlags::REPAINT_LOCKED) {
            return;
        }
        n.state.remove(StateFlags::REPAINT_LOCKED);
        let mut pending = core::mem::take(&mut n.pending);
        for rect in pending.rects() {
            self.invalid_rect(id, rect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Probe, new_log};
    use understory_event::EventMask;

    fn tree_with_root() -> (ViewTree, ViewId) {
        let mut tree = ViewTree::new();
        let root = tree.create_group(IntRect::new(0, 0, 100, 100), ());
        tree.set_root(root);
        let _ = tree.queue_mut().take_damage();
        let _ = tree.queue_mut().get_next(EventMask::all());
        (tree, root)
    }

    fn order(tree: &ViewTree, group: ViewId) -> Vec<ViewId> {
        tree.children(group).collect()
    }

    #[test]
    fn insert_orders_front_to_back() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        let b = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        let c = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        let d = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        tree.insert(root, a);
        tree.insert(root, b);
        tree.insert_back(root, c);
        tree.insert_after(d, b);
        assert_eq!(order(&tree, root), [b, d, a, c]);
        assert_eq!(tree.child_count(root), 4);
        assert_eq!(tree.first_child(root), Some(b));
        assert_eq!(tree.last_child(root), Some(c));
        assert_eq!(tree.prev_sibling(a), Some(d));

        tree.make_first(c);
        assert_eq!(order(&tree, root), [c, b, d, a]);
        tree.remove(d);
        assert_eq!(order(&tree, root), [c, b, a]);
        assert_eq!(tree.owner(d), None);
        tree.insert_before(d, c);
        assert_eq!(order(&tree, root), [d, c, b, a]);

        tree.put_behind(d, b);
        assert_eq!(order(&tree, root), [c, b, d, a]);
        tree.put_behind(c, a);
        assert_eq!(order(&tree, root), [b, d, a, c]);
        assert_eq!(tree.last_child(root), Some(c));
        assert_eq!(tree.child_count(root), 4);
    }

    #[test]
    #[should_panic(expected = "insert: view is already inserted")]
    fn double_insertion_panics() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        tree.insert(root, a);
        tree.insert(root, a);
    }

    #[test]
    #[should_panic(expected = "remove: view has no owner")]
    fn removing_unowned_view_panics() {
        let mut tree = ViewTree::new();
        let a = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        tree.remove(a);
    }

    #[test]
    #[should_panic(expected = "insert: view would contain itself")]
    fn inserting_into_own_subtree_panics() {
        let (mut tree, root) = tree_with_root();
        let g = tree.create_group(IntRect::new(0, 0, 50, 50), ());
        let inner = tree.create_group(IntRect::new(0, 0, 10, 10), ());
        tree.insert(root, g);
        tree.insert(g, inner);
        tree.remove(g);
        tree.insert(inner, g);
    }

    #[test]
    fn destroy_frees_subtree_and_stales_ids() {
        let (mut tree, root) = tree_with_root();
        let g = tree.create_group(IntRect::new(0, 0, 50, 50), ());
        let leaf = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        tree.insert(root, g);
        tree.insert(g, leaf);
        tree.destroy(g);
        assert!(!tree.is_alive(g));
        assert!(!tree.is_alive(leaf));
        assert_eq!(tree.child_count(root), 0);

        let reused = tree.create_view(IntRect::new(0, 0, 1, 1), ());
        assert_ne!(reused, g);
        assert_ne!(reused, leaf);
        assert!(!tree.is_alive(leaf));
        // Destroying a stale id is a no-op.
        tree.destroy(leaf);
        assert!(tree.is_alive(reused));
    }

    #[test]
    fn failed_arena_growth_returns_none_and_leaves_tree_unchanged() {
        let (mut tree, root) = tree_with_root();
        let slots = tree.nodes.len();
        let mut calls = 0;
        let id = tree.try_alloc(
            Node::new(0, IntRect::new(0, 0, 5, 5), false, Box::new(())),
            |_, _| {
                calls += 1;
                Err(Vec::<u8>::new()
                    .try_reserve(usize::MAX)
                    .expect_err("usize::MAX bytes cannot be reserved"))
            },
        );
        assert_eq!(id, None);
        // Tried once, then again after spending the reserve.
        assert_eq!(calls, 2);
        assert!(tree.low_memory());
        assert_eq!(tree.nodes.len(), slots);
        assert_eq!(tree.generations.len(), slots);
        assert!(tree.is_alive(root));
    }

    #[test]
    fn try_create_reuses_free_slots_without_growing() {
        let (mut tree, root) = tree_with_root();
        let first = tree.try_create_view(IntRect::new(0, 0, 5, 5), ()).expect("arena can grow");
        let group = tree.try_create_group(IntRect::new(0, 0, 9, 9), ()).expect("arena can grow");
        tree.insert(root, group);
        assert!(tree.is_group(group));
        tree.destroy(first);

        let slots = tree.nodes.len();
        let reused = tree.try_alloc(
            Node::new(0, IntRect::new(0, 0, 5, 5), false, Box::new(())),
            |_, _| panic!("a free slot needs no growth"),
        );
        let reused = reused.expect("free slot is available");
        assert_ne!(reused, first);
        assert!(tree.is_alive(reused));
        assert_eq!(tree.nodes.len(), slots);
        assert!(!tree.low_memory());
    }

    #[test]
    fn insertion_damages_the_inserted_area() {
        let (mut tree, root) = tree_with_root();
        let g = tree.create_group(IntRect::new(10, 10, 60, 60), ());
        tree.insert(root, g);
        let leaf = tree.create_view(IntRect::new(5, 5, 15, 15), ());
        let _ = tree.queue_mut().take_damage();
        tree.insert(g, leaf);
        assert!(tree.queue().repaint_pending());
        assert_eq!(
            *tree.queue().damage(),
            Region::from_rect(IntRect::new(15, 15, 25, 25))
        );
    }

    #[test]
    fn damage_is_clipped_by_ancestors() {
        let (mut tree, root) = tree_with_root();
        let g = tree.create_group(IntRect::new(90, 90, 120, 120), ());
        tree.insert(root, g);
        let _ = tree.queue_mut().take_damage();
        tree.invalid_rect(g, IntRect::new(0, 0, 30, 30));
        assert_eq!(
            *tree.queue().damage(),
            Region::from_rect(IntRect::new(90, 90, 100, 100))
        );
    }

    #[test]
    fn hidden_views_produce_no_damage_but_hiding_damages_owner() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        tree.insert(root, a);
        tree.hide(a);
        assert!(!tree.state(a).contains(StateFlags::EXPOSED));
        assert_eq!(tree.queue_mut().take_damage().area(), 100);
        tree.invalidate(a);
        assert!(tree.queue().damage().is_empty());
        tree.show(a);
        assert!(tree.state(a).contains(StateFlags::EXPOSED));
        assert_eq!(tree.queue().damage().area(), 100);
    }

    #[test]
    fn exposed_follows_ancestors() {
        let (mut tree, root) = tree_with_root();
        let g = tree.create_group(IntRect::new(0, 0, 50, 50), ());
        let leaf = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        tree.insert(g, leaf);
        assert!(!tree.state(leaf).contains(StateFlags::EXPOSED));
        tree.insert(root, g);
        assert!(tree.state(leaf).contains(StateFlags::EXPOSED));
        tree.hide(g);
        assert!(!tree.state(leaf).contains(StateFlags::EXPOSED));
        assert!(tree.state(leaf).contains(StateFlags::VISIBLE));
    }

    #[test]
    fn disabled_view_cannot_become_active() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        tree.insert(root, a);
        tree.set_state(a, StateFlags::DISABLED, true);
        tree.set_state(a, StateFlags::ACTIVE, true);
        assert!(!tree.state(a).contains(StateFlags::ACTIVE));
    }

    #[test]
    fn state_changes_repaint_the_view() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_view(IntRect::new(20, 20, 30, 30), ());
        tree.insert(root, a);
        let _ = tree.queue_mut().take_damage();
        tree.set_state(a, StateFlags::DISABLED, true);
        assert_eq!(
            *tree.queue().damage(),
            Region::from_rect(IntRect::new(20, 20, 30, 30))
        );
        let _ = tree.queue_mut().take_damage();
        // MODAL is not a repainting flag.
        tree.set_state(a, StateFlags::MODAL, true);
        assert!(tree.queue().damage().is_empty());
    }

    #[test]
    fn focus_change_notifies_owner() {
        let (mut tree, root) = tree_with_root();
        let log = new_log();
        let g = tree.create_group(IntRect::new(0, 0, 50, 50), Probe::new("g", &log));
        tree.insert(root, g);
        let a = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        tree.insert(g, a);
        log.borrow_mut().clear();

        tree.set_state(a, StateFlags::FOCUSED, true);
        assert!(
            log.borrow()
                .iter()
                .any(|e| e.is_broadcast("g", Command::RECEIVED_FOCUS, a))
        );
        tree.set_state(a, StateFlags::FOCUSED, false);
        assert!(
            log.borrow()
                .iter()
                .any(|e| e.is_broadcast("g", Command::RELEASED_FOCUS, a))
        );
    }

    #[test]
    fn set_bounds_keeps_clip_inside_visible_inside_bounds() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_view(IntRect::new(0, 0, 40, 40), ());
        tree.insert(root, a);
        tree.node_mut(a).clip = Region::from_rect(IntRect::new(0, 0, 40, 40));
        tree.set_bounds(a, IntRect::new(20, 20, 60, 60));
        let bounds = Region::from_rect(tree.bounds(a));
        assert!(bounds.contains_region(tree.visible_region(a)));
        assert!(tree.visible_region(a).contains_region(tree.clip_region(a)));
        assert_eq!(tree.clip_region(a).area(), 400);
    }

    #[test]
    fn centering_uses_client_rect() {
        let (mut tree, root) = tree_with_root();
        tree.set_client_rect(root, Some(IntRect::new(0, 10, 100, 90)));
        let a = tree.create_view(IntRect::new(0, 0, 20, 10), ());
        tree.set_options(a, OptionFlags::CENTERED);
        tree.insert(root, a);
        assert_eq!(tree.bounds(a), IntRect::new(40, 45, 60, 55));

        let b = tree.create_view(IntRect::new(3, 7, 23, 17), ());
        tree.set_options(b, OptionFlags::CENTER_X);
        tree.insert(root, b);
        assert_eq!(tree.bounds(b), IntRect::new(40, 7, 60, 17));
    }

    #[test]
    fn repaint_lock_defers_damage() {
        let (mut tree, root) = tree_with_root();
        let g = tree.create_group(IntRect::new(10, 10, 50, 50), ());
        tree.insert(root, g);
        let a = tree.create_view(IntRect::new(0, 0, 10, 10), ());
        tree.insert(g, a);
        let _ = tree.queue_mut().take_damage();

        tree.lock_repaint(g);
        tree.invalidate(a);
        tree.invalid_rect(g, IntRect::new(20, 20, 30, 30));
        assert!(tree.queue().damage().is_empty());
        tree.unlock_repaint(g);
        assert_eq!(tree.queue().damage().area(), 200);
        assert!(tree.queue().damage().contains_rect(IntRect::new(10, 10, 20, 20)));
        assert!(tree.queue().damage().contains_rect(IntRect::new(30, 30, 40, 40)));
    }

    #[test]
    fn valid_rect_withdraws_damage() {
        let (mut tree, root) = tree_with_root();
        let a = tree.create_view(IntRect::new(10, 10, 20, 20), ());
        tree.insert(root, a);
        assert!(tree.queue().repaint_pending());
        tree.valid_rect(a, IntRect::new(0, 0, 10, 10));
        assert!(tree.queue().damage().is_empty());
        assert!(!tree.queue().repaint_pending());
    }

    #[test]
    fn behavior_downcasts() {
        let mut tree = ViewTree::new();
        let bg = tree.create_view(
            IntRect::new(0, 0, 1, 1),
            crate::Background(crate::Color::WHITE),
        );
        assert_eq!(
            tree.behavior::<crate::Background>(bg),
            Some(&crate::Background(crate::Color::WHITE))
        );
        assert!(tree.behavior::<()>(bg).is_none());
        if let Some(b) = tree.behavior_mut::<crate::Background>(bg) {
            b.0 = crate::Color::BLACK;
        }
        assert_eq!(
            tree.behavior::<crate::Background>(bg).map(|b| b.0),
            Some(crate::Color::BLACK)
        );
    }

    #[test]
    fn global_origin_accumulates() {
        let (mut tree, root) = tree_with_root();
        let g = tree.create_group(IntRect::new(10, 20, 60, 70), ());
        let a = tree.create_view(IntRect::new(5, 5, 15, 15), ());
        tree.insert(root, g);
        tree.insert(g, a);
        assert_eq!(tree.global_origin(a), (15, 25));
        assert_eq!(
            tree.to_local(a, Point::new(16.0, 27.0)),
            Point::new(1.0, 2.0)
        );
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion-aware painting.
//!
//! ## Algorithm
//!
//! A group receives an incoming clip from its owner and:
//!
//! 1. Sets each child's visible region: its bounds, cut to the client rect when
//!    the child has [`OptionFlags::CLIP_TO_OWNER`].
//! 2. Walks the children front to back. A child's clip is its visible region,
//!    intersected with the incoming clip, minus everything in front of it. Hidden
//!    children get an empty clip and hide nothing.
//! 3. Draws its own background on the part of the incoming clip no child covers,
//!    unless it has [`OptionFlags::NO_BACKGROUND`].
//! 4. Walks the children back to front and paints those with a non-empty clip.
//!
//! Leaves draw each rectangle of their clip separately, with the surface clip set
//! to that rectangle, so every pixel is drawn by exactly one view.
//!
//! ## Quick path
//!
//! When the incoming clip covers the whole group and its children are pairwise
//! disjoint and inside its extent, nothing can occlude anything and every child's
//! clip is its visible region. Both conditions are checked on every paint; the
//! second is cached until the children, their bounds, or the client rect change.
//!
//! ## Low memory
//!
//! Region growth goes through the [`SafetyPool`](crate::SafetyPool). When it
//! still fails, painting degrades toward overdraw (a child painted under a sibling
//! that paints later), never toward drawing over something that will not be
//! repainted.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;

use understory_region::{IntRect, Region};

use crate::surface::Surface;
use crate::tree::ViewTree;
use crate::types::{OptionFlags, StateFlags, ViewId};
use crate::view::DrawCx;

impl ViewTree {
    /// Repaint the parts of the tree covered by `damage`, in root coordinates.
    pub fn paint(&mut self, surface: &mut dyn Surface, damage: &Region) {
        let Some(root) = self.root() else {
            return;
        };
        let n = self.node(root);
        if !n.state.contains(StateFlags::EXPOSED) {
            return;
        }
        let bounds = n.bounds;
        let mut clip = Region::from_rect(bounds);
        if !self.guarded(|| clip.try_intersect(damage)) {
            clip = Region::from_rect(bounds.intersect(damage.bounds()));
        }
        tracing::trace!(area = clip.area(), "paint");
        let n = self.node_mut(root);
        n.visible = Region::from_rect(bounds);
        n.clip = clip;
        self.paint_view(root, surface, (0, 0));
    }

    fn guarded(&mut self, op: impl FnMut() -> Result<(), TryReserveError>) -> bool {
        self.memory.attempt(op).is_some()
    }

    fn paint_view(&mut self, id: ViewId, surface: &mut dyn Surface, owner_origin: (i32, i32)) {
        let n = self.node(id);
        if n.clip.is_empty() || !n.state.contains(StateFlags::EXPOSED) {
            return;
        }
        let (bx, by) = n.bounds.origin();
        let origin = (owner_origin.0 + bx, owner_origin.1 + by);
        let clip = n.clip.translated(-bx, -by);
        if n.group.is_some() {
            self.paint_group(id, surface, origin, &clip);
        } else {
            self.draw_view(id, surface, origin, clip);
        }
    }

    fn paint_group(
        &mut self,
        id: ViewId,
        surface: &mut dyn Surface,
        origin: (i32, i32),
        incoming: &Region,
    ) {
        let n = self.node(id);
        let extent = n.bounds.extent();
        let background = !n.options.contains(OptionFlags::NO_BACKGROUND);
        let children = self.child_snapshot(id);

        for &child in &children {
            let visible = Region::from_rect(self.visible_rect(id, child));
            self.node_mut(child).visible = visible;
        }

        let quick = incoming.contains_rect(extent) && self.children_tiled(id, &children);
        let mut occluding = Region::new();
        for &child in &children {
            let n = self.node(child);
            if !n.state.contains(StateFlags::EXPOSED) {
                self.node_mut(child).clip.clear();
                continue;
            }
            let visible = n.visible.clone();
            let mut clip = visible.clone();
            if !quick {
                if !self.guarded(|| clip.try_intersect(incoming)) {
                    tracing::warn!(?child, "clip computation failed; child skipped");
                    clip.clear();
                }
                let _ = self.guarded(|| clip.try_subtract(&occluding));
            }
            self.node_mut(child).clip = clip;
            let _ = self.guarded(|| occluding.try_union_with(&visible));
        }

        if background {
            let mut rest = incoming.clone();
            let _ = self.guarded(|| rest.try_subtract(&occluding));
            if !rest.is_empty() {
                self.draw_view(id, surface, origin, rest);
            }
        }

        for &child in children.iter().rev() {
            if self.node_opt(child).is_some_and(|n| !n.clip.is_empty()) {
                self.paint_view(child, surface, origin);
            }
        }
    }

    /// Children's visible rects are pairwise disjoint and inside the group's extent.
    fn children_tiled(&mut self, group: ViewId, children: &[ViewId]) -> bool {
        if let Some(tiled) = self.group_data(group).tiled {
            return tiled;
        }
        let extent = self.node(group).bounds.extent();
        let rects: Vec<IntRect> = children
            .iter()
            .map(|&c| self.visible_rect(group, c))
            .collect();
        let tiled = rects.iter().all(|r| extent.contains_rect(*r))
            && rects
                .iter()
                .enumerate()
                .all(|(i, a)| rects[i + 1..].iter().all(|b| !a.overlaps(*b)));
        self.group_data_mut(group).tiled = Some(tiled);
        tiled
    }

    /// Draw `region` (local coordinates) of one view, a rectangle at a time.
    fn draw_view(
        &mut self,
        id: ViewId,
        surface: &mut dyn Surface,
        origin: (i32, i32),
        mut region: Region,
    ) {
        let Some(mut behavior) = self.take_behavior(id) else {
            return;
        };
        let n = self.node(id);
        let mut cx = DrawCx {
            surface,
            id,
            origin,
            extent: n.bounds.extent(),
            state: n.state,
        };
        tracing::trace!(?id, rects = region.len(), "draw");
        for rect in region.rects() {
            cx.install_clip(rect);
            behavior.draw(&mut cx, rect);
        }
        self.restore_behavior(id, behavior);
    }
}

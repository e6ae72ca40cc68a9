// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle sets.
//!
//! ## Representation
//!
//! A [`Region`] stores a list of pairwise non-overlapping, non-empty [`IntRect`]s.
//! Every operator re-establishes the non-overlap invariant immediately; only the
//! canonical form (merged neighbours, sorted top-to-bottom then left-to-right) is
//! deferred until [`Region::optimize`] runs. Occlusion passes perform many mutations
//! in a row and normalize once before traversal.
//!
//! ## Allocation
//!
//! Each operator has a `try_` form that reports allocation failure as a
//! [`TryReserveError`] and leaves the region unchanged in that case.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::convert::Infallible;
use core::iter::FusedIterator;

use kurbo::Point;

use crate::rect::IntRect;

/// Growth strategy for the rectangle buffers.
trait Grow {
    type Error;
    fn grow(v: &mut Vec<IntRect>, additional: usize) -> Result<(), Self::Error>;
}

/// Aborts on allocation failure, like `Vec::reserve`.
struct Abort;

impl Grow for Abort {
    type Error = Infallible;
    fn grow(v: &mut Vec<IntRect>, additional: usize) -> Result<(), Infallible> {
        v.reserve(additional);
        Ok(())
    }
}

/// Reports allocation failure to the caller.
struct Fallible;

impl Grow for Fallible {
    type Error = TryReserveError;
    fn grow(v: &mut Vec<IntRect>, additional: usize) -> Result<(), TryReserveError> {
        v.try_reserve(additional)
    }
}

fn push<G: Grow>(out: &mut Vec<IntRect>, r: IntRect) -> Result<(), G::Error> {
    if out.len() == out.capacity() {
        G::grow(out, out.len().max(4))?;
    }
    out.push(r);
    Ok(())
}

fn copy_of<G: Grow>(rects: &[IntRect]) -> Result<Vec<IntRect>, G::Error> {
    let mut out = Vec::new();
    G::grow(&mut out, rects.len())?;
    out.extend_from_slice(rects);
    Ok(out)
}

/// Remove `cut` from every rectangle in `rects`.
fn cut_rects<G: Grow>(rects: Vec<IntRect>, cut: IntRect) -> Result<Vec<IntRect>, G::Error> {
    if cut.is_empty() || !rects.iter().any(|r| r.overlaps(cut)) {
        return Ok(rects);
    }
    let mut out = Vec::new();
    G::grow(&mut out, rects.len() + 3)?;
    for r in rects {
        if r.overlaps(cut) {
            for piece in r.subtract(cut) {
                push::<G>(&mut out, piece)?;
            }
        } else {
            push::<G>(&mut out, r)?;
        }
    }
    Ok(out)
}

/// A finite set of pixels, stored as non-overlapping integer rectangles.
///
/// All binary operators accept empty operands. Equality compares the covered pixel
/// sets, not the stored rectangles.
#[derive(Clone, Debug)]
pub struct Region {
    rects: Vec<IntRect>,
    normalized: bool,
}

impl Default for Region {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.contains_region(other) && other.contains_region(self)
    }
}

impl Eq for Region {}

impl From<IntRect> for Region {
    fn from(rect: IntRect) -> Self {
        Self::from_rect(rect)
    }
}

impl Region {
    /// The empty region.
    pub const fn new() -> Self {
        Self {
            rects: Vec::new(),
            normalized: true,
        }
    }

    /// A region covering a single rectangle (or nothing, if `rect` is empty).
    pub fn from_rect(rect: IntRect) -> Self {
        let mut rects = Vec::new();
        if !rect.is_empty() {
            rects.push(rect);
        }
        Self {
            rects,
            normalized: true,
        }
    }

    /// The union of arbitrary (possibly overlapping) rectangles.
    pub fn from_rects(rects: impl IntoIterator<Item = IntRect>) -> Self {
        let mut out = Self::new();
        for r in rects {
            out.union_rect(r);
        }
        out
    }

    /// Returns true if the region covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of stored rectangles.
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Remove every rectangle.
    pub fn clear(&mut self) {
        self.rects.clear();
        self.normalized = true;
    }

    /// Returns true if the region is in canonical form (see [`Region::optimize`]).
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Bounding box of the region; [`IntRect::ZERO`] when empty.
    pub fn bounds(&self) -> IntRect {
        self.rects
            .iter()
            .fold(IntRect::ZERO, |acc, r| acc.union(*r))
    }

    /// Number of covered pixels.
    pub fn area(&self) -> u64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// Returns true if the pixel `(x, y)` is covered.
    pub fn includes(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains(x, y))
    }

    /// Returns true if a fractional point falls inside a covered pixel.
    pub fn includes_point(&self, pt: Point) -> bool {
        self.rects.iter().any(|r| r.contains_point(pt))
    }

    /// Returns true if every pixel of `rect` is covered.
    pub fn contains_rect(&self, rect: IntRect) -> bool {
        let mut rest = Self::from_rect(rect);
        rest.subtract(self);
        rest.is_empty()
    }

    /// Returns true if every pixel of `other` is covered.
    pub fn contains_region(&self, other: &Self) -> bool {
        let mut rest = other.clone();
        rest.subtract(self);
        rest.is_empty()
    }

    /// Offset every rectangle by `(dx, dy)`.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        for r in &mut self.rects {
            *r = r.translate(dx, dy);
        }
    }

    /// A copy offset by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        let mut out = self.clone();
        out.translate(dx, dy);
        out
    }

    /// Add every pixel of `other`.
    pub fn union_with(&mut self, other: &Self) {
        let Ok(()) = self.union_impl::<Abort>(&other.rects);
    }

    /// Add every pixel of `rect`.
    pub fn union_rect(&mut self, rect: IntRect) {
        if !rect.is_empty() {
            let Ok(()) = self.union_impl::<Abort>(&[rect]);
        }
    }

    /// Remove every pixel of `other`.
    pub fn subtract(&mut self, other: &Self) {
        let Ok(()) = self.subtract_impl::<Abort>(&other.rects);
    }

    /// Remove every pixel of `rect`.
    pub fn subtract_rect(&mut self, rect: IntRect) {
        let Ok(()) = self.subtract_impl::<Abort>(&[rect]);
    }

    /// Keep only the pixels also covered by `other`.
    pub fn intersect(&mut self, other: &Self) {
        let Ok(()) = self.intersect_impl::<Abort>(&other.rects);
    }

    /// Keep only the pixels inside `rect`.
    pub fn intersect_rect(&mut self, rect: IntRect) {
        let Ok(()) = self.intersect_impl::<Abort>(&[rect]);
    }

    /// Fallible [`Region::union_with`]; the region is unchanged on error.
    pub fn try_union_with(&mut self, other: &Self) -> Result<(), TryReserveError> {
        self.union_impl::<Fallible>(&other.rects)
    }

    /// Fallible [`Region::union_rect`]; the region is unchanged on error.
    pub fn try_union_rect(&mut self, rect: IntRect) -> Result<(), TryReserveError> {
        if rect.is_empty() {
            return Ok(());
        }
        self.union_impl::<Fallible>(&[rect])
    }

    /// Fallible [`Region::subtract`]; the region is unchanged on error.
    pub fn try_subtract(&mut self, other: &Self) -> Result<(), TryReserveError> {
        self.subtract_impl::<Fallible>(&other.rects)
    }

    /// Fallible [`Region::subtract_rect`]; the region is unchanged on error.
    pub fn try_subtract_rect(&mut self, rect: IntRect) -> Result<(), TryReserveError> {
        self.subtract_impl::<Fallible>(&[rect])
    }

    /// Fallible [`Region::intersect`]; the region is unchanged on error.
    pub fn try_intersect(&mut self, other: &Self) -> Result<(), TryReserveError> {
        self.intersect_impl::<Fallible>(&other.rects)
    }

    /// Fallible [`Region::intersect_rect`]; the region is unchanged on error.
    pub fn try_intersect_rect(&mut self, rect: IntRect) -> Result<(), TryReserveError> {
        self.intersect_impl::<Fallible>(&[rect])
    }

    /// Bring the region into canonical form.
    ///
    /// Drops empty rectangles, merges horizontally then vertically adjacent rectangles
    /// until nothing more merges, and sorts the result top-to-bottom, then
    /// left-to-right. Idempotent. Never allocates.
    pub fn optimize(&mut self) {
        if self.normalized {
            return;
        }
        self.rects.retain(|r| !r.is_empty());
        loop {
            // Sorted by (y0, x0), two rects sharing a band and an edge are adjacent in
            // the list: anything between them would overlap one of them.
            self.rects.sort_unstable_by_key(|r| (r.y0, r.x0));
            let merged_h = merge_runs(&mut self.rects, |a, b| {
                a.y0 == b.y0 && a.y1 == b.y1 && a.x1 == b.x0
            });
            self.rects.sort_unstable_by_key(|r| (r.x0, r.y0));
            let merged_v = merge_runs(&mut self.rects, |a, b| {
                a.x0 == b.x0 && a.x1 == b.x1 && a.y1 == b.y0
            });
            if !merged_h && !merged_v {
                break;
            }
        }
        self.rects.sort_unstable_by_key(|r| (r.y0, r.x0));
        self.normalized = true;
    }

    /// Iterate the stored rectangles.
    ///
    /// The rectangles never overlap. The order is top-to-bottom, then left-to-right
    /// only when the region [is normalized](Region::is_normalized); use
    /// [`Region::rects`] to normalize first.
    pub fn iter(&self) -> Rects<'_> {
        Rects {
            inner: self.rects.iter(),
        }
    }

    /// Normalize, then iterate the rectangles top-to-bottom, then left-to-right.
    ///
    /// The borrow keeps the region from being mutated (and re-normalized) while the
    /// traversal is in progress.
    pub fn rects(&mut self) -> Rects<'_> {
        self.optimize();
        self.iter()
    }

    fn union_impl<G: Grow>(&mut self, other: &[IntRect]) -> Result<(), G::Error> {
        if other.is_empty() {
            return Ok(());
        }
        if self.rects.is_empty() {
            self.rects = copy_of::<G>(other)?;
            self.normalized = other.len() <= 1;
            return Ok(());
        }
        // `other` is itself non-overlapping, so carving it out of `self` and
        // appending it keeps the whole set disjoint.
        let mut cur = copy_of::<G>(&self.rects)?;
        for cut in other {
            cur = cut_rects::<G>(cur, *cut)?;
        }
        G::grow(&mut cur, other.len())?;
        cur.extend_from_slice(other);
        self.rects = cur;
        self.normalized = false;
        Ok(())
    }

    fn subtract_impl<G: Grow>(&mut self, other: &[IntRect]) -> Result<(), G::Error> {
        let bounds = self.bounds();
        if self.rects.is_empty() || !other.iter().any(|c| c.overlaps(bounds)) {
            return Ok(());
        }
        let mut cur = copy_of::<G>(&self.rects)?;
        for cut in other {
            cur = cut_rects::<G>(cur, *cut)?;
        }
        self.rects = cur;
        self.normalized = false;
        Ok(())
    }

    fn intersect_impl<G: Grow>(&mut self, other: &[IntRect]) -> Result<(), G::Error> {
        if self.rects.is_empty() {
            return Ok(());
        }
        let mut out = Vec::new();
        // Pairwise intersections of two disjoint sets are themselves disjoint.
        for a in &self.rects {
            for b in other {
                let i = a.intersect(*b);
                if !i.is_empty() {
                    push::<G>(&mut out, i)?;
                }
            }
        }
        if out.len() != self.rects.len() || out != self.rects {
            self.normalized = out.len() <= 1;
            self.rects = out;
        }
        Ok(())
    }
}

/// Merge consecutive runs for which `adjacent(last, next)` holds. Returns true if
/// anything merged.
fn merge_runs(rects: &mut Vec<IntRect>, adjacent: impl Fn(&IntRect, &IntRect) -> bool) -> bool {
    let before = rects.len();
    let mut write = 0;
    for read in 0..rects.len() {
        let r = rects[read];
        if write > 0 && adjacent(&rects[write - 1], &r) {
            let last = &mut rects[write - 1];
            *last = last.union(r);
        } else {
            rects[write] = r;
            write += 1;
        }
    }
    rects.truncate(write);
    write != before
}

/// Iterator over the rectangles of a [`Region`].
///
/// Created by [`Region::iter`] and [`Region::rects`].
#[derive(Clone, Debug)]
pub struct Rects<'a> {
    inner: core::slice::Iter<'a, IntRect>,
}

impl Iterator for Rects<'_> {
    type Item = IntRect;

    fn next(&mut self) -> Option<IntRect> {
        self.inner.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Rects<'_> {}

impl FusedIterator for Rects<'_> {}

impl<'a> IntoIterator for &'a Region {
    type Item = IntRect;
    type IntoIter = Rects<'a>;

    fn into_iter(self) -> Rects<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn r(x0: i32, y0: i32, x1: i32, y1: i32) -> IntRect {
        IntRect::new(x0, y0, x1, y1)
    }

    fn assert_disjoint(region: &Region) {
        let rects: Vec<_> = region.iter().collect();
        for (i, a) in rects.iter().enumerate() {
            assert!(!a.is_empty(), "stored an empty rect: {a:?}");
            for b in &rects[i + 1..] {
                assert!(!a.overlaps(*b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn empty_rect_makes_empty_region() {
        assert!(Region::from_rect(r(3, 3, 3, 9)).is_empty());
        assert!(Region::new().is_empty());
        assert_eq!(Region::new().bounds(), IntRect::ZERO);
    }

    #[test]
    fn union_of_overlapping_rects_stays_disjoint() {
        let mut a = Region::from_rect(r(0, 0, 10, 10));
        a.union_rect(r(5, 5, 15, 15));
        assert_disjoint(&a);
        assert_eq!(a.area(), 100 + 100 - 25);
        assert_eq!(a.bounds(), r(0, 0, 15, 15));
    }

    #[test]
    fn subtract_punches_hole() {
        let mut a = Region::from_rect(r(0, 0, 10, 10));
        a.subtract_rect(r(2, 2, 8, 8));
        assert_disjoint(&a);
        assert_eq!(a.area(), 100 - 36);
        assert!(!a.includes(5, 5));
        assert!(a.includes(1, 5));
    }

    #[test]
    fn intersect_with_empty_is_empty() {
        let mut a = Region::from_rect(r(0, 0, 10, 10));
        a.intersect(&Region::new());
        assert!(a.is_empty());
    }

    #[test]
    fn optimize_merges_split_pieces_back() {
        let mut a = Region::from_rect(r(0, 0, 10, 10));
        a.subtract_rect(r(2, 2, 8, 8));
        a.union_rect(r(2, 2, 8, 8));
        assert!(!a.is_normalized());
        a.optimize();
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![r(0, 0, 10, 10)]);
    }

    #[test]
    fn optimize_sorts_top_to_bottom_left_to_right() {
        let mut a = Region::from_rects([r(20, 20, 30, 30), r(0, 20, 10, 30), r(5, 0, 6, 1)]);
        let order: Vec<_> = a.rects().collect();
        assert_eq!(order, vec![r(5, 0, 6, 1), r(0, 20, 10, 30), r(20, 20, 30, 30)]);
    }

    #[test]
    fn optimize_is_idempotent() {
        let mut a = Region::from_rects([r(0, 0, 4, 4), r(4, 0, 8, 4), r(0, 4, 8, 8), r(9, 9, 12, 12)]);
        a.optimize();
        let once: Vec<_> = a.iter().collect();
        a.optimize();
        let twice: Vec<_> = a.iter().collect();
        assert_eq!(once, twice);
        assert_eq!(once, vec![r(0, 0, 8, 8), r(9, 9, 12, 12)]);
    }

    #[test]
    fn equality_is_by_pixels() {
        let a = Region::from_rects([r(0, 0, 5, 10), r(5, 0, 10, 10)]);
        let b = Region::from_rect(r(0, 0, 10, 10));
        assert_eq!(a, b);
        assert_ne!(a, Region::from_rect(r(0, 0, 10, 9)));
    }

    #[test]
    fn translate_moves_everything() {
        let a = Region::from_rects([r(0, 0, 2, 2), r(4, 4, 6, 6)]).translated(10, -1);
        assert!(a.includes(10, -1));
        assert!(a.includes(15, 4));
        assert!(!a.includes(0, 0));
    }

    #[test]
    fn try_forms_match_infallible_forms() {
        let mut a = Region::from_rect(r(0, 0, 10, 10));
        let mut b = a.clone();
        a.subtract_rect(r(0, 0, 5, 5));
        b.try_subtract_rect(r(0, 0, 5, 5)).unwrap();
        assert_eq!(a, b);
        a.union_rect(r(20, 20, 25, 25));
        b.try_union_rect(r(20, 20, 25, 25)).unwrap();
        assert_eq!(a, b);
        a.intersect_rect(r(0, 0, 22, 22));
        b.try_intersect_rect(r(0, 0, 22, 22)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn contains_region_and_rect() {
        let big = Region::from_rect(r(0, 0, 100, 100));
        let small = Region::from_rects([r(10, 10, 20, 20), r(50, 50, 60, 60)]);
        assert!(big.contains_region(&small));
        assert!(!small.contains_region(&big));
        assert!(big.contains_rect(r(0, 0, 100, 100)));
        assert!(big.contains_region(&Region::new()));
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer rectangles: the element type of a [`Region`](crate::Region).

use kurbo::{Point, Rect};

/// Axis-aligned integer rectangle, half-open on its right and bottom edges.
///
/// A rectangle covers the pixels `x0 <= x < x1` and `y0 <= y < y1`.
/// Any rectangle with `x1 <= x0` or `y1 <= y0` is empty; all empty rectangles
/// cover the same (empty) set of pixels regardless of their coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntRect {
    /// Minimum x (left, inclusive).
    pub x0: i32,
    /// Minimum y (top, inclusive).
    pub y0: i32,
    /// Maximum x (right, exclusive).
    pub x1: i32,
    /// Maximum y (bottom, exclusive).
    pub y1: i32,
}

impl IntRect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Create a rectangle from its corners.
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Create a rectangle from an origin and a size.
    pub const fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Width, or zero for an empty rectangle.
    pub const fn width(self) -> i32 {
        if self.x1 > self.x0 {
            self.x1 - self.x0
        } else {
            0
        }
    }

    /// Height, or zero for an empty rectangle.
    pub const fn height(self) -> i32 {
        if self.y1 > self.y0 {
            self.y1 - self.y0
        } else {
            0
        }
    }

    /// Top-left corner.
    pub const fn origin(self) -> (i32, i32) {
        (self.x0, self.y0)
    }

    /// The same size, moved to the origin.
    pub const fn extent(self) -> Self {
        Self::new(0, 0, self.width(), self.height())
    }

    /// Returns true if the rectangle covers no pixels.
    pub const fn is_empty(self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    /// Number of pixels covered.
    pub const fn area(self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Intersection of two rectangles. The result may be empty.
    pub fn intersect(self, other: Self) -> Self {
        Self::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        )
    }

    /// Smallest rectangle covering both. Empty operands are ignored.
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Returns true if the two rectangles share at least one pixel.
    pub fn overlaps(self, other: Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Returns true if the pixel `(x, y)` is covered.
    pub const fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Returns true if a (fractional) point lies inside the rectangle.
    pub fn contains_point(self, pt: Point) -> bool {
        pt.x >= f64::from(self.x0)
            && pt.x < f64::from(self.x1)
            && pt.y >= f64::from(self.y0)
            && pt.y < f64::from(self.y1)
    }

    /// Returns true if every pixel of `other` is covered by `self`.
    ///
    /// The empty rectangle is contained in every rectangle.
    pub fn contains_rect(self, other: Self) -> bool {
        other.is_empty()
            || (other.x0 >= self.x0
                && other.y0 >= self.y0
                && other.x1 <= self.x1
                && other.y1 <= self.y1)
    }

    /// Offset by `(dx, dy)`.
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x0 + dx, self.y0 + dy, self.x1 + dx, self.y1 + dy)
    }

    /// The parts of `self` not covered by `cut`, as at most four disjoint rectangles.
    ///
    /// Pieces are produced as full-width bands above and below the cut, then the
    /// left and right remainders of the middle band.
    pub fn subtract(self, cut: Self) -> impl Iterator<Item = Self> {
        let inter = self.intersect(cut);
        let pieces = if inter.is_empty() {
            [self, Self::ZERO, Self::ZERO, Self::ZERO]
        } else {
            [
                Self::new(self.x0, self.y0, self.x1, inter.y0),
                Self::new(self.x0, inter.y1, self.x1, self.y1),
                Self::new(self.x0, inter.y0, inter.x0, inter.y1),
                Self::new(inter.x1, inter.y0, self.x1, inter.y1),
            ]
        };
        pieces.into_iter().filter(|r| !r.is_empty())
    }

    /// Convert to a Kurbo rectangle.
    pub fn to_kurbo(self) -> Rect {
        Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }

    /// The smallest integer rectangle covering a Kurbo rectangle.
    ///
    /// Coordinates outside the `i32` range saturate.
    pub fn from_kurbo_outer(rect: Rect) -> Self {
        let r = rect.abs().expand();
        #[allow(
            clippy::cast_possible_truncation,
            reason = "float to int casts saturate, and `expand` already rounded outward."
        )]
        Self::new(r.x0 as i32, r.y0 as i32, r.x1 as i32, r.y1 as i32)
    }
}

impl From<IntRect> for Rect {
    fn from(rect: IntRect) -> Self {
        rect.to_kurbo()
    }
}

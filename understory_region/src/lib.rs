// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_region --heading-base-level=0

//! Understory Region: integer rectangle sets for damage and occlusion.
//!
//! Understory Region is a small value-type building block for retained-mode UIs.
//!
//! - [`IntRect`]: a half-open, axis-aligned integer rectangle.
//! - [`Region`]: a set of pixels stored as non-overlapping rectangles, with union,
//!   subtraction, intersection, containment and emptiness tests.
//!
//! Normalization is lazy. Operators keep the rectangles disjoint but do not merge
//! neighbours or sort; call [`Region::optimize`] (or iterate with [`Region::rects`])
//! before traversals that need the canonical top-to-bottom, left-to-right order.
//! This keeps tight occlusion loops cheap.
//!
//! Every operator has a `try_` form reporting allocation failure instead of aborting,
//! for callers that manage a low-memory policy of their own.
//!
//! # Example
//!
//! ```rust
//! use understory_region::{IntRect, Region};
//!
//! // A window with a dialog on top of it.
//! let mut exposed = Region::from_rect(IntRect::new(0, 0, 100, 100));
//! exposed.subtract_rect(IntRect::new(25, 25, 75, 75));
//! assert_eq!(exposed.area(), 100 * 100 - 50 * 50);
//! assert!(!exposed.includes(50, 50));
//!
//! // Walk the rectangles in paint order.
//! let bands: Vec<IntRect> = exposed.rects().collect();
//! assert_eq!(bands.first(), Some(&IntRect::new(0, 0, 100, 25)));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod rect;
pub mod region;

pub use rect::IntRect;
pub use region::{Rects, Region};

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing surface abstraction.
//!
//! ## Overview
//!
//! Painting goes through the [`Surface`] trait, which a platform backend implements
//! over its real pixel target. All coordinates are in root (screen) space. Before a
//! view draws, the tree installs a clip rectangle with [`Surface::set_clip_rect`];
//! output outside that rectangle must be discarded.
//!
//! [`RecordingSurface`] keeps the operations it receives, already clipped, which is
//! enough to inspect what a paint pass produced.

use alloc::string::String;
use alloc::vec::Vec;

use understory_region::{IntRect, Region};

/// Packed `0xRRGGBBAA` color.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self(0x0000_00ff);
    /// Opaque white.
    pub const WHITE: Self = Self(0xffff_ffff);

    /// Opaque color from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | 0xff)
    }
}

/// Pixel target used while painting.
pub trait Surface {
    /// Restrict subsequent output to `rect`.
    fn set_clip_rect(&mut self, rect: IntRect);

    /// Fill `rect` with `color`.
    fn fill_rect(&mut self, rect: IntRect, color: Color);

    /// Draw a line of text with its top-left corner at (`x`, `y`).
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color);

    /// Copy the pixels of `src` so that its top-left lands at (`x`, `y`).
    fn blit(&mut self, src: IntRect, x: i32, y: i32);
}

/// An operation received by a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceOp {
    /// A clip change.
    Clip(IntRect),
    /// A fill, already intersected with the clip.
    Fill(IntRect, Color),
    /// A text draw with the clip in effect at the time.
    Text {
        /// Anchor x.
        x: i32,
        /// Anchor y.
        y: i32,
        /// The text.
        text: String,
        /// Text color.
        color: Color,
        /// Clip in effect.
        clip: IntRect,
    },
    /// A blit destination, already intersected with the clip.
    Blit(IntRect),
}

/// [`Surface`] that records every operation.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    clip: IntRect,
    ops: Vec<SurfaceOp>,
}

impl RecordingSurface {
    /// Create an empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in order.
    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Forget the recorded operations.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Iterate over the recorded fills.
    pub fn fills(&self) -> impl Iterator<Item = (IntRect, Color)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            SurfaceOp::Fill(r, c) => Some((*r, *c)),
            _ => None,
        })
    }

    /// The pixels filled with `color`.
    pub fn covered_by(&self, color: Color) -> Region {
        Region::from_rects(
            self.fills()
                .filter(|(_, c)| *c == color)
                .map(|(r, _)| r),
        )
    }

    /// The pixels filled with any color.
    pub fn covered(&self) -> Region {
        Region::from_rects(self.fills().map(|(r, _)| r))
    }
}

impl Surface for RecordingSurface {
    fn set_clip_rect(&mut self, rect: IntRect) {
        self.clip = rect;
        self.ops.push(SurfaceOp::Clip(rect));
    }

    fn fill_rect(&mut self, rect: IntRect, color: Color) {
        let r = rect.intersect(self.clip);
        if !r.is_empty() {
            self.ops.push(SurfaceOp::Fill(r, color));
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        self.ops.push(SurfaceOp::Text {
            x,
            y,
            text: String::from(text),
            color,
            clip: self.clip,
        });
    }

    fn blit(&mut self, src: IntRect, x: i32, y: i32) {
        let (sx, sy) = src.origin();
        let r = src.translate(x - sx, y - sy).intersect(self.clip);
        if !r.is_empty() {
            self.ops.push(SurfaceOp::Blit(r));
        }
    }
}

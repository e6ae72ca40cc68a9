// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Region basics.
//!
//! Builds the exposed area of a window partly covered by two others, then walks
//! it in paint order.
//!
//! Run:
//! - `cargo run -p understory_demos --example region_basics`

use understory_region::{IntRect, Region};

fn main() {
    let window = IntRect::new(0, 0, 60, 20);
    let mut exposed = Region::from_rect(window);
    exposed.subtract_rect(IntRect::new(10, 5, 30, 15));
    exposed.subtract_rect(IntRect::new(25, 10, 70, 25));

    println!("== Exposed area: {} of {} cells ==", exposed.area(), window.area());
    for r in exposed.rects() {
        println!("  {r:?}");
    }

    let damage = Region::from_rects([IntRect::new(0, 0, 15, 8), IntRect::new(40, 0, 60, 12)]);
    let mut to_paint = exposed.clone();
    to_paint.intersect(&damage);
    println!("== Damage to paint: {} cells ==", to_paint.area());
    for r in to_paint.rects() {
        println!("  {r:?}");
    }
    println!("point (20, 10) exposed: {}", exposed.includes(20, 10));
}

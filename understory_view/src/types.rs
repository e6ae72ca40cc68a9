// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the view tree: view identifiers, state and option flags, cursors.

/// Identifier for a view in a [`ViewTree`](crate::ViewTree).
///
/// This is a small, copyable handle that stays stable while the view lives and
/// becomes invalid when the view is destroyed.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On creation, a fresh slot is allocated with generation `1`.
/// - On destruction, the slot is freed; any existing `ViewId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `ViewId`.
///
/// Use [`ViewTree::is_alive`](crate::ViewTree::is_alive) to check whether a `ViewId` still refers
/// to a live view. Stale ids never alias a different live view because the generation must match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ViewId(pub(crate) u32, pub(crate) u32);

impl ViewId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Dynamic view state.
    ///
    /// Change these through [`ViewTree::set_state`](crate::ViewTree::set_state), which
    /// applies the side effects (focus notifications, repaint requests, exposure).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct StateFlags: u16 {
        /// Shown within its owner.
        const VISIBLE        = 0x0001;
        /// The selected child of its owner.
        const SELECTED       = 0x0002;
        /// Active (selected); cannot be set on a disabled view.
        const ACTIVE         = 0x0004;
        /// On the focus chain: selected, and its owner is focused.
        const FOCUSED        = 0x0008;
        /// Receives no input and cannot become active.
        const DISABLED       = 0x0010;
        /// Currently executing modally.
        const MODAL          = 0x0020;
        /// Visible and every ancestor up to the root is visible. Maintained by the tree.
        const EXPOSED        = 0x0040;
        /// Damage is held back until the lock is released.
        const REPAINT_LOCKED = 0x0080;
    }
}

impl Default for StateFlags {
    fn default() -> Self {
        Self::VISIBLE
    }
}

bitflags::bitflags! {
    /// Static view options.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct OptionFlags: u16 {
        /// Can be selected with the pointer or by tab order.
        const SELECTABLE    = 0x0001;
        /// Moves to the front of its owner when selected.
        const TOP_SELECT    = 0x0002;
        /// The click that selects the view is also delivered to it.
        const FIRST_CLICK   = 0x0004;
        /// Observes focused events before the selected sibling.
        const PRE_PROCESS   = 0x0008;
        /// Observes focused events after the selected sibling.
        const POST_PROCESS  = 0x0010;
        /// Centered horizontally in the owner's client rect on insertion.
        const CENTER_X      = 0x0020;
        /// Centered vertically in the owner's client rect on insertion.
        const CENTER_Y      = 0x0040;
        /// Centered both ways.
        const CENTERED      = Self::CENTER_X.bits() | Self::CENTER_Y.bits();
        /// Visible region is clipped to the owner's client rect.
        const CLIP_TO_OWNER = 0x0080;
        /// A group with this option does not paint its own background.
        const NO_BACKGROUND = 0x0100;
    }
}

/// Opaque cursor descriptor.
///
/// Cursor resources belong to the platform; the tree only picks among them and
/// compares them by identity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CursorId(pub u32);

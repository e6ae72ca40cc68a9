// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for events: phases, classification masks, input payloads, and commands.
//!
//! ## Overview
//!
//! These types describe the event protocol shared by event producers (a platform
//! driver) and consumers (a view tree). They are carried by [`Event`](crate::Event).

use bitflags::bitflags;
use kurbo::Point;

/// Delivery phase of a focused-family event.
///
/// A group delivers a keyboard or command event to observers subscribed to
/// [`PreProcess`](Phase::PreProcess), then to its selected child in the
/// [`Focused`](Phase::Focused) phase, then to [`PostProcess`](Phase::PostProcess)
/// observers. Positional and broadcast deliveries always use `Focused`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Phase {
    /// Early observer, before the addressee.
    PreProcess,
    /// The addressee.
    Focused,
    /// Late observer, after the addressee left the event uncleared.
    PostProcess,
}

bitflags! {
    /// Classification of event kinds, used for masked queue retrieval and routing.
    ///
    /// Every [`Event`](crate::Event) maps to exactly one kind bit via
    /// [`Event::mask`](crate::Event::mask). The family constants combine kind bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct EventMask: u16 {
        /// A pointer button was pressed.
        const MOUSE_DOWN = 0x0001;
        /// A pointer button was released.
        const MOUSE_UP   = 0x0002;
        /// The pointer moved.
        const MOUSE_MOVE = 0x0004;
        /// A button is held down (auto-repeat tick).
        const MOUSE_AUTO = 0x0008;
        /// A key was pressed.
        const KEY_DOWN   = 0x0010;
        /// A key is held down (auto-repeat).
        const KEY_AUTO   = 0x0020;
        /// A command addressed to the focus chain.
        const COMMAND    = 0x0100;
        /// A command delivered to every view.
        const BROADCAST  = 0x0200;
        /// Accumulated damage is waiting to be painted.
        const REPAINT    = 0x0400;

        /// All pointer kinds.
        const MOUSE = Self::MOUSE_DOWN.bits()
            | Self::MOUSE_UP.bits()
            | Self::MOUSE_MOVE.bits()
            | Self::MOUSE_AUTO.bits();
        /// All keyboard kinds.
        const KEYBOARD = Self::KEY_DOWN.bits() | Self::KEY_AUTO.bits();
        /// Events routed by hit-testing.
        const POSITIONAL = Self::MOUSE.bits();
        /// Events routed down the focus chain.
        const FOCUSED = Self::KEYBOARD.bits() | Self::COMMAND.bits();
        /// Events routed to every sibling.
        const BROADCASTS = Self::BROADCAST.bits();
        /// Commands and broadcasts.
        const MESSAGE = Self::COMMAND.bits() | Self::BROADCAST.bits();
    }
}

bitflags! {
    /// Pointer buttons held during a pointer event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Buttons: u8 {
        /// Primary (usually left) button.
        const PRIMARY   = 0b0000_0001;
        /// Secondary (usually right) button.
        const SECONDARY = 0b0000_0010;
        /// Middle button.
        const MIDDLE    = 0b0000_0100;
    }
}

bitflags! {
    /// Keyboard modifiers held during an input event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift.
        const SHIFT = 0b0000_0001;
        /// Control.
        const CTRL  = 0b0000_0010;
        /// Alt / Option.
        const ALT   = 0b0000_0100;
        /// Meta / Command / Super.
        const META  = 0b0000_1000;
    }
}

/// Pointer payload.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent {
    /// Location in root coordinates.
    pub position: Point,
    /// Buttons held (for `MouseUp`, the button that was released).
    pub buttons: Buttons,
    /// Modifiers held.
    pub modifiers: Modifiers,
    /// True for the second press of a double click.
    pub double_click: bool,
}

impl PointerEvent {
    /// A primary-button event at `position` with no modifiers.
    pub fn primary(position: Point) -> Self {
        Self {
            position,
            buttons: Buttons::PRIMARY,
            modifiers: Modifiers::empty(),
            double_click: false,
        }
    }

    /// A button-less event at `position`.
    pub fn hover(position: Point) -> Self {
        Self {
            position,
            buttons: Buttons::empty(),
            modifiers: Modifiers::empty(),
            double_click: false,
        }
    }
}

/// Logical keys.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Key {
    /// A character-producing key.
    Char(char),
    /// Enter / Return.
    Enter,
    /// Escape.
    Escape,
    /// Tab (with [`Modifiers::SHIFT`] for backwards).
    Tab,
    /// Backspace.
    Backspace,
    /// Delete.
    Delete,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Function key `F1`..`F24`.
    Function(u8),
}

/// Keyboard payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct KeyEvent {
    /// The key.
    pub key: Key,
    /// Modifiers held.
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// A key press without modifiers.
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::empty(),
        }
    }
}

/// A command code.
///
/// Commands are an open set: the toolkit reserves codes below [`Command::USER`],
/// applications define their own from there on.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Command(pub u16);

impl Command {
    /// Asked of a view before it is executed modally.
    pub const VALID: Self = Self(0);
    /// End the program.
    pub const QUIT: Self = Self(1);
    /// Close the focused window.
    pub const CLOSE: Self = Self(4);
    /// Move focus to the next selectable sibling.
    pub const NEXT: Self = Self(7);
    /// Move focus to the previous selectable sibling.
    pub const PREV: Self = Self(8);
    /// Accept a dialog.
    pub const OK: Self = Self(10);
    /// Dismiss a dialog.
    pub const CANCEL: Self = Self(11);
    /// Answer yes.
    pub const YES: Self = Self(12);
    /// Answer no.
    pub const NO: Self = Self(13);
    /// Activate the default control.
    pub const DEFAULT: Self = Self(14);

    /// Broadcast: the sender received focus.
    pub const RECEIVED_FOCUS: Self = Self(50);
    /// Broadcast: the sender released focus.
    pub const RELEASED_FOCUS: Self = Self(51);
    /// Broadcast: a modal session started on the receiving group.
    pub const GRAB_MODAL: Self = Self(60);
    /// Broadcast: a modal session ended on the receiving group.
    pub const RELEASE_MODAL: Self = Self(61);

    /// First code available to applications.
    pub const USER: Self = Self(1000);

    /// An application command `USER + n`.
    pub const fn user(n: u16) -> Self {
        Self(Self::USER.0 + n)
    }
}

/// Command payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CommandEvent<K> {
    /// The command code.
    pub command: Command,
    /// Opaque reference to the originator, if any.
    pub sender: Option<K>,
}

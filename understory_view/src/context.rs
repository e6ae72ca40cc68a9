// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatch context: pointer capture, the current cursor, and alerts.

use crate::types::{CursorId, ViewId};

/// Interaction state shared by every dispatch in a tree.
///
/// Owned by the [`ViewTree`](crate::ViewTree) and reachable from handlers through
/// [`EventCx::tree`](crate::EventCx::tree).
#[derive(Clone, Debug, Default)]
pub struct DispatchContext {
    pub(crate) capture: Option<ViewId>,
    pub(crate) cursor: Option<CursorId>,
    pub(crate) default_cursor: Option<CursorId>,
    pub(crate) cursor_changed: bool,
    pub(crate) alerts: u32,
}

impl DispatchContext {
    /// The view receiving all pointer events, if any.
    pub fn capture(&self) -> Option<ViewId> {
        self.capture
    }

    /// The cursor currently shown.
    pub fn cursor(&self) -> Option<CursorId> {
        self.cursor
    }

    /// The cursor shown where no view supplies one.
    pub fn default_cursor(&self) -> Option<CursorId> {
        self.default_cursor
    }

    /// Number of alerts raised and not yet taken.
    pub fn alerts(&self) -> u32 {
        self.alerts
    }

    /// Take the pending alert count, leaving zero.
    ///
    /// The platform layer sounds the bell (or flashes) once per alert.
    pub fn take_alerts(&mut self) -> u32 {
        core::mem::take(&mut self.alerts)
    }

    /// Take a pending cursor change, if the cursor changed since the last call.
    pub fn take_cursor_change(&mut self) -> Option<Option<CursorId>> {
        core::mem::take(&mut self.cursor_changed).then_some(self.cursor)
    }

    pub(crate) fn alert(&mut self) {
        self.alerts = self.alerts.saturating_add(1);
    }

    pub(crate) fn set_cursor(&mut self, cursor: Option<CursorId>) {
        if self.cursor != cursor {
            tracing::trace!(?cursor, "cursor changed");
            self.cursor = cursor;
            self.cursor_changed = true;
        }
    }
}

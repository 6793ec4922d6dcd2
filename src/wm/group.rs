//! Group Module
//!
//! A named workspace: an ordered run of client windows plus the focus cursor
//! selecting which member receives input. The order is arrival order and
//! doubles as the circular focus-cycling order; it is never reshuffled by
//! focus history.

use tracing::debug;

use crate::errors::SchedulerError;
use crate::wm::display::{request_focus, DisplayServer};

/// A named, always-existing workspace. Groups come from configuration and
/// are never created or destroyed at runtime.
#[derive(Debug)]
pub struct Group {
    pub name: String,

    /// Member handles in arrival order.
    windows: Vec<u32>,

    /// Cursor into `windows`; `None` exactly when the group is empty.
    focus: Option<usize>,

    /// Screen currently showing this group, if any.
    pub screen: Option<usize>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            windows: Vec::new(),
            focus: None,
            screen: None,
        }
    }

    /// Member handles in arrival order.
    pub fn windows(&self) -> &[u32] {
        &self.windows
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.screen.is_some()
    }

    /// Handle under the focus cursor.
    pub fn focused_window(&self) -> Option<u32> {
        self.focus.map(|index| self.windows[index])
    }

    /// Append a window and move the cursor to it; new arrivals always take
    /// focus within their group. When the group is visible the display layer
    /// is asked to hand the window input focus.
    pub fn add_window(&mut self, display: &mut impl DisplayServer, window: u32) {
        self.windows.push(window);
        self.focus = Some(self.windows.len() - 1);
        debug!(
            "Group '{}': added window {} ({} member(s))",
            self.name,
            window,
            self.windows.len()
        );
        if self.is_visible() {
            request_focus(display, window);
        }
        self.check_cursor();
    }

    /// Drop a member. A non-focused removal leaves the cursor on the same
    /// logical window; removing the focused member hands focus to its
    /// predecessor in arrival order, wrapping from the front to the back.
    pub fn remove_window(
        &mut self,
        display: &mut impl DisplayServer,
        window: u32,
    ) -> Result<(), SchedulerError> {
        let index = self
            .windows
            .iter()
            .position(|&w| w == window)
            .ok_or_else(|| SchedulerError::NotAMember(window, self.name.clone()))?;

        self.windows.remove(index);
        self.focus = match self.focus {
            Some(_) if self.windows.is_empty() => None,
            Some(cursor) if cursor == index => Some(if index == 0 {
                self.windows.len() - 1
            } else {
                index - 1
            }),
            Some(cursor) if cursor > index => Some(cursor - 1),
            other => other,
        };

        debug!(
            "Group '{}': removed window {}, focus now {:?}",
            self.name,
            window,
            self.focused_window()
        );
        if self.is_visible() {
            if let Some(next) = self.focused_window() {
                request_focus(display, next);
            }
        }
        self.check_cursor();
        Ok(())
    }

    /// Advance the cursor one step in arrival order, wrapping at the end.
    /// No-op on an empty group.
    pub fn focus_next(&mut self, display: &mut impl DisplayServer) {
        let Some(cursor) = self.focus else { return };
        self.focus = Some((cursor + 1) % self.windows.len());
        self.apply_focus(display);
    }

    /// Retreat the cursor one step in arrival order, wrapping at the front.
    /// No-op on an empty group.
    pub fn focus_previous(&mut self, display: &mut impl DisplayServer) {
        let Some(cursor) = self.focus else { return };
        self.focus = Some(if cursor == 0 {
            self.windows.len() - 1
        } else {
            cursor - 1
        });
        self.apply_focus(display);
    }

    fn apply_focus(&self, display: &mut impl DisplayServer) {
        if self.is_visible() {
            if let Some(window) = self.focused_window() {
                request_focus(display, window);
            }
        }
    }

    fn check_cursor(&self) {
        debug_assert_eq!(self.focus.is_none(), self.windows.is_empty());
        debug_assert!(self.focus.map_or(true, |cursor| cursor < self.windows.len()));
    }
}

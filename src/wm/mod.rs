//! Window Scheduling Core
//!
//! Groups, screens, and the client registry, plus the scheduler that binds
//! them: group↔screen assignment, window lifecycle, focus cycling, and the
//! read-only queries served over the control protocol.

pub mod client;
pub mod display;
pub mod events;
pub mod group;
pub mod screen;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::errors::SchedulerError;
use crate::wm::client::ClientRegistry;
use crate::wm::display::{request_focus, request_hide, request_show, DisplayServer};
use crate::wm::group::Group;
use crate::wm::screen::{Geometry, ScreenSet};

/// Read-only snapshot of one group, served to `groupinfo` callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// Member labels in arrival order.
    pub clients: Vec<String>,
    /// Label of the focused member, if any.
    pub focus: Option<String>,
    /// Screen the group is shown on, if any.
    pub screen: Option<usize>,
}

/// The root coordinator. Owns every group, the screen set, and the client
/// registry; all mutation goes through the event dispatcher, one operation
/// at a time.
pub struct Scheduler {
    groups: Vec<Group>,
    screens: ScreenSet,
    clients: ClientRegistry,

    /// Screen that pull and focus commands act on. Screen 0 for the
    /// daemon's lifetime; kept explicit so command handlers read against
    /// "the active screen" rather than a literal index.
    active_screen: usize,
}

impl Scheduler {
    /// Build the scheduler: one group per configured name, the first N bound
    /// one-to-one to the N screens in topology order.
    pub fn new(group_names: &[String], screen_geometries: Vec<Geometry>) -> Result<Self> {
        if screen_geometries.is_empty() {
            bail!("display reported no screens");
        }
        if group_names.len() < screen_geometries.len() {
            bail!(
                "{} group(s) configured but {} screen(s) present; every screen needs a group",
                group_names.len(),
                screen_geometries.len()
            );
        }
        for (i, name) in group_names.iter().enumerate() {
            if group_names[..i].contains(name) {
                bail!("duplicate group name '{}' in configuration", name);
            }
        }

        let mut groups: Vec<Group> = group_names
            .iter()
            .map(|name| Group::new(name.as_str()))
            .collect();
        let screens = ScreenSet::new(screen_geometries);
        for screen in screens.iter() {
            groups[screen.group].screen = Some(screen.index);
        }

        info!(
            "Scheduler ready: {} group(s) across {} screen(s)",
            groups.len(),
            screens.len()
        );

        Ok(Self {
            groups,
            screens,
            clients: ClientRegistry::new(),
            active_screen: 0,
        })
    }

    fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.name == name)
    }

    /// Group currently shown on the active screen.
    fn active_group(&self) -> usize {
        self.screens.get(self.active_screen).group
    }

    /// Screen containing the given root coordinate.
    pub fn screen_at(&self, x: i32, y: i32) -> usize {
        self.screens.at_point(x, y)
    }

    // ------------------------------------------------------------------
    // Window lifecycle
    // ------------------------------------------------------------------

    /// A window became viewable: register it and hand it to the active
    /// group of the screen it appeared on, unless a hint names a group.
    pub fn window_mapped(
        &mut self,
        display: &mut impl DisplayServer,
        window: u32,
        name: String,
        screen: usize,
        group_hint: Option<&str>,
    ) {
        if self.clients.contains(window) {
            debug!("window {} already tracked; ignoring duplicate map", window);
            return;
        }
        let group = group_hint
            .and_then(|hint| self.group_index(hint))
            .unwrap_or_else(|| self.screens.get(screen).group);
        self.clients.register(window, name, group);
        self.groups[group].add_window(display, window);
    }

    /// A window went away. Unknown handles (duplicate or out-of-order
    /// destroy notifications) are routine and only logged.
    pub fn window_unmapped(&mut self, display: &mut impl DisplayServer, window: u32) {
        let Some(client) = self.clients.unregister(window) else {
            debug!("{}; ignoring", SchedulerError::UnknownWindow(window));
            return;
        };
        if let Err(err) = self.groups[client.group].remove_window(display, client.window) {
            // The registry said this group owns the window; disagreement is
            // an anomaly worth logging, not a reason to stop serving.
            warn!("inconsistent removal: {}", err);
        }
    }

    // ------------------------------------------------------------------
    // Focus
    // ------------------------------------------------------------------

    /// Rotate focus forward in the active screen's group.
    pub fn focus_next(&mut self, display: &mut impl DisplayServer) {
        let group = self.active_group();
        self.groups[group].focus_next(display);
    }

    /// Rotate focus backward in the active screen's group.
    pub fn focus_previous(&mut self, display: &mut impl DisplayServer) {
        let group = self.active_group();
        self.groups[group].focus_previous(display);
    }

    // ------------------------------------------------------------------
    // Group ↔ screen assignment
    // ------------------------------------------------------------------

    /// Make a group visible on the active screen.
    ///
    /// The displaced group goes unassigned and its windows are hidden,
    /// unless the pulled group was already visible elsewhere; in that case
    /// the two screens trade groups and nothing leaves the display.
    pub fn pull_group(
        &mut self,
        display: &mut impl DisplayServer,
        name: &str,
    ) -> Result<(), SchedulerError> {
        let target = self.group_index(name).ok_or(SchedulerError::NoSuchGroup)?;
        let screen = self.active_screen;
        let displaced = self.screens.get(screen).group;
        if displaced == target {
            debug!("group '{}' already on screen {}", name, screen);
            return Ok(());
        }

        match self.groups[target].screen {
            Some(other) => {
                info!(
                    "Pulling group '{}' from screen {} to screen {}; group '{}' takes screen {}",
                    name, other, screen, self.groups[displaced].name, other
                );
                self.screens.get_mut(screen).group = target;
                self.groups[target].screen = Some(screen);
                self.screens.get_mut(other).group = displaced;
                self.groups[displaced].screen = Some(other);
            }
            None => {
                info!(
                    "Pulling group '{}' onto screen {}; group '{}' leaves the display",
                    name, screen, self.groups[displaced].name
                );
                self.screens.get_mut(screen).group = target;
                self.groups[target].screen = Some(screen);
                self.groups[displaced].screen = None;
                for &window in self.groups[displaced].windows() {
                    request_hide(display, window);
                }
                for &window in self.groups[target].windows() {
                    request_show(display, window);
                }
            }
        }

        if let Some(window) = self.groups[target].focused_window() {
            request_focus(display, window);
        }

        self.verify_assignments();
        Ok(())
    }

    /// Hard consistency check behind every reassignment. A screen without a
    /// group, or a group on two screens, poisons everything downstream;
    /// there is no recovering from it.
    fn verify_assignments(&self) {
        for screen in self.screens.iter() {
            let group = &self.groups[screen.group];
            assert_eq!(
                group.screen,
                Some(screen.index),
                "screen {} and group '{}' disagree about their binding",
                screen.index,
                group.name
            );
        }
        let visible = self.groups.iter().filter(|g| g.screen.is_some()).count();
        assert_eq!(
            visible,
            self.screens.len(),
            "{} visible group(s) for {} screen(s)",
            visible,
            self.screens.len()
        );
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Total tracked windows across all groups.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Number of configured screens.
    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    /// Snapshot of one group: member labels in order, focused label, screen.
    pub fn group_info(&self, name: &str) -> Result<GroupInfo, SchedulerError> {
        let index = self.group_index(name).ok_or(SchedulerError::NoSuchGroup)?;
        let group = &self.groups[index];
        let label = |window: u32| {
            self.clients
                .get(window)
                .map(|client| client.name.clone())
                .unwrap_or_else(|| format!("0x{window:x}"))
        };
        Ok(GroupInfo {
            clients: group.windows().iter().map(|&w| label(w)).collect(),
            focus: group.focused_window().map(label),
            screen: group.screen,
        })
    }
}

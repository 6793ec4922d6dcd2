//! Display Module
//!
//! Boundary to the display server. The scheduler only ever issues the three
//! commands in [`DisplayServer`]; everything X11-specific (taking over the
//! root window, screen topology, reducing raw protocol events to scheduler
//! notifications) lives in [`X11Display`].

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::wm::screen::Geometry;

/// Commands the scheduler may issue against the display server.
pub trait DisplayServer {
    /// Give input focus to a window.
    fn focus(&mut self, window: u32) -> Result<()>;

    /// Make a window viewable.
    fn show(&mut self, window: u32) -> Result<()>;

    /// Take a window off the display without destroying it.
    fn hide(&mut self, window: u32) -> Result<()>;
}

/// Issue a focus request, downgrading failure to a warning. State has
/// already moved on; the window may legitimately be gone by the time the
/// request lands.
pub fn request_focus(display: &mut impl DisplayServer, window: u32) {
    if let Err(err) = display.focus(window) {
        warn!("focus request for window {} failed: {:#}", window, err);
    }
}

/// Best-effort show, see [`request_focus`].
pub fn request_show(display: &mut impl DisplayServer, window: u32) {
    if let Err(err) = display.show(window) {
        warn!("show request for window {} failed: {:#}", window, err);
    }
}

/// Best-effort hide, see [`request_focus`].
pub fn request_hide(display: &mut impl DisplayServer, window: u32) {
    if let Err(err) = display.hide(window) {
        warn!("hide request for window {} failed: {:#}", window, err);
    }
}

/// A display-layer notification, reduced to what the scheduler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// A client window became viewable at the given root position.
    Mapped {
        window: u32,
        name: String,
        x: i32,
        y: i32,
    },

    /// A client window went away.
    Unmapped { window: u32 },
}

/// The x11rb-backed display adapter.
pub struct X11Display {
    conn: Arc<RustConnection>,
    screen_num: usize,
    root: u32,

    /// Windows we unmapped ourselves; their UnmapNotify must not be taken
    /// for a client-side withdrawal.
    pending_unmaps: HashSet<u32>,
}

impl X11Display {
    /// Become the window manager: select substructure redirection on the
    /// root so map requests are routed through us.
    pub fn new(conn: Arc<RustConnection>, screen_num: usize) -> Result<Self> {
        let root = conn.setup().roots[screen_num].root;

        let mask = EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY;
        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()
            .context("Another window manager is already running")?;

        info!("Registered as window manager on root window {}", root);

        Ok(Self {
            conn,
            screen_num,
            root,
            pending_unmaps: HashSet::new(),
        })
    }

    /// Output topology, queried once at startup.
    ///
    /// Prefers RandR monitors; falls back to the root geometry when the
    /// extension reports nothing (nested servers often don't carry it).
    pub fn enumerate_screens(&self) -> Result<Vec<Geometry>> {
        match self.conn.randr_get_monitors(self.root, true) {
            Ok(cookie) => match cookie.reply() {
                Ok(reply) if !reply.monitors.is_empty() => {
                    let monitors: Vec<Geometry> = reply
                        .monitors
                        .iter()
                        .map(|monitor| Geometry {
                            x: monitor.x as i32,
                            y: monitor.y as i32,
                            width: monitor.width as u32,
                            height: monitor.height as u32,
                        })
                        .collect();
                    info!("RandR reports {} monitor(s)", monitors.len());
                    return Ok(monitors);
                }
                Ok(_) => debug!("RandR reported no monitors"),
                Err(err) => debug!("RandR monitor query failed: {}", err),
            },
            Err(err) => debug!("RandR unavailable: {}", err),
        }

        let screen = &self.conn.setup().roots[self.screen_num];
        info!(
            "Using root geometry as the single screen: {}x{}",
            screen.width_in_pixels, screen.height_in_pixels
        );
        Ok(vec![Geometry {
            x: 0,
            y: 0,
            width: screen.width_in_pixels as u32,
            height: screen.height_in_pixels as u32,
        }])
    }

    /// Windows that were already viewable when we took over, in stacking
    /// order, as mapped events ready for dispatch.
    pub fn scan_existing(&self) -> Result<Vec<DisplayEvent>> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        let mut events = Vec::new();
        for &child in &tree.children {
            let attrs = match self.conn.get_window_attributes(child)?.reply() {
                Ok(attrs) => attrs,
                Err(_) => continue, // raced away during the scan
            };
            if attrs.map_state != MapState::VIEWABLE || attrs.override_redirect {
                continue;
            }
            if let Some(event) = self.mapped_event(child)? {
                events.push(event);
            }
        }
        info!("Adopted {} pre-existing window(s)", events.len());
        Ok(events)
    }

    /// Reduce a raw X11 event to a scheduler-level notification, performing
    /// the display-side bookkeeping (mapping requested windows) on the way.
    pub fn translate(&mut self, event: &Event) -> Result<Option<DisplayEvent>> {
        match event {
            Event::MapRequest(e) => {
                debug!("MapRequest for window {}", e.window);
                self.conn.map_window(e.window)?;
                self.mapped_event(e.window)
            }
            Event::UnmapNotify(e) => {
                if self.pending_unmaps.remove(&e.window) {
                    // Our own hide(); the client is still alive.
                    return Ok(None);
                }
                debug!("UnmapNotify for window {}", e.window);
                Ok(Some(DisplayEvent::Unmapped { window: e.window }))
            }
            Event::DestroyNotify(e) => {
                debug!("DestroyNotify for window {}", e.window);
                self.pending_unmaps.remove(&e.window);
                Ok(Some(DisplayEvent::Unmapped { window: e.window }))
            }
            _ => Ok(None),
        }
    }

    /// Flush pending requests to the server. Called before every reactor
    /// wait so side effects are not sitting in the output buffer.
    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn mapped_event(&self, window: u32) -> Result<Option<DisplayEvent>> {
        let geometry = match self.conn.get_geometry(window)?.reply() {
            Ok(geometry) => geometry,
            Err(_) => {
                debug!("window {} vanished before it could be placed", window);
                return Ok(None);
            }
        };
        let name = match self.window_name(window) {
            Ok(name) if !name.is_empty() => name,
            _ => format!("0x{window:x}"),
        };
        Ok(Some(DisplayEvent::Mapped {
            window,
            name,
            x: geometry.x as i32,
            y: geometry.y as i32,
        }))
    }

    /// WM_NAME at map time; this is the label the window keeps for its
    /// lifetime in group snapshots.
    fn window_name(&self, window: u32) -> Result<String> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_NAME, AtomEnum::ANY, 0, 1024)?
            .reply()?;
        Ok(String::from_utf8_lossy(&reply.value).into_owned())
    }
}

impl DisplayServer for X11Display {
    fn focus(&mut self, window: u32) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn show(&mut self, window: u32) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn hide(&mut self, window: u32) -> Result<()> {
        self.pending_unmaps.insert(window);
        self.conn.unmap_window(window)?;
        Ok(())
    }
}

//! Events Module
//!
//! The single-threaded reactor. Display notifications and control requests
//! are funneled through one dispatch point and each runs to completion
//! before the next is read. That serialization is what keeps the
//! scheduler's invariants observable from outside without any locking.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ipc::protocol::{Command, Response};
use crate::ipc::IpcRequest;
use crate::wm::display::{DisplayEvent, DisplayServer, X11Display};
use crate::wm::Scheduler;
use crate::x11_async::X11EventStream;

/// Apply one display-layer notification to the scheduler.
pub fn dispatch_display_event(
    scheduler: &mut Scheduler,
    display: &mut impl DisplayServer,
    event: DisplayEvent,
) {
    match event {
        DisplayEvent::Mapped { window, name, x, y } => {
            let screen = scheduler.screen_at(x, y);
            scheduler.window_mapped(display, window, name, screen, None);
        }
        DisplayEvent::Unmapped { window } => {
            scheduler.window_unmapped(display, window);
        }
    }
}

/// Execute one control command and produce its response.
///
/// Command-level failures become ordinary [`Response::Error`] values; only
/// the framing layer ever drops a connection.
pub fn dispatch_command(
    scheduler: &mut Scheduler,
    display: &mut impl DisplayServer,
    command: Command,
) -> Response {
    debug!("Dispatching {:?}", command);
    match command {
        Command::Status => Response::ok(),
        Command::ClientCount => Response::Count {
            value: scheduler.client_count() as u64,
        },
        Command::ScreenCount => Response::Count {
            value: scheduler.screen_count() as u64,
        },
        Command::GroupInfo { group } => match scheduler.group_info(&group) {
            Ok(info) => Response::Group {
                clients: info.clients,
                focus: info.focus,
                screen: info.screen,
            },
            Err(err) => Response::error(err),
        },
        Command::PullGroup { group } => match scheduler.pull_group(display, &group) {
            Ok(()) => Response::ok(),
            Err(err) => Response::error(err),
        },
        Command::FocusNext => {
            scheduler.focus_next(display);
            Response::ok()
        }
        Command::FocusPrevious => {
            scheduler.focus_previous(display);
            Response::ok()
        }
    }
}

/// Run the reactor until shutdown: drain buffered X11 events, serve one
/// control request at a time, flush the display connection before every
/// wait.
pub async fn run(
    mut scheduler: Scheduler,
    mut display: X11Display,
    stream: X11EventStream,
    mut requests: mpsc::Receiver<IpcRequest>,
    mut shutdown: mpsc::Receiver<()>,
) -> Result<()> {
    info!("Entering event loop");
    loop {
        // Drain everything the connection already buffered before sleeping.
        while let Some(event) = stream.poll_next_event()? {
            match display.translate(&event) {
                Ok(Some(event)) => dispatch_display_event(&mut scheduler, &mut display, event),
                Ok(None) => {}
                Err(err) => warn!("failed to translate X11 event: {:#}", err),
            }
        }
        display.flush()?;

        tokio::select! {
            _ = stream.wait_readable() => {}
            Some(IpcRequest { command, reply }) = requests.recv() => {
                let response = dispatch_command(&mut scheduler, &mut display, command);
                // A caller that hung up mid-request forfeits its answer.
                let _ = reply.send(response);
            }
            _ = shutdown.recv() => {
                info!("Shutdown requested; leaving event loop");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::display::testing::RecordingDisplay;
    use crate::wm::screen::Geometry;

    fn geometries(count: usize) -> Vec<Geometry> {
        (0..count)
            .map(|i| Geometry {
                x: i as i32 * 800,
                y: 0,
                width: 800,
                height: 600,
            })
            .collect()
    }

    fn scheduler(screens: usize) -> Scheduler {
        let groups: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        Scheduler::new(&groups, geometries(screens)).unwrap()
    }

    fn map(scheduler: &mut Scheduler, display: &mut RecordingDisplay, window: u32, name: &str) {
        dispatch_display_event(
            scheduler,
            display,
            DisplayEvent::Mapped {
                window,
                name: name.to_string(),
                x: 0,
                y: 0,
            },
        );
    }

    fn unmap(scheduler: &mut Scheduler, display: &mut RecordingDisplay, window: u32) {
        dispatch_display_event(scheduler, display, DisplayEvent::Unmapped { window });
    }

    fn groupinfo(
        scheduler: &mut Scheduler,
        display: &mut RecordingDisplay,
        name: &str,
    ) -> (Vec<String>, Option<String>, Option<usize>) {
        match dispatch_command(
            scheduler,
            display,
            Command::GroupInfo {
                group: name.to_string(),
            },
        ) {
            Response::Group {
                clients,
                focus,
                screen,
            } => (clients, focus, screen),
            other => panic!("expected group snapshot, got {other:?}"),
        }
    }

    #[test]
    fn status_reports_ok() {
        let mut scheduler = scheduler(1);
        let mut display = RecordingDisplay::default();
        assert_eq!(
            dispatch_command(&mut scheduler, &mut display, Command::Status),
            Response::ok()
        );
    }

    #[test]
    fn mapped_windows_show_up_in_group_snapshots() {
        let mut scheduler = scheduler(1);
        let mut display = RecordingDisplay::default();

        map(&mut scheduler, &mut display, 1, "one");
        let (clients, focus, _) = groupinfo(&mut scheduler, &mut display, "a");
        assert!(clients.contains(&"one".to_string()));
        assert_eq!(focus.as_deref(), Some("one"));

        map(&mut scheduler, &mut display, 2, "two");
        let (clients, focus, _) = groupinfo(&mut scheduler, &mut display, "a");
        assert!(clients.contains(&"two".to_string()));
        assert_eq!(focus.as_deref(), Some("two"));
    }

    #[test]
    fn unmap_counts_down_and_hands_focus_back() {
        let mut scheduler = scheduler(1);
        let mut display = RecordingDisplay::default();

        map(&mut scheduler, &mut display, 1, "one");
        map(&mut scheduler, &mut display, 2, "two");
        assert_eq!(
            dispatch_command(&mut scheduler, &mut display, Command::ClientCount),
            Response::Count { value: 2 }
        );

        unmap(&mut scheduler, &mut display, 2);
        assert_eq!(
            dispatch_command(&mut scheduler, &mut display, Command::ClientCount),
            Response::Count { value: 1 }
        );
        let (_, focus, _) = groupinfo(&mut scheduler, &mut display, "a");
        assert_eq!(focus.as_deref(), Some("one"));

        unmap(&mut scheduler, &mut display, 1);
        assert_eq!(
            dispatch_command(&mut scheduler, &mut display, Command::ClientCount),
            Response::Count { value: 0 }
        );
        let (_, focus, _) = groupinfo(&mut scheduler, &mut display, "a");
        assert_eq!(focus, None);
    }

    #[test]
    fn focus_commands_cycle_in_arrival_order() {
        let mut scheduler = scheduler(1);
        let mut display = RecordingDisplay::default();

        for (window, name) in [(1, "one"), (2, "two"), (3, "three")] {
            map(&mut scheduler, &mut display, window, name);
        }
        let (_, focus, _) = groupinfo(&mut scheduler, &mut display, "a");
        assert_eq!(focus.as_deref(), Some("three"));

        dispatch_command(&mut scheduler, &mut display, Command::FocusNext);
        let (_, focus, _) = groupinfo(&mut scheduler, &mut display, "a");
        assert_eq!(focus.as_deref(), Some("one"));

        dispatch_command(&mut scheduler, &mut display, Command::FocusNext);
        let (_, focus, _) = groupinfo(&mut scheduler, &mut display, "a");
        assert_eq!(focus.as_deref(), Some("two"));

        dispatch_command(&mut scheduler, &mut display, Command::FocusPrevious);
        let (_, focus, _) = groupinfo(&mut scheduler, &mut display, "a");
        assert_eq!(focus.as_deref(), Some("one"));
    }

    #[test]
    fn pullgroup_reassigns_one_screen() {
        let mut scheduler = scheduler(1);
        let mut display = RecordingDisplay::default();
        map(&mut scheduler, &mut display, 1, "one");

        assert_eq!(
            dispatch_command(
                &mut scheduler,
                &mut display,
                Command::PullGroup {
                    group: "nonexistent".into()
                }
            ),
            Response::Error {
                message: "No such group".into()
            }
        );

        dispatch_command(
            &mut scheduler,
            &mut display,
            Command::PullGroup { group: "b".into() },
        );
        assert_eq!(groupinfo(&mut scheduler, &mut display, "a").2, None);
        assert_eq!(groupinfo(&mut scheduler, &mut display, "b").2, Some(0));

        dispatch_command(
            &mut scheduler,
            &mut display,
            Command::PullGroup { group: "c".into() },
        );
        assert_eq!(groupinfo(&mut scheduler, &mut display, "c").2, Some(0));
    }

    #[test]
    fn pullgroup_swaps_when_target_is_visible_elsewhere() {
        let mut scheduler = scheduler(2);
        let mut display = RecordingDisplay::default();
        map(&mut scheduler, &mut display, 1, "one");

        dispatch_command(
            &mut scheduler,
            &mut display,
            Command::PullGroup { group: "b".into() },
        );
        assert_eq!(groupinfo(&mut scheduler, &mut display, "a").2, Some(1));
        assert_eq!(groupinfo(&mut scheduler, &mut display, "b").2, Some(0));
    }

    #[test]
    fn screencount_reports_topology() {
        let mut scheduler = scheduler(2);
        let mut display = RecordingDisplay::default();
        assert_eq!(
            dispatch_command(&mut scheduler, &mut display, Command::ScreenCount),
            Response::Count { value: 2 }
        );
    }

    #[test]
    fn mapped_window_lands_on_the_screen_it_appeared_on() {
        let mut scheduler = scheduler(2);
        let mut display = RecordingDisplay::default();

        dispatch_display_event(
            &mut scheduler,
            &mut display,
            DisplayEvent::Mapped {
                window: 9,
                name: "right".into(),
                x: 900,
                y: 100,
            },
        );

        // Screen 1 shows group "b", so that's where the window went.
        let (clients, _, screen) = groupinfo(&mut scheduler, &mut display, "b");
        assert_eq!(clients, vec!["right"]);
        assert_eq!(screen, Some(1));
    }
}

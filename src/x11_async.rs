//! X11 Async Event Stream
//!
//! Readiness notification for the X11 connection. A mio poll thread watches
//! the connection's file descriptor and wakes the reactor through a
//! [`Notify`] whenever it becomes readable, so the async loop never blocks
//! a thread on the display socket.

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{oneshot, Notify};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

pub struct X11EventStream {
    conn: Arc<RustConnection>,
    notify: Arc<Notify>,
    _poll_guard: oneshot::Receiver<()>,
}

impl X11EventStream {
    /// Register the connection's fd with a dedicated mio poll thread.
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let notify = Arc::new(Notify::new());
        let task_notify = notify.clone();

        let (guard, poll_guard) = oneshot::channel::<()>();
        let mut poll = mio::Poll::new().context("failed to create mio poll")?;
        let mut events = mio::Events::with_capacity(1);
        poll.registry()
            .register(
                &mut mio::unix::SourceFd(&fd),
                mio::Token(0),
                mio::Interest::READABLE,
            )
            .context("failed to register X11 fd with mio")?;

        // Poll with a timeout so the thread notices when the stream drops.
        let timeout = Duration::from_millis(100);
        tokio::task::spawn_blocking(move || loop {
            if guard.is_closed() {
                tracing::debug!("X11 poll thread shutting down");
                return;
            }
            if let Err(err) = poll.poll(&mut events, Some(timeout)) {
                tracing::warn!("X11 fd poll failed: {:?}", err);
                continue;
            }
            events
                .iter()
                .filter(|event| event.token() == mio::Token(0))
                .for_each(|_| task_notify.notify_one());
        });

        Ok(Self {
            conn,
            notify,
            _poll_guard: poll_guard,
        })
    }

    /// Drain one already-buffered event, if any. Non-blocking.
    pub fn poll_next_event(&self) -> Result<Option<Event>> {
        Ok(self.conn.poll_for_event()?)
    }

    /// Wait until the connection's fd has data to read.
    pub async fn wait_readable(&self) {
        self.notify.notified().await;
    }
}

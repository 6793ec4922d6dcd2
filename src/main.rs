//! Strata
//!
//! A session control daemon for X11: tracks client windows in named groups,
//! binds groups to physical screens, keeps a deterministic focus order, and
//! serves queries and commands over a Unix-socket control protocol.

mod config;
mod errors;
mod ipc;
mod wm;
mod x11_async;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::rust_connection::RustConnection;

use wm::display::X11Display;
use wm::Scheduler;

/// Command-line options.
#[derive(Debug, Default)]
struct Options {
    /// X display to connect to; `$DISPLAY` when unset.
    display: Option<String>,
    /// Control-socket path override.
    socket: Option<PathBuf>,
}

fn parse_args() -> Result<Options> {
    let mut options = Options::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--display" | "-d" => {
                options.display = Some(args.next().context("--display requires a value")?);
            }
            "--socket" | "-s" => {
                options.socket = Some(args.next().context("--socket requires a value")?.into());
            }
            other => bail!("unknown argument '{}' (expected --display or --socket)", other),
        }
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "strata=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Strata session daemon");

    let options = parse_args()?;
    let config = config::Config::load().context("Failed to load configuration")?;

    // Shutdown plumbing: SIGTERM/SIGINT drain the reactor.
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            }
            let _ = shutdown_tx.send(()).await;
        });
    }

    // Connect to X11
    let (conn, screen_num) = RustConnection::connect(options.display.as_deref())
        .context("Failed to connect to X server")?;
    let conn = Arc::new(conn);
    info!("Connected to X server, screen {}", screen_num);

    let mut display = X11Display::new(conn.clone(), screen_num)?;

    let screens = display.enumerate_screens()?;
    let mut scheduler =
        Scheduler::new(&config.groups, screens).context("Failed to initialize scheduler")?;

    // Adopt windows that were mapped before we took over.
    for event in display.scan_existing()? {
        wm::events::dispatch_display_event(&mut scheduler, &mut display, event);
    }
    display.flush()?;

    let stream = x11_async::X11EventStream::new(conn)?;

    let (request_tx, request_rx) = mpsc::channel(256);
    let socket_path = config.socket_path(options.socket);
    let server = ipc::ControlServer::start(socket_path, request_tx)?;

    let result = wm::events::run(scheduler, display, stream, request_rx, shutdown_rx).await;
    server.cleanup();

    if let Err(err) = &result {
        error!("Event loop failed: {:#}", err);
    }
    result
}

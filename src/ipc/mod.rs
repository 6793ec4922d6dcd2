//! IPC Module
//!
//! Unix-socket control server. Each connection gets its own task that reads
//! one framed request at a time, hands it to the reactor over the request
//! channel, and writes the framed response back before reading the next:
//! strictly one in flight per connection, and a stalled client stalls only
//! itself.

pub mod protocol;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::ipc::protocol::{encode_frame, Command, Request, Response, MAX_FRAME_LEN};

/// One in-flight control request, awaiting its reply from the reactor.
pub struct IpcRequest {
    pub command: Command,
    pub reply: oneshot::Sender<Response>,
}

/// Control-protocol listener.
pub struct ControlServer {
    path: PathBuf,
}

impl ControlServer {
    /// Bind the listening socket, removing a stale file from a previous
    /// run, and start accepting connections in a background task.
    pub fn start(path: PathBuf, requests: mpsc::Sender<IpcRequest>) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove stale socket {}", path.display()))?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let listener = UnixListener::bind(&path)
            .with_context(|| format!("failed to bind control socket {}", path.display()))?;
        info!("Control server listening on {}", path.display());

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        debug!("Control client connected");
                        tokio::spawn(handle_client(stream, requests.clone()));
                    }
                    Err(err) => warn!("accept error on control socket: {}", err),
                }
            }
        });

        Ok(Self { path })
    }

    /// Remove the socket file. Called once at shutdown.
    pub fn cleanup(&self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            debug!("could not remove socket {}: {}", self.path.display(), err);
        }
    }
}

/// Serve one connection. Framing violations end the connection; command
/// rejections are ordinary responses.
async fn handle_client(mut stream: UnixStream, requests: mpsc::Sender<IpcRequest>) {
    let mut len_buf = [0u8; 4];
    loop {
        if stream.read_exact(&mut len_buf).await.is_err() {
            break; // client hung up
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            warn!("oversized control frame ({} bytes); closing connection", len);
            break;
        }

        let mut body = vec![0u8; len];
        if stream.read_exact(&mut body).await.is_err() {
            break;
        }

        let request: Request = match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(err) => {
                warn!("malformed control request ({}); closing connection", err);
                break;
            }
        };
        debug!("Request: {} {:?}", request.command, request.args);

        let response = match Command::parse(&request) {
            Ok(command) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                if requests
                    .send(IpcRequest {
                        command,
                        reply: reply_tx,
                    })
                    .await
                    .is_err()
                {
                    break; // reactor is gone, nothing left to serve
                }
                match reply_rx.await {
                    Ok(response) => response,
                    Err(_) => break,
                }
            }
            Err(err) => Response::error(err),
        };

        let frame = match encode_frame(&response) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("failed to encode response: {}", err);
                break;
            }
        };
        if stream.write_all(&frame).await.is_err() {
            break;
        }
    }
    debug!("Control client disconnected");
}

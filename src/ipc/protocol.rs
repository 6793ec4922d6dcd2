//! Control Protocol
//!
//! Wire types for the daemon's Unix-socket control channel. A request is a
//! command name plus positional string arguments; a response is a tagged
//! value. Frames are length-prefixed JSON in both directions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on a single frame body; anything larger is a framing
/// violation and ends the connection.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Default socket path for the control channel.
pub fn default_socket_path() -> PathBuf {
    match std::env::var_os("XDG_RUNTIME_DIR") {
        Some(dir) => PathBuf::from(dir).join("strata.sock"),
        None => PathBuf::from("/tmp/strata.sock"),
    }
}

// ============================================================================
// Client → Daemon Requests
// ============================================================================

/// One decoded request: a command name plus its ordered arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Request {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Typed commands, produced by [`Command::parse`] after the dispatch table
/// has validated name and arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    ClientCount,
    GroupInfo { group: String },
    PullGroup { group: String },
    FocusNext,
    FocusPrevious,
    ScreenCount,
}

/// Rejected requests: recognizable framing, unusable content. These are
/// answered with an [`Response::Error`]; the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command '{command}' takes {expected} argument(s), got {got}")]
    WrongArity {
        command: String,
        expected: usize,
        got: usize,
    },
}

impl Command {
    /// Decode a request against the command table, checking arity.
    pub fn parse(request: &Request) -> Result<Self, RequestError> {
        let arity = |expected: usize| {
            if request.args.len() == expected {
                Ok(())
            } else {
                Err(RequestError::WrongArity {
                    command: request.command.clone(),
                    expected,
                    got: request.args.len(),
                })
            }
        };

        match request.command.as_str() {
            "status" => {
                arity(0)?;
                Ok(Command::Status)
            }
            "clientcount" => {
                arity(0)?;
                Ok(Command::ClientCount)
            }
            "groupinfo" => {
                arity(1)?;
                Ok(Command::GroupInfo {
                    group: request.args[0].clone(),
                })
            }
            "pullgroup" => {
                arity(1)?;
                Ok(Command::PullGroup {
                    group: request.args[0].clone(),
                })
            }
            "focusnext" => {
                arity(0)?;
                Ok(Command::FocusNext)
            }
            "focusprevious" => {
                arity(0)?;
                Ok(Command::FocusPrevious)
            }
            "screencount" => {
                arity(0)?;
                Ok(Command::ScreenCount)
            }
            other => Err(RequestError::UnknownCommand(other.to_string())),
        }
    }
}

// ============================================================================
// Daemon → Client Responses
// ============================================================================

/// Responses sent back to control clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Plain acknowledgment.
    Text { value: String },

    /// Integer query result.
    Count { value: u64 },

    /// `groupinfo` snapshot.
    Group {
        clients: Vec<String>,
        focus: Option<String>,
        screen: Option<usize>,
    },

    /// Command-level failure. The connection stays usable; callers can tell
    /// a rejected command apart from an unreachable daemon.
    Error { message: String },
}

impl Response {
    pub fn ok() -> Self {
        Response::Text { value: "OK".into() }
    }

    pub fn error(err: impl std::fmt::Display) -> Self {
        Response::Error {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Message Framing
// ============================================================================

/// Encode a value as one wire frame: 4-byte big-endian length + JSON body.
pub fn encode_frame<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
    let data = serde_json::to_vec(value)?;
    let mut buf = Vec::with_capacity(4 + data.len());
    buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buf.extend_from_slice(&data);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SchedulerError;

    #[test]
    fn request_roundtrips_through_a_frame() {
        let request = Request::new("groupinfo", &["a"]);
        let frame = encode_frame(&request).unwrap();

        let len = u32::from_be_bytes(frame[..4].try_into().unwrap()) as usize;
        assert_eq!(len, frame.len() - 4);

        let decoded: Request = serde_json::from_slice(&frame[4..]).unwrap();
        assert_eq!(decoded.command, "groupinfo");
        assert_eq!(decoded.args, vec!["a"]);
    }

    #[test]
    fn args_default_to_empty() {
        let decoded: Request = serde_json::from_str(r#"{"command": "status"}"#).unwrap();
        assert_eq!(Command::parse(&decoded), Ok(Command::Status));
    }

    #[test]
    fn command_table_covers_every_command() {
        let cases = [
            ("status", Command::Status),
            ("clientcount", Command::ClientCount),
            ("focusnext", Command::FocusNext),
            ("focusprevious", Command::FocusPrevious),
            ("screencount", Command::ScreenCount),
        ];
        for (name, expected) in cases {
            assert_eq!(Command::parse(&Request::new(name, &[])), Ok(expected));
        }
        assert_eq!(
            Command::parse(&Request::new("pullgroup", &["b"])),
            Ok(Command::PullGroup { group: "b".into() })
        );
        assert_eq!(
            Command::parse(&Request::new("groupinfo", &["b"])),
            Ok(Command::GroupInfo { group: "b".into() })
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        let err = Command::parse(&Request::new("explode", &[])).unwrap_err();
        assert_eq!(err, RequestError::UnknownCommand("explode".into()));
        assert_eq!(err.to_string(), "Unknown command: explode");
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(Command::parse(&Request::new("groupinfo", &[])).is_err());
        assert!(Command::parse(&Request::new("status", &["x"])).is_err());
        assert!(Command::parse(&Request::new("pullgroup", &["a", "b"])).is_err());
    }

    #[test]
    fn scheduler_errors_keep_their_wire_message() {
        assert_eq!(
            Response::error(SchedulerError::NoSuchGroup),
            Response::Error {
                message: "No such group".into()
            }
        );
    }

    #[test]
    fn response_roundtrips_through_json() {
        let response = Response::Group {
            clients: vec!["one".into(), "two".into()],
            focus: Some("two".into()),
            screen: Some(0),
        };
        let json = serde_json::to_string(&response).unwrap();
        let decoded: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, response);
    }
}

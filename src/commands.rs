//! Wire command types.
//!
//! A request is a single text line, optionally prefixed by a shared-secret
//! token:
//!
//! ```text
//! RIGHT
//! monstercookie:FACE Blink 3
//! ```
//!
//! Parsing happens in two steps:
//!
//! 1. [`Command::parse`] splits the line into token and payload
//! 2. [`Request::parse`] turns the payload into a typed request
//!
//! Every request is answered with exactly one [`Reply`] line.
//!
//! # Example
//!
//! ```rust
//! use car_agent::commands::{Command, Request};
//!
//! let cmd = Command::parse("s3cret: face Blink 3\n");
//! assert!(cmd.is_authorized("s3cret"));
//! assert!(!cmd.is_authorized("other"));
//!
//! assert_eq!(
//!     Request::parse(cmd.payload()),
//!     Request::Face { name: "Blink".into(), repeat: Some(3) }
//! );
//! ```

use core::fmt;

// ============================================================================
// Command (token + payload)
// ============================================================================

/// One request line split into its token and payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    token: Option<String>,
    payload: String,
}

impl Command {
    /// Splits `line` on the first `:`.
    ///
    /// Both halves are trimmed. A line without `:` has no token.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.split_once(':') {
            Some((token, payload)) => Self {
                token: Some(token.trim().to_string()),
                payload: payload.trim().to_string(),
            },
            None => Self {
                token: None,
                payload: line.to_string(),
            },
        }
    }

    /// Token sent by the client, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Everything after the token.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Checks the token against `expected`.
    ///
    /// An empty `expected` disables authentication.
    pub fn is_authorized(&self, expected: &str) -> bool {
        expected.is_empty() || self.token.as_deref() == Some(expected)
    }
}

// ============================================================================
// Request
// ============================================================================

/// A parsed command payload.
///
/// Verbs are case-insensitive; animation names keep their case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// Liveness check.
    Ping,
    /// Correct answer: happy reaction.
    Right,
    /// Wrong answer: sad reaction.
    Wrong,
    /// Return to ambient behavior (nothing to enqueue).
    Idle,
    /// Play one animation.
    Face {
        /// Animation name, case preserved.
        name: String,
        /// Requested repeat count; `None` when missing or not a number.
        repeat: Option<u32>,
    },
    /// Anything else.
    Unknown,
}

impl Request {
    /// Parses a payload.
    ///
    /// `PING`, `RIGHT`, `WRONG` and `IDLE` take no arguments. `FACE` takes a
    /// name and an optional count. Anything that does not fit is
    /// [`Request::Unknown`].
    pub fn parse(payload: &str) -> Self {
        let mut words = payload.split_whitespace();
        let Some(verb) = words.next() else {
            return Request::Unknown;
        };
        let args: Vec<&str> = words.collect();

        match (verb.to_ascii_uppercase().as_str(), args.as_slice()) {
            ("PING", []) => Request::Ping,
            ("RIGHT", []) => Request::Right,
            ("WRONG", []) => Request::Wrong,
            ("IDLE", []) => Request::Idle,
            ("FACE", [name]) => Request::Face {
                name: (*name).to_string(),
                repeat: None,
            },
            ("FACE", [name, repeat]) => Request::Face {
                name: (*name).to_string(),
                repeat: repeat.parse().ok(),
            },
            _ => Request::Unknown,
        }
    }

    /// Whether handling this request enqueues a job.
    pub fn enqueues(&self) -> bool {
        matches!(self, Request::Right | Request::Wrong | Request::Face { .. })
    }
}

// ============================================================================
// Reply
// ============================================================================

/// Reply line sent back for every request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    /// `PONG`
    Pong,
    /// `OK RIGHT`
    OkRight,
    /// `OK SAD`
    OkSad,
    /// `OK IDLE`
    OkIdle,
    /// `OK FACE`
    OkFace,
    /// `ERR UNKNOWN`
    ErrUnknown,
    /// `ERR AUTH`
    ErrAuth,
    /// `ERR STOPPED`: the queue is shutting down.
    ErrStopped,
}

impl Reply {
    /// Wire text, without the trailing newline.
    pub fn as_str(&self) -> &'static str {
        match self {
            Reply::Pong => "PONG",
            Reply::OkRight => "OK RIGHT",
            Reply::OkSad => "OK SAD",
            Reply::OkIdle => "OK IDLE",
            Reply::OkFace => "OK FACE",
            Reply::ErrUnknown => "ERR UNKNOWN",
            Reply::ErrAuth => "ERR AUTH",
            Reply::ErrStopped => "ERR STOPPED",
        }
    }

    /// Whether this is an error reply.
    pub fn is_error(&self) -> bool {
        self.as_str().starts_with("ERR")
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

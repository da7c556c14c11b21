use std::{fmt, io};

use thiserror::Error;

/// Position of a field within a marker message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Reasons a datagram is dropped by the decoder.
///
/// None of these are fatal: the listener logs them, counts them and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Payload is not UTF-8 or does not start with the expected prefix
    #[error("Framing error: {0}")]
    Framing(String),

    /// Wrong number of space-separated fields after the prefix
    #[error("Expected 3 fields, found {found}")]
    FieldCount { found: usize },

    /// A field is not of the form `name=value`
    #[error("Malformed field {token:?}")]
    FieldFormat { token: String },

    /// A field value is not a finite number
    #[error("Invalid {axis} value {value:?}")]
    Parse { axis: Axis, value: String },
}

/// Errors surfaced by the telemetry listener.
#[derive(Error, Debug)]
pub enum ListenerError {
    /// Bind failure at startup, or a receive failure while running
    #[error("Socket error: {0}")]
    Socket(#[from] io::Error),

    /// The socket was closed for shutdown
    #[error("Socket closed")]
    SocketClosed,

    #[error("Listener thread panicked")]
    ThreadPanicked,
}

/// Result type for listener operations
pub type Result<T> = std::result::Result<T, ListenerError>;

//! # Telemetry - marker position ingestion
//!
//! Receives positions of four tracked markers from a motion-capture source
//! over UDP and keeps the latest position of each marker available to the
//! control loop.
//!
//! ## Pipeline
//!
//! - [`Decoder`] turns one datagram into a [`MarkerSample`]
//! - [`MarkerWriter`] / [`MarkerReader`] share a four-slot cycle buffer, one
//!   writer and any number of readers
//! - [`TelemetryListener`] owns the socket and the background receive thread
//!
//! Marker identity is positional: the n-th successfully decoded message since
//! startup lands in slot `((n - 1) mod 4) + 1`, whatever the message says.

mod buffer;
mod decoder;
mod error;
mod listener;
mod sample;

pub use buffer::{marker_buffer, MarkerReader, MarkerWriter};
pub use decoder::{decode, Decoder, Frame, DEFAULT_PREFIX};
pub use error::{Axis, DecodeError, ListenerError, Result};
pub use listener::{ListenerConfig, ListenerStats, TelemetryListener, DEFAULT_PORT};
pub use sample::{MarkerSample, MarkerSlot, MARKER_COUNT};

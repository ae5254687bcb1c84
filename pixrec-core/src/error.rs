//! Domain-specific error types for the pixrec protocol.
//!
//! All fallible operations return `Result<T, PixrecError>`.
//! No panics on malformed input; every error is typed and surfaced to the caller.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the pixrec protocol.
#[derive(Debug, Error)]
pub enum PixrecError {
    // ── Encoder Errors ───────────────────────────────────────────
    /// The source image has no color defined at a coordinate.
    #[error("undefined pixel at ({x}, {y})")]
    UndefinedPixel { x: usize, y: usize },

    /// Image dimensions do not fit the 32-bit record fields.
    #[error("image dimensions {width}x{height} exceed the 32-bit record range")]
    DimensionOverflow { width: usize, height: usize },

    // ── Framing Errors ───────────────────────────────────────────
    /// Received bytes that cannot be split into whole records.
    #[error("framing error: {len} bytes do not form a whole record ({context})")]
    Framing { len: usize, context: &'static str },

    /// The tag byte did not map to any known record kind.
    #[error("unknown record tag: {0:#04x}")]
    UnknownTag(u8),

    // ── Protocol Errors ──────────────────────────────────────────
    /// A record arrived that the reconstructor cannot accept in its current state.
    #[error("protocol violation: {record} record while {state}")]
    ProtocolViolation {
        state: &'static str,
        record: &'static str,
    },

    /// A `PIXEL` record addressed a coordinate outside the declared image.
    #[error("pixel ({x}, {y}) outside {width}x{height} image")]
    OutOfRangeCoordinate {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// `INIT` declared an image larger than the receiver accepts.
    #[error("image too large: {width}x{height} (max {max} pixels)")]
    ImageTooLarge { width: u32, height: u32, max: u64 },

    /// The stream closed on a record boundary before `END` arrived.
    #[error("channel closed before END record")]
    UnexpectedEof,

    // ── Channel Errors ───────────────────────────────────────────
    /// The TCP/UDP/IO layer reported an error.
    #[error("channel error: {0}")]
    Channel(#[from] std::io::Error),

    /// A datagram was only partially accepted by the transport.
    #[error("short send: {actual} of {expected} bytes accepted")]
    ShortSend { expected: usize, actual: usize },

    /// No data arrived within the receiver's idle timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the transfer.
    #[error("transfer cancelled")]
    Cancelled,
}

impl PixrecError {
    /// Whether the error is confined to a single datagram.
    ///
    /// The datagram receiver drops these and keeps listening; everything
    /// else aborts the transfer.
    pub fn is_isolated_datagram_fault(&self) -> bool {
        matches!(self, Self::Framing { .. } | Self::UnknownTag(_))
    }
}

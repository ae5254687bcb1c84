//! # pixrec-core
//!
//! Record protocol for moving a raster image between two hosts over TCP
//! or UDP, uncompressed and unacknowledged.
//!
//! This crate contains:
//! - **Record**: the 12-byte `INIT` / `PIXEL` / `END` unit and its wire layout
//! - **Grid**: `PixelSource` (what the encoder reads) and `RgbGrid` (what the receiver builds)
//! - **Encoder**: image → ordered record sequence
//! - **Codec**: `RecordCodec` for stream framing via `tokio_util`
//! - **Stream / Datagram**: send and receive adapters for each framing
//! - **Reconstructor**: the receiver state machine
//! - **Error**: `PixrecError`, a typed `thiserror`-based error enum
//!
//! ```text
//! SENDER                                   RECEIVER
//! PixelSource ─► encode ─► [Record]        channel ─► framing ─► Reconstructor ─► RgbGrid
//!                            │                ▲
//!                            └── framing ─────┘
//! ```

pub mod codec;
pub mod config;
pub mod datagram;
pub mod encoder;
pub mod error;
pub mod grid;
pub mod reconstructor;
pub mod record;
pub mod stream;
pub mod transfer;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::RecordCodec;
pub use config::{DuplicateInitPolicy, OutOfRangePolicy, ReceiverConfig};
pub use datagram::{DatagramChannel, DatagramSender, receive_datagrams};
pub use encoder::{encode, encode_bytes, record_count};
pub use error::PixrecError;
pub use grid::{PixelSource, RgbGrid};
pub use reconstructor::{Phase, Progress, ReconstructStats, Reconstructor};
pub use record::{RECORD_SIZE, Record, RecordBytes, Rgb, Tag};
pub use stream::{receive_stream, send_stream};
pub use transfer::{ReceivedImage, TransferStats};

/// Re-exported so callers can cancel a receive without depending on `tokio-util`.
pub use tokio_util::sync::CancellationToken;

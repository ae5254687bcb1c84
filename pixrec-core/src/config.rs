//! Receiver-side tuning knobs.
//!
//! The policy enums derive `serde` so the CLI's TOML config can embed them
//! directly; [`ReceiverConfig`] itself is built by the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default receive buffer for datagrams, large enough to spot oversized ones.
pub const DEFAULT_DATAGRAM_BUFFER: usize = 512;

/// Default cap on `width * height` accepted from an `INIT` record.
pub const DEFAULT_MAX_PIXELS: u64 = 1 << 26;

// ── Policies ─────────────────────────────────────────────────────

/// What to do with a second `INIT` while pixels are being received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateInitPolicy {
    /// Abort with a protocol violation.
    #[default]
    Reject,
    /// Discard the partial image and start over with the new dimensions.
    Reset,
}

/// What to do with a `PIXEL` outside the dimensions declared by `INIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRangePolicy {
    /// Abort the whole transfer.
    #[default]
    Abort,
    /// Drop the record and keep going.
    Skip,
}

// ── ReceiverConfig ───────────────────────────────────────────────

/// Configuration shared by the stream and datagram receivers.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Longest wait for the next read/datagram. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Largest image (in pixels) an `INIT` record may declare.
    pub max_pixels: u64,
    pub duplicate_init: DuplicateInitPolicy,
    pub out_of_range: OutOfRangePolicy,
    /// Datagram receive buffer size in bytes (must exceed one record).
    pub datagram_buffer: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            max_pixels: DEFAULT_MAX_PIXELS,
            duplicate_init: DuplicateInitPolicy::default(),
            out_of_range: OutOfRangePolicy::default(),
            datagram_buffer: DEFAULT_DATAGRAM_BUFFER,
        }
    }
}

impl ReceiverConfig {
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn with_duplicate_init(mut self, policy: DuplicateInitPolicy) -> Self {
        self.duplicate_init = policy;
        self
    }

    pub fn with_out_of_range(mut self, policy: OutOfRangePolicy) -> Self {
        self.out_of_range = policy;
        self
    }

    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let cfg = ReceiverConfig::default();
        assert_eq!(cfg.duplicate_init, DuplicateInitPolicy::Reject);
        assert_eq!(cfg.out_of_range, OutOfRangePolicy::Abort);
        assert!(cfg.idle_timeout.is_none());
        assert!(cfg.datagram_buffer > crate::RECORD_SIZE);
    }

    #[test]
    fn builders() {
        let cfg = ReceiverConfig::default()
            .with_idle_timeout(Duration::from_millis(250))
            .with_duplicate_init(DuplicateInitPolicy::Reset)
            .with_out_of_range(OutOfRangePolicy::Skip)
            .with_max_pixels(16);
        assert_eq!(cfg.idle_timeout, Some(Duration::from_millis(250)));
        assert_eq!(cfg.duplicate_init, DuplicateInitPolicy::Reset);
        assert_eq!(cfg.out_of_range, OutOfRangePolicy::Skip);
        assert_eq!(cfg.max_pixels, 16);
    }
}

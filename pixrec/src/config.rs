//! Configuration for the pixrec CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pixrec_core::config::{DEFAULT_DATAGRAM_BUFFER, DEFAULT_MAX_PIXELS};
use pixrec_core::{DuplicateInitPolicy, OutOfRangePolicy, ReceiverConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PixrecConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Transfer settings shared by `send` and `recv`.
    pub transfer: TransferConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Which transport carries the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Stream framing over a TCP connection.
    #[default]
    Tcp,
    /// One datagram per record over UDP.
    Udp,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Tcp => f.write_str("tcp"),
            Mode::Udp => f.write_str("udp"),
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Transport to use.
    pub mode: Mode,
    /// Host to connect to (`send`) or bind on (`recv`).
    pub interface: String,
    /// Port to connect to (`send`) or bind on (`recv`).
    pub port: u16,
}

/// Transfer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Image read by `send`.
    pub input_file: PathBuf,
    /// Image written by `recv`.
    pub output_file: PathBuf,
    /// Give up when nothing arrives for this long. 0 waits forever.
    pub idle_timeout_ms: u64,
    /// Largest image `recv` will allocate, in pixels.
    pub max_pixels: u64,
    /// Handling of a second INIT: "reject" or "reset".
    pub duplicate_init: DuplicateInitPolicy,
    /// Handling of out-of-range pixels: "abort" or "skip".
    pub out_of_range: OutOfRangePolicy,
    /// UDP receive buffer in bytes.
    pub datagram_buffer: usize,
    /// UDP sender pauses after this many datagrams. 0 disables pacing.
    pub pacing_every: usize,
    /// Length of each UDP pacing pause in microseconds (0 = yield only).
    pub pacing_pause_us: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Tcp,
            interface: "localhost".into(),
            port: 8080,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("media_in.png"),
            output_file: PathBuf::from("media_out.png"),
            idle_timeout_ms: 0,
            max_pixels: DEFAULT_MAX_PIXELS,
            duplicate_init: DuplicateInitPolicy::Reject,
            out_of_range: OutOfRangePolicy::Abort,
            datagram_buffer: DEFAULT_DATAGRAM_BUFFER,
            pacing_every: 0,
            pacing_pause_us: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl PixrecConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error, so a typo never runs silently on defaults.
    pub fn load(path: &Path) -> Result<Self, toml::de::Error> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents),
            Err(_) => {
                tracing::debug!("no config at {}; using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    /// Convert transfer settings into the receiver's runtime config.
    pub fn to_receiver_config(&self) -> ReceiverConfig {
        let t = &self.transfer;
        ReceiverConfig {
            idle_timeout: (t.idle_timeout_ms > 0).then(|| Duration::from_millis(t.idle_timeout_ms)),
            max_pixels: t.max_pixels.max(1),
            duplicate_init: t.duplicate_init,
            out_of_range: t.out_of_range,
            datagram_buffer: t.datagram_buffer.max(pixrec_core::RECORD_SIZE + 1),
        }
    }

    /// UDP pacing as `(every, pause)`, if enabled.
    pub fn pacing(&self) -> Option<(usize, Duration)> {
        let t = &self.transfer;
        (t.pacing_every > 0).then(|| (t.pacing_every, Duration::from_micros(t.pacing_pause_us)))
    }
}

// ── Tests ────────────────────────────────────────────────────────

//! Datagram framing over an unreliable, message-oriented channel (UDP).
//!
//! One record per datagram, in both directions. The receiver drops any
//! datagram that is not exactly one valid record and keeps listening, so
//! an isolated bad packet never aborts a transfer. Lost or reordered
//! `PIXEL` records are tolerated; a lost `INIT` or `END` leaves the
//! receiver waiting until its idle timeout or cancellation fires.

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::ReceiverConfig;
use crate::error::PixrecError;
use crate::reconstructor::{Progress, Reconstructor};
use crate::record::{RECORD_SIZE, Record};
use crate::transfer::{ReceivedImage, TransferStats, bounded};

// ── DatagramChannel ──────────────────────────────────────────────

/// The datagram capability the protocol needs from the network layer.
#[async_trait]
pub trait DatagramChannel: Send + Sync {
    /// Send `payload` as one datagram to `dest`, returning the bytes accepted.
    async fn send_datagram(&self, payload: &[u8], dest: SocketAddr) -> io::Result<usize>;

    /// Wait for the next datagram, returning its length and source.
    ///
    /// Datagrams longer than `buf` are truncated to `buf.len()`.
    async fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;
}

#[async_trait]
impl DatagramChannel for UdpSocket {
    async fn send_datagram(&self, payload: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.send_to(payload, dest).await
    }

    async fn recv_datagram(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.recv_from(buf).await
    }
}

// ── DatagramSender ───────────────────────────────────────────────

/// Sends records as individual datagrams to a fixed destination.
pub struct DatagramSender<C> {
    channel: C,
    dest: SocketAddr,
    /// Pause after every `n` datagrams, to avoid overrunning the peer's
    /// socket buffer on fast links.
    pacing: Option<(usize, Duration)>,
    datagrams_sent: u64,
}

impl<C: DatagramChannel> DatagramSender<C> {
    pub fn new(channel: C, dest: SocketAddr) -> Self {
        Self {
            channel,
            dest,
            pacing: None,
            datagrams_sent: 0,
        }
    }

    /// Sleep for `pause` after every `every` datagrams (yield if `pause` is zero).
    pub fn with_pacing(mut self, every: usize, pause: Duration) -> Self {
        self.pacing = (every > 0).then_some((every, pause));
        self
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    /// Total datagrams sent so far.
    pub fn datagrams_sent(&self) -> u64 {
        self.datagrams_sent
    }

    /// Send a single record.
    pub async fn send_record(&mut self, record: &Record) -> Result<(), PixrecError> {
        let payload = record.to_bytes();
        let sent = self.channel.send_datagram(&payload, self.dest).await?;
        if sent != RECORD_SIZE {
            return Err(PixrecError::ShortSend {
                expected: RECORD_SIZE,
                actual: sent,
            });
        }
        self.datagrams_sent += 1;
        Ok(())
    }

    /// Send every record in order, returning the number of bytes sent.
    pub async fn send_records(&mut self, records: &[Record]) -> Result<u64, PixrecError> {
        for (i, record) in records.iter().enumerate() {
            self.send_record(record).await?;

            if let Some((every, pause)) = self.pacing {
                if (i + 1) % every == 0 {
                    if pause.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::time::sleep(pause).await;
                    }
                }
            }
        }

        let bytes = (records.len() * RECORD_SIZE) as u64;
        debug!(dest = %self.dest, records = records.len(), bytes, "datagram send complete");
        Ok(bytes)
    }

    pub fn into_inner(self) -> C {
        self.channel
    }
}

// ── Receiver ─────────────────────────────────────────────────────

/// Receive datagrams from `channel` until `END` and return the rebuilt image.
///
/// Datagrams of the wrong length or with an unknown tag are dropped, logged
/// and counted in [`TransferStats::dropped`]. Protocol violations and
/// out-of-range pixels follow `config` like the stream receiver.
pub async fn receive_datagrams<C>(
    channel: &C,
    config: &ReceiverConfig,
    cancel: &CancellationToken,
) -> Result<ReceivedImage, PixrecError>
where
    C: DatagramChannel + ?Sized,
{
    let started = Instant::now();
    let mut buf = vec![0u8; config.datagram_buffer.max(RECORD_SIZE + 1)];
    let mut reconstructor = Reconstructor::new(config);
    let mut stats = TransferStats::default();

    loop {
        let (len, source) = bounded(
            async { Ok(channel.recv_datagram(&mut buf).await?) },
            config.idle_timeout,
            cancel,
        )
        .await?;
        stats.bytes += len as u64;

        let record = match Record::from_slice(&buf[..len]) {
            Ok(record) => record,
            Err(e) if e.is_isolated_datagram_fault() => {
                warn!(%source, len, error = %e, "dropping malformed datagram");
                stats.dropped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        stats.records += 1;
        trace!(%source, %record, "datagram record");
        if reconstructor.feed(record)? == Progress::Done {
            break;
        }
    }

    stats.reconstruct = reconstructor.stats();
    stats.elapsed = started.elapsed();
    let grid = reconstructor.finish()?;
    debug!(
        width = grid.width(),
        height = grid.height(),
        records = stats.records,
        dropped = stats.dropped,
        "datagram receive complete"
    );
    Ok(ReceivedImage { grid, stats })
}

// ── Tests ────────────────────────────────────────────────────────

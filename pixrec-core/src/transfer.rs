//! Types and helpers shared by the stream and datagram receivers.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::PixrecError;
use crate::grid::RgbGrid;
use crate::reconstructor::ReconstructStats;

// ── TransferStats ────────────────────────────────────────────────

/// Per-transfer statistics reported alongside the image.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    /// Records accepted by the reconstructor.
    pub records: u64,
    /// Bytes consumed: whole records on a stream, every received datagram
    /// (malformed ones included) on UDP.
    pub bytes: u64,
    /// Datagrams discarded as malformed (always 0 for streams).
    pub dropped: u64,
    /// Counters from the reconstructor.
    pub reconstruct: ReconstructStats,
    /// Wall-clock time from first receive call to `END`.
    pub elapsed: Duration,
}

/// A completed transfer.
#[derive(Debug, Clone)]
pub struct ReceivedImage {
    pub grid: RgbGrid,
    pub stats: TransferStats,
}

// ── Limits ───────────────────────────────────────────────────────

/// Await `fut`, bounded by an optional idle timeout and a cancellation token.
pub(crate) async fn bounded<T, F>(
    fut: F,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<T, PixrecError>
where
    F: Future<Output = Result<T, PixrecError>>,
{
    let limited = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| PixrecError::Timeout(limit))?,
            None => fut.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PixrecError::Cancelled),
        result = limited => result,
    }
}

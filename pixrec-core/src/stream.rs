//! Stream framing over a reliable, ordered byte channel (TCP).
//!
//! The sender writes records back-to-back. The receiver accumulates
//! whatever each read returns and drains whole records through
//! [`RecordCodec`]; a read may carry a fraction of a record or many.

use std::time::Instant;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::codec::RecordCodec;
use crate::config::ReceiverConfig;
use crate::error::PixrecError;
use crate::reconstructor::{Progress, Reconstructor};
use crate::record::{RECORD_SIZE, Record};
use crate::transfer::{ReceivedImage, TransferStats, bounded};

/// Write `records` to `io` and shut down its write half.
///
/// Returns the number of bytes written.
pub async fn send_stream<W>(io: W, records: &[Record]) -> Result<u64, PixrecError>
where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(io, RecordCodec);
    for record in records {
        framed.feed(*record).await?;
    }
    framed.flush().await?;

    let mut io = framed.into_inner();
    io.shutdown().await?;

    let bytes = (records.len() * RECORD_SIZE) as u64;
    debug!(records = records.len(), bytes, "stream send complete");
    Ok(bytes)
}

/// Read records from `io` until `END` and return the rebuilt image.
///
/// Stops reading as soon as `END` is processed; anything after it is left
/// unread. Closing the channel mid-record is a framing error, closing it
/// on a record boundary before `END` is [`PixrecError::UnexpectedEof`].
pub async fn receive_stream<R>(
    io: R,
    config: &ReceiverConfig,
    cancel: &CancellationToken,
) -> Result<ReceivedImage, PixrecError>
where
    R: AsyncRead + Unpin,
{
    let started = Instant::now();
    let mut frames = FramedRead::new(io, RecordCodec);
    let mut reconstructor = Reconstructor::new(config);
    let mut records: u64 = 0;

    loop {
        let next = bounded(
            async { frames.next().await.transpose() },
            config.idle_timeout,
            cancel,
        )
        .await?;

        let Some(record) = next else {
            return Err(PixrecError::UnexpectedEof);
        };

        records += 1;
        trace!(%record, "stream record");
        if reconstructor.feed(record)? == Progress::Done {
            break;
        }
    }

    let stats = TransferStats {
        records,
        bytes: records * RECORD_SIZE as u64,
        dropped: 0,
        reconstruct: reconstructor.stats(),
        elapsed: started.elapsed(),
    };
    let grid = reconstructor.finish()?;
    debug!(
        width = grid.width(),
        height = grid.height(),
        records,
        "stream receive complete"
    );
    Ok(ReceivedImage { grid, stats })
}

// ── Tests ────────────────────────────────────────────────────────

//! Image → record sequence.
//!
//! [`encode`] walks the source row-major and produces
//! `INIT`, one `PIXEL` per coordinate, then `END`. The whole sequence is
//! built before anything is returned, so a missing pixel aborts the
//! transfer before a single record reaches the network.

use bytes::{BufMut, BytesMut};

use crate::error::PixrecError;
use crate::grid::PixelSource;
use crate::record::{RECORD_SIZE, Record};

/// Upper bound on the up-front record allocation; larger images grow the vector.
const PREALLOC_LIMIT: usize = 1 << 20;

/// Number of records [`encode`] emits for a `width` × `height` image.
pub fn record_count(width: u32, height: u32) -> u64 {
    width as u64 * height as u64 + 2
}

/// Encode `source` into its full record sequence.
pub fn encode<S: PixelSource + ?Sized>(source: &S) -> Result<Vec<Record>, PixrecError> {
    let (w, h) = source.dimensions();
    let (width, height) = match (u32::try_from(w), u32::try_from(h)) {
        (Ok(width), Ok(height)) => (width, height),
        _ => {
            return Err(PixrecError::DimensionOverflow {
                width: w,
                height: h,
            });
        }
    };

    let mut records = Vec::with_capacity(w.saturating_mul(h).saturating_add(2).min(PREALLOC_LIMIT));
    records.push(Record::Init { width, height });

    for y in 0..height {
        for x in 0..width {
            let rgb = source
                .pixel_at(x as usize, y as usize)
                .ok_or(PixrecError::UndefinedPixel {
                    x: x as usize,
                    y: y as usize,
                })?;
            records.push(Record::Pixel { x, y, rgb });
        }
    }

    records.push(Record::End);
    tracing::debug!(width, height, records = records.len(), "image encoded");
    Ok(records)
}

/// Encode `source` straight into contiguous wire bytes.
pub fn encode_bytes<S: PixelSource + ?Sized>(source: &S) -> Result<BytesMut, PixrecError> {
    let records = encode(source)?;
    let mut buf = BytesMut::with_capacity(records.len() * RECORD_SIZE);
    for record in &records {
        buf.put_slice(&record.to_bytes());
    }
    Ok(buf)
}

// ── Tests ────────────────────────────────────────────────────────

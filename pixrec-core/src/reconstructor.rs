//! Receiver-side state machine that rebuilds an image from records.
//!
//! ```text
//!  AwaitingInit ──INIT──► ReceivingPixels ──END──► Done
//!                          │  ▲
//!                          └──┘ PIXEL
//! ```
//!
//! `PIXEL` records may arrive in any order and may repeat; the last write
//! for a coordinate wins. Transitions that the protocol does not allow
//! return `Err` instead of panicking.

use std::fmt;

use tracing::{debug, warn};

use crate::config::{DuplicateInitPolicy, OutOfRangePolicy, ReceiverConfig};
use crate::error::PixrecError;
use crate::grid::RgbGrid;
use crate::record::{Record, Rgb};

// ── Phase ────────────────────────────────────────────────────────

/// Externally visible state of a [`Reconstructor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingInit,
    ReceivingPixels,
    Done,
}

impl Phase {
    fn describe(self) -> &'static str {
        match self {
            Phase::AwaitingInit => "awaiting INIT",
            Phase::ReceivingPixels => "receiving pixels",
            Phase::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Result of feeding one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More records are expected.
    Continue,
    /// `END` was processed; stop reading.
    Done,
}

/// Counters collected while reconstructing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructStats {
    /// `PIXEL` records written into the grid (duplicates included).
    pub pixels_written: u64,
    /// Out-of-range `PIXEL` records dropped under [`OutOfRangePolicy::Skip`].
    pub skipped: u64,
    /// Grids discarded by a second `INIT` under [`DuplicateInitPolicy::Reset`].
    pub resets: u64,
}

enum State {
    AwaitingInit,
    ReceivingPixels(RgbGrid),
    Done(RgbGrid),
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::AwaitingInit => Phase::AwaitingInit,
            State::ReceivingPixels(_) => Phase::ReceivingPixels,
            State::Done(_) => Phase::Done,
        }
    }
}

// ── Reconstructor ────────────────────────────────────────────────

/// Consumes records in arrival order and produces an [`RgbGrid`].
///
/// One instance per transfer; it is consumed by [`finish`](Self::finish).
pub struct Reconstructor {
    state: State,
    duplicate_init: DuplicateInitPolicy,
    out_of_range: OutOfRangePolicy,
    max_pixels: u64,
    stats: ReconstructStats,
}

impl Reconstructor {
    pub fn new(config: &ReceiverConfig) -> Self {
        Self {
            state: State::AwaitingInit,
            duplicate_init: config.duplicate_init,
            out_of_range: config.out_of_range,
            max_pixels: config.max_pixels,
            stats: ReconstructStats::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done(_))
    }

    pub fn stats(&self) -> ReconstructStats {
        self.stats
    }

    /// Dimensions declared by `INIT`, once known.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match &self.state {
            State::AwaitingInit => None,
            State::ReceivingPixels(grid) | State::Done(grid) => {
                Some((grid.width(), grid.height()))
            }
        }
    }

    /// Apply one record.
    pub fn feed(&mut self, record: Record) -> Result<Progress, PixrecError> {
        let kind = record.kind();
        match record {
            Record::Init { width, height } => self.on_init(width, height, kind),
            Record::Pixel { x, y, rgb } => self.on_pixel(x, y, rgb, kind),
            Record::End => self.on_end(kind),
        }
    }

    /// Hand out the completed grid.
    ///
    /// Fails unless `END` has been processed; a partial image is never
    /// returned.
    pub fn finish(self) -> Result<RgbGrid, PixrecError> {
        match self.state {
            State::Done(grid) => Ok(grid),
            other => Err(PixrecError::ProtocolViolation {
                state: other.phase().describe(),
                record: "finish before END",
            }),
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    fn on_init(&mut self, width: u32, height: u32, kind: &'static str) -> Result<Progress, PixrecError> {
        let resetting = match self.state.phase() {
            Phase::AwaitingInit => false,
            Phase::ReceivingPixels if self.duplicate_init == DuplicateInitPolicy::Reset => true,
            phase => return Err(violation(phase, kind)),
        };

        let pixels = width as u64 * height as u64;
        if pixels > self.max_pixels {
            return Err(PixrecError::ImageTooLarge {
                width,
                height,
                max: self.max_pixels,
            });
        }

        if resetting {
            warn!(width, height, "duplicate INIT, discarding partial image");
            self.stats.resets += 1;
        }

        debug!(width, height, "INIT received, allocating grid");
        self.state = State::ReceivingPixels(RgbGrid::new(width, height));
        Ok(Progress::Continue)
    }

    fn on_pixel(&mut self, x: u32, y: u32, rgb: Rgb, kind: &'static str) -> Result<Progress, PixrecError> {
        let phase = self.state.phase();
        let State::ReceivingPixels(grid) = &mut self.state else {
            return Err(violation(phase, kind));
        };

        if grid.set(x, y, rgb) {
            self.stats.pixels_written += 1;
            return Ok(Progress::Continue);
        }

        match self.out_of_range {
            OutOfRangePolicy::Abort => Err(PixrecError::OutOfRangeCoordinate {
                x,
                y,
                width: grid.width(),
                height: grid.height(),
            }),
            OutOfRangePolicy::Skip => {
                warn!(x, y, "skipping out-of-range PIXEL");
                self.stats.skipped += 1;
                Ok(Progress::Continue)
            }
        }
    }

    fn on_end(&mut self, kind: &'static str) -> Result<Progress, PixrecError> {
        match std::mem::replace(&mut self.state, State::AwaitingInit) {
            State::ReceivingPixels(grid) => {
                debug!(
                    width = grid.width(),
                    height = grid.height(),
                    written = self.stats.pixels_written,
                    "END received"
                );
                self.state = State::Done(grid);
                Ok(Progress::Done)
            }
            other => {
                let phase = other.phase();
                self.state = other;
                Err(violation(phase, kind))
            }
        }
    }
}

impl fmt::Debug for Reconstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconstructor")
            .field("phase", &self.phase())
            .field("dimensions", &self.dimensions())
            .field("stats", &self.stats)
            .finish()
    }
}

fn violation(phase: Phase, record: &'static str) -> PixrecError {
    PixrecError::ProtocolViolation {
        state: phase.describe(),
        record,
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const GREEN: Rgb = Rgb::new(0, 255, 0);

    fn init(width: u32, height: u32) -> Record {
        Record::Init { width, height }
    }

    fn pixel(x: u32, y: u32, rgb: Rgb) -> Record {
        Record::Pixel { x, y, rgb }
    }

    fn strict() -> Reconstructor {
        Reconstructor::new(&ReceiverConfig::default())
    }

    #[test]
    fn happy_path() {
        let mut r = strict();
        assert_eq!(r.phase(), Phase::AwaitingInit);
        assert_eq!(r.feed(init(2, 1)).unwrap(), Progress::Continue);
        assert_eq!(r.phase(), Phase::ReceivingPixels);
        r.feed(pixel(1, 0, GREEN)).unwrap();
        r.feed(pixel(0, 0, RED)).unwrap();
        assert_eq!(r.feed(Record::End).unwrap(), Progress::Done);
        assert!(r.is_done());
        assert_eq!(r.stats().pixels_written, 2);

        let grid = r.finish().unwrap();
        assert_eq!(grid.get(0, 0), Some(RED));
        assert_eq!(grid.get(1, 0), Some(GREEN));
    }

    #[test]
    fn unwritten_pixels_stay_black() {
        let mut r = strict();
        r.feed(init(2, 2)).unwrap();
        r.feed(pixel(0, 0, RED)).unwrap();
        r.feed(Record::End).unwrap();
        let grid = r.finish().unwrap();
        assert_eq!(grid.get(1, 1), Some(Rgb::BLACK));
    }

    #[test]
    fn duplicate_pixel_overwrites() {
        let mut r = strict();
        r.feed(init(1, 1)).unwrap();
        r.feed(pixel(0, 0, RED)).unwrap();
        r.feed(pixel(0, 0, GREEN)).unwrap();
        r.feed(Record::End).unwrap();
        assert_eq!(r.finish().unwrap().get(0, 0), Some(GREEN));
    }

    #[test]
    fn pixel_before_init_is_violation() {
        let mut r = strict();
        let err = r.feed(pixel(0, 0, RED)).unwrap_err();
        assert!(matches!(
            err,
            PixrecError::ProtocolViolation {
                record: "PIXEL",
                ..
            }
        ));
        assert_eq!(r.phase(), Phase::AwaitingInit);
    }

    #[test]
    fn end_before_init_is_violation() {
        let mut r = strict();
        assert!(matches!(
            r.feed(Record::End),
            Err(PixrecError::ProtocolViolation { record: "END", .. })
        ));
        assert_eq!(r.phase(), Phase::AwaitingInit);
    }

    #[test]
    fn duplicate_init_rejected_by_default() {
        let mut r = strict();
        r.feed(init(2, 2)).unwrap();
        assert!(matches!(
            r.feed(init(4, 4)),
            Err(PixrecError::ProtocolViolation { record: "INIT", .. })
        ));
        assert_eq!(r.dimensions(), Some((2, 2)));
    }

    #[test]
    fn duplicate_init_reset_policy() {
        let cfg = ReceiverConfig::default().with_duplicate_init(DuplicateInitPolicy::Reset);
        let mut r = Reconstructor::new(&cfg);
        r.feed(init(2, 2)).unwrap();
        r.feed(pixel(0, 0, RED)).unwrap();
        r.feed(init(3, 1)).unwrap();
        assert_eq!(r.dimensions(), Some((3, 1)));
        assert_eq!(r.stats().resets, 1);
        r.feed(Record::End).unwrap();
        let grid = r.finish().unwrap();
        assert_eq!(grid.get(0, 0), Some(Rgb::BLACK));
    }

    #[test]
    fn out_of_range_aborts_by_default() {
        let mut r = strict();
        r.feed(init(2, 2)).unwrap();
        let err = r.feed(pixel(2, 0, RED)).unwrap_err();
        assert!(matches!(
            err,
            PixrecError::OutOfRangeCoordinate {
                x: 2,
                y: 0,
                width: 2,
                height: 2
            }
        ));
    }

    #[test]
    fn out_of_range_skip_policy() {
        let cfg = ReceiverConfig::default().with_out_of_range(OutOfRangePolicy::Skip);
        let mut r = Reconstructor::new(&cfg);
        r.feed(init(2, 2)).unwrap();
        r.feed(pixel(0, u32::MAX, RED)).unwrap();
        r.feed(pixel(1, 1, GREEN)).unwrap();
        r.feed(Record::End).unwrap();
        assert_eq!(r.stats().skipped, 1);
        let grid = r.finish().unwrap();
        assert_eq!(grid.get(1, 1), Some(GREEN));
        assert_eq!(grid.pixels().iter().filter(|&&p| p == RED).count(), 0);
    }

    #[test]
    fn done_is_terminal() {
        let mut r = strict();
        r.feed(init(1, 1)).unwrap();
        r.feed(Record::End).unwrap();
        assert!(r.feed(pixel(0, 0, RED)).is_err());
        assert!(r.feed(init(1, 1)).is_err());
        assert!(r.feed(Record::End).is_err());
        assert!(r.is_done());
        assert!(r.finish().is_ok());
    }

    #[test]
    fn finish_before_end_fails() {
        let mut r = strict();
        r.feed(init(1, 1)).unwrap();
        assert!(matches!(
            r.finish(),
            Err(PixrecError::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn oversized_init_rejected() {
        let cfg = ReceiverConfig::default().with_max_pixels(100);
        let mut r = Reconstructor::new(&cfg);
        assert!(matches!(
            r.feed(init(11, 10)),
            Err(PixrecError::ImageTooLarge { max: 100, .. })
        ));
        assert_eq!(r.phase(), Phase::AwaitingInit);
        r.feed(init(10, 10)).unwrap();
    }

    #[test]
    fn empty_image_completes() {
        let mut r = strict();
        r.feed(init(0, 7)).unwrap();
        assert_eq!(r.feed(Record::End).unwrap(), Progress::Done);
        let grid = r.finish().unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.height(), 7);
    }
}

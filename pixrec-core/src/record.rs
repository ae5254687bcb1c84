//! The 12-byte record, the only unit pixrec puts on the wire.
//!
//! ## Wire format
//!
//! All integers are **big-endian**.
//!
//! ```text
//! field_a:  u32     (4)   INIT: width   PIXEL: x   END: 0
//! field_b:  u32     (4)   INIT: height  PIXEL: y   END: 0
//! field_c:  [u8; 3] (3)   INIT: 0       PIXEL: rgb END: 0
//! tag:      u8      (1)   INIT = 0x00, PIXEL = 0x80, END = 0xFF
//! ```

use std::fmt;

use crate::error::PixrecError;

// ── Constants ────────────────────────────────────────────────────

/// Encoded size of every record on the wire.
pub const RECORD_SIZE: usize = 12;

/// A single serialized record.
pub type RecordBytes = [u8; RECORD_SIZE];

const FIELD_A: std::ops::Range<usize> = 0..4;
const FIELD_B: std::ops::Range<usize> = 4..8;
const FIELD_C: std::ops::Range<usize> = 8..11;
const TAG: usize = 11;

// ── Tag ──────────────────────────────────────────────────────────

/// Record discriminator stored in the last byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Init = 0x00,
    Pixel = 0x80,
    End = 0xFF,
}

impl TryFrom<u8> for Tag {
    type Error = PixrecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Tag::Init),
            0x80 => Ok(Tag::Pixel),
            0xFF => Ok(Tag::End),
            other => Err(PixrecError::UnknownTag(other)),
        }
    }
}

// ── Rgb ──────────────────────────────────────────────────────────

/// An 8-bit-per-channel color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

// ── Record ───────────────────────────────────────────────────────

/// In-memory form of a record, decoded according to its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    /// Opens a transfer and declares the image dimensions.
    Init { width: u32, height: u32 },
    /// Sets one pixel.
    Pixel { x: u32, y: u32, rgb: Rgb },
    /// Closes the transfer.
    End,
}

impl Record {
    pub fn tag(&self) -> Tag {
        match self {
            Record::Init { .. } => Tag::Init,
            Record::Pixel { .. } => Tag::Pixel,
            Record::End => Tag::End,
        }
    }

    /// Tag name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Init { .. } => "INIT",
            Record::Pixel { .. } => "PIXEL",
            Record::End => "END",
        }
    }

    /// Serialize to the 12-byte wire form.
    pub fn to_bytes(&self) -> RecordBytes {
        let mut buf = [0u8; RECORD_SIZE];
        match *self {
            Record::Init { width, height } => {
                buf[FIELD_A].copy_from_slice(&width.to_be_bytes());
                buf[FIELD_B].copy_from_slice(&height.to_be_bytes());
            }
            Record::Pixel { x, y, rgb } => {
                buf[FIELD_A].copy_from_slice(&x.to_be_bytes());
                buf[FIELD_B].copy_from_slice(&y.to_be_bytes());
                buf[FIELD_C].copy_from_slice(&rgb.to_array());
            }
            Record::End => {}
        }
        buf[TAG] = self.tag() as u8;
        buf
    }

    /// Deserialize from exactly one record's worth of bytes.
    ///
    /// Unused fields of `INIT` and `END` are ignored rather than validated.
    pub fn from_bytes(bytes: &RecordBytes) -> Result<Self, PixrecError> {
        let tag = Tag::try_from(bytes[TAG])?;
        let a = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let b = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        Ok(match tag {
            Tag::Init => Record::Init {
                width: a,
                height: b,
            },
            Tag::Pixel => Record::Pixel {
                x: a,
                y: b,
                rgb: Rgb::new(bytes[8], bytes[9], bytes[10]),
            },
            Tag::End => Record::End,
        })
    }

    /// Deserialize from a slice that must be exactly [`RECORD_SIZE`] long.
    pub fn from_slice(data: &[u8]) -> Result<Self, PixrecError> {
        let bytes: &RecordBytes = data.try_into().map_err(|_| PixrecError::Framing {
            len: data.len(),
            context: "record slice",
        })?;
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Init { width, height } => write!(f, "INIT({width}x{height})"),
            Record::Pixel { x, y, rgb } => {
                write!(f, "PIXEL({x},{y})=#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
            }
            Record::End => write!(f, "END"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

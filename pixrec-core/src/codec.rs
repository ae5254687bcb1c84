//! `tokio_util` codec for stream framing.
//!
//! Records are written back-to-back with no delimiter. The decoder only
//! yields a record once twelve bytes are buffered and leaves any shorter
//! tail in place for the next read.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::PixrecError;
use crate::record::{RECORD_SIZE, Record, RecordBytes};

/// Stateless codec for [`Record`]s over a byte stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl Decoder for RecordCodec {
    type Item = Record;
    type Error = PixrecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < RECORD_SIZE {
            // Make room for the rest of this record plus a typical next read.
            src.reserve(RECORD_SIZE - src.len());
            return Ok(None);
        }

        let mut bytes: RecordBytes = [0u8; RECORD_SIZE];
        bytes.copy_from_slice(&src[..RECORD_SIZE]);
        src.advance(RECORD_SIZE);

        Record::from_bytes(&bytes).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() => Ok(None),
            None => Err(PixrecError::Framing {
                len: src.len(),
                context: "stream closed mid-record",
            }),
        }
    }
}

impl Encoder<Record> for RecordCodec {
    type Error = PixrecError;

    fn encode(&mut self, item: Record, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.to_bytes());
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Rgb;

    #[test]
    fn waits_for_a_whole_record() {
        let mut codec = RecordCodec;
        let bytes = Record::End.to_bytes();
        let mut buf = BytesMut::from(&bytes[..7]);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 7);

        buf.extend_from_slice(&bytes[7..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Record::End));
        assert!(buf.is_empty());
    }

    #[test]
    fn drains_several_records_and_keeps_tail() {
        let mut codec = RecordCodec;
        let mut buf = BytesMut::new();
        codec
            .encode(
                Record::Init {
                    width: 1,
                    height: 1,
                },
                &mut buf,
            )
            .unwrap();
        codec
            .encode(
                Record::Pixel {
                    x: 0,
                    y: 0,
                    rgb: Rgb::new(1, 2, 3),
                },
                &mut buf,
            )
            .unwrap();
        buf.extend_from_slice(&[0, 0, 0]);

        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Some(Record::Init { .. })
        ));
        assert!(matches!(
            codec.decode(&mut buf).unwrap(),
            Some(Record::Pixel { .. })
        ));
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn eof_with_partial_record_is_framing_error() {
        let mut codec = RecordCodec;
        let mut buf = BytesMut::from(&[0u8; 5][..]);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(PixrecError::Framing { len: 5, .. })
        ));
    }

    #[test]
    fn eof_on_boundary_is_clean() {
        let mut codec = RecordCodec;
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn unknown_tag_is_error() {
        let mut codec = RecordCodec;
        let mut bytes = Record::End.to_bytes();
        bytes[11] = 0x42;
        let mut buf = BytesMut::from(&bytes[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(PixrecError::UnknownTag(0x42))
        ));
    }
}

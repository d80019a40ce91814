use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use super::{Ownership, UnitBuffer};
use crate::codec::h264::{classify, NalHeader};
use crate::error::{RelayError, Result};

/// Fixed 4-byte marker that opens every unit.
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// One framed NAL unit: `START_CODE` followed by the payload.
///
/// The first payload byte is classified once, when the unit is built.
pub struct Unit<B: UnitBuffer = Bytes> {
    buf: B,
    header: NalHeader,
}

impl<B: UnitBuffer> Unit<B> {
    /// Wraps a buffer that already carries the start code.
    ///
    /// Fails with [`RelayError::Framing`] if the marker is missing or there is
    /// no classification byte after it.
    pub fn from_buffer(buf: B) -> Result<Self> {
        if buf.len() < START_CODE.len() || buf[..4] != START_CODE {
            let shown = &buf[..buf.len().min(4)];
            return Err(RelayError::Framing(format!(
                "bad start code {:02x?}",
                shown
            )));
        }
        if buf.len() == START_CODE.len() {
            return Err(RelayError::Framing("unit has no classification byte".into()));
        }
        let header = classify(buf[4]);
        Ok(Self { buf, header })
    }

    /// Full unit bytes, start code included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Payload bytes after the start code.
    pub fn payload(&self) -> &[u8] {
        &self.buf[4..]
    }

    /// Total length including the start code.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Always false for a constructed unit; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn payload_len(&self) -> usize {
        self.buf.len() - START_CODE.len()
    }

    /// Raw classification byte (payload byte 0).
    pub fn type_code(&self) -> u8 {
        self.header.raw
    }

    /// Low 5 bits of the classification byte.
    pub fn nal_type(&self) -> u8 {
        self.header.nal_type
    }

    pub fn header(&self) -> NalHeader {
        self.header
    }

    /// True for SEI, SPS and PPS units.
    pub fn is_header(&self) -> bool {
        self.header.is_header()
    }

    pub fn ownership(&self) -> Ownership {
        B::OWNERSHIP
    }

    /// Gives the backing buffer back to the caller, who becomes responsible
    /// for releasing it.
    pub fn into_buffer(self) -> B {
        self.buf
    }
}

impl Unit<Bytes> {
    /// Builds a heap-owned unit from bare payload bytes.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let mut buf = BytesMut::with_capacity(START_CODE.len() + payload.len());
        buf.put_slice(&START_CODE);
        buf.put_slice(payload);
        Self::from_buffer(buf.freeze())
    }
}

impl<B: UnitBuffer> fmt::Debug for Unit<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("type_code", &format_args!("{:#04x}", self.header.raw))
            .field("nal_type", &self.header.nal_type)
            .field("len", &self.buf.len())
            .field("ownership", &B::OWNERSHIP)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::BackendKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_payload() {
        let unit = Unit::from_payload(&[0x67, 0x11]).unwrap();
        assert_eq!(unit.as_bytes(), &[0, 0, 0, 1, 0x67, 0x11]);
        assert_eq!(unit.len(), 6);
        assert_eq!(unit.payload_len(), 2);
        assert_eq!(unit.type_code(), 0x67);
        assert_eq!(unit.nal_type(), 7);
        assert!(unit.is_header());
        assert_eq!(unit.ownership(), Ownership::HeapOwned);
    }

    #[test]
    fn test_bad_start_code() {
        let err = Unit::from_buffer(Bytes::from_static(&[0, 0, 1, 0x65, 0x00])).unwrap_err();
        assert!(matches!(err, RelayError::Framing(_)));

        let err = Unit::from_buffer(Bytes::from_static(&[0, 0])).unwrap_err();
        assert!(matches!(err, RelayError::Framing(_)));
    }

    #[test]
    fn test_missing_classification_byte() {
        let err = Unit::from_buffer(Bytes::from_static(&START_CODE)).unwrap_err();
        assert!(matches!(err, RelayError::Framing(_)));
        assert!(Unit::from_payload(&[]).is_err());
    }

    #[test]
    fn test_backend_ownership_tags() {
        assert_eq!(
            <zmq::Message as UnitBuffer>::OWNERSHIP,
            Ownership::BackendOwned(BackendKind::ZeroMq)
        );
        assert_eq!(
            <nng::Message as UnitBuffer>::OWNERSHIP,
            Ownership::BackendOwned(BackendKind::Nanomsg)
        );
    }

    #[test]
    fn test_backend_message_wraps() {
        let msg = nng::Message::from(&[0u8, 0, 0, 1, 0x65, 0xaa][..]);
        let unit = Unit::from_buffer(msg).unwrap();
        assert_eq!(unit.nal_type(), 5);
        assert!(!unit.is_header());
        assert_eq!(unit.payload(), &[0x65, 0xaa]);
    }
}

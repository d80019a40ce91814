//! # Length-prefixed NAL framing
//!
//! Every record on disk (or on a byte stream) is laid out as:
//!
//! ```text
//! 00 00 00 01 | payload length (u32, big-endian) | payload
//! ```
//!
//! [`read_unit`] turns one record into a heap-owned [`Unit`] and
//! [`write_unit`] is its exact inverse.
//!
//! ```rust
//! use nalrelay::format::annexb::{read_unit, write_unit};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = [0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x67, 0x11];
//! let unit = read_unit(&mut &input[..])?.expect("one record");
//! assert!(unit.is_header());
//!
//! let mut out = Vec::new();
//! write_unit(&unit, &mut out)?;
//! assert_eq!(out, input);
//! # Ok(())
//! # }
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::io::{self, Read, Write};

use crate::av::{Unit, UnitBuffer, START_CODE};
use crate::codec::h264::{NoopObserver, Observer};
use crate::error::{RelayError, Result};
use crate::format::{UnitSink, UnitSource};

/// Size of the marker plus the length field.
const RECORD_PREFIX_LEN: usize = 8;

/// Reads until `buf` is full or the source is exhausted; returns bytes read.
fn read_full<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads one record.
///
/// Returns `Ok(None)` when the source is at end-of-input before the first
/// marker byte.
pub fn read_unit<R: Read + ?Sized>(src: &mut R) -> Result<Option<Unit>> {
    let mut marker = [0u8; 4];
    match read_full(src, &mut marker)? {
        0 => return Ok(None),
        4 => {}
        n => {
            return Err(RelayError::TruncatedStream(format!(
                "{} of 4 start code bytes before end of input",
                n
            )))
        }
    }
    if marker != START_CODE {
        return Err(RelayError::Framing(format!("bad start code {:02x?}", marker)));
    }

    let mut len = [0u8; 4];
    let n = read_full(src, &mut len)?;
    if n < len.len() {
        return Err(RelayError::TruncatedStream(format!(
            "{} of 4 length bytes before end of input",
            n
        )));
    }
    let size = u32::from_be_bytes(len) as usize;

    let mut data = Vec::with_capacity(START_CODE.len() + size.min(1 << 20));
    data.extend_from_slice(&START_CODE);
    let got = (&mut *src).take(size as u64).read_to_end(&mut data)?;
    if got < size {
        return Err(RelayError::TruncatedStream(format!(
            "payload of {} bytes cut short at {}",
            size, got
        )));
    }

    Unit::from_buffer(Bytes::from(data)).map(Some)
}

/// Reads records until one that is not SEI/SPS/PPS; header records are
/// dropped along the way.
pub fn read_unit_skip_headers<R: Read + ?Sized>(src: &mut R) -> Result<Option<Unit>> {
    while let Some(unit) = read_unit(src)? {
        if !unit.is_header() {
            return Ok(Some(unit));
        }
    }
    Ok(None)
}

/// Writes one record: marker, big-endian payload length, payload.
pub fn write_unit<B: UnitBuffer, W: Write + ?Sized>(unit: &Unit<B>, sink: &mut W) -> Result<()> {
    let payload = unit.payload();
    let size = u32::try_from(payload.len()).map_err(|_| {
        RelayError::Framing(format!("payload of {} bytes does not fit a u32 length", payload.len()))
    })?;

    let mut prefix = BytesMut::with_capacity(RECORD_PREFIX_LEN);
    prefix.put_slice(&START_CODE);
    prefix.put_u32(size);
    sink.write_all(&prefix)?;
    sink.write_all(payload)?;
    Ok(())
}

/// Framed reader that reports every unit to an [`Observer`].
pub struct UnitReader<R> {
    inner: R,
    observer: Box<dyn Observer>,
    exhausted: bool,
}

impl<R: Read> UnitReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            observer: Box::new(NoopObserver),
            exhausted: false,
        }
    }

    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Reads the next unit, observed. `Ok(None)` at end-of-input.
    pub fn read_unit(&mut self) -> Result<Option<Unit>> {
        if self.exhausted {
            return Ok(None);
        }
        match read_unit(&mut self.inner)? {
            Some(unit) => {
                self.observer.on_classified(unit.header(), unit.len());
                Ok(Some(unit))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Like [`read_unit_skip_headers`], observing every unit including the
    /// skipped ones.
    pub fn read_non_header(&mut self) -> Result<Option<Unit>> {
        while let Some(unit) = self.read_unit()? {
            if !unit.is_header() {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    /// True once end-of-input has been seen.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> UnitSource for UnitReader<R> {
    type Buffer = Bytes;

    fn next_unit(&mut self) -> Result<Option<Unit>> {
        self.read_unit()
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Framed writer; the inverse of [`UnitReader`].
#[derive(Debug)]
pub struct UnitWriter<W> {
    inner: W,
    units_written: usize,
}

impl<W: Write> UnitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            units_written: 0,
        }
    }

    pub fn write_unit<B: UnitBuffer>(&mut self, unit: &Unit<B>) -> Result<()> {
        write_unit(unit, &mut self.inner)?;
        self.units_written += 1;
        Ok(())
    }

    pub fn units_written(&self) -> usize {
        self.units_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> UnitSink for UnitWriter<W> {
    fn send_unit<B: UnitBuffer>(&mut self, unit: &Unit<B>) -> Result<()> {
        self.write_unit(unit)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;

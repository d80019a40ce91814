//! # Unit tracker
//!
//! A [`Tracker`] buffers units in receipt order and runs the two-phase state
//! machine a relay needs:
//!
//! ```text
//! Empty -> AccumulatingHeaders -> HeaderSetComplete -> AccumulatingFrame -> (flush) -> Empty
//! ```
//!
//! Header accumulation comes in two flavours, see [`HeaderMode`]. Frame
//! accumulation appends one unit per call. [`Tracker::flush`] drains every
//! buffered unit, in order, into a [`UnitSink`] and releases it.
//!
//! ```rust
//! use nalrelay::format::{UnitReader, UnitWriter};
//! use nalrelay::tracker::{HeaderMode, HeaderProgress, Tracker};
//!
//! # fn main() -> nalrelay::Result<()> {
//! let input: &[u8] = &[
//!     0, 0, 0, 1, 0, 0, 0, 2, 0x67, 0x42, // SPS
//!     0, 0, 0, 1, 0, 0, 0, 2, 0x68, 0xce, // PPS
//!     0, 0, 0, 1, 0, 0, 0, 2, 0x06, 0x05, // SEI
//!     0, 0, 0, 1, 0, 0, 0, 2, 0x65, 0x88, // IDR slice
//! ];
//! let mut reader = UnitReader::new(input);
//! let mut writer = UnitWriter::new(Vec::new());
//! let mut tracker = Tracker::new();
//!
//! let progress = tracker.accumulate_headers(&mut reader, HeaderMode::Sequential)?;
//! assert_eq!(progress, HeaderProgress::Complete);
//! assert_eq!(tracker.flush(&mut writer)?, 3);
//!
//! assert!(tracker.read_frame_skip_headers(&mut reader)?);
//! assert_eq!(tracker.flush(&mut writer)?, 1);
//! assert_eq!(writer.into_inner(), input);
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

use crate::av::{Unit, UnitBuffer};
use crate::codec::h264::NALUnitType;
use crate::error::{RelayError, Result};
use crate::format::{UnitSink, UnitSource};

/// How header accumulation decides it is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// Append until an SEI unit arrives. SPS/PPS presence is not checked.
    /// Suited to an ordered byte stream.
    Sequential,
    /// Append until SEI, SPS and PPS have all been seen, in any order. Any
    /// other unit type is a protocol violation. Suited to message transports.
    Set,
}

impl fmt::Display for HeaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderMode::Sequential => write!(f, "sequential"),
            HeaderMode::Set => write!(f, "set"),
        }
    }
}

impl FromStr for HeaderMode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(HeaderMode::Sequential),
            "set" => Ok(HeaderMode::Set),
            other => Err(RelayError::Config(format!("unknown header mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Empty,
    AccumulatingHeaders,
    HeaderSetComplete,
    AccumulatingFrame,
}

/// Outcome of a header accumulation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProgress {
    /// The header phase finished; the headers are buffered.
    Complete,
    /// The source had nothing more to give (end-of-input, keepalive,
    /// timeout). Whatever arrived so far stays buffered and a later call
    /// picks up where this one stopped.
    Incomplete,
}

#[derive(Debug, Default, Clone, Copy)]
struct HeaderSet {
    sei: bool,
    sps: bool,
    pps: bool,
}

impl HeaderSet {
    fn is_complete(&self) -> bool {
        self.sei && self.sps && self.pps
    }
}

/// Ordered buffer of units plus the header/frame state machine.
///
/// The tracker owns every unit it holds. Dropping the tracker releases them
/// through the release path of `B`.
pub struct Tracker<B: UnitBuffer = Bytes> {
    units: Vec<Unit<B>>,
    state: TrackerState,
    seen: HeaderSet,
}

impl<B: UnitBuffer> Tracker<B> {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            state: TrackerState::Empty,
            seen: HeaderSet::default(),
        }
    }

    /// Appends at the tail, keeping receipt order.
    pub fn append(&mut self, unit: Unit<B>) {
        if self.state == TrackerState::Empty {
            self.state = TrackerState::AccumulatingFrame;
        }
        self.units.push(unit);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Buffered units, oldest first.
    pub fn units(&self) -> &[Unit<B>] {
        &self.units
    }

    /// Pulls header units from `source` until the phase completes under
    /// `mode`, or the source has nothing more.
    ///
    /// When the source [skips priming](UnitSource::skips_priming), units with
    /// a raw classification byte of 0 are released and skipped. Any other
    /// source has every unit buffered.
    ///
    /// In [`HeaderMode::Set`] a non-header unit ends the call with
    /// [`RelayError::ProtocolViolation`]. That unit is released, and the
    /// headers buffered before it are left in place for the caller.
    pub fn accumulate_headers<S>(&mut self, mut source: S, mode: HeaderMode) -> Result<HeaderProgress>
    where
        S: UnitSource<Buffer = B>,
    {
        if self.state != TrackerState::AccumulatingHeaders {
            self.seen = HeaderSet::default();
        }
        self.state = TrackerState::AccumulatingHeaders;

        loop {
            let unit = match source.next_unit()? {
                Some(unit) => unit,
                None => return Ok(HeaderProgress::Incomplete),
            };
            if unit.type_code() == 0 && source.skips_priming() {
                log::debug!("skipping priming unit of {} bytes", unit.len());
                continue;
            }

            let done = match mode {
                HeaderMode::Sequential => unit.header().unit_type() == NALUnitType::SEI,
                HeaderMode::Set => {
                    match unit.header().unit_type() {
                        NALUnitType::SEI => self.seen.sei = true,
                        NALUnitType::SPS => self.seen.sps = true,
                        NALUnitType::PPS => self.seen.pps = true,
                        _ => return Err(RelayError::ProtocolViolation(unit.nal_type())),
                    }
                    self.seen.is_complete()
                }
            };
            self.units.push(unit);

            if done {
                self.state = TrackerState::HeaderSetComplete;
                return Ok(HeaderProgress::Complete);
            }
        }
    }

    /// Appends exactly one unit from `source`, whatever its type.
    ///
    /// Returns `false` if the source produced nothing.
    pub fn read_frame<S>(&mut self, mut source: S) -> Result<bool>
    where
        S: UnitSource<Buffer = B>,
    {
        match source.next_unit()? {
            Some(unit) => {
                self.append(unit);
                self.state = TrackerState::AccumulatingFrame;
                Ok(true)
            }
            None => {
                log::warn!("could not fetch frame unit");
                Ok(false)
            }
        }
    }

    /// Appends the next non-header unit from `source`.
    ///
    /// Header units met on the way are released without being buffered, so
    /// headers repeated mid-stream are not forwarded. Returns `false` if the
    /// source ran dry first.
    pub fn read_frame_skip_headers<S>(&mut self, mut source: S) -> Result<bool>
    where
        S: UnitSource<Buffer = B>,
    {
        while let Some(unit) = source.next_unit()? {
            if unit.is_header() {
                continue;
            }
            self.append(unit);
            self.state = TrackerState::AccumulatingFrame;
            return Ok(true);
        }
        log::warn!("could not fetch frame unit");
        Ok(false)
    }

    /// Sends every buffered unit, oldest first, through `sink`, releasing
    /// each one after it is sent, then resets to [`TrackerState::Empty`].
    ///
    /// The buffer is always emptied. If the sink fails, the remaining units
    /// are still offered to it and released, and the first error is
    /// returned. Returns the number of units drained.
    pub fn flush<K: UnitSink>(&mut self, mut sink: K) -> Result<usize> {
        let mut first_err = None;
        let mut drained = 0;

        for unit in self.units.drain(..) {
            if let Err(e) = sink.send_unit(&unit) {
                log::warn!("flush: sink rejected unit of {} bytes: {}", unit.len(), e);
                first_err.get_or_insert(e);
            }
            drained += 1;
        }
        if let Err(e) = sink.flush() {
            first_err.get_or_insert(e);
        }

        self.state = TrackerState::Empty;
        self.seen = HeaderSet::default();
        log::debug!("flushed {} units", drained);

        match first_err {
            Some(e) => Err(e),
            None => Ok(drained),
        }
    }

    /// Releases every buffered unit without sending it.
    pub fn discard(&mut self) {
        self.units.clear();
        self.state = TrackerState::Empty;
        self.seen = HeaderSet::default();
    }
}

impl<B: UnitBuffer> Default for Tracker<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: UnitBuffer> fmt::Debug for Tracker<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("state", &self.state)
            .field("units", &self.units)
            .finish()
    }
}

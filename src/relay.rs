//! # Relay drivers
//!
//! The two loops a relay process runs: draining a framed file into a sink,
//! and draining a socket (or any other [`UnitSource`]) into a sink. Both
//! forward the header set as one batch, then every frame unit on its own.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{RelayError, Result};
use crate::format::{UnitReader, UnitSink, UnitSource};
use crate::tracker::{HeaderMode, HeaderProgress, Tracker};

/// Cooperative stop signal checked between receive attempts.
///
/// A receive already blocked in the transport is not interrupted; pair this
/// with a receive timeout so the loop gets a chance to look at it.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters reported when a relay loop ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Units handed to the sink
    pub units: usize,
    /// Tracker flushes performed
    pub flushes: usize,
}

impl RelayStats {
    fn record_flush(&mut self, units: usize) {
        self.units += units;
        self.flushes += 1;
    }
}

/// Relays a framed byte stream into `sink`.
///
/// Headers are collected in [`HeaderMode::Sequential`] up to the first SEI
/// and flushed together; after that each non-header unit is flushed on its
/// own until end-of-input.
pub fn relay_file<R, K>(reader: &mut UnitReader<R>, mut sink: K) -> Result<RelayStats>
where
    R: Read,
    K: UnitSink,
{
    let mut tracker = Tracker::new();
    let mut stats = RelayStats::default();

    if tracker.accumulate_headers(&mut *reader, HeaderMode::Sequential)? == HeaderProgress::Incomplete {
        log::warn!("input ended before a complete header set");
    }
    stats.record_flush(tracker.flush(&mut sink)?);

    while tracker.read_frame_skip_headers(&mut *reader)? {
        stats.record_flush(tracker.flush(&mut sink)?);
    }

    log::info!("file relay done: {} units in {} flushes", stats.units, stats.flushes);
    Ok(stats)
}

/// Relays units from a message source into `sink` until `shutdown` fires
/// or the source is exhausted.
///
/// Header accumulation is retried while the source has nothing to give. A
/// protocol violation discards the partial header set and starts over.
/// Framing errors on received messages are logged and skipped; other
/// errors end the relay.
pub fn relay_stream<S, K>(
    mut source: S,
    mut sink: K,
    mode: HeaderMode,
    shutdown: &Shutdown,
) -> Result<RelayStats>
where
    S: UnitSource,
    K: UnitSink,
{
    let mut tracker: Tracker<S::Buffer> = Tracker::new();
    let mut stats = RelayStats::default();

    loop {
        if shutdown.is_triggered() {
            log::info!("shutdown before header set was complete");
            tracker.discard();
            return Ok(stats);
        }
        match tracker.accumulate_headers(&mut source, mode) {
            Ok(HeaderProgress::Complete) => break,
            Ok(HeaderProgress::Incomplete) if source.is_exhausted() => {
                log::warn!("input ended before a complete header set");
                stats.record_flush(tracker.flush(&mut sink)?);
                return Ok(stats);
            }
            Ok(HeaderProgress::Incomplete) => continue,
            Err(RelayError::ProtocolViolation(nal_type)) => {
                log::warn!(
                    "got nal type {} while receiving headers; dropping {} buffered header units",
                    nal_type,
                    tracker.len()
                );
                tracker.discard();
            }
            Err(e) => skip_or_fail(e)?,
        }
    }
    stats.record_flush(tracker.flush(&mut sink)?);

    while !shutdown.is_triggered() {
        match tracker.read_frame(&mut source) {
            Ok(true) => stats.record_flush(tracker.flush(&mut sink)?),
            Ok(false) if source.is_exhausted() => break,
            Ok(false) => {}
            Err(e) => skip_or_fail(e)?,
        }
    }

    tracker.discard();
    log::info!("stream relay stopped: {} units in {} flushes", stats.units, stats.flushes);
    Ok(stats)
}

fn skip_or_fail(e: RelayError) -> Result<()> {
    match e {
        RelayError::Framing(_) => Ok(()),
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::Unit;
    use crate::format::tests::{CollectingSink, ScriptedSource};
    use crate::format::UnitWriter;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn record(payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0, 0, 0, 1];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    /// Fires the shutdown token once its script runs out.
    struct StoppingSource {
        inner: ScriptedSource,
        shutdown: Shutdown,
    }

    impl UnitSource for StoppingSource {
        type Buffer = Bytes;

        fn next_unit(&mut self) -> Result<Option<Unit>> {
            if self.inner.remaining() == 0 {
                self.shutdown.trigger();
            }
            self.inner.next_unit()
        }
    }

    #[test]
    fn test_relay_file_drops_repeated_headers() {
        let mut input = Vec::new();
        for payload in [
            &[0x67u8, 1][..],
            &[0x68, 2][..],
            &[0x06, 3][..],
            &[0x65, 4][..],
            &[0x67, 5][..],
            &[0x41, 6][..],
        ] {
            input.extend(record(payload));
        }

        let mut reader = UnitReader::new(input.as_slice());
        let mut writer = UnitWriter::new(Vec::new());
        let stats = relay_file(&mut reader, &mut writer).unwrap();
        assert_eq!(stats, RelayStats { units: 5, flushes: 3 });

        let mut expected = Vec::new();
        for payload in [&[0x67u8, 1][..], &[0x68, 2][..], &[0x06, 3][..], &[0x65, 4][..], &[0x41, 6][..]] {
            expected.extend(record(payload));
        }
        assert_eq!(writer.into_inner(), expected);
    }

    #[test]
    fn test_relay_file_keeps_type_zero_records() {
        let mut input = Vec::new();
        for payload in [&[0x00u8, 9][..], &[0x67, 1][..], &[0x68, 2][..], &[0x06, 3][..], &[0x65, 4][..]] {
            input.extend(record(payload));
        }

        let mut reader = UnitReader::new(input.as_slice());
        let mut writer = UnitWriter::new(Vec::new());
        let stats = relay_file(&mut reader, &mut writer).unwrap();
        assert_eq!(stats, RelayStats { units: 5, flushes: 2 });
        assert_eq!(writer.into_inner(), input);
    }

    #[test]
    fn test_relay_stream_ends_with_input() {
        let mut input = Vec::new();
        for payload in [&[0x67u8, 1][..], &[0x68, 2][..], &[0x06, 3][..], &[0x65, 4][..], &[0x41, 5][..]] {
            input.extend(record(payload));
        }

        let reader = UnitReader::new(input.as_slice());
        let mut sink = CollectingSink::new();
        let shutdown = Shutdown::new();
        let stats = relay_stream(reader, &mut sink, HeaderMode::Set, &shutdown).unwrap();
        assert_eq!(stats, RelayStats { units: 5, flushes: 3 });
        assert_eq!(sink.nal_types(), vec![7, 8, 6, 5, 1]);
        assert!(!shutdown.is_triggered());
    }

    #[test]
    fn test_relay_stream_input_ends_in_headers() {
        let input = record(&[0x67, 1]);
        let reader = UnitReader::new(input.as_slice());
        let mut sink = CollectingSink::new();
        let stats = relay_stream(reader, &mut sink, HeaderMode::Set, &Shutdown::new()).unwrap();
        assert_eq!(stats, RelayStats { units: 1, flushes: 1 });
        assert_eq!(sink.nal_types(), vec![7]);
    }

    #[test]
    fn test_relay_file_framing_error_propagates() {
        let mut input = record(&[0x06, 1]);
        input.extend([0xde, 0xad, 0xbe, 0xef]);
        let mut reader = UnitReader::new(input.as_slice());
        let err = relay_file(&mut reader, CollectingSink::new()).unwrap_err();
        assert!(matches!(err, RelayError::Framing(_)));
    }

    #[test]
    fn test_relay_stream_restarts_after_violation() {
        let shutdown = Shutdown::new();
        let mut inner = ScriptedSource::from_types(&[0x67, 0x41]);
        inner.push_nothing();
        for (i, t) in [0x68u8, 0x67, 0x06, 0x65, 0x41].iter().enumerate() {
            inner.push_unit(Unit::from_payload(&[*t, 10 + i as u8]).unwrap());
        }
        let source = StoppingSource {
            inner,
            shutdown: shutdown.clone(),
        };

        let mut sink = CollectingSink::new();
        let stats = relay_stream(source, &mut sink, HeaderMode::Set, &shutdown).unwrap();
        assert_eq!(sink.nal_types(), vec![8, 7, 6, 5, 1]);
        assert_eq!(stats, RelayStats { units: 5, flushes: 3 });
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_relay_stream_shutdown_before_headers() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let source = ScriptedSource::from_types(&[0x67]);
        let stats = relay_stream(source, CollectingSink::new(), HeaderMode::Set, &shutdown).unwrap();
        assert_eq!(stats, RelayStats::default());
    }
}

use crate::av::{Unit, UnitBuffer};
use crate::Result;

pub mod annexb;
pub mod transport;

/// Anything that produces classified units one at a time.
pub trait UnitSource {
    /// Buffer type of the units this source produces
    type Buffer: UnitBuffer;

    /// Produce the next unit.
    ///
    /// `Ok(None)` means "no unit this call": end-of-input for a byte stream,
    /// a keepalive, timeout or transient failure for a socket.
    fn next_unit(&mut self) -> Result<Option<Unit<Self::Buffer>>>;

    /// True once the source can never produce another unit. A socket never
    /// is; a byte stream is after end-of-input.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Whether units with a raw classification byte of 0 are connection
    /// priming messages rather than stream content.
    fn skips_priming(&self) -> bool {
        false
    }
}

/// Anything that consumes units in order.
pub trait UnitSink {
    /// Write or send one unit. The unit stays owned by the caller.
    fn send_unit<B: UnitBuffer>(&mut self, unit: &Unit<B>) -> Result<()>;

    /// Push out anything buffered below this sink
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: UnitSource + ?Sized> UnitSource for &mut S {
    type Buffer = S::Buffer;

    fn next_unit(&mut self) -> Result<Option<Unit<Self::Buffer>>> {
        (**self).next_unit()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }

    fn skips_priming(&self) -> bool {
        (**self).skips_priming()
    }
}

impl<K: UnitSink + ?Sized> UnitSink for &mut K {
    fn send_unit<B: UnitBuffer>(&mut self, unit: &Unit<B>) -> Result<()> {
        (**self).send_unit(unit)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

pub mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::VecDeque;

    /// A test source that replays a fixed script of results
    pub struct ScriptedSource<B: UnitBuffer = Bytes> {
        pub script: VecDeque<Result<Option<Unit<B>>>>,
        priming: bool,
    }

    impl<B: UnitBuffer> ScriptedSource<B> {
        pub fn new() -> Self {
            Self {
                script: VecDeque::new(),
                priming: false,
            }
        }

        /// Behave like a socket that opens with priming messages
        pub fn with_priming_skip(mut self) -> Self {
            self.priming = true;
            self
        }

        pub fn push_unit(&mut self, unit: Unit<B>) {
            self.script.push_back(Ok(Some(unit)));
        }

        pub fn push_nothing(&mut self) {
            self.script.push_back(Ok(None));
        }

        pub fn remaining(&self) -> usize {
            self.script.len()
        }
    }

    impl ScriptedSource<Bytes> {
        /// Queues one heap unit per classification byte
        pub fn from_types(types: &[u8]) -> Self {
            let mut source = Self::new();
            for (i, t) in types.iter().enumerate() {
                if let Ok(unit) = Unit::from_payload(&[*t, i as u8]) {
                    source.push_unit(unit);
                }
            }
            source
        }
    }

    impl<B: UnitBuffer> Default for ScriptedSource<B> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<B: UnitBuffer> UnitSource for ScriptedSource<B> {
        type Buffer = B;

        fn next_unit(&mut self) -> Result<Option<Unit<B>>> {
            self.script.pop_front().unwrap_or(Ok(None))
        }

        fn skips_priming(&self) -> bool {
            self.priming
        }
    }

    /// A test sink that records the bytes of every unit it receives
    #[derive(Debug, Default)]
    pub struct CollectingSink {
        pub sent: Vec<Vec<u8>>,
    }

    impl CollectingSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Normalized types of everything sent so far
        pub fn nal_types(&self) -> Vec<u8> {
            self.sent.iter().map(|b| b[4] & 0x1F).collect()
        }
    }

    impl UnitSink for CollectingSink {
        fn send_unit<B: UnitBuffer>(&mut self, unit: &Unit<B>) -> Result<()> {
            self.sent.push(unit.as_bytes().to_vec());
            Ok(())
        }
    }
}

pub use self::annexb::{read_unit, read_unit_skip_headers, write_unit, UnitReader, UnitWriter};
pub use self::transport::{Endpoint, NngTransport, Role, Transport, ZmqTransport};

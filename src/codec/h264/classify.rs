use std::time::{Duration, Instant};

use super::types::{NALUnitType, NalHeader};
use crate::av::{Unit, UnitBuffer};

/// Decodes the classification byte of a unit.
pub fn classify(type_code: u8) -> NalHeader {
    NalHeader::new(type_code)
}

/// True iff the unit is SEI, SPS or PPS.
pub fn is_header<B: UnitBuffer>(unit: &Unit<B>) -> bool {
    unit.header().is_header()
}

/// Hook invoked once per unit right after it is produced by a source.
///
/// Implementations are purely observational: they never see the unit
/// mutably and cannot influence buffering.
pub trait Observer {
    fn on_classified(&mut self, header: NalHeader, size: usize);
}

/// Observer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_classified(&mut self, _header: NalHeader, _size: usize) {}
}

/// Source of monotonic time for interval diagnostics.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Logs every unit's type and size, and the interval between key units.
///
/// Ordinary slices (type 1) are not logged.
#[derive(Debug)]
pub struct IntervalObserver<C: Clock = MonotonicClock> {
    clock: C,
    last_key: Option<Instant>,
    last_interval: Option<Duration>,
}

impl IntervalObserver<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }
}

impl Default for IntervalObserver<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> IntervalObserver<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            last_key: None,
            last_interval: None,
        }
    }

    /// Time between the two most recent key units, if two have been seen.
    pub fn last_interval(&self) -> Option<Duration> {
        self.last_interval
    }
}

impl<C: Clock> Observer for IntervalObserver<C> {
    fn on_classified(&mut self, header: NalHeader, size: usize) {
        match header.unit_type() {
            NALUnitType::CodedSliceNonIDR => {}
            NALUnitType::CodedSliceIDR => {
                let now = self.clock.now();
                match self.last_key.replace(now) {
                    Some(prev) => {
                        let dif = now.saturating_duration_since(prev);
                        self.last_interval = Some(dif);
                        log::info!(
                            "key unit - size: {} - interval: {:.3} ms",
                            size,
                            dif.as_secs_f64() * 1000.0
                        );
                    }
                    None => log::info!("key unit - size: {}", size),
                }
            }
            kind => match kind.header_name() {
                Some(name) => log::debug!("nal type: {}, size: {}", name, size),
                None => log::debug!("nal type: {}, size: {}", header.nal_type, size),
            },
        }
    }
}

impl<T: Observer + ?Sized> Observer for Box<T> {
    fn on_classified(&mut self, header: NalHeader, size: usize) {
        (**self).on_classified(header, size)
    }
}

use bytes::Bytes;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{RelayError, Result};

/// Which push/pull messaging backend produced or will carry a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// ZeroMQ (`libzmq`)
    ZeroMq,
    /// nanomsg-family sockets (NNG)
    Nanomsg,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::ZeroMq => write!(f, "zeromq"),
            BackendKind::Nanomsg => write!(f, "nanomsg"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zeromq" | "zmq" => Ok(BackendKind::ZeroMq),
            "nanomsg" | "nng" => Ok(BackendKind::Nanomsg),
            other => Err(RelayError::Config(format!("unknown backend '{}'", other))),
        }
    }
}

/// Identifies the allocator a unit's bytes came from, and so the routine
/// that must release them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Plain heap allocation, freed by the global allocator
    HeapOwned,
    /// Buffer handed out by a transport backend, released through that backend
    BackendOwned(BackendKind),
}

/// A byte buffer that can back a [`Unit`].
///
/// The release path is the buffer type's `Drop` impl, so a unit can only be
/// released through the routine of the backend that produced it. Two buffer
/// types never share a [`Tracker`](crate::tracker::Tracker), since the
/// tracker is generic over exactly one of them.
pub trait UnitBuffer: Deref<Target = [u8]> {
    /// Ownership tag shared by every buffer of this type
    const OWNERSHIP: Ownership;
}

impl UnitBuffer for Bytes {
    const OWNERSHIP: Ownership = Ownership::HeapOwned;
}

impl UnitBuffer for zmq::Message {
    const OWNERSHIP: Ownership = Ownership::BackendOwned(BackendKind::ZeroMq);
}

impl UnitBuffer for nng::Message {
    const OWNERSHIP: Ownership = Ownership::BackendOwned(BackendKind::Nanomsg);
}

mod unit;
pub use unit::*;

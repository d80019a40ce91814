//! # Push/pull transports
//!
//! One capability interface, [`Transport`], with two backends:
//!
//! - [`ZmqTransport`]: ZeroMQ `PUSH`/`PULL` sockets
//! - [`NngTransport`]: NNG `push0`/`pull0` sockets (nanomsg wire protocol)
//!
//! A push endpoint connects and only sends; a pull endpoint binds and only
//! receives. Every received message is expected to carry the same
//! `00 00 00 01` marker as the framed file format, with the classification
//! byte at offset 4.
//!
//! Each backend hands out its own message type, and a unit keeps that
//! message until it is released. Since [`Tracker`](crate::tracker::Tracker)
//! is generic over the message type, units from one backend can never be
//! released through the other's routine.
//!
//! ```rust,no_run
//! use nalrelay::format::transport::{Endpoint, Role, Transport, ZmqTransport};
//!
//! # fn main() -> nalrelay::Result<()> {
//! let endpoint = Endpoint::parse("tcp://127.0.0.1:5555")?;
//! let mut pull = ZmqTransport::connect_or_bind(&endpoint, Role::Pull)?;
//! while let Some(unit) = pull.receive_unit()? {
//!     println!("nal type {} ({} bytes)", unit.nal_type(), unit.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;
use url::Url;

use crate::av::{BackendKind, Unit, UnitBuffer};
use crate::codec::h264::Observer;
use crate::error::{RelayError, Result};

mod nanomsg;
mod zeromq;

pub use self::nanomsg::NngTransport;
pub use self::zeromq::ZmqTransport;

/// Address schemes both backends understand.
const SUPPORTED_SCHEMES: [&str; 4] = ["tcp", "ipc", "inproc", "ws"];

/// Which end of the pipeline a socket is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Send-only, connects to its peer
    Push,
    /// Receive-only, binds its address
    Pull,
}

impl Role {
    pub fn from_receiver(as_receiver: bool) -> Self {
        if as_receiver {
            Role::Pull
        } else {
            Role::Push
        }
    }

    pub fn is_receiver(&self) -> bool {
        *self == Role::Pull
    }
}

/// A validated transport address such as `tcp://127.0.0.1:5555` or
/// `ipc:///tmp/video.sock`.
///
/// The address string is kept verbatim and handed to the backend as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
    scheme: String,
}

impl Endpoint {
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        let url = Url::parse(address)
            .map_err(|e| RelayError::Config(format!("invalid endpoint '{}': {}", address, e)))?;
        if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            return Err(RelayError::Config(format!(
                "unsupported endpoint scheme '{}' in '{}'",
                url.scheme(),
                address
            )));
        }
        Ok(Self {
            raw: address.to_string(),
            scheme: url.scheme().to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A push or pull socket endpoint.
pub trait Transport: Sized {
    /// Buffer type handed out by `recv_message`
    type Message: UnitBuffer;

    /// Backend this implementation talks to
    const KIND: BackendKind;

    /// Connects a push endpoint or binds a pull endpoint.
    ///
    /// Failure is [`RelayError::TransportEstablish`]; callers treat it as a
    /// startup failure and do not retry.
    fn connect_or_bind(endpoint: &Endpoint, role: Role) -> Result<Self>;

    fn role(&self) -> Role;

    /// Bounds how long a receive may block. `None` blocks forever.
    fn set_receive_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;

    /// Best-effort send; failures are logged and dropped. Only valid on a
    /// push endpoint.
    fn send_bytes(&mut self, buf: &[u8]);

    /// Blocks for one raw message. `Ok(None)` means the receive timed out;
    /// transient failures are [`RelayError::TransportReceive`].
    fn recv_message(&mut self) -> Result<Option<Self::Message>>;

    /// Diagnostic hook called for every received unit.
    fn observer(&mut self) -> &mut dyn Observer;

    /// Replaces the diagnostic hook.
    fn set_observer(&mut self, observer: Box<dyn Observer>);

    /// Returns a message to its backend.
    fn release(message: Self::Message) {
        drop(message);
    }

    /// Receives one message and wraps it as a unit.
    ///
    /// Returns `Ok(None)` for a zero-length message (keepalive), a timeout,
    /// or a transient receive error, which is logged. A message without the
    /// start marker is released and reported as [`RelayError::Framing`].
    fn receive_unit(&mut self) -> Result<Option<Unit<Self::Message>>> {
        debug_assert!(self.role().is_receiver(), "receive on a {:?} socket", self.role());
        let message = match self.recv_message() {
            Ok(Some(message)) => message,
            Ok(None) => {
                log::debug!("{} receive timed out", Self::KIND);
                return Ok(None);
            }
            Err(RelayError::TransportReceive(reason)) => {
                log::warn!("{} error receiving: {}", Self::KIND, reason);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if message.is_empty() {
            log::debug!("{} keepalive", Self::KIND);
            Self::release(message);
            return Ok(None);
        }

        let unit = Unit::from_buffer(message).map_err(|e| {
            log::error!("{} dropped malformed message: {}", Self::KIND, e);
            e
        })?;
        let size = unit.len();
        self.observer().on_classified(unit.header(), size);
        Ok(Some(unit))
    }
}

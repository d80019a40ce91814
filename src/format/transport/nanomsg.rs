use nng::options::{Options, RecvTimeout};
use nng::{Protocol, Socket};
use std::time::Duration;

use super::{Endpoint, Role, Transport};
use crate::av::{BackendKind, Unit, UnitBuffer};
use crate::codec::h264::{NoopObserver, Observer};
use crate::error::{RelayError, Result};
use crate::format::{UnitSink, UnitSource};

/// NNG push0/pull0 endpoint.
///
/// Received units keep the `nng::Message` the library allocated; it goes
/// back to NNG when the unit is dropped.
pub struct NngTransport {
    socket: Socket,
    role: Role,
    observer: Box<dyn Observer>,
}

impl NngTransport {
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.set_observer(Box::new(observer));
        self
    }
}

impl Transport for NngTransport {
    type Message = nng::Message;
    const KIND: BackendKind = BackendKind::Nanomsg;

    fn connect_or_bind(endpoint: &Endpoint, role: Role) -> Result<Self> {
        let protocol = match role {
            Role::Push => Protocol::Push0,
            Role::Pull => Protocol::Pull0,
        };
        let socket = Socket::new(protocol).map_err(|e| {
            RelayError::TransportEstablish(format!("nanomsg socket creation failed: {}", e))
        })?;

        // Dialing in the background lets the push side start before its peer.
        let established = match role {
            Role::Pull => socket.listen(endpoint.as_str()),
            Role::Push => socket.dial_async(endpoint.as_str()),
        };
        established.map_err(|e| {
            RelayError::TransportEstablish(format!("nanomsg bind/connect to {} failed: {}", endpoint, e))
        })?;
        log::debug!("nanomsg {:?} socket ready on {}", role, endpoint);

        Ok(Self {
            socket,
            role,
            observer: Box::new(NoopObserver),
        })
    }

    fn role(&self) -> Role {
        self.role
    }

    fn set_receive_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.socket
            .set_opt::<RecvTimeout>(timeout)
            .map_err(|e| RelayError::Config(format!("nanomsg receive timeout: {}", e)))
    }

    fn send_bytes(&mut self, buf: &[u8]) {
        debug_assert!(!self.role.is_receiver(), "send on a pull socket");
        if let Err((_, e)) = self.socket.send(buf) {
            log::warn!("nanomsg send of {} bytes failed: {}", buf.len(), e);
        }
    }

    fn recv_message(&mut self) -> Result<Option<nng::Message>> {
        match self.socket.recv() {
            Ok(message) => Ok(Some(message)),
            Err(nng::Error::TimedOut) => Ok(None),
            Err(e) => Err(RelayError::TransportReceive(e.to_string())),
        }
    }

    fn observer(&mut self) -> &mut dyn Observer {
        &mut *self.observer
    }

    fn set_observer(&mut self, observer: Box<dyn Observer>) {
        self.observer = observer;
    }
}

impl UnitSource for NngTransport {
    type Buffer = nng::Message;

    fn next_unit(&mut self) -> Result<Option<Unit<nng::Message>>> {
        self.receive_unit()
    }

    fn skips_priming(&self) -> bool {
        true
    }
}

impl UnitSink for NngTransport {
    fn send_unit<B: UnitBuffer>(&mut self, unit: &Unit<B>) -> Result<()> {
        self.send_bytes(unit.as_bytes());
        Ok(())
    }
}

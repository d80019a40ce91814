use std::time::Duration;

use super::{Endpoint, Role, Transport};
use crate::av::{BackendKind, Unit, UnitBuffer};
use crate::codec::h264::{NoopObserver, Observer};
use crate::error::{RelayError, Result};
use crate::format::{UnitSink, UnitSource};

/// ZeroMQ push/pull endpoint with its own context.
pub struct ZmqTransport {
    socket: zmq::Socket,
    _context: zmq::Context,
    role: Role,
    observer: Box<dyn Observer>,
}

impl ZmqTransport {
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.set_observer(Box::new(observer));
        self
    }
}

impl Transport for ZmqTransport {
    type Message = zmq::Message;
    const KIND: BackendKind = BackendKind::ZeroMq;

    fn connect_or_bind(endpoint: &Endpoint, role: Role) -> Result<Self> {
        let context = zmq::Context::new();
        let socket_type = match role {
            Role::Push => zmq::PUSH,
            Role::Pull => zmq::PULL,
        };
        let socket = context.socket(socket_type).map_err(|e| {
            RelayError::TransportEstablish(format!("zeromq socket creation failed: {}", e))
        })?;

        let established = match role {
            Role::Pull => socket.bind(endpoint.as_str()),
            Role::Push => socket.connect(endpoint.as_str()),
        };
        established.map_err(|e| {
            let verb = if role.is_receiver() { "bind to" } else { "connect to" };
            RelayError::TransportEstablish(format!(
                "zeromq could not {} {}: {} ({:?})",
                verb, endpoint, e, e
            ))
        })?;
        log::debug!("zeromq {:?} socket ready on {}", role, endpoint);

        Ok(Self {
            socket,
            _context: context,
            role,
            observer: Box::new(NoopObserver),
        })
    }

    fn role(&self) -> Role {
        self.role
    }

    fn set_receive_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let millis = match timeout {
            Some(t) => i32::try_from(t.as_millis()).unwrap_or(i32::MAX),
            None => -1,
        };
        self.socket
            .set_rcvtimeo(millis)
            .map_err(|e| RelayError::Config(format!("zeromq receive timeout: {}", e)))
    }

    fn send_bytes(&mut self, buf: &[u8]) {
        debug_assert!(!self.role.is_receiver(), "send on a pull socket");
        if let Err(e) = self.socket.send(buf, 0) {
            log::warn!("zeromq send of {} bytes failed: {} ({:?})", buf.len(), e, e);
        }
    }

    fn recv_message(&mut self) -> Result<Option<zmq::Message>> {
        match self.socket.recv_msg(0) {
            Ok(message) => Ok(Some(message)),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(RelayError::TransportReceive(format!("{} ({:?})", e, e))),
        }
    }

    fn observer(&mut self) -> &mut dyn Observer {
        &mut *self.observer
    }

    fn set_observer(&mut self, observer: Box<dyn Observer>) {
        self.observer = observer;
    }
}

impl UnitSource for ZmqTransport {
    type Buffer = zmq::Message;

    fn next_unit(&mut self) -> Result<Option<Unit<zmq::Message>>> {
        self.receive_unit()
    }

    fn skips_priming(&self) -> bool {
        true
    }
}

impl UnitSink for ZmqTransport {
    fn send_unit<B: UnitBuffer>(&mut self, unit: &Unit<B>) -> Result<()> {
        self.send_bytes(unit.as_bytes());
        Ok(())
    }
}

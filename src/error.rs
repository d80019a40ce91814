use std::num::ParseIntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Framing(String),

    #[error("truncated stream: {0}")]
    TruncatedStream(String),

    #[error("transport establish error: {0}")]
    TransportEstablish(String),

    #[error("transport receive error: {0}")]
    TransportReceive(String),

    #[error("protocol violation: nal type {0} received while accumulating headers")]
    ProtocolViolation(u8),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

pub type Result<T> = std::result::Result<T, RelayError>;

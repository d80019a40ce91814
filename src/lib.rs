#![doc(html_root_url = "https://docs.rs/nalrelay/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # nalrelay - H.264 NAL unit re-framer and push/pull relay
//!
//! `nalrelay` sits between a process that produces an H.264 elementary
//! stream and a process that consumes it. It reads length-prefixed NAL
//! units, sorts header units (SEI, SPS, PPS) from frame units, batches them,
//! and forwards them over a ZeroMQ or NNG push/pull socket, or writes them
//! back out in the same framed format.
//!
//! ## Framed format
//!
//! ```text
//! 00 00 00 01 | length (u32, big-endian) | payload
//! ```
//!
//! Payload byte 0 is the NAL header byte; its low five bits give the unit
//! type. Messages on the wire carry the same `00 00 00 01` prefix, so the
//! classification byte always sits at offset 4.
//!
//! ## File to socket
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use nalrelay::codec::h264::IntervalObserver;
//! use nalrelay::format::{Endpoint, Role, Transport, UnitReader, ZmqTransport};
//! use nalrelay::relay::relay_file;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = BufReader::new(File::open("capture.nal")?);
//! let mut reader = UnitReader::new(file).with_observer(IntervalObserver::new());
//!
//! let endpoint = Endpoint::parse("tcp://127.0.0.1:5555")?;
//! let mut push = ZmqTransport::connect_or_bind(&endpoint, Role::Push)?;
//!
//! let stats = relay_file(&mut reader, &mut push)?;
//! println!("sent {} units", stats.units);
//! # Ok(())
//! # }
//! ```
//!
//! ## Socket to file
//!
//! ```rust,no_run
//! use std::fs::File;
//! use nalrelay::format::{Endpoint, NngTransport, Role, Transport, UnitWriter};
//! use nalrelay::relay::{relay_stream, Shutdown};
//! use nalrelay::tracker::HeaderMode;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = Endpoint::parse("ipc:///tmp/video.sock")?;
//! let pull = NngTransport::connect_or_bind(&endpoint, Role::Pull)?;
//! let mut writer = UnitWriter::new(File::create("out.nal")?);
//!
//! relay_stream(pull, &mut writer, HeaderMode::Set, &Shutdown::new())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `av`: the [`Unit`](av::Unit) record and buffer ownership types
//! - `codec`: NAL header classification and the diagnostic observer hook
//! - `format`: the length-prefixed framing codec and the push/pull transports
//! - `tracker`: header/frame accumulation state machine
//! - `relay`: file and stream relay loops
//! - `config`: settings from `config.toml` and `NALRELAY_*` variables
//! - `error`: error type and `Result` alias

/// Unit record and buffer ownership
pub mod av;

/// NAL header classification
pub mod codec;

/// Error types and utilities
pub mod error;

/// Framing codec and transport backends
pub mod format;

/// Header/frame accumulation
pub mod tracker;

/// Relay loops
pub mod relay;

/// Configuration module
pub mod config;

pub use av::{BackendKind, Ownership, Unit, UnitBuffer};
pub use error::{RelayError, Result};
pub use tracker::{HeaderMode, Tracker};

//! Reads a length-prefixed NAL file and pushes it to the configured endpoint.
//!
//! ```text
//! NALRELAY_BACKEND=nanomsg cargo run --example file_to_push -- capture.nal
//! ```

use std::fs::File;
use std::io::BufReader;
use std::process;

use nalrelay::codec::h264::IntervalObserver;
use nalrelay::config;
use nalrelay::format::{Endpoint, NngTransport, Role, Transport, UnitReader, ZmqTransport};
use nalrelay::relay::{relay_file, RelayStats};
use nalrelay::{BackendKind, Result};

fn push_file<T: Transport + nalrelay::format::UnitSink>(
    endpoint: &Endpoint,
    reader: &mut UnitReader<BufReader<File>>,
) -> Result<RelayStats> {
    let mut push = match T::connect_or_bind(endpoint, Role::Push) {
        Ok(push) => push,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };
    relay_file(reader, &mut push)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: file_to_push <input.nal>");
            process::exit(2);
        }
    };

    let config = config::get();
    let endpoint = config.push_endpoint()?;
    println!("Pushing {} to {} over {}", path, endpoint, config.backend);

    let file = BufReader::new(File::open(&path)?);
    let mut reader = UnitReader::new(file).with_observer(IntervalObserver::new());

    let stats = match config.backend {
        BackendKind::ZeroMq => push_file::<ZmqTransport>(&endpoint, &mut reader)?,
        BackendKind::Nanomsg => push_file::<NngTransport>(&endpoint, &mut reader)?,
    };
    println!("Sent {} units in {} batches", stats.units, stats.flushes);
    Ok(())
}

//! Binds the configured pull endpoint and writes every received unit to a
//! length-prefixed NAL file.
//!
//! ```text
//! NALRELAY_RECV_TIMEOUT_MS=500 cargo run --example pull_to_file -- out.nal
//! ```
//!
//! Stops after `NALRELAY_IDLE_LIMIT` consecutive empty receives (needs a
//! receive timeout), or runs until killed.

use std::fs::File;
use std::io::BufWriter;
use std::process;

use nalrelay::codec::h264::IntervalObserver;
use nalrelay::config::{self, Config};
use nalrelay::format::{Endpoint, NngTransport, Role, Transport, UnitSource, UnitWriter, ZmqTransport};
use nalrelay::relay::{relay_stream, RelayStats, Shutdown};
use nalrelay::{BackendKind, Result, Unit};

/// Counts consecutive empty receives and fires the shutdown token.
struct IdleWatch<T> {
    inner: T,
    idle: u32,
    limit: Option<u32>,
    shutdown: Shutdown,
}

impl<T: Transport> UnitSource for IdleWatch<T> {
    type Buffer = T::Message;

    fn next_unit(&mut self) -> Result<Option<Unit<T::Message>>> {
        let unit = self.inner.receive_unit()?;
        match (&unit, self.limit) {
            (Some(_), _) => self.idle = 0,
            (None, Some(limit)) => {
                self.idle += 1;
                if self.idle >= limit {
                    log::info!("no units for {} receives, stopping", self.idle);
                    self.shutdown.trigger();
                }
            }
            (None, None) => {}
        }
        Ok(unit)
    }

    fn skips_priming(&self) -> bool {
        true
    }
}

fn pull_to<T: Transport>(
    config: &Config,
    endpoint: &Endpoint,
    writer: &mut UnitWriter<BufWriter<File>>,
    limit: Option<u32>,
) -> Result<RelayStats> {
    let mut pull = match T::connect_or_bind(endpoint, Role::Pull) {
        Ok(pull) => pull,
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    };
    pull.set_receive_timeout(config.recv_timeout())?;
    pull.set_observer(Box::new(IntervalObserver::new()));

    let shutdown = Shutdown::new();
    let source = IdleWatch {
        inner: pull,
        idle: 0,
        limit,
        shutdown: shutdown.clone(),
    };
    relay_stream(source, writer, config.header_mode, &shutdown)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: pull_to_file <output.nal>");
            process::exit(2);
        }
    };
    let limit = match std::env::var("NALRELAY_IDLE_LIMIT") {
        Ok(v) => Some(v.parse()?),
        Err(_) => None,
    };

    let config = config::get();
    let endpoint = config.pull_endpoint()?;
    println!(
        "Pulling from {} over {} ({} header mode) into {}",
        endpoint, config.backend, config.header_mode, path
    );

    let mut writer = UnitWriter::new(BufWriter::new(File::create(&path)?));
    let stats = match config.backend {
        BackendKind::ZeroMq => pull_to::<ZmqTransport>(&config, &endpoint, &mut writer, limit)?,
        BackendKind::Nanomsg => pull_to::<NngTransport>(&config, &endpoint, &mut writer, limit)?,
    };
    println!("Wrote {} units in {} batches", stats.units, stats.flushes);
    Ok(())
}

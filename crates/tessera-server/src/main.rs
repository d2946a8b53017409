//! The Tessera sync server binary.
//!
//! Loads `config.ron`, applies command-line overrides, installs logging, and
//! runs the fixed-rate tick loop. Frames leave through an in-process channel
//! that stands in for the connection layer.
//!
//! Run with: `cargo run -p tessera-server -- --ticks 100`

use std::process::ExitCode;
use std::thread;
use std::time::Instant;

use clap::Parser;
use crossbeam_channel::Receiver;
use tessera_config::{CliArgs, Config, default_config_dir};
use tessera_net::{ChannelTransport, FRAME_HEADER_LEN, OutgoingFrame};
use tessera_server::{SyncServer, TickSchedule};
use tessera_voxel::MemoryBlockStore;
use tracing::info;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    tessera_log::init_logging(Some(&log_dir), config.debug.log_to_file, Some(&config));

    info!(
        "Tessera sync server: {}:{} at {} Hz",
        config.network.bind_address, config.network.port, config.sync.tick_rate_hz
    );

    let (transport, frames) = ChannelTransport::unbounded();
    let max_payload = config.network.max_payload_size as usize;
    let drain = match thread::Builder::new()
        .name("frame-drain".to_string())
        .spawn(move || drain_frames(frames, max_payload))
    {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start frame drain thread: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut server = SyncServer::new(transport, MemoryBlockStore::new());
    run(&mut server, &config, args.ticks);

    // Dropping the server closes the channel and lets the drain thread finish.
    drop(server);
    match drain.join() {
        Ok(sent) => {
            info!("Shut down after handing off {sent} frames");
            ExitCode::SUCCESS
        }
        Err(_) => {
            tracing::error!("Frame drain thread panicked");
            ExitCode::FAILURE
        }
    }
}

/// Runs ticks at the configured rate until `max_ticks` have elapsed, or
/// forever when no limit is given.
fn run(
    server: &mut SyncServer<ChannelTransport, MemoryBlockStore>,
    config: &Config,
    max_ticks: Option<u64>,
) {
    let mut schedule = TickSchedule::with_tick_rate(config.sync.tick_rate_hz);
    let mut last = Instant::now();

    loop {
        let now = Instant::now();
        let due = schedule.accumulate(now - last);
        last = now;

        for _ in 0..due {
            let report = server.tick();
            if !report.flush.is_empty() {
                tracing::debug!(?report, "tick");
            }
        }

        if max_ticks.is_some_and(|max| schedule.total_ticks() >= max) {
            info!("Reached {} ticks, stopping", schedule.total_ticks());
            return;
        }

        thread::sleep(schedule.until_next_tick());
    }
}

/// Consumes outgoing frames until every sender is gone. Returns how many
/// frames were seen.
fn drain_frames(frames: Receiver<OutgoingFrame>, max_payload: usize) -> u64 {
    let mut count = 0;
    for (client, frame) in frames {
        let payload = frame.len().saturating_sub(FRAME_HEADER_LEN);
        if payload > max_payload {
            tracing::warn!(?client, payload, max_payload, "dropping oversized frame");
            continue;
        }
        tracing::trace!(?client, len = frame.len(), tag = ?frame.first(), "frame out");
        count += 1;
    }
    count
}

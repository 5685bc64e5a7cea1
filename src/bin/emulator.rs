//! Fobos Controller Emulator Binary
//!
//! Serves an emulated controller over TCP for bench testing.

use clap::Parser;
use fobos_link::emulator::{ControllerEmulator, EmulatorServer, DEFAULT_FIRMWARE};
use fobos_link::protocol::defaults;
use tracing_subscriber::{fmt, EnvFilter};

/// Fobos controller emulator
#[derive(Parser, Debug)]
#[command(name = "fobos-emulator")]
#[command(about = "Emulated Fobos controller speaking the PC link protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value_t = format!("127.0.0.1:{}", defaults::PORT))]
    listen: String,

    /// Firmware string reported to the PC
    #[arg(short, long, default_value = DEFAULT_FIRMWARE)]
    firmware: String,

    /// Report the machine as not ready (scans are refused)
    #[arg(long)]
    not_ready: bool,

    /// Report an obstacle in the C-arm's path
    #[arg(long)]
    barrier: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fobos_link=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Fobos emulator v{}", fobos_link::VERSION);
    tracing::info!("Firmware: {}", args.firmware);

    let mut emulator = ControllerEmulator::new();
    emulator.set_firmware(args.firmware);
    emulator.set_ready(!args.not_ready);
    emulator.set_barrier(args.barrier);

    let server = match EmulatorServer::bind(&args.listen, emulator) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    server.wait();
    tracing::info!("Emulator stopped");
}

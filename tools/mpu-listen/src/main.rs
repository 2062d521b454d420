//! mpu-listen - Receive MPU-6050 telemetry datagrams
//!
//! Host counterpart of the `mpu-osc` firmware. Each datagram carries one raw
//! 14-byte measurement block; the listener decodes it, keeps a rolling window
//! of normalized traces, and prints per-window summaries.

mod trace;

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use imu_telemetry::sample::CHANNEL_NAMES;
use imu_telemetry::Sample;
use log::{info, warn};
use trace::{Traces, TRACES};

/// Receive and summarize MPU-6050 UDP telemetry
#[derive(Parser, Debug)]
#[command(name = "mpu-listen")]
#[command(version)]
struct Args {
    /// Local address to listen on
    #[arg(short, long, default_value = "0.0.0.0:12345")]
    bind: String,

    /// Points kept per trace; a summary is printed every window
    #[arg(short, long, default_value = "100")]
    window: usize,

    /// Stop after this many valid packets (0 = unlimited)
    #[arg(short = 'n', long, default_value = "0")]
    count: u64,

    /// Print every packet's raw channels instead of window summaries
    #[arg(long)]
    raw: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("installing Ctrl+C handler")?;

    let socket =
        UdpSocket::bind(&args.bind).with_context(|| format!("binding {}", args.bind))?;
    // Periodic wake-up so Ctrl+C is noticed without traffic
    socket
        .set_read_timeout(Some(Duration::from_millis(200)))
        .context("setting read timeout")?;

    info!("Listening on {} (window {})", args.bind, args.window);
    if args.raw {
        println!("{}", CHANNEL_NAMES.map(|n| format!("{:>6}", n)).join(" "));
    }

    let mut traces = Traces::new(args.window);
    let mut received: u64 = 0;
    let mut rejected: u64 = 0;
    // Larger than a block so oversize datagrams are detected, not truncated
    let mut buf = [0u8; 64];

    while running.load(Ordering::SeqCst) {
        if args.count > 0 && received >= args.count {
            break;
        }

        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(packet) => packet,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(e) => return Err(e).context("receiving datagram"),
        };

        let Some(sample) = Sample::from_bytes(&buf[..len]) else {
            rejected += 1;
            warn!("Ignoring {}-byte datagram from {}", len, from);
            continue;
        };

        received += 1;
        traces.push(&sample);

        if args.raw {
            println!("{}", sample);
        } else if received % traces.window() as u64 == 0 {
            print_summary(&traces, received);
        }
    }

    info!("Received {} packet(s), rejected {}", received, rejected);
    Ok(())
}

fn print_summary(traces: &Traces, received: u64) {
    println!("--- packet {} ---", received);
    for (def, summary) in TRACES.iter().zip(traces.summaries()) {
        let (lo, hi) = def.range();
        println!(
            "{:<10} {:>5}  min {:+.3}  last {:+.3}  max {:+.3}  [{:+.1}, {:+.1}]",
            def.title, summary.key, summary.min, summary.last, summary.max, lo, hi
        );
    }
}

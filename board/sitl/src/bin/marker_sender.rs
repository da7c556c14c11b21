//! Bench source for the marker protocol.
//!
//! Sends the four markers round-robin, `"<prefix><n>: X=.. Y=.. Z=.."`, with
//! heights taken from a fixed gesture, so the SITL host can be driven without
//! a motion-capture system.
//!
//! Usage: cargo run -p sitl --bin marker_sender -- --gesture forward

use std::{
    net::{SocketAddr, UdpSocket},
    thread,
    time::Duration,
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{debug, info};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Hover,
    Forward,
    Backward,
    Left,
    Right,
    Ascend,
    Descend,
    YawLeft,
    YawRight,
}

impl Gesture {
    /// Marker heights (z) for markers 1..4, in millimetres.
    fn heights(self) -> [f64; 4] {
        match self {
            Gesture::Hover => [1000.0, 1000.0, 1000.0, 1000.0],
            Gesture::Forward => [1000.0, 1030.0, 1000.0, 1030.0],
            Gesture::Backward => [1030.0, 1000.0, 1030.0, 1000.0],
            Gesture::Right => [1000.0, 1000.0, 1030.0, 1030.0],
            Gesture::Left => [1030.0, 1030.0, 1000.0, 1000.0],
            Gesture::Ascend => [1800.0, 1800.0, 1800.0, 1800.0],
            Gesture::Descend => [0.0, 1000.0, 1000.0, 1000.0],
            Gesture::YawLeft => [1100.0, 1100.0, 1000.0, 1000.0],
            Gesture::YawRight => [1000.0, 1000.0, 1100.0, 1100.0],
        }
    }
}

/// Send marker telemetry to a SITL host.
#[derive(Parser, Debug)]
#[command(name = "marker_sender", version, about)]
struct Args {
    /// Address the SITL host listens on
    #[arg(long, default_value = "127.0.0.1:5005")]
    target: SocketAddr,

    /// Prefix to put in front of every message
    #[arg(long, default_value = telemetry::DEFAULT_PREFIX)]
    prefix: String,

    #[arg(long, value_enum, default_value_t = Gesture::Hover)]
    gesture: Gesture,

    /// Messages per second
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    rate: u32,

    /// Stop after this many messages
    #[arg(long)]
    count: Option<u64>,
}

fn marker_message(prefix: &str, marker: usize, z: f64) -> String {
    // spread the markers out in the horizontal plane; only z drives control
    let x = if marker % 2 == 0 { -150.0 } else { 150.0 };
    let y = if marker < 2 { 100.0 } else { -100.0 };
    format!("{}{}: X={:.3} Y={:.3} Z={:.3}", prefix, marker + 1, x, y, z)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind sender socket")?;
    socket.set_broadcast(true)?;

    let heights = args.gesture.heights();
    let interval = Duration::from_secs(1) / args.rate;
    info!("Sending {:?} to {} at {} Hz", args.gesture, args.target, args.rate);

    let mut sent = 0u64;
    while args.count.map_or(true, |count| sent < count) {
        let marker = (sent % 4) as usize;
        let message = marker_message(&args.prefix, marker, heights[marker]);
        socket
            .send_to(message.as_bytes(), args.target)
            .with_context(|| format!("Failed to send to {}", args.target))?;
        debug!("Sent {:?}", message);

        sent += 1;
        thread::sleep(interval);
    }

    info!("Sent {} messages", sent);
    Ok(())
}

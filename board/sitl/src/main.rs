use std::{
    net::IpAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use autopilot::{DecisionEngine, Tuning, Vehicle};
use clap::Parser;
use log::{info, warn};
use telemetry::{ListenerConfig, MarkerReader, TelemetryListener};

use airframe::{Airframe, AirframeConfig};
use stabilizer::Stabilizer;

mod airframe;
mod stabilizer;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);
const STALE_AFTER: Duration = Duration::from_secs(1);

/// Fly a simulated airframe from motion-capture marker telemetry.
#[derive(Parser, Debug)]
#[command(name = "sitl", version, about)]
struct Args {
    /// UDP port the marker telemetry arrives on
    #[arg(long, default_value_t = telemetry::DEFAULT_PORT)]
    port: u16,

    /// Local address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Prefix every marker message starts with
    #[arg(long, default_value = telemetry::DEFAULT_PREFIX)]
    prefix: String,

    /// Control ticks per second
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=1000))]
    rate: u32,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    duration: Option<f64>,
}

enum State {
    Running,
    Stopping,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl-C handler")?;

    let tuning = Tuning::default();
    let mut airframe = Airframe::new(
        AirframeConfig {
            tilt_rate: tuning.tilt_rate,
            ..Default::default()
        },
        Stabilizer::default(),
    );
    let mut vehicle = Vehicle::new(DecisionEngine::new(tuning).context("Invalid tuning")?);
    info!("Decision tuning: {:?}", vehicle.engine().tuning());

    let config = ListenerConfig {
        bind_addr: args.bind,
        port: args.port,
        prefix: args.prefix.clone(),
    };
    let listener = TelemetryListener::start(config)
        .with_context(|| format!("Failed to start telemetry listener on port {}", args.port))?;
    let markers = listener.reader();
    info!("Listening for marker telemetry on {}", listener.local_addr());

    let run_for = args
        .duration
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("Invalid --duration")?;
    let minimum_elapsed_duration = Duration::from_secs(1) / args.rate;

    let started = Instant::now();
    let mut last_update_time = started;
    let mut last_report_time = started;
    let mut state = State::Running;
    loop {
        match state {
            State::Running => {
                let out_of_time = run_for.is_some_and(|limit| started.elapsed() >= limit);
                if !running.load(Ordering::SeqCst) || out_of_time {
                    state = State::Stopping;
                    continue;
                }

                let now = Instant::now();
                let dt = now.duration_since(last_update_time);
                if dt < minimum_elapsed_duration {
                    std::thread::sleep(minimum_elapsed_duration - dt);
                    continue;
                }
                last_update_time = now;

                vehicle.update(markers.snapshot(), dt.as_secs_f64(), &mut airframe);

                if now.duration_since(last_report_time) >= REPORT_INTERVAL {
                    last_report_time = now;
                    report(&vehicle, &airframe, &markers, &listener);
                }
            }
            State::Stopping => {
                info!("Stopping after {} ticks", vehicle.ticks());
                break;
            }
        }
    }

    let stats = listener.stats();
    listener.stop().context("Failed to stop telemetry listener")?;
    info!("Telemetry: {:?}", stats);
    Ok(())
}

fn report(
    vehicle: &Vehicle,
    airframe: &Airframe,
    markers: &MarkerReader,
    listener: &TelemetryListener,
) {
    match markers.age() {
        None => warn!("No marker telemetry received yet"),
        Some(age) if age > STALE_AFTER => {
            warn!("Marker telemetry is {:.1?} old, holding last positions", age)
        }
        Some(_) => {}
    }

    let command = vehicle.last_command();
    let attitude = airframe.attitude();
    let position = airframe.position();
    info!(
        "Position: ({:.2}, {:.2}, {:.2}) m, altitude {:.2} m",
        position.x,
        position.y,
        position.z,
        airframe.altitude()
    );
    info!(
        "Attitude: roll {:.1}, pitch {:.1}, yaw {:.1} deg{}",
        attitude.roll,
        attitude.pitch,
        attitude.yaw,
        if airframe.is_stabilizing() { " (stabilizing)" } else { "" }
    );
    info!(
        "Command: movement ({:.1}, {:.1}), lift {:.1}, yaw rate {:.1}, tilt ({:.1}, {:.1})",
        command.movement.x,
        command.movement.y,
        command.lift,
        command.yaw_rate,
        command.target_tilt_x,
        command.target_tilt_z
    );

    let stats = listener.stats();
    info!(
        "Telemetry: {} decoded, {} dropped, {} label mismatches, {} receive errors",
        stats.decoded, stats.decode_errors, stats.label_mismatches, stats.receive_errors
    );
}

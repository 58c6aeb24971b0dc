//! # Track Replay
//!
//! Replays a recorded track feed through the maintenance engine.
//!
//! The recording's timestamps lie decades in the past; the engine's clock
//! offset keeps promotion and eviction on the feed's own timebase. Track `k`
//! stops reporting after step `10 * k`, so tracks are dropped one by one.
//!
//! Usage: `track_replay [config.toml]`. Set `RUST_LOG=debug` for detail.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;
use warden_maintainer::{EntityMaintenanceEngine, MaintainerConfig, Observation, ReportKind};
use warden_sync::{Control, ThreadOfControl};

const TRACKS: u32 = 5;
const STEPS: u32 = 60;
const STEP: Duration = Duration::from_millis(50);

/// Start of the recording, seconds since the Unix epoch.
const RECORDING_START: f64 = 315_532_800.0;

/// Position of a simulated track.
#[derive(Clone, Copy, Debug)]
struct Position {
    x: f64,
    y: f64,
}

fn demo_config() -> MaintainerConfig {
    MaintainerConfig {
        hits_before_promote: 3,
        misses_before_drop: 2,
        cycle_duration_secs: 0.2,
        maintenance_period_secs: 0.1,
        ..MaintainerConfig::default()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MaintainerConfig::from_file(path)?,
        None => demo_config(),
    };
    info!(?config, "configuration loaded");

    let (tx, rx) = crossbeam_channel::unbounded();
    let engine = Arc::new(EntityMaintenanceEngine::new(config, tx)?);
    engine.start_timer()?;

    let producer = {
        let engine = Arc::clone(&engine);
        ThreadOfControl::named("replay", move |control: &Control| {
            for step in 0..STEPS {
                let event_time = RECORDING_START + f64::from(step) * STEP.as_secs_f64();
                for track in 1..=TRACKS {
                    if step >= 10 * track {
                        continue;
                    }
                    let angle = f64::from(step) / 10.0 + f64::from(track);
                    let position = Position {
                        x: angle.cos() * f64::from(track),
                        y: angle.sin() * f64::from(track),
                    };
                    if let Err(err) = engine.observe(Observation::new(track, event_time, position)) {
                        tracing::error!(error = %err, "observation rejected");
                        return;
                    }
                }
                match control.wait_for(STEP) {
                    Ok(true) => {}
                    Ok(false) | Err(_) => return,
                }
            }
        })
    };
    producer.start()?;

    let mut remaining = TRACKS;
    while remaining > 0 {
        let Ok(report) = rx.recv_timeout(Duration::from_secs(10)) else {
            tracing::warn!(remaining, "no report within ten seconds, giving up");
            break;
        };
        match report.kind {
            ReportKind::Promoted => info!(
                track = report.key,
                hits = report.hits,
                x = report.payload.x,
                y = report.payload.y,
                "track confirmed"
            ),
            ReportKind::Dropping => {
                remaining -= 1;
                info!(
                    track = report.key,
                    entity_type = %report.entity_type,
                    last_seen = report.latest_event_time - RECORDING_START,
                    "track dropped"
                );
            }
        }
    }

    producer.cancel()?;
    producer.join()?;
    let status = engine.status()?;
    engine.shutdown()?;

    println!("{status}");
    println!("cycles run: {}", status.cycles);
    Ok(())
}

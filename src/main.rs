//! Boomerang Player - demo session over synthetic streams.
//!
//! Drives three producers against a simulated fixed-rate clock and a
//! stand-in compositor, printing the dispatch rate once per second.

use std::time::{Duration, Instant};

use boomerang_player::video::synthetic_asset;
use boomerang_player::{PlayerConfig, PlayerSession, StreamSource, SyntheticDecoder};

/// Simulated vsync period (~60 Hz).
const TICK_PERIOD: Duration = Duration::from_millis(16);

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Starting Boomerang Player v{}", env!("CARGO_PKG_VERSION"));

    let config = PlayerConfig::default();
    let sources = config
        .streams
        .iter()
        .enumerate()
        .map(|(index, stream)| StreamSource {
            asset: synthetic_asset(
                config.width,
                config.height,
                60,
                stream.cache_range,
                16_667,
                index as u64 + 1,
            ),
            decoder: Box::new(SyntheticDecoder::new(config.width, config.height)),
        })
        .collect();

    let session = PlayerSession::start(&config, sources)?;

    let run_for = Duration::from_secs(5);
    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut last_dispatched = 0u64;

    while started.elapsed() < run_for {
        session.tick();

        // Stand-in compositor: take the completed set, pretend to paint it,
        // report consumption. The wait doubles as the clock period.
        if let Some(set) = session.take_frame_set(TICK_PERIOD) {
            session.frame_consumed(set);
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            let elapsed = last_report.elapsed().as_secs_f64();
            let dispatched = session
                .dispatched()
                .first()
                .map(|(_, count)| *count)
                .unwrap_or(0);
            log::info!(
                "FPS: {:.1} ({} sets composited)",
                (dispatched - last_dispatched) as f64 / elapsed,
                session.completed_sets()
            );
            last_dispatched = dispatched;
            last_report = Instant::now();
        }

        if !session.is_healthy() {
            anyhow::bail!("a producer terminated with a fatal decode error");
        }
    }

    log::info!(
        "Done: {} frame sets over {:?}",
        session.completed_sets(),
        started.elapsed()
    );
    Ok(())
}

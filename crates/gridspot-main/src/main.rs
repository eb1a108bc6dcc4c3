// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! GridSpot - Entry point for the price aggregation daemon
//!
//! Loads configuration, wires the built-in source clients into a
//! [`UnifiedPriceManager`] and runs the refresh and health-check loops.
//! The manager decides per tick whether a network fetch is warranted.

use anyhow::{Context, Result};
use chrono::Utc;
use gridspot_core::UnifiedPriceManager;
use gridspot_sources::builtin_sources;
use gridspot_types::load_config;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "gridspot.toml";
const HEALTH_CHECK_SECS: u64 = 15 * 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with env filter support
    // Respects RUST_LOG environment variable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var("GRIDSPOT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    info!("Starting GridSpot");
    info!("  Interval: {} min", config.interval_minutes);
    info!(
        "  Cache: ttl={} min, max_entries={}, persist={}",
        config.cache.ttl_minutes, config.cache.max_entries, config.cache.persist
    );
    for area in &config.areas {
        info!(
            "  Area {} ({}, {}): sources {:?}",
            area.id,
            area.timezone,
            area.currency,
            area.sources
        );
    }

    let registry = builtin_sources()?;
    let manager = UnifiedPriceManager::new(&config, &registry)?;

    let mut clocks = Vec::new();
    for area in &config.areas {
        clocks.push((
            area.id.clone(),
            gridspot_core::IntervalClock::new(config.interval_minutes, area.tz()?)?,
        ));
    }

    let tick_secs = u64::from(config.interval_minutes) * 60;
    let mut refresh = tokio::time::interval(Duration::from_secs(tick_secs));
    let mut health = tokio::time::interval(Duration::from_secs(HEALTH_CHECK_SECS));

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                for (area_id, clock) in &clocks {
                    match manager.fetch_data(area_id, false).await {
                        Ok(prices) => {
                            let current = prices.price_at(&clock.current_key(Utc::now()));
                            info!(
                                area = %area_id,
                                source = %prices.source,
                                current = ?current,
                                tomorrow = prices.has_tomorrow(),
                                "price data refreshed"
                            );
                        }
                        Err(e) => {
                            warn!(area = %area_id, "refresh failed: {e}");
                        }
                    }
                }
                let stats = manager.cache_stats();
                info!(
                    hits = stats.hits,
                    misses = stats.misses,
                    evictions = stats.evictions,
                    "cache statistics"
                );
            }
            _ = health.tick() => {
                manager.run_health_check(Utc::now()).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, exiting");
                break;
            }
        }
    }

    let stats = manager.cache_stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        "final cache statistics"
    );
    Ok(())
}

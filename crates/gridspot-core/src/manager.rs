// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Unified price manager
//!
//! Orchestrates the whole subsystem: per-area state and locking, fetch
//! decisions, rate limiting, source fallback, normalization, and the
//! snapshot read model. At most one network fetch is in flight per area;
//! concurrent callers wait on the area lock and receive the completed
//! result. A transient failure never produces a user-visible gap while any
//! cached data exists.

use crate::cache::{Cache, CacheStats};
use crate::fetch_decision::{FetchReason, should_fetch};
use crate::interval::IntervalClock;
use crate::price_cache::PriceCacheManager;
use crate::rate_limiter::{SkipReason, should_skip_fetch};
use crate::source::{ChainFetch, PriceSource, SourceChain};
use chrono::{DateTime, NaiveDate, Utc};
use gridspot_types::{
    AreaConfig, FetchConfig, GridspotConfig, GridspotError, IntervalPriceSet, PriceSnapshot,
    Result, apply_display_transform,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ERROR_ALL_SOURCES_EXHAUSTED: &str = "all_sources_exhausted";

/// Per-area mutable coordination state, guarded by the area lock
#[derive(Debug, Default)]
struct AreaFetchState {
    last_fetch: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    /// Special-window start hours already revalidated today
    windows_checked: HashSet<u32>,
    windows_reset_date: Option<NaiveDate>,
}

/// Immutable per-area wiring plus its fetch-state lock
struct AreaRuntime {
    config: AreaConfig,
    clock: IntervalClock,
    chain: SourceChain,
    state: tokio::sync::Mutex<AreaFetchState>,
}

/// Coordinates caching, rate limiting and source fallback for all areas
pub struct UnifiedPriceManager {
    fetch_config: FetchConfig,
    areas: HashMap<String, Arc<AreaRuntime>>,
    cache: Mutex<PriceCacheManager>,
    started_at: DateTime<Utc>,
}

impl std::fmt::Debug for UnifiedPriceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedPriceManager")
            .field("areas", &self.areas.keys().collect::<Vec<_>>())
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl UnifiedPriceManager {
    /// Wire up all configured areas against a registry of source clients.
    /// Unknown source ids are a configuration error.
    pub fn new(
        config: &GridspotConfig,
        registry: &HashMap<String, Arc<dyn PriceSource>>,
    ) -> Result<Self> {
        let mut cache = Cache::new(config.cache.ttl_minutes, config.cache.max_entries);
        if config.cache.persist {
            cache = cache.with_persistence(&config.cache.persist_dir);
        }

        let mut areas = HashMap::new();
        for area in &config.areas {
            let mut sources = Vec::new();
            for id in &area.sources {
                let source = registry.get(id).ok_or_else(|| {
                    GridspotError::Configuration(format!(
                        "area {}: unknown source '{id}'",
                        area.id
                    ))
                })?;
                sources.push(Arc::clone(source));
            }
            let clock = IntervalClock::new(config.interval_minutes, area.tz()?)?;
            areas.insert(
                area.id.clone(),
                Arc::new(AreaRuntime {
                    config: area.clone(),
                    clock,
                    chain: SourceChain::new(sources),
                    state: tokio::sync::Mutex::new(AreaFetchState::default()),
                }),
            );
        }

        Ok(Self {
            fetch_config: config.fetch.clone(),
            areas,
            cache: Mutex::new(PriceCacheManager::new(
                cache,
                config.fetch.completeness_threshold,
            )),
            started_at: Utc::now(),
        })
    }

    /// Current canonical data for an area, fetching only when warranted
    pub async fn fetch_data(&self, area: &str, force_refresh: bool) -> Result<IntervalPriceSet> {
        self.fetch_data_at(area, force_refresh, Utc::now())
            .await
            .map(|(set, _)| set)
    }

    /// Snapshot for the host sensor layer
    pub async fn current_snapshot(&self, area: &str) -> Result<PriceSnapshot> {
        self.snapshot_at(area, Utc::now()).await
    }

    /// Drop cached entries for one area or all; the next read fetches
    pub fn clear_cache(&self, area: Option<&str>) {
        info!(area = area.unwrap_or("*"), "clearing price cache");
        self.cache.lock().clear(area);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Grace-period anchor override; construction time is used by default.
    /// Mainly for deterministic tests and supervised restarts.
    pub fn with_start_time(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Snapshot evaluated at an explicit instant
    pub async fn snapshot_at(&self, area: &str, now: DateTime<Utc>) -> Result<PriceSnapshot> {
        let (set, from_cache) = self.fetch_data_at(area, false, now).await?;
        let runtime = self.runtime(area)?;
        let current_key = runtime.clock.current_key(now);
        let next_key = runtime.clock.next_key(now);
        // A wrapped next key ("00:00") lives in tomorrow's map
        let next_interval_price = if next_key.as_str() <= current_key.as_str() {
            set.tomorrow_price_at(&next_key)
        } else {
            set.price_at(&next_key)
        };

        Ok(PriceSnapshot {
            area: area.to_string(),
            current_price: set.price_at(&current_key),
            next_interval_price,
            current_key,
            next_key,
            statistics: set.statistics(),
            tomorrow_statistics: set.tomorrow_statistics(),
            tomorrow: set.has_tomorrow().then(|| set.tomorrow.clone()),
            today: set.today,
            data_source: set.source,
            using_cached_data: from_cache,
            error_code: set.error_code,
            fetched_at: set.fetched_at,
        })
    }

    /// The full decision pipeline for one call, evaluated at an explicit
    /// instant. Returns the price set and whether it was served from cache.
    pub async fn fetch_data_at(
        &self,
        area: &str,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Result<(IntervalPriceSet, bool)> {
        let runtime = self.runtime(area)?;

        // Serializes all callers for this area; different areas proceed
        // independently
        let mut state = runtime.state.lock().await;

        {
            let mut cache = self.cache.lock();
            cache.migrate_midnight(
                area,
                &runtime.clock,
                now,
                self.fetch_config.migration_window_minutes,
            );
        }

        let (has_current, has_complete) = {
            let mut cache = self.cache.lock();
            (
                cache.has_current_interval_price(area, &runtime.clock, now),
                cache.has_complete_data_for_today(area, &runtime.clock, now),
            )
        };

        let hour = runtime.clock.local_hour(now);
        let in_window = self
            .fetch_config
            .special_windows
            .iter()
            .any(|w| w.contains_hour(hour));

        let limit = should_skip_fetch(
            state.last_fetch,
            now,
            state.consecutive_failures,
            &self.fetch_config,
            &runtime.clock,
            runtime.chain.primary_id().as_deref(),
        );
        let in_grace =
            (now - self.started_at).num_minutes() < self.fetch_config.grace_period_minutes;
        let rate_limited = limit.skip && !in_grace;

        let decision = should_fetch(
            now,
            state.last_fetch,
            self.fetch_config.refresh_interval_minutes,
            has_current,
            has_complete,
            rate_limited,
            in_window,
        );

        // Need and permission are separate: a missing current interval may
        // override spacing limits but never an active backoff
        let need = force_refresh || decision.fetch;
        let permitted = force_refresh
            || !rate_limited
            || (decision.reason == FetchReason::MissingCurrentInterval
                && limit.reason != SkipReason::Backoff);

        if need && permitted {
            debug!(
                area,
                reason = %decision.reason,
                forced = force_refresh,
                "fetching from sources"
            );
            match runtime.chain.fetch(area).await {
                Ok(fetch) => {
                    let set = normalize(&runtime.config, &runtime.clock, fetch, now);
                    self.cache.lock().store(set.clone(), now);
                    state.last_fetch = Some(now);
                    state.consecutive_failures = 0;
                    info!(
                        area,
                        source = %set.source,
                        today_intervals = set.today.len(),
                        tomorrow_intervals = set.tomorrow.len(),
                        "stored fresh price data"
                    );
                    return Ok((set, false));
                }
                Err(e) => {
                    state.last_fetch = Some(now);
                    state.consecutive_failures += 1;
                    warn!(
                        area,
                        failures = state.consecutive_failures,
                        "fetch failed: {e}"
                    );
                    // Stale data beats no data; annotate the copy, never
                    // the stored entry
                    if let Some(mut cached) = self.best_cached(&runtime, now) {
                        cached.error_code = Some(ERROR_ALL_SOURCES_EXHAUSTED.to_string());
                        cached.error_message = Some(e.to_string());
                        return Ok((cached, true));
                    }
                    return Err(e);
                }
            }
        }

        if need && !permitted {
            debug!(area, reason = %limit.reason, "fetch needed but rate limited");
        } else {
            debug!(area, reason = %decision.reason, "serving from cache");
        }
        match self.best_cached(&runtime, now) {
            Some(set) => Ok((set, true)),
            None => Err(GridspotError::NoData(area.to_string())),
        }
    }

    /// Revalidate failing areas: once per special window per day, and
    /// otherwise whenever the rate limiter permits another attempt. Driven
    /// periodically by the host loop.
    pub async fn run_health_check(&self, now: DateTime<Utc>) {
        for (area, runtime) in &self.areas {
            let mut state = runtime.state.lock().await;

            let today = runtime.clock.local_date(now);
            if state.windows_reset_date != Some(today) {
                state.windows_checked.clear();
                state.windows_reset_date = Some(today);
            }

            if state.consecutive_failures == 0 {
                continue;
            }

            let hour = runtime.clock.local_hour(now);
            let window = self
                .fetch_config
                .special_windows
                .iter()
                .find(|w| w.contains_hour(hour))
                .copied();

            let due = match window {
                Some(w) if !state.windows_checked.contains(&w.start_hour) => {
                    state.windows_checked.insert(w.start_hour);
                    true
                }
                _ => {
                    !should_skip_fetch(
                        state.last_fetch,
                        now,
                        state.consecutive_failures,
                        &self.fetch_config,
                        &runtime.clock,
                        runtime.chain.primary_id().as_deref(),
                    )
                    .skip
                }
            };
            if !due {
                continue;
            }

            debug!(area, "health check: revalidating failed sources");
            match runtime.chain.fetch(area).await {
                Ok(fetch) => {
                    let set = normalize(&runtime.config, &runtime.clock, fetch, now);
                    self.cache.lock().store(set.clone(), now);
                    state.last_fetch = Some(now);
                    state.consecutive_failures = 0;
                    info!(area, source = %set.source, "health check recovered source");
                }
                Err(e) => {
                    state.last_fetch = Some(now);
                    state.consecutive_failures += 1;
                    debug!(area, "health check still failing: {e}");
                }
            }
        }
    }

    fn runtime(&self, area: &str) -> Result<Arc<AreaRuntime>> {
        self.areas
            .get(area)
            .cloned()
            .ok_or_else(|| GridspotError::Configuration(format!("unknown area '{area}'")))
    }

    /// Best available cached entry: today's, else yesterday's
    fn best_cached(&self, runtime: &AreaRuntime, now: DateTime<Utc>) -> Option<IntervalPriceSet> {
        let params = runtime.config.display_params();
        let today = runtime.clock.local_date(now);
        let mut cache = self.cache.lock();
        if let Some(set) = cache.get(&runtime.config.id, today, None, &params, now) {
            return Some(set);
        }
        let yesterday = today.pred_opt()?;
        cache.get(&runtime.config.id, yesterday, None, &params, now)
    }
}

/// Build a canonical stored entry from a successful chain fetch
fn normalize(
    area: &AreaConfig,
    clock: &IntervalClock,
    fetch: ChainFetch,
    now: DateTime<Utc>,
) -> IntervalPriceSet {
    let params = area.display_params();
    IntervalPriceSet {
        area: area.id.clone(),
        date: clock.local_date(now),
        source: fetch.source,
        today: apply_display_transform(&fetch.result.today, &params),
        tomorrow: apply_display_transform(&fetch.result.tomorrow, &params),
        raw_today: fetch.result.today,
        raw_tomorrow: fetch.result.tomorrow,
        export_tariff: None,
        source_currency: fetch.result.source_currency,
        source_timezone: fetch.result.source_timezone,
        target_currency: params.currency.clone(),
        target_timezone: params.timezone.clone(),
        vat_rate: params.vat_rate,
        vat_included: params.vat_included,
        display_unit: params.unit,
        fetched_at: now,
        last_updated: now,
        attempted_sources: fetch.attempted,
        failed_sources: fetch.failed,
        error_code: None,
        error_message: None,
        config_fingerprint: params.fingerprint(),
        migrated_from_tomorrow: false,
    }
}

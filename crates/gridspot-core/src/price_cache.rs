// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Domain wrapper over the generic cache
//!
//! Owns all reads and writes of cached price entries. Retrieval is a pure
//! content lookup: success depends on presence, never on entry age (the
//! generic cache's TTL is the single expiry path). Every read returns a
//! clone, so callers can annotate results without touching stored data.

use crate::cache::{Cache, CacheStats};
use crate::interval::IntervalClock;
use chrono::{DateTime, NaiveDate, Utc};
use gridspot_types::{DisplayParams, IntervalPriceSet, apply_display_transform};
use std::collections::BTreeMap;
use std::collections::HashMap;
use tracing::{debug, info};

/// Translates domain requests into generic cache operations
#[derive(Debug)]
pub struct PriceCacheManager {
    cache: Cache<IntervalPriceSet>,
    /// Most recently stored source per (area, date), so retrieval without an
    /// explicit source returns the freshest entry
    latest_source: HashMap<(String, NaiveDate), String>,
    completeness_threshold: f64,
}

fn cache_key(area: &str, date: NaiveDate, source: &str) -> String {
    format!("{area}|{date}|{source}")
}

impl PriceCacheManager {
    pub fn new(cache: Cache<IntervalPriceSet>, completeness_threshold: f64) -> Self {
        Self {
            cache,
            latest_source: HashMap::new(),
            completeness_threshold,
        }
    }

    /// Store a normalized entry and update the latest-source pointer
    pub fn store(&mut self, set: IntervalPriceSet, now: DateTime<Utc>) {
        let key = cache_key(&set.area, set.date, &set.source);
        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), set.source.clone());
        self.latest_source
            .insert((set.area.clone(), set.date), set.source.clone());
        self.cache.set(&key, set, None, metadata, now);
    }

    /// Content lookup; never takes a max-age. When the stored entry's config
    /// fingerprint no longer matches `params`, display prices are recomputed
    /// from the immutable raw prices and re-stored. Recomputation never
    /// triggers a fetch.
    pub fn get(
        &mut self,
        area: &str,
        date: NaiveDate,
        source: Option<&str>,
        params: &DisplayParams,
        now: DateTime<Utc>,
    ) -> Option<IntervalPriceSet> {
        let mut set = self.entry(area, date, source, now)?;

        let live_fingerprint = params.fingerprint();
        if set.config_fingerprint != live_fingerprint {
            debug!(
                area,
                %date,
                "config fingerprint mismatch, recomputing display prices"
            );
            set.today = apply_display_transform(&set.raw_today, params);
            set.tomorrow = apply_display_transform(&set.raw_tomorrow, params);
            set.vat_rate = params.vat_rate;
            set.vat_included = params.vat_included;
            set.target_currency = params.currency.clone();
            set.target_timezone = params.timezone.clone();
            set.display_unit = params.unit;
            set.config_fingerprint = live_fingerprint;
            set.last_updated = now;
            self.store(set.clone(), now);
        }

        Some(set)
    }

    /// True iff today's entry exists and its map has the current interval key
    pub fn has_current_interval_price(
        &mut self,
        area: &str,
        clock: &IntervalClock,
        now: DateTime<Utc>,
    ) -> bool {
        let date = clock.local_date(now);
        let key = clock.current_key(now);
        self.entry(area, date, None, now)
            .is_some_and(|set| set.today.contains_key(&key))
    }

    /// True iff today's entry covers at least the configured fraction of the
    /// day's expected intervals (which shrinks/grows on DST days)
    pub fn has_complete_data_for_today(
        &mut self,
        area: &str,
        clock: &IntervalClock,
        now: DateTime<Utc>,
    ) -> bool {
        let date = clock.local_date(now);
        let expected = clock.expected_key_count(date);
        let needed = (self.completeness_threshold * expected as f64).ceil() as usize;
        self.entry(area, date, None, now)
            .is_some_and(|set| set.today.len() >= needed)
    }

    /// Midnight roll-over: inside the first `window_minutes` after local
    /// midnight, move yesterday's tomorrow-prices into a fresh entry for
    /// today. Idempotent, and never clobbers a fresher fetch that already
    /// arrived for today.
    pub fn migrate_midnight(
        &mut self,
        area: &str,
        clock: &IntervalClock,
        now: DateTime<Utc>,
        window_minutes: i64,
    ) -> bool {
        if clock.minutes_into_day(now) >= window_minutes {
            return false;
        }
        let today = clock.local_date(now);
        let Some(yesterday) = today.pred_opt() else {
            return false;
        };
        let Some(previous) = self.entry(area, yesterday, None, now) else {
            return false;
        };
        if previous.tomorrow.is_empty() {
            return false;
        }
        if let Some(existing) = self.entry(area, today, None, now)
            && (existing.migrated_from_tomorrow || existing.fetched_at >= previous.fetched_at)
        {
            return false;
        }

        let migrated = IntervalPriceSet {
            date: today,
            today: previous.tomorrow.clone(),
            tomorrow: BTreeMap::new(),
            raw_today: previous.raw_tomorrow.clone(),
            raw_tomorrow: BTreeMap::new(),
            export_tariff: None,
            last_updated: now,
            error_code: None,
            error_message: None,
            migrated_from_tomorrow: true,
            ..previous
        };
        info!(
            area,
            %today,
            intervals = migrated.today.len(),
            "migrated tomorrow's prices into today's entry"
        );
        self.store(migrated, now);
        true
    }

    /// Drop entries for one area, or everything
    pub fn clear(&mut self, area: Option<&str>) {
        match area {
            Some(area) => {
                let prefix = format!("{area}|");
                let removed = self.cache.delete_where(|key| key.starts_with(&prefix));
                self.latest_source.retain(|(a, _), _| a != area);
                debug!(area, removed, "cleared area cache entries");
            }
            None => {
                self.cache.clear();
                self.latest_source.clear();
                debug!("cleared all cache entries");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolve and fetch the entry for (area, date), via the latest-source
    /// pointer or, after a persisted reload, by scanning stored keys.
    fn entry(
        &mut self,
        area: &str,
        date: NaiveDate,
        source: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<IntervalPriceSet> {
        if let Some(source) = source {
            return self.cache.get(&cache_key(area, date, source), now);
        }
        if let Some(source) = self.latest_source.get(&(area.to_string(), date)) {
            let key = cache_key(area, date, source);
            return self.cache.get(&key, now);
        }
        // No pointer (fresh start with persisted entries): pick the freshest
        let prefix = format!("{area}|{date}|");
        let candidates = self.cache.keys_with_prefix(&prefix);
        let mut best: Option<IntervalPriceSet> = None;
        for key in candidates {
            if let Some(set) = self.cache.get(&key, now)
                && best.as_ref().is_none_or(|b| set.fetched_at > b.fetched_at)
            {
                best = Some(set);
            }
        }
        if let Some(set) = &best {
            self.latest_source
                .insert((area.to_string(), date), set.source.clone());
        }
        best
    }
}

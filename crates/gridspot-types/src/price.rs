// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Canonical per-interval price data
//!
//! `IntervalPriceSet` is the unit of cached data. Only source data and
//! metadata are stored fields; everything derived from "now" (current price,
//! validity, statistics) is computed by methods so a stored entry can never
//! go stale relative to its own derived values.

use crate::config::DisplayUnit;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Per-interval price map keyed by zero-padded "HH:MM" interval start
pub type PriceMap = BTreeMap<String, f64>;

/// Display-affecting configuration, hashed into the config fingerprint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayParams {
    pub vat_rate: f64,
    pub vat_included: bool,
    pub currency: String,
    pub unit: DisplayUnit,
    pub precision: u32,
    pub timezone: String,
}

impl DisplayParams {
    /// Stable hash of everything that affects displayed prices. A cached
    /// entry whose fingerprint differs from the live configuration gets its
    /// display prices recomputed from raw source prices, never refetched.
    pub fn fingerprint(&self) -> String {
        // DefaultHasher::new() uses fixed keys, so the value survives
        // restarts and can be persisted alongside the entry.
        let mut hasher = DefaultHasher::new();
        self.vat_rate.to_bits().hash(&mut hasher);
        self.vat_included.hash(&mut hasher);
        self.currency.hash(&mut hasher);
        self.unit.as_str().hash(&mut hasher);
        self.precision.hash(&mut hasher);
        self.timezone.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

/// Canonical output of a source-specific parser/client
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceFetchResult {
    /// Raw prices in source currency per MWh, keyed by "HH:MM"
    pub today: PriceMap,
    /// Empty until the day-ahead auction for tomorrow is published
    pub tomorrow: PriceMap,
    pub source_currency: String,
    pub source_timezone: String,
}

/// The unit of cached price data for one (area, date, source)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntervalPriceSet {
    pub area: String,
    pub date: NaiveDate,
    pub source: String,

    /// Display prices for the entry's calendar day
    pub today: PriceMap,
    /// Display prices for the following day; empty until published
    pub tomorrow: PriceMap,
    /// Raw pre-VAT source prices (source currency per MWh), immutable
    pub raw_today: PriceMap,
    pub raw_tomorrow: PriceMap,
    /// Export tariff prices where the market provides them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_tariff: Option<PriceMap>,

    pub source_currency: String,
    pub source_timezone: String,
    pub target_currency: String,
    pub target_timezone: String,
    pub vat_rate: f64,
    pub vat_included: bool,
    pub display_unit: DisplayUnit,

    pub fetched_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,

    /// Source ids tried for this entry, in order
    #[serde(default)]
    pub attempted_sources: Vec<String>,
    /// Subset of attempted sources that failed
    #[serde(default)]
    pub failed_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Fingerprint of the display configuration the entry was computed with
    pub config_fingerprint: String,

    /// True when today's prices were moved over from yesterday's
    /// tomorrow-data during the midnight migration
    #[serde(default)]
    pub migrated_from_tomorrow: bool,
}

impl IntervalPriceSet {
    /// Display price for the given interval key, today's map
    pub fn price_at(&self, key: &str) -> Option<f64> {
        self.today.get(key).copied()
    }

    /// Display price for the key in tomorrow's map
    pub fn tomorrow_price_at(&self, key: &str) -> Option<f64> {
        self.tomorrow.get(key).copied()
    }

    pub fn has_tomorrow(&self) -> bool {
        !self.tomorrow.is_empty()
    }

    /// Min/max/average over today's display prices
    pub fn statistics(&self) -> Option<PriceStatistics> {
        PriceStatistics::of(&self.today)
    }

    /// Min/max/average over tomorrow's display prices, when published
    pub fn tomorrow_statistics(&self) -> Option<PriceStatistics> {
        PriceStatistics::of(&self.tomorrow)
    }
}

/// Summary statistics over one day's price map
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceStatistics {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    /// Interval key at which the minimum occurs
    pub min_key: String,
    /// Interval key at which the maximum occurs
    pub max_key: String,
}

impl PriceStatistics {
    pub fn of(prices: &PriceMap) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }
        let (mut min_key, mut min) = ("", f64::INFINITY);
        let (mut max_key, mut max) = ("", f64::NEG_INFINITY);
        let mut sum = 0.0;
        for (key, &price) in prices {
            if price < min {
                min = price;
                min_key = key;
            }
            if price > max {
                max = price;
                max_key = key;
            }
            sum += price;
        }
        Some(Self {
            min,
            max,
            average: sum / prices.len() as f64,
            min_key: min_key.to_string(),
            max_key: max_key.to_string(),
        })
    }
}

/// Read model handed to the host sensor layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub area: String,
    pub current_price: Option<f64>,
    pub next_interval_price: Option<f64>,
    pub current_key: String,
    pub next_key: String,
    pub today: PriceMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tomorrow: Option<PriceMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<PriceStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tomorrow_statistics: Option<PriceStatistics>,
    pub data_source: String,
    pub using_cached_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

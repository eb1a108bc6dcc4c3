// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Configuration surface for the price aggregation service
//!
//! Loaded from a TOML file at startup. Every tunable has a serde default so a
//! minimal config only needs to list areas and their source priorities.
//! Validation is fatal at startup; nothing here is recoverable at runtime.

use crate::error::{GridspotError, Result};
use crate::price::DisplayParams;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

fn default_interval_minutes() -> u32 {
    15
}

fn default_ttl_minutes() -> i64 {
    1440
}

fn default_max_entries() -> usize {
    200
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("/data/gridspot")
}

fn default_min_fetch_interval() -> i64 {
    15
}

fn default_backoff_cap() -> i64 {
    120
}

fn default_refresh_interval() -> i64 {
    60
}

fn default_grace_period() -> i64 {
    5
}

fn default_completeness_threshold() -> f64 {
    0.8
}

fn default_migration_window() -> i64 {
    10
}

fn default_special_windows() -> Vec<SpecialWindow> {
    // Day-ahead auction results are typically published early afternoon CET
    vec![SpecialWindow {
        start_hour: 13,
        end_hour: 15,
    }]
}

fn default_precision() -> u32 {
    4
}

fn default_currency() -> String {
    "EUR".to_string()
}

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridspotConfig {
    /// Interval duration in minutes; must evenly divide 60
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    /// Areas to serve, each with its own source priority list
    pub areas: Vec<AreaConfig>,
}

/// Generic cache tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default entry TTL (minutes)
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,

    /// Entry budget before LRU eviction kicks in
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Write entries to disk on every set and reload them at startup
    #[serde(default)]
    pub persist: bool,

    /// Directory holding the persisted cache file
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            max_entries: default_max_entries(),
            persist: false,
            persist_dir: default_persist_dir(),
        }
    }
}

/// Fetch timing and rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Minimum spacing between network fetches for one area (minutes)
    #[serde(default = "default_min_fetch_interval")]
    pub min_fetch_interval_minutes: i64,

    /// Upper bound on exponential backoff after failures (minutes)
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_minutes: i64,

    /// How often a routine refresh is considered due (minutes)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: i64,

    /// Rate limiting is bypassed this long after process start (minutes)
    #[serde(default = "default_grace_period")]
    pub grace_period_minutes: i64,

    /// Fraction of the day's expected intervals that counts as complete
    #[serde(default = "default_completeness_threshold")]
    pub completeness_threshold: f64,

    /// Wall-clock hour ranges around known publication times
    #[serde(default = "default_special_windows")]
    pub special_windows: Vec<SpecialWindow>,

    /// Per-source market hours with frequent intraday updates, keyed by
    /// source id; fetches inside these are never rate limited
    #[serde(default)]
    pub intraday_windows: BTreeMap<String, Vec<SpecialWindow>>,

    /// Minutes after local midnight during which tomorrow-data migration runs
    #[serde(default = "default_migration_window")]
    pub migration_window_minutes: i64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_fetch_interval_minutes: default_min_fetch_interval(),
            backoff_cap_minutes: default_backoff_cap(),
            refresh_interval_minutes: default_refresh_interval(),
            grace_period_minutes: default_grace_period(),
            completeness_threshold: default_completeness_threshold(),
            special_windows: default_special_windows(),
            intraday_windows: BTreeMap::new(),
            migration_window_minutes: default_migration_window(),
        }
    }
}

/// A half-open wall-clock hour range `[start_hour, end_hour)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecialWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SpecialWindow {
    pub fn contains_hour(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// Price unit used for display values
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    #[default]
    Kwh,
    Mwh,
}

impl DisplayUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kwh => "kwh",
            Self::Mwh => "mwh",
        }
    }
}

/// One market area and its display settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaConfig {
    /// Area/price-zone id (e.g. "SE3", "DK1")
    pub id: String,

    /// IANA timezone the area's market operates in
    pub timezone: String,

    /// Target currency for displayed prices
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub display_unit: DisplayUnit,

    /// VAT rate as a fraction (0.25 = 25%)
    #[serde(default)]
    pub vat_rate: f64,

    /// Whether source prices already include VAT
    #[serde(default)]
    pub vat_included: bool,

    /// Decimal places for displayed prices
    #[serde(default = "default_precision")]
    pub precision: u32,

    /// Source ids in fallback priority order
    pub sources: Vec<String>,
}

impl AreaConfig {
    pub fn tz(&self) -> Result<Tz> {
        Tz::from_str(&self.timezone).map_err(|_| {
            GridspotError::Configuration(format!(
                "area {}: unknown timezone '{}'",
                self.id, self.timezone
            ))
        })
    }

    /// Display-affecting settings, used for fingerprinting and the price
    /// transform
    pub fn display_params(&self) -> DisplayParams {
        DisplayParams {
            vat_rate: self.vat_rate,
            vat_included: self.vat_included,
            currency: self.currency.clone(),
            unit: self.display_unit,
            precision: self.precision,
            timezone: self.timezone.clone(),
        }
    }
}

impl GridspotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 || 60 % self.interval_minutes != 0 {
            return Err(GridspotError::Configuration(format!(
                "interval_minutes must evenly divide 60, got {}",
                self.interval_minutes
            )));
        }
        if !(self.fetch.completeness_threshold > 0.0 && self.fetch.completeness_threshold <= 1.0) {
            return Err(GridspotError::Configuration(format!(
                "completeness_threshold must be in (0, 1], got {}",
                self.fetch.completeness_threshold
            )));
        }
        for window in self
            .fetch
            .special_windows
            .iter()
            .chain(self.fetch.intraday_windows.values().flatten())
        {
            if window.start_hour >= window.end_hour || window.end_hour > 24 {
                return Err(GridspotError::Configuration(format!(
                    "malformed window {}..{} (need start < end <= 24)",
                    window.start_hour, window.end_hour
                )));
            }
        }
        if self.areas.is_empty() {
            return Err(GridspotError::Configuration(
                "at least one area must be configured".to_string(),
            ));
        }
        for area in &self.areas {
            area.tz()?;
            if area.sources.is_empty() {
                return Err(GridspotError::Configuration(format!(
                    "area {} has no sources configured",
                    area.id
                )));
            }
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<GridspotConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GridspotError::Configuration(format!("cannot read config {}: {e}", path.display()))
    })?;
    let config: GridspotConfig = toml::from_str(&content)
        .map_err(|e| GridspotError::Configuration(format!("cannot parse config: {e}")))?;
    config.validate()?;
    Ok(config)
}

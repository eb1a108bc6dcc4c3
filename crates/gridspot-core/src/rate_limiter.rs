// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Fetch-timing gate
//!
//! A stateless decision function answering "is a network fetch permitted
//! right now". Evaluated in strict priority order: first-fetch, failure
//! backoff, intraday market hours, publication windows, minimum spacing,
//! interval-boundary crossing. Whether a fetch is *needed* is the decision
//! maker's question, not this one's.

use crate::interval::IntervalClock;
use chrono::{DateTime, Utc};
use gridspot_types::FetchConfig;
use std::fmt;

/// Why a fetch was (not) skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NeverFetched,
    Backoff,
    IntradayWindow,
    SpecialWindow,
    TooSoon,
    IntervalBoundary,
    SpacingElapsed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NeverFetched => "never fetched",
            Self::Backoff => "backoff",
            Self::IntradayWindow => "intraday market hours",
            Self::SpecialWindow => "publication window",
            Self::TooSoon => "too soon",
            Self::IntervalBoundary => "interval boundary crossed",
            Self::SpacingElapsed => "minimum spacing elapsed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipDecision {
    pub skip: bool,
    pub reason: SkipReason,
}

impl SkipDecision {
    fn skip(reason: SkipReason) -> Self {
        Self { skip: true, reason }
    }

    fn proceed(reason: SkipReason) -> Self {
        Self { skip: false, reason }
    }
}

/// Exponential backoff in minutes for a failure count, capped
pub fn backoff_minutes(consecutive_failures: u32, config: &FetchConfig) -> i64 {
    if consecutive_failures == 0 {
        return 0;
    }
    // Shift clamped well below overflow; the cap bounds the result anyway
    let factor = 1i64 << (consecutive_failures - 1).min(20);
    config
        .min_fetch_interval_minutes
        .saturating_mul(factor)
        .min(config.backoff_cap_minutes)
}

/// Decide whether to skip a fetch attempt for an area right now.
///
/// `source` is the id the fetch would go to first, used for per-source
/// intraday-hours overrides.
pub fn should_skip_fetch(
    last_fetch: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    consecutive_failures: u32,
    config: &FetchConfig,
    clock: &IntervalClock,
    source: Option<&str>,
) -> SkipDecision {
    let Some(last) = last_fetch else {
        return SkipDecision::proceed(SkipReason::NeverFetched);
    };
    let elapsed_minutes = (now - last).num_minutes();

    if consecutive_failures > 0 {
        let backoff = backoff_minutes(consecutive_failures, config);
        if elapsed_minutes < backoff {
            return SkipDecision::skip(SkipReason::Backoff);
        }
    }

    let hour = clock.local_hour(now);

    if let Some(source) = source
        && let Some(windows) = config.intraday_windows.get(source)
        && windows.iter().any(|w| w.contains_hour(hour))
    {
        return SkipDecision::proceed(SkipReason::IntradayWindow);
    }

    if config
        .special_windows
        .iter()
        .any(|w| w.contains_hour(hour))
    {
        return SkipDecision::proceed(SkipReason::SpecialWindow);
    }

    if elapsed_minutes < config.min_fetch_interval_minutes {
        return SkipDecision::skip(SkipReason::TooSoon);
    }

    if clock.current_key(last) != clock.current_key(now) || clock.local_date(last) != clock.local_date(now) {
        return SkipDecision::proceed(SkipReason::IntervalBoundary);
    }

    SkipDecision::proceed(SkipReason::SpacingElapsed)
}

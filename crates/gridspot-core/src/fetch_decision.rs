// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! "Should we call the network" decision
//!
//! Combines cache content answers with rate-limiter timing into a single
//! prioritized decision. This function decides *need*; the orchestrator
//! still consults the rate limiter separately before issuing the call,
//! because need and permission are different questions.

use chrono::{DateTime, Utc};
use std::fmt;

/// Why a fetch is (not) warranted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchReason {
    MissingCurrentInterval,
    WindowDataPresent,
    RateLimited,
    IncompleteCoverage,
    RefreshDue,
    FirstRun,
    CacheSufficient,
}

impl fmt::Display for FetchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingCurrentInterval => "missing current interval",
            Self::WindowDataPresent => "publication window, data present",
            Self::RateLimited => "rate limited, data present",
            Self::IncompleteCoverage => "incomplete coverage",
            Self::RefreshDue => "refresh interval elapsed",
            Self::FirstRun => "first run",
            Self::CacheSufficient => "cache sufficient",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchDecision {
    pub fetch: bool,
    pub reason: FetchReason,
}

impl FetchDecision {
    fn fetch(reason: FetchReason) -> Self {
        Self {
            fetch: true,
            reason,
        }
    }

    fn use_cache(reason: FetchReason) -> Self {
        Self {
            fetch: false,
            reason,
        }
    }
}

/// Prioritized fetch-need decision. Highest priority first:
///
/// 1. Current interval price missing: always fetch. This is the only reason
///    that may override an active rate limit (backoff still wins at the
///    rate-limiter stage).
/// 2. Inside a publication window with data present: no fetch.
/// 3. Rate limited with data present: no fetch.
/// 4. Today's coverage below the completeness threshold: fetch.
/// 5. Routine refresh due and the current price still missing: fetch.
/// 6. Never fetched: fetch.
/// 7. Otherwise: use cache.
#[allow(clippy::fn_params_excessive_bools)]
pub fn should_fetch(
    now: DateTime<Utc>,
    last_fetch: Option<DateTime<Utc>>,
    refresh_interval_minutes: i64,
    has_current_interval_price: bool,
    has_complete_data_for_today: bool,
    rate_limited: bool,
    in_special_window: bool,
) -> FetchDecision {
    if !has_current_interval_price {
        return FetchDecision::fetch(FetchReason::MissingCurrentInterval);
    }

    if in_special_window {
        return FetchDecision::use_cache(FetchReason::WindowDataPresent);
    }

    if rate_limited {
        return FetchDecision::use_cache(FetchReason::RateLimited);
    }

    if !has_complete_data_for_today {
        return FetchDecision::fetch(FetchReason::IncompleteCoverage);
    }

    match last_fetch {
        None => FetchDecision::fetch(FetchReason::FirstRun),
        Some(last)
            if (now - last).num_minutes() >= refresh_interval_minutes
                && !has_current_interval_price =>
        {
            FetchDecision::fetch(FetchReason::RefreshDue)
        }
        Some(_) => FetchDecision::use_cache(FetchReason::CacheSufficient),
    }
}

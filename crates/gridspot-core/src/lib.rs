// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Price caching and fetch decision core
//!
//! The subsystem that decides when a network fetch is warranted, rate limits
//! it, stores normalized price data with day-boundary and DST correctness,
//! and serves derived views computed on demand. Source-specific market
//! clients plug in through the [`PriceSource`] trait.

pub mod cache;
pub mod fetch_decision;
pub mod interval;
pub mod manager;
pub mod price_cache;
pub mod rate_limiter;
pub mod source;

pub use cache::{Cache, CacheEntry, CacheStats};
pub use fetch_decision::{FetchDecision, FetchReason, should_fetch};
pub use interval::IntervalClock;
pub use manager::UnifiedPriceManager;
pub use price_cache::PriceCacheManager;
pub use rate_limiter::{SkipDecision, SkipReason, should_skip_fetch};
pub use source::{PriceSource, SourceChain};

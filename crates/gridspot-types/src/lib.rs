// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Shared data model and configuration for GridSpot
//!
//! Everything here is plain data: the canonical interval price set, the
//! configuration surface, the display transform, and the error taxonomy.
//! No I/O and no clock reads happen in this crate.

pub mod config;
pub mod display;
pub mod error;
pub mod price;

pub use config::{
    AreaConfig, CacheConfig, DisplayUnit, FetchConfig, GridspotConfig, SpecialWindow, load_config,
};
pub use display::apply_display_transform;
pub use error::{GridspotError, Result};
pub use price::{
    DisplayParams, IntervalPriceSet, PriceSnapshot, PriceStatistics, SourceFetchResult,
};

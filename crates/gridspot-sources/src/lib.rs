// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Source-specific market clients
//!
//! Each module implements [`gridspot_core::PriceSource`] for one external
//! market API. Currently ships the Energi Data Service client; further
//! markets register the same way.

pub mod energi_data;

pub use energi_data::EnergiDataServiceSource;

use gridspot_core::PriceSource;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of all built-in source clients, keyed by source id
pub fn builtin_sources() -> gridspot_types::Result<HashMap<String, Arc<dyn PriceSource>>> {
    let mut registry: HashMap<String, Arc<dyn PriceSource>> = HashMap::new();
    let energi_data = EnergiDataServiceSource::new()?;
    registry.insert(energi_data.id().to_string(), Arc::new(energi_data));
    Ok(registry)
}

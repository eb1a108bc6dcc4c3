// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Error types shared across the GridSpot crates

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridspotError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("source '{source_id}' failed: {message}")]
    SourceFetch { source_id: String, message: String },

    #[error("all sources exhausted for area {area} (attempted: {attempted:?})")]
    AllSourcesExhausted {
        area: String,
        attempted: Vec<String>,
    },

    #[error("no data available for area {0}")]
    NoData(String),

    #[error("cache persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GridspotError>;

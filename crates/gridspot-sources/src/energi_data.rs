// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Energi Data Service client (Danish market data portal)
//!
//! Queries the `Elspotprices` dataset and maps records into the canonical
//! per-interval price form. Record timestamps are Danish local time; the
//! record's calendar date decides whether a price lands in today's or
//! tomorrow's map.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use gridspot_core::PriceSource;
use gridspot_types::price::PriceMap;
use gridspot_types::{GridspotError, Result, SourceFetchResult};
use serde::Deserialize;
use tracing::debug;

const SOURCE_ID: &str = "energi_data_service";
const DEFAULT_BASE_URL: &str = "https://api.energidataservice.dk";
const MARKET_TZ: &str = "Europe/Copenhagen";
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct ElspotResponse {
    records: Vec<ElspotRecord>,
}

#[derive(Debug, Deserialize)]
struct ElspotRecord {
    /// Danish local time, e.g. "2026-08-29T10:00:00"
    #[serde(rename = "HourDK")]
    hour_dk: String,
    /// EUR per MWh
    #[serde(rename = "SpotPriceEUR")]
    spot_price_eur: Option<f64>,
}

/// Client for the Energi Data Service REST API
#[derive(Debug, Clone)]
pub struct EnergiDataServiceSource {
    client: reqwest::Client,
    base_url: String,
    tz: Tz,
}

impl EnergiDataServiceSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                GridspotError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            tz: MARKET_TZ.parse().expect("static timezone parses"),
        })
    }

    /// Point the client at a different base URL (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn fetch_error(&self, message: impl Into<String>) -> GridspotError {
        GridspotError::SourceFetch {
            source_id: SOURCE_ID.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl PriceSource for EnergiDataServiceSource {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch_and_parse(&self, area: &str) -> Result<SourceFetchResult> {
        let today = Utc::now().with_timezone(&self.tz).date_naive();
        let end = today + Duration::days(2);
        let url = format!("{}/dataset/Elspotprices", self.base_url);
        let filter = format!(r#"{{"PriceArea":["{area}"]}}"#);

        debug!(area, %today, "querying Energi Data Service");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("start", format!("{today}T00:00")),
                ("end", format!("{end}T00:00")),
                ("filter", filter),
                ("sort", "HourDK ASC".to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.fetch_error(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(self.fetch_error(format!("HTTP {}", response.status())));
        }

        let body: ElspotResponse = response
            .json()
            .await
            .map_err(|e| self.fetch_error(format!("failed to parse response: {e}")))?;

        let mut today_prices = PriceMap::new();
        let mut tomorrow_prices = PriceMap::new();
        for record in &body.records {
            let Some(price) = record.spot_price_eur else {
                continue;
            };
            let Ok(stamp) = NaiveDateTime::parse_from_str(&record.hour_dk, "%Y-%m-%dT%H:%M:%S")
            else {
                continue;
            };
            let key = stamp.format("%H:%M").to_string();
            if stamp.date() == today {
                // First occurrence wins on DST fall-back days
                today_prices.entry(key).or_insert(price);
            } else if stamp.date() == today + Duration::days(1) {
                tomorrow_prices.entry(key).or_insert(price);
            }
        }

        if today_prices.is_empty() {
            return Err(self.fetch_error(format!("no records for area {area}")));
        }

        debug!(
            area,
            today = today_prices.len(),
            tomorrow = tomorrow_prices.len(),
            "parsed Elspotprices records"
        );
        Ok(SourceFetchResult {
            today: today_prices,
            tomorrow: tomorrow_prices,
            source_currency: "EUR".to_string(),
            source_timezone: MARKET_TZ.to_string(),
        })
    }
}

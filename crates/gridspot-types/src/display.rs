// SPDX-License-Identifier: CC-BY-NC-ND-4.0

//! Pure transform from raw source prices to display prices
//!
//! Applied once when a fetch is normalized and again whenever a cached
//! entry's config fingerprint no longer matches live configuration. Raw
//! prices are source currency per MWh, VAT handling per the area settings.

use crate::config::DisplayUnit;
use crate::price::{DisplayParams, PriceMap};

/// Apply VAT, unit scaling and precision rounding to a raw price map.
///
/// Side-effect free: the input map is never modified, currency conversion is
/// a collaborator concern and raw prices are assumed already converted to the
/// target currency upstream.
pub fn apply_display_transform(raw: &PriceMap, params: &DisplayParams) -> PriceMap {
    let unit_divisor = match params.unit {
        DisplayUnit::Kwh => 1000.0,
        DisplayUnit::Mwh => 1.0,
    };
    let vat_factor = if params.vat_included {
        1.0
    } else {
        1.0 + params.vat_rate
    };
    let rounding = 10f64.powi(params.precision as i32);

    raw.iter()
        .map(|(key, &price)| {
            let value = price / unit_divisor * vat_factor;
            (key.clone(), (value * rounding).round() / rounding)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(unit: DisplayUnit, vat_rate: f64, vat_included: bool) -> DisplayParams {
        DisplayParams {
            vat_rate,
            vat_included,
            currency: "EUR".to_string(),
            unit,
            precision: 4,
            timezone: "Europe/Copenhagen".to_string(),
        }
    }

    #[test]
    fn test_mwh_to_kwh_with_vat() {
        let mut raw = PriceMap::new();
        raw.insert("00:00".to_string(), 100.0);

        let out = apply_display_transform(&raw, &params(DisplayUnit::Kwh, 0.25, false));
        assert!((out["00:00"] - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_vat_included_is_not_applied_twice() {
        let mut raw = PriceMap::new();
        raw.insert("08:15".to_string(), 100.0);

        let out = apply_display_transform(&raw, &params(DisplayUnit::Mwh, 0.25, true));
        assert!((out["08:15"] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_precision_rounding() {
        let mut raw = PriceMap::new();
        raw.insert("12:00".to_string(), 123.456789);

        let mut p = params(DisplayUnit::Mwh, 0.0, false);
        p.precision = 2;
        let out = apply_display_transform(&raw, &p);
        assert!((out["12:00"] - 123.46).abs() < 1e-9);
    }

    #[test]
    fn test_input_not_modified() {
        let mut raw = PriceMap::new();
        raw.insert("00:00".to_string(), 100.0);
        let before = raw.clone();
        let _ = apply_display_transform(&raw, &params(DisplayUnit::Kwh, 0.25, false));
        assert_eq!(raw, before);
    }
}

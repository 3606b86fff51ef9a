//! Pairwise exchange-rate arithmetic and display formatting.
//!
//! All functions here are pure: they take a [`RateTable`] and currency codes and
//! never touch the network or the store.

use crate::core::error::{RateError, Result};
use crate::core::rates::{BASE_CURRENCY, RateTable};

/// Units of `to` per one unit of `from`, triangulated through USD.
///
/// Fails with [`RateError::UnknownCurrency`] when either code is missing from `rates`,
/// rather than producing a meaningless number.
pub fn get_exchange_rate(rates: &RateTable, from: &str, to: &str) -> Result<f64> {
    let lookup = |code: &str| {
        rates
            .rate(code)
            .ok_or_else(|| RateError::UnknownCurrency(code.to_string()))
    };

    if from == BASE_CURRENCY {
        return lookup(to);
    }
    if to == BASE_CURRENCY {
        return Ok(1.0 / lookup(from)?);
    }
    Ok(lookup(to)? / lookup(from)?)
}

pub fn convert(amount: f64, rate: f64) -> f64 {
    amount * rate
}

/// Inverse of [`convert`]: the source amount needed to obtain `amount` of the target.
pub fn convert_reverse(amount: f64, rate: f64) -> f64 {
    amount / rate
}

/// Formats a rate or amount for display.
///
/// Values below 0.1 in magnitude keep two significant figures with trailing zeros
/// dropped; everything else gets two decimal places. Zero is `"0"` and non-finite
/// input renders as an empty string.
pub fn format_for_display(value: f64) -> String {
    if !value.is_finite() {
        return String::new();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.abs() < 0.1 {
        return to_significant_figures(value, 2);
    }
    format!("{:.2}", round_half_away(value, 2))
}

/// Rounds to `decimals` places with ties away from zero, so 1.125 becomes 1.13.
/// `{:.N}` alone would round exact binary ties to even.
fn round_half_away(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn to_significant_figures(value: f64, figures: i32) -> String {
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (figures - 1 - magnitude).max(0);
    // Display of the rounded f64 drops trailing zeros, e.g. 0.0999 -> 0.1
    round_half_away(value, decimals).to_string()
}

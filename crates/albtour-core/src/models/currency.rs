use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Currencies shown on the info screen, in display order
pub const MAIN_CURRENCIES: [&str; 4] = ["eur", "usd", "gbp", "chf"];

/// Rates feed keyed by lowercase currency code, expressed per 1 ALL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub date: String,
    #[serde(default)]
    pub all: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrencyRate {
    pub code: String,
    /// Lek per one unit of `code`
    pub rate: f64,
}

impl ExchangeRates {
    /// How many lek one unit of `code` buys, rounded to 4 decimals.
    /// Returns 0.0 when the feed has no usable rate for the code.
    pub fn rate_to_lek(&self, code: &str) -> f64 {
        match self.all.get(&code.to_ascii_lowercase()) {
            Some(&per_lek) if per_lek != 0.0 => ((1.0 / per_lek) * 10_000.0).round() / 10_000.0,
            _ => 0.0,
        }
    }

    pub fn main_currencies(&self) -> Vec<CurrencyRate> {
        MAIN_CURRENCIES
            .iter()
            .map(|code| CurrencyRate {
                code: code.to_ascii_uppercase(),
                rate: self.rate_to_lek(code),
            })
            .collect()
    }
}

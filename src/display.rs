// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Price display helpers.
//!
//! Amounts reach us in several shapes (contract words, decimal strings,
//! converted floats); these helpers settle them into consistent display
//! values.

use ethers::types::U256;
use ethers::utils::format_units;

/// A price in one of the representations seen across the storefront.
#[derive(Debug, Clone)]
pub enum PriceValue {
    Big(U256),
    Text(String),
    Float(f64),
}

impl From<U256> for PriceValue {
    fn from(value: U256) -> Self {
        PriceValue::Big(value)
    }
}

impl From<f64> for PriceValue {
    fn from(value: f64) -> Self {
        PriceValue::Float(value)
    }
}

impl From<&str> for PriceValue {
    fn from(value: &str) -> Self {
        PriceValue::Text(value.to_string())
    }
}

/// Settle a price into a whole KES amount. Saturates on out-of-range
/// big-integer input; display only, never used for payment amounts.
pub fn to_whole(price: &PriceValue) -> u64 {
    match price {
        PriceValue::Big(value) => {
            if *value > U256::from(u64::MAX) {
                u64::MAX
            } else {
                value.as_u64()
            }
        }
        PriceValue::Text(text) => text
            .parse::<u64>()
            .or_else(|_| text.parse::<f64>().map(|f| f.round() as u64))
            .unwrap_or(0),
        PriceValue::Float(value) => value.round() as u64,
    }
}

/// `KES 1,500` style formatting.
pub fn format_kes(price: impl Into<PriceValue>) -> String {
    format!("KES {}", group_thousands(to_whole(&price.into())))
}

/// Thousands-grouped amount without the currency label.
pub fn format_amount(price: impl Into<PriceValue>) -> String {
    group_thousands(to_whole(&price.into()))
}

pub fn min_price(prices: &[f64; 3]) -> f64 {
    prices.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max_price(prices: &[f64; 3]) -> f64 {
    prices.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Native-unit amount as a short decimal string ("7.5" rather than
/// "7.500000000000000000").
pub fn format_native(value: U256) -> String {
    match format_units(value, "ether") {
        Ok(text) => {
            // format_units always emits a fractional part
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        Err(_) => value.to_string(),
    }
}

fn group_thousands(mut value: u64) -> String {
    let mut groups = Vec::new();
    loop {
        let group = value % 1000;
        value /= 1000;
        if value == 0 {
            groups.push(group.to_string());
            break;
        }
        groups.push(format!("{group:03}"));
    }
    groups.reverse();
    groups.join(",")
}

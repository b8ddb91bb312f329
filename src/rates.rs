// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Conversions between KES and the native unit.
//!
//! Every conversion fetches a fresh snapshot from the rate endpoint and
//! falls back to a fixed pair when the endpoint is unreachable. These
//! values are for display only; the purchase flow always pays the price
//! read from the contract, never a converted one.

use tracing::debug;
use url::Url;

use crate::types::ExchangeRate;

/// 1 KES in ETH when no live rate is available.
pub const FALLBACK_KES_TO_ETH: f64 = 0.0000075;

impl ExchangeRate {
    /// The fixed pair used when the rate endpoint cannot be reached. The
    /// reverse rate is the exact inverse so that a conversion round trip
    /// through the fallback returns the starting amount.
    pub fn fallback() -> Self {
        ExchangeRate {
            eth_to_kes: 1.0 / FALLBACK_KES_TO_ETH,
            kes_to_eth: FALLBACK_KES_TO_ETH,
        }
    }
}

pub struct RateService {
    rate_url: Url,
    http: reqwest::Client,
}

impl RateService {
    pub fn new(base: Url) -> Self {
        let rate_url = base
            .join("/api/exchange-rate")
            .unwrap_or_else(|_| base.clone());
        Self {
            rate_url,
            http: reqwest::Client::new(),
        }
    }

    async fn snapshot(&self) -> ExchangeRate {
        match self.fetch().await {
            Ok(rate) => rate,
            Err(err) => {
                debug!(%err, "exchange rate fetch failed, using fallback pair");
                ExchangeRate::fallback()
            }
        }
    }

    async fn fetch(&self) -> Result<ExchangeRate, reqwest::Error> {
        self.http
            .get(self.rate_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// KES amount to a native-unit decimal string.
    pub async fn kes_to_native(&self, kes: f64) -> String {
        kes_to_native_with(&self.snapshot().await, kes)
    }

    /// Native-unit decimal string to a KES amount.
    pub async fn native_to_kes(&self, native: &str) -> f64 {
        native_to_kes_with(&self.snapshot().await, native)
    }
}

pub fn kes_to_native_with(rate: &ExchangeRate, kes: f64) -> String {
    // parse_units rejects more than 18 fractional digits
    trim_fraction(format!("{}", kes * rate.kes_to_eth), 18)
}

pub fn native_to_kes_with(rate: &ExchangeRate, native: &str) -> f64 {
    let amount: f64 = native.parse().unwrap_or(0.0);
    amount * rate.eth_to_kes
}

fn trim_fraction(text: String, max_digits: usize) -> String {
    match text.find('.') {
        Some(dot) if text.len() - dot - 1 > max_digits => {
            let trimmed = text[..dot + 1 + max_digits]
                .trim_end_matches('0')
                .trim_end_matches('.');
            trimmed.to_string()
        }
        _ => text,
    }
}

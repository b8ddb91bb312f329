// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Domain types shared across the storefront.
//!
//! Prices on [Event] and [Ticket] are in the display currency (KES); the
//! ledger itself only ever sees native-unit amounts.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::StorefrontError;

/// The three ticket classes sold for every event. The ordinal doubles as
/// the index into the per-event price/supply/sold triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketTier {
    Regular = 0,
    Vip = 1,
    Vvip = 2,
}

impl TicketTier {
    pub const ALL: [TicketTier; 3] = [TicketTier::Regular, TicketTier::Vip, TicketTier::Vvip];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for TicketTier {
    type Error = StorefrontError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TicketTier::Regular),
            1 => Ok(TicketTier::Vip),
            2 => Ok(TicketTier::Vvip),
            _ => Err(StorefrontError::InvalidTicketTier),
        }
    }
}

impl std::fmt::Display for TicketTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TicketTier::Regular => "Regular",
            TicketTier::Vip => "VIP",
            TicketTier::Vvip => "VVIP",
        };
        f.write_str(label)
    }
}

/// An event as shown to users, with prices already converted to KES.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: u64,
    pub name: String,
    pub description: String,
    pub venue: String,
    /// Seconds since epoch.
    pub event_date: u64,
    /// KES per tier, indexed by [TicketTier].
    pub prices: [f64; 3],
    pub supply: [u64; 3],
    pub sold: [u64; 3],
    pub is_active: bool,
    pub creator: String,
}

/// A ticket owned by some account. `purchase_price` is the KES value at
/// purchase time and does not track later event price edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: u64,
    pub event_id: u64,
    pub owner: String,
    pub ticket_type: TicketTier,
    pub purchase_price: f64,
    /// Seconds since epoch.
    pub purchase_time: u64,
    pub is_used: bool,
    pub seat: Option<String>,
}

/// Inputs for creating or updating an event. Prices are KES; the
/// orchestration layer converts them to native units before submission.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub name: String,
    pub description: String,
    pub venue: String,
    /// Seconds since epoch.
    pub event_date: u64,
    pub prices_kes: [f64; 3],
    pub supply: [u64; 3],
}

/// Merged read-only snapshot returned by the verification flow.
#[derive(Debug, Clone)]
pub struct VerifiedTicket {
    pub is_valid: bool,
    pub is_used: bool,
    pub event_name: String,
    /// Seconds since epoch.
    pub event_date: u64,
    pub ticket: Ticket,
}

/// An event together with the per-tier remaining availability.
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    pub event: Event,
    pub available: [u64; 3],
}

/// One exchange-rate snapshot as served by the rate endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub eth_to_kes: f64,
    pub kes_to_eth: f64,
}

/// Milliseconds since epoch, clamped to zero on a pre-epoch clock.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Scannable ticket payloads.
//!
//! A ticket is serialized into a compact JSON payload carrying everything
//! a verification console needs, identifiers normalized to decimal
//! strings. Decoding is deliberately forgiving: anything that does not
//! parse is "not a ticket code", never an error.

use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorefrontError;
use crate::types::{now_millis, Ticket};

/// The fields a verification console reads back out of a scanned code.
/// `ticket_type`, `is_used` and `timestamp` default when a minimal
/// fallback payload is scanned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQrData {
    pub ticket_id: String,
    pub event_id: String,
    #[serde(default)]
    pub ticket_type: u8,
    pub owner: String,
    #[serde(default)]
    pub is_used: bool,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FullPayload<'a> {
    ticket_id: String,
    event_id: String,
    ticket_type: u8,
    owner: &'a str,
    is_used: bool,
    timestamp: u64,
    event_name: &'a str,
    /// Milliseconds since epoch.
    event_date: u64,
    verify_url: String,
    purchase_price: String,
    seat: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MinimalPayload<'a> {
    ticket_id: String,
    event_id: String,
    owner: &'a str,
    event_name: &'a str,
    verify_url: String,
}

/// Deep link a scanned code resolves to for manual verification.
pub fn verify_url(origin: &str, ticket_id: u64) -> String {
    format!("{}/verify?ticketId={ticket_id}", origin.trim_end_matches('/'))
}

/// The primary payload for a ticket.
pub fn encode_payload(
    ticket: &Ticket,
    event_name: &str,
    event_date_secs: u64,
    origin: &str,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&FullPayload {
        ticket_id: ticket.ticket_id.to_string(),
        event_id: ticket.event_id.to_string(),
        ticket_type: ticket.ticket_type.index() as u8,
        owner: &ticket.owner,
        is_used: ticket.is_used,
        timestamp: now_millis(),
        event_name,
        event_date: event_date_secs * 1000,
        verify_url: verify_url(origin, ticket.ticket_id),
        purchase_price: format!("{}", ticket.purchase_price),
        seat: ticket.seat.as_deref(),
    })
}

fn encode_minimal(
    ticket: &Ticket,
    event_name: &str,
    origin: &str,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&MinimalPayload {
        ticket_id: ticket.ticket_id.to_string(),
        event_id: ticket.event_id.to_string(),
        owner: &ticket.owner,
        event_name,
        verify_url: verify_url(origin, ticket.ticket_id),
    })
}

/// Render a ticket as a scannable code, falling back to a minimal payload
/// when the full one does not fit.
pub fn ticket_code(
    ticket: &Ticket,
    event_name: &str,
    event_date_secs: u64,
    origin: &str,
) -> Result<(String, QrCode), StorefrontError> {
    let primary_failure = match encode_payload(ticket, event_name, event_date_secs, origin) {
        Ok(payload) => match QrCode::new(payload.as_bytes()) {
            Ok(code) => return Ok((payload, code)),
            Err(err) => err.to_string(),
        },
        Err(err) => err.to_string(),
    };

    debug!(%primary_failure, "full ticket payload not encodable, trying minimal payload");

    if let Ok(payload) = encode_minimal(ticket, event_name, origin) {
        if let Ok(code) = QrCode::new(payload.as_bytes()) {
            return Ok((payload, code));
        }
    }

    Err(StorefrontError::QrEncodingFailed(primary_failure))
}

/// Parse a scanned payload. `None` means "not a recognized ticket code".
pub fn decode_payload(data: &str) -> Option<TicketQrData> {
    serde_json::from_str(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TicketTier;

    const ORIGIN: &str = "http://localhost:3000";

    fn ticket() -> Ticket {
        Ticket {
            ticket_id: 42,
            event_id: 7,
            owner: "0x00a329c0648769a73afac7f9381e08fb43dbea72".to_string(),
            ticket_type: TicketTier::Vip,
            purchase_price: 2_500.0,
            purchase_time: 1_700_000_000,
            is_used: false,
            seat: Some("Nairobi Jazz-1-1700000000000-0".to_string()),
        }
    }

    #[test]
    fn round_trip_preserves_identity() {
        let ticket = ticket();
        let payload = encode_payload(&ticket, "Nairobi Jazz", 1_750_000_000, ORIGIN).unwrap();
        let decoded = decode_payload(&payload).expect("payload should decode");

        assert_eq!(decoded.ticket_id, "42");
        assert_eq!(decoded.event_id, "7");
        assert_eq!(decoded.ticket_type, 1);
        assert_eq!(decoded.owner, ticket.owner);
        assert!(!decoded.is_used);
    }

    #[test]
    fn payload_carries_deep_link_and_date() {
        let payload = encode_payload(&ticket(), "Nairobi Jazz", 1_750_000_000, ORIGIN).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(
            value["verifyUrl"],
            "http://localhost:3000/verify?ticketId=42"
        );
        assert_eq!(value["eventDate"], 1_750_000_000_000u64);
        assert_eq!(value["purchasePrice"], "2500");
    }

    #[test]
    fn absent_seat_serializes_as_null() {
        let mut ticket = ticket();
        ticket.seat = None;
        let payload = encode_payload(&ticket, "Nairobi Jazz", 1_750_000_000, ORIGIN).unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert!(value["seat"].is_null());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_payload("not json at all").is_none());
        assert!(decode_payload("").is_none());
        let payload = encode_payload(&ticket(), "Nairobi Jazz", 1_750_000_000, ORIGIN).unwrap();
        let truncated = &payload[..payload.len() / 2];
        assert!(decode_payload(truncated).is_none());
    }

    #[test]
    fn oversized_payload_falls_back_to_minimal() {
        let mut ticket = ticket();
        ticket.seat = Some("s".repeat(4_000));
        let (payload, _code) = ticket_code(&ticket, "Nairobi Jazz", 1_750_000_000, ORIGIN)
            .expect("minimal payload should fit");
        let decoded = decode_payload(&payload).expect("fallback payload should decode");
        assert_eq!(decoded.ticket_id, "42");
        assert_eq!(decoded.event_id, "7");
        // minimal payload defaults the rest
        assert_eq!(decoded.ticket_type, 0);
        assert!(!decoded.is_used);
    }

    #[test]
    fn unencodable_ticket_is_an_error() {
        let mut ticket = ticket();
        ticket.owner = "o".repeat(4_000);
        let err = match ticket_code(&ticket, "Nairobi Jazz", 1_750_000_000, ORIGIN) {
            Ok(_) => panic!("owner is in both payloads, neither fits"),
            Err(err) => err,
        };
        assert!(matches!(err, StorefrontError::QrEncodingFailed(_)));
    }
}

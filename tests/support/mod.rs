// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! A scripted in-memory ledger mirroring the contract's observable
//! behaviour: same revert reasons, same one-ticket-per-call issuance,
//! same opaque estimation failures.

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::types::{Address, H256, U256};

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use blockticket::error::LedgerError;
use blockticket::ledger::{
    EventView, Ledger, SupplyView, TicketView, TxOutcome, VerificationView,
};
use blockticket::types::{EventDraft, TicketTier};

#[derive(Debug, Clone)]
pub struct FakeEvent {
    pub name: String,
    pub description: String,
    pub venue: String,
    pub event_date: u64,
    pub prices: [U256; 3],
    pub supply: [u64; 3],
    pub sold: [u64; 3],
    pub is_active: bool,
    pub creator: Address,
}

#[derive(Debug, Clone)]
pub struct FakeTicket {
    pub event_id: u64,
    pub owner: Address,
    pub tier: TicketTier,
    pub price: U256,
    pub purchase_time: u64,
    pub is_used: bool,
    pub seat: String,
}

#[derive(Debug, Default)]
pub struct LedgerState {
    pub events: HashMap<u64, FakeEvent>,
    pub tickets: HashMap<u64, FakeTicket>,
    pub balances: HashMap<Address, U256>,
    pub admins: HashSet<Address>,
    pub owner: Address,
    pub next_ticket_id: u64,
    /// When set, gas estimation fails opaquely with this message.
    pub estimate_outage: Option<String>,
    /// When set, the probe reverts with this reason instead of running
    /// the normal validation.
    pub probe_reason: Option<String>,
    /// When set, submissions fail with this error.
    pub submit_error: Option<LedgerError>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<LedgerState>,
    estimate_calls: AtomicU32,
    probe_calls: AtomicU32,
}

/// Cheaply cloneable handle; tests keep one clone for assertions and give
/// another to the box office.
#[derive(Clone, Default)]
pub struct FakeLedger {
    inner: Arc<Inner>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(self, event_id: u64, event: FakeEvent) -> Self {
        self.state().events.insert(event_id, event);
        self
    }

    pub fn with_balance(self, account: Address, amount: U256) -> Self {
        self.state().balances.insert(account, amount);
        self
    }

    pub fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.state.lock().expect("fake ledger state poisoned")
    }

    pub fn estimate_calls(&self) -> u32 {
        self.inner.estimate_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> u32 {
        self.inner.probe_calls.load(Ordering::SeqCst)
    }

    pub fn ticket_count(&self) -> usize {
        self.state().tickets.len()
    }

    pub fn ticket(&self, ticket_id: u64) -> Option<FakeTicket> {
        self.state().tickets.get(&ticket_id).cloned()
    }

    pub fn insert_ticket(&self, ticket_id: u64, ticket: FakeTicket) {
        self.state().tickets.insert(ticket_id, ticket);
    }

    pub fn set_estimate_outage(&self, message: &str) {
        self.state().estimate_outage = Some(message.to_string());
    }

    pub fn set_probe_reason(&self, reason: &str) {
        self.state().probe_reason = Some(reason.to_string());
    }

    pub fn set_submit_error(&self, error: LedgerError) {
        self.state().submit_error = Some(error);
    }
}

fn validate_purchase(
    state: &LedgerState,
    event_id: u64,
    tier: TicketTier,
    seat: &str,
    value: U256,
) -> Result<(), String> {
    let event = state
        .events
        .get(&event_id)
        .ok_or_else(|| "Event does not exist".to_string())?;
    if !event.is_active {
        return Err("Event is not active".to_string());
    }
    let index = tier.index();
    if event.sold[index] >= event.supply[index] {
        return Err("No tickets available for this type".to_string());
    }
    if value < event.prices[index] {
        return Err("Insufficient payment".to_string());
    }
    if state
        .tickets
        .values()
        .any(|ticket| ticket.event_id == event_id && ticket.seat == seat)
    {
        return Err("Seat already taken".to_string());
    }
    Ok(())
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn event_counter(&self) -> Result<u64, LedgerError> {
        Ok(self.state().events.keys().max().copied().unwrap_or(0))
    }

    async fn event_details(&self, event_id: u64) -> Result<EventView, LedgerError> {
        let state = self.state();
        let event = state
            .events
            .get(&event_id)
            .ok_or_else(|| LedgerError::Revert("Event does not exist".to_string()))?;
        Ok(EventView {
            name: event.name.clone(),
            description: event.description.clone(),
            venue: event.venue.clone(),
            event_date: event.event_date,
            prices: event.prices,
            is_active: event.is_active,
            creator: event.creator,
        })
    }

    async fn event_supply(&self, event_id: u64) -> Result<SupplyView, LedgerError> {
        let state = self.state();
        let event = state
            .events
            .get(&event_id)
            .ok_or_else(|| LedgerError::Revert("Event does not exist".to_string()))?;
        Ok(SupplyView {
            supply: event.supply,
            sold: event.sold,
        })
    }

    async fn available_tickets(&self, event_id: u64) -> Result<[u64; 3], LedgerError> {
        let supply = self.event_supply(event_id).await?;
        Ok([
            supply.supply[0] - supply.sold[0],
            supply.supply[1] - supply.sold[1],
            supply.supply[2] - supply.sold[2],
        ])
    }

    async fn balance_of(&self, account: Address) -> Result<U256, LedgerError> {
        Ok(self
            .state()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default())
    }

    async fn estimate_purchase(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
    ) -> Result<U256, LedgerError> {
        self.inner.estimate_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if let Some(message) = &state.estimate_outage {
            return Err(LedgerError::Rpc {
                code: None,
                message: message.clone(),
            });
        }
        // a doomed transaction fails estimation without a usable reason
        if validate_purchase(&state, event_id, tier, seat, value).is_err() {
            return Err(LedgerError::Rpc {
                code: None,
                message: "cannot estimate gas".to_string(),
            });
        }
        Ok(U256::from(90_000u64))
    }

    async fn probe_purchase(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
    ) -> Result<(), LedgerError> {
        self.inner.probe_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if let Some(reason) = &state.probe_reason {
            return Err(LedgerError::Revert(reason.clone()));
        }
        validate_purchase(&state, event_id, tier, seat, value).map_err(LedgerError::Revert)
    }

    async fn purchase_ticket(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
        _gas_limit: U256,
    ) -> Result<TxOutcome, LedgerError> {
        let mut state = self.state();
        if let Some(error) = state.submit_error.clone() {
            return Err(error);
        }
        validate_purchase(&state, event_id, tier, seat, value).map_err(LedgerError::Revert)?;

        state.next_ticket_id += 1;
        let ticket_id = state.next_ticket_id;
        if let Some(event) = state.events.get_mut(&event_id) {
            event.sold[tier.index()] += 1;
        }
        state.tickets.insert(
            ticket_id,
            FakeTicket {
                event_id,
                owner: Address::from([0xaa; 20]),
                tier,
                price: value,
                purchase_time: 1_700_000_000,
                is_used: false,
                seat: seat.to_string(),
            },
        );
        Ok(TxOutcome {
            tx_hash: H256::from_low_u64_be(ticket_id),
        })
    }

    async fn user_tickets(&self, owner: Address) -> Result<Vec<u64>, LedgerError> {
        let state = self.state();
        let mut ids: Vec<u64> = state
            .tickets
            .iter()
            .filter(|(_, ticket)| ticket.owner == owner)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn ticket_details(&self, ticket_id: u64) -> Result<TicketView, LedgerError> {
        let state = self.state();
        let ticket = state
            .tickets
            .get(&ticket_id)
            .ok_or_else(|| LedgerError::Revert("Ticket does not exist".to_string()))?;
        Ok(TicketView {
            event_id: ticket.event_id,
            owner: ticket.owner,
            ticket_type: ticket.tier,
            purchase_price: ticket.price,
            purchase_time: ticket.purchase_time,
            is_used: ticket.is_used,
            seat: ticket.seat.clone(),
        })
    }

    async fn verify_ticket(&self, ticket_id: u64) -> Result<VerificationView, LedgerError> {
        let state = self.state();
        let ticket = state
            .tickets
            .get(&ticket_id)
            .ok_or_else(|| LedgerError::Revert("Ticket does not exist".to_string()))?;
        let event = state
            .events
            .get(&ticket.event_id)
            .ok_or_else(|| LedgerError::Revert("Event does not exist".to_string()))?;
        Ok(VerificationView {
            is_valid: event.is_active,
            is_used: ticket.is_used,
            event_name: event.name.clone(),
            event_date: event.event_date,
        })
    }

    async fn use_ticket(&self, ticket_id: u64) -> Result<TxOutcome, LedgerError> {
        let mut state = self.state();
        let ticket = state
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| LedgerError::Revert("Ticket does not exist".to_string()))?;
        if ticket.is_used {
            return Err(LedgerError::Revert("Ticket already used".to_string()));
        }
        ticket.is_used = true;
        Ok(TxOutcome {
            tx_hash: H256::from_low_u64_be(ticket_id),
        })
    }

    async fn create_event(
        &self,
        draft: &EventDraft,
        prices_wei: [U256; 3],
    ) -> Result<TxOutcome, LedgerError> {
        let mut state = self.state();
        let event_id = state.events.keys().max().copied().unwrap_or(0) + 1;
        let creator = state.owner;
        state.events.insert(
            event_id,
            FakeEvent {
                name: draft.name.clone(),
                description: draft.description.clone(),
                venue: draft.venue.clone(),
                event_date: draft.event_date,
                prices: prices_wei,
                supply: draft.supply,
                sold: [0, 0, 0],
                is_active: true,
                creator,
            },
        );
        Ok(TxOutcome {
            tx_hash: H256::from_low_u64_be(event_id),
        })
    }

    async fn update_event(
        &self,
        event_id: u64,
        draft: &EventDraft,
        prices_wei: [U256; 3],
    ) -> Result<TxOutcome, LedgerError> {
        let mut state = self.state();
        let event = state
            .events
            .get_mut(&event_id)
            .ok_or_else(|| LedgerError::Revert("Event does not exist".to_string()))?;
        event.name = draft.name.clone();
        event.description = draft.description.clone();
        event.venue = draft.venue.clone();
        event.event_date = draft.event_date;
        event.prices = prices_wei;
        event.supply = draft.supply;
        Ok(TxOutcome {
            tx_hash: H256::from_low_u64_be(event_id),
        })
    }

    async fn delete_event(&self, event_id: u64) -> Result<TxOutcome, LedgerError> {
        let mut state = self.state();
        let event = state
            .events
            .get_mut(&event_id)
            .ok_or_else(|| LedgerError::Revert("Event does not exist".to_string()))?;
        event.is_active = false;
        Ok(TxOutcome {
            tx_hash: H256::from_low_u64_be(event_id),
        })
    }

    async fn add_admin(&self, account: Address) -> Result<TxOutcome, LedgerError> {
        self.state().admins.insert(account);
        Ok(TxOutcome {
            tx_hash: H256::from_low_u64_be(1),
        })
    }

    async fn remove_admin(&self, account: Address) -> Result<TxOutcome, LedgerError> {
        self.state().admins.remove(&account);
        Ok(TxOutcome {
            tx_hash: H256::from_low_u64_be(1),
        })
    }

    async fn is_admin(&self, account: Address) -> Result<bool, LedgerError> {
        Ok(self.state().admins.contains(&account))
    }

    async fn contract_owner(&self) -> Result<Address, LedgerError> {
        Ok(self.state().owner)
    }
}

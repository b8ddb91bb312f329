// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Purchase, verification and administration flows.
//!
//! Every operation is a self-contained request/response cycle against the
//! ledger. Client-side precondition checks are a fast-fail optimisation
//! only: the ledger may change between a read and the write it protects,
//! and a conflict discovered at estimate/submit time is the authoritative
//! failure path.

use ethers::types::{Address, U256};
use ethers::utils::parse_units;
use tokio::try_join;
use tracing::{debug, info};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::display::format_native;
use crate::error::{LedgerError, StorefrontError, RPC_INTERNAL_CODE, USER_REJECTED_CODE};
use crate::ledger::{Ledger, TxOutcome};
use crate::rates::RateService;
use crate::types::{now_millis, Event, EventDraft, EventSnapshot, Ticket, TicketTier, VerifiedTicket};
use crate::wallet::WalletSession;

/// Submitted gas limit as a percentage of the estimate, to absorb drift
/// between estimation and submission.
const GAS_LIMIT_PERCENT: u64 = 150;

pub struct BoxOffice<L> {
    ledger: L,
    rates: RateService,
    session: Arc<WalletSession>,
    busy: AtomicBool,
}

/// Clears the loading flag when the flow ends, successful or not.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<L: Ledger> BoxOffice<L> {
    pub fn new(ledger: L, rates: RateService, session: Arc<WalletSession>) -> Self {
        Self {
            ledger,
            rates,
            session,
            busy: AtomicBool::new(false),
        }
    }

    /// True while a state-changing flow is in flight. Callers use this to
    /// suppress duplicate submissions of the same action.
    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn begin(&self) -> LoadingGuard<'_> {
        self.busy.store(true, Ordering::SeqCst);
        LoadingGuard(&self.busy)
    }

    /// Buy `quantity` tickets of one tier. The contract issues one ticket
    /// per call, so units are purchased strictly sequentially; the batch
    /// stops at the first failure and earlier units stay purchased.
    pub async fn purchase_tickets(
        &self,
        event_id: u64,
        tier: TicketTier,
        quantity: u32,
    ) -> Result<Vec<TxOutcome>, StorefrontError> {
        let buyer = self
            .session
            .address()
            .ok_or(StorefrontError::WalletNotConnected)?;
        let _guard = self.begin();

        let details = self
            .ledger
            .event_details(event_id)
            .await
            .map_err(read_failure)?;

        let mut outcomes = Vec::with_capacity(quantity as usize);
        for index in 0..quantity {
            let seat = format!("{}-{}-{}-{index}", details.name, tier.index(), now_millis());
            outcomes.push(self.purchase_one(event_id, tier, &seat, buyer).await?);
        }
        Ok(outcomes)
    }

    async fn purchase_one(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        buyer: Address,
    ) -> Result<TxOutcome, StorefrontError> {
        // the price actually charged is read fresh from the ledger, never
        // taken from a display conversion
        let details = self
            .ledger
            .event_details(event_id)
            .await
            .map_err(read_failure)?;
        if !details.is_active {
            return Err(StorefrontError::EventInactive);
        }

        let available = self.ledger.available_tickets(event_id).await.map_err(|err| {
            StorefrontError::Unclassified(format!("Unable to check ticket availability: {err}"))
        })?;
        if available[tier.index()] == 0 {
            return Err(StorefrontError::SoldOut);
        }

        let price = details.prices[tier.index()];
        let required = format_native(price);

        let balance = self
            .ledger
            .balance_of(buyer)
            .await
            .map_err(read_failure)?;
        let available_funds = format_native(balance);
        if balance < price {
            return Err(StorefrontError::InsufficientFunds {
                available: available_funds,
                required,
            });
        }

        let estimate = match self
            .ledger
            .estimate_purchase(event_id, tier, seat, price)
            .await
        {
            Ok(estimate) => estimate,
            Err(err) => {
                // a failed estimate carries no actionable detail; probe the
                // same entry point to recover the decline reason
                debug!(%err, "gas estimation failed, probing for decline reason");
                return Err(self.diagnose_decline(event_id, tier, seat, price, &required).await);
            }
        };

        let gas_limit = estimate * U256::from(GAS_LIMIT_PERCENT) / U256::from(100u64);
        match self
            .ledger
            .purchase_ticket(event_id, tier, seat, price, gas_limit)
            .await
        {
            Ok(outcome) => {
                info!(tx = ?outcome.tx_hash, seat, "ticket purchased");
                Ok(outcome)
            }
            Err(err) => Err(classify_submission(err, &available_funds, &required)),
        }
    }

    async fn diagnose_decline(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        price: U256,
        required: &str,
    ) -> StorefrontError {
        match self.ledger.probe_purchase(event_id, tier, seat, price).await {
            Err(LedgerError::Revert(reason)) => classify_revert(&reason, required)
                .unwrap_or(StorefrontError::Unclassified(reason)),
            Err(other) => StorefrontError::Unclassified(other.to_string()),
            Ok(()) => StorefrontError::Unclassified("Transaction would fail".to_string()),
        }
    }

    /// Fetch the validity summary and the full ticket record together.
    /// Any failure collapses into [StorefrontError::InvalidTicket]: the
    /// verification console does not distinguish causes.
    pub async fn verify_ticket(&self, ticket_id: u64) -> Result<VerifiedTicket, StorefrontError> {
        match try_join!(
            self.ledger.verify_ticket(ticket_id),
            self.load_ticket(ticket_id)
        ) {
            Ok((verification, ticket)) => Ok(VerifiedTicket {
                is_valid: verification.is_valid,
                is_used: verification.is_used,
                event_name: verification.event_name,
                event_date: verification.event_date,
                ticket,
            }),
            Err(err) => {
                debug!(%err, ticket_id, "ticket verification failed");
                Err(StorefrontError::InvalidTicket)
            }
        }
    }

    /// Mark a ticket as used. The one-way transition is enforced by the
    /// ledger; a rejection surfaces generically.
    pub async fn check_in(&self, ticket_id: u64) -> Result<TxOutcome, StorefrontError> {
        let _guard = self.begin();
        match self.ledger.use_ticket(ticket_id).await {
            Ok(outcome) => {
                info!(ticket_id, "ticket marked as used");
                Ok(outcome)
            }
            Err(err) => Err(StorefrontError::Unclassified(format!(
                "Could not mark ticket as used: {err}"
            ))),
        }
    }

    pub async fn create_event(&self, draft: &EventDraft) -> Result<TxOutcome, StorefrontError> {
        let _guard = self.begin();
        let prices_wei = self.convert_prices(draft.prices_kes).await?;
        match self.ledger.create_event(draft, prices_wei).await {
            Ok(outcome) => {
                info!(name = %draft.name, "event created");
                Ok(outcome)
            }
            Err(err) => Err(write_failure(err)),
        }
    }

    pub async fn update_event(
        &self,
        event_id: u64,
        draft: &EventDraft,
    ) -> Result<TxOutcome, StorefrontError> {
        let _guard = self.begin();
        let prices_wei = self.convert_prices(draft.prices_kes).await?;
        match self.ledger.update_event(event_id, draft, prices_wei).await {
            Ok(outcome) => {
                info!(event_id, "event updated");
                Ok(outcome)
            }
            Err(err) => Err(write_failure(err)),
        }
    }

    /// Deletion is logical: the ledger only flips the event inactive.
    pub async fn delete_event(&self, event_id: u64) -> Result<TxOutcome, StorefrontError> {
        let _guard = self.begin();
        match self.ledger.delete_event(event_id).await {
            Ok(outcome) => {
                info!(event_id, "event deleted (marked inactive)");
                Ok(outcome)
            }
            Err(err) => Err(write_failure(err)),
        }
    }

    pub async fn add_admin(&self, account: Address) -> Result<TxOutcome, StorefrontError> {
        let _guard = self.begin();
        match self.ledger.add_admin(account).await {
            Ok(outcome) => {
                info!(account = ?account, "admin added");
                Ok(outcome)
            }
            Err(err) => Err(admin_failure(AdminAction::Add, err)),
        }
    }

    pub async fn remove_admin(&self, account: Address) -> Result<TxOutcome, StorefrontError> {
        let _guard = self.begin();
        match self.ledger.remove_admin(account).await {
            Ok(outcome) => {
                info!(account = ?account, "admin removed");
                Ok(outcome)
            }
            Err(err) => Err(admin_failure(AdminAction::Remove, err)),
        }
    }

    pub async fn event_details(&self, event_id: u64) -> Result<EventSnapshot, StorefrontError> {
        let details = self
            .ledger
            .event_details(event_id)
            .await
            .map_err(read_failure)?;
        let supply = self
            .ledger
            .event_supply(event_id)
            .await
            .map_err(read_failure)?;
        let available = self
            .ledger
            .available_tickets(event_id)
            .await
            .map_err(read_failure)?;

        let mut prices = [0.0; 3];
        for (slot, wei) in prices.iter_mut().zip(details.prices) {
            *slot = self.rates.native_to_kes(&format_native(wei)).await;
        }

        Ok(EventSnapshot {
            event: Event {
                event_id,
                name: details.name,
                description: details.description,
                venue: details.venue,
                event_date: details.event_date,
                prices,
                supply: supply.supply,
                sold: supply.sold,
                is_active: details.is_active,
                creator: format!("{:?}", details.creator),
            },
            available,
        })
    }

    /// All events issued so far, skipping any that fail to load.
    pub async fn list_events(&self) -> Vec<EventSnapshot> {
        let counter = self.event_counter().await;
        let mut events = Vec::new();
        for event_id in 1..=counter {
            match self.event_details(event_id).await {
                Ok(snapshot) => events.push(snapshot),
                Err(err) => debug!(event_id, %err, "skipping unloadable event"),
            }
        }
        events
    }

    pub async fn user_tickets(&self, owner: Address) -> Result<Vec<Ticket>, StorefrontError> {
        let ids = self
            .ledger
            .user_tickets(owner)
            .await
            .map_err(read_failure)?;
        let mut tickets = Vec::with_capacity(ids.len());
        for ticket_id in ids {
            tickets.push(self.load_ticket(ticket_id).await.map_err(read_failure)?);
        }
        Ok(tickets)
    }

    pub async fn ticket(&self, ticket_id: u64) -> Result<Ticket, StorefrontError> {
        self.load_ticket(ticket_id).await.map_err(read_failure)
    }

    async fn load_ticket(&self, ticket_id: u64) -> Result<Ticket, LedgerError> {
        let view = self.ledger.ticket_details(ticket_id).await?;
        let purchase_price = self
            .rates
            .native_to_kes(&format_native(view.purchase_price))
            .await;
        Ok(Ticket {
            ticket_id,
            event_id: view.event_id,
            owner: format!("{:?}", view.owner),
            ticket_type: view.ticket_type,
            purchase_price,
            purchase_time: view.purchase_time,
            is_used: view.is_used,
            seat: if view.seat.is_empty() {
                None
            } else {
                Some(view.seat)
            },
        })
    }

    pub async fn event_counter(&self) -> u64 {
        match self.ledger.event_counter().await {
            Ok(counter) => counter,
            Err(err) => {
                debug!(%err, "failed to read event counter");
                0
            }
        }
    }

    pub async fn check_admin(&self, account: Address) -> bool {
        match self.ledger.is_admin(account).await {
            Ok(is_admin) => is_admin,
            Err(err) => {
                debug!(%err, "failed to check admin status");
                false
            }
        }
    }

    pub async fn contract_owner(&self) -> Option<Address> {
        match self.ledger.contract_owner().await {
            Ok(owner) => Some(owner),
            Err(err) => {
                debug!(%err, "failed to read contract owner");
                None
            }
        }
    }

    async fn convert_prices(&self, prices_kes: [f64; 3]) -> Result<[U256; 3], StorefrontError> {
        let mut wei = [U256::zero(); 3];
        for (slot, kes) in wei.iter_mut().zip(prices_kes) {
            let native = self.rates.kes_to_native(kes).await;
            *slot = parse_units(&native, "ether")
                .map_err(|err| {
                    StorefrontError::Unclassified(format!("Failed to convert price: {err}"))
                })?
                .into();
        }
        Ok(wei)
    }
}

/// Map the revert reasons the contract is known to emit onto the
/// storefront taxonomy.
fn classify_revert(reason: &str, required: &str) -> Option<StorefrontError> {
    if reason.contains("Event does not exist") {
        Some(StorefrontError::EventNotFound)
    } else if reason.contains("Event is not active") {
        Some(StorefrontError::EventInactive)
    } else if reason.contains("Ticket type does not exist") {
        Some(StorefrontError::InvalidTicketTier)
    } else if reason.contains("No tickets available") {
        Some(StorefrontError::SoldOut)
    } else if reason.contains("Insufficient payment") {
        Some(StorefrontError::InsufficientPayment {
            required: required.to_string(),
        })
    } else if reason.contains("Seat already taken") {
        Some(StorefrontError::SeatTaken)
    } else {
        None
    }
}

fn classify_submission(err: LedgerError, available: &str, required: &str) -> StorefrontError {
    match err {
        LedgerError::Rpc {
            code: Some(USER_REJECTED_CODE),
            ..
        } => StorefrontError::UserRejected,
        LedgerError::Rpc {
            code: Some(RPC_INTERNAL_CODE),
            ..
        } => StorefrontError::NetworkOrNodeFailure,
        LedgerError::Rpc { message, .. } if message.contains("missing revert data") => {
            StorefrontError::Unclassified(
                "Contract call failed - please check the contract address and ensure the event exists"
                    .to_string(),
            )
        }
        LedgerError::Rpc { message, .. } if message.contains("insufficient funds") => {
            StorefrontError::InsufficientFunds {
                available: available.to_string(),
                required: required.to_string(),
            }
        }
        LedgerError::Revert(reason) => {
            classify_revert(&reason, required).unwrap_or(StorefrontError::Unclassified(reason))
        }
        other => StorefrontError::Unclassified(other.to_string()),
    }
}

fn read_failure(err: LedgerError) -> StorefrontError {
    match err {
        LedgerError::Revert(reason) => {
            classify_revert(&reason, "").unwrap_or(StorefrontError::Unclassified(reason))
        }
        other => StorefrontError::Unclassified(other.to_string()),
    }
}

fn write_failure(err: LedgerError) -> StorefrontError {
    match err {
        LedgerError::Rpc {
            code: Some(USER_REJECTED_CODE),
            ..
        } => StorefrontError::UserRejected,
        other => StorefrontError::Unclassified(other.to_string()),
    }
}

enum AdminAction {
    Add,
    Remove,
}

fn admin_failure(action: AdminAction, err: LedgerError) -> StorefrontError {
    match err {
        LedgerError::Rpc {
            code: Some(USER_REJECTED_CODE),
            ..
        } => StorefrontError::UserRejected,
        LedgerError::Revert(reason) if reason.contains("Only owner") => {
            StorefrontError::Unclassified(match action {
                AdminAction::Add => "Only the contract owner can add admins".to_string(),
                AdminAction::Remove => "Only the contract owner can remove admins".to_string(),
            })
        }
        LedgerError::Revert(reason) if reason.contains("Cannot remove owner") => {
            StorefrontError::Unclassified(
                "Cannot remove the contract owner from admin role".to_string(),
            )
        }
        LedgerError::Revert(reason) if reason.contains("Invalid address") => {
            StorefrontError::Unclassified("Invalid address provided".to_string())
        }
        other => StorefrontError::Unclassified(other.to_string()),
    }
}

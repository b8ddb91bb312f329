// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! The ledger boundary.
//!
//! [Ledger] is the narrow capability interface the orchestration layer
//! works against; [EvmLedger] is the production implementation over the
//! contract bindings. Counters and identifiers are narrowed to `u64` at
//! this boundary, with out-of-range values reported rather than
//! truncated. Value amounts stay as full-width words.

use async_trait::async_trait;
use ethers::contract::builders::ContractCall;
use ethers::prelude::*;

use std::sync::Arc;

use crate::abi::TicketOffice;
use crate::client::{Client, EthClient};
use crate::error::LedgerError;
use crate::types::{EventDraft, TicketTier};

/// Raw event details as stored on the ledger; prices in native units.
#[derive(Debug, Clone)]
pub struct EventView {
    pub name: String,
    pub description: String,
    pub venue: String,
    pub event_date: u64,
    pub prices: [U256; 3],
    pub is_active: bool,
    pub creator: Address,
}

#[derive(Debug, Clone, Copy)]
pub struct SupplyView {
    pub supply: [u64; 3],
    pub sold: [u64; 3],
}

/// Raw per-ticket record; `purchase_price` in native units.
#[derive(Debug, Clone)]
pub struct TicketView {
    pub event_id: u64,
    pub owner: Address,
    pub ticket_type: TicketTier,
    pub purchase_price: U256,
    pub purchase_time: u64,
    pub is_used: bool,
    pub seat: String,
}

/// The validity/usage summary the contract exposes for verification.
#[derive(Debug, Clone)]
pub struct VerificationView {
    pub is_valid: bool,
    pub is_used: bool,
    pub event_name: String,
    pub event_date: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TxOutcome {
    pub tx_hash: H256,
}

/// Everything the storefront needs from the ticketing contract.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn event_counter(&self) -> Result<u64, LedgerError>;

    async fn event_details(&self, event_id: u64) -> Result<EventView, LedgerError>;

    async fn event_supply(&self, event_id: u64) -> Result<SupplyView, LedgerError>;

    async fn available_tickets(&self, event_id: u64) -> Result<[u64; 3], LedgerError>;

    async fn balance_of(&self, account: Address) -> Result<U256, LedgerError>;

    async fn estimate_purchase(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
    ) -> Result<U256, LedgerError>;

    /// Non-mutating probe of the purchase entry point, used to recover a
    /// decline reason after an opaque estimation failure.
    async fn probe_purchase(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
    ) -> Result<(), LedgerError>;

    async fn purchase_ticket(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
        gas_limit: U256,
    ) -> Result<TxOutcome, LedgerError>;

    async fn user_tickets(&self, owner: Address) -> Result<Vec<u64>, LedgerError>;

    async fn ticket_details(&self, ticket_id: u64) -> Result<TicketView, LedgerError>;

    async fn verify_ticket(&self, ticket_id: u64) -> Result<VerificationView, LedgerError>;

    async fn use_ticket(&self, ticket_id: u64) -> Result<TxOutcome, LedgerError>;

    async fn create_event(
        &self,
        draft: &EventDraft,
        prices_wei: [U256; 3],
    ) -> Result<TxOutcome, LedgerError>;

    async fn update_event(
        &self,
        event_id: u64,
        draft: &EventDraft,
        prices_wei: [U256; 3],
    ) -> Result<TxOutcome, LedgerError>;

    async fn delete_event(&self, event_id: u64) -> Result<TxOutcome, LedgerError>;

    async fn add_admin(&self, account: Address) -> Result<TxOutcome, LedgerError>;

    async fn remove_admin(&self, account: Address) -> Result<TxOutcome, LedgerError>;

    async fn is_admin(&self, account: Address) -> Result<bool, LedgerError>;

    async fn contract_owner(&self) -> Result<Address, LedgerError>;
}

/// Production ledger over the deployed contract.
pub struct EvmLedger {
    contract: TicketOffice<EthClient>,
    provider: Arc<EthClient>,
}

impl EvmLedger {
    pub fn new(client: &Client) -> Self {
        Self {
            contract: client.contract(),
            provider: client.provider(),
        }
    }

    fn purchase_call(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
    ) -> ContractCall<EthClient, ()> {
        self.contract
            .purchase_ticket(U256::from(event_id), tier.index() as u8, seat.to_string())
            .value(value)
    }

    async fn submit(&self, call: ContractCall<EthClient, ()>) -> Result<TxOutcome, LedgerError> {
        let pending = call.send().await.map_err(contract_error)?;
        let receipt = pending
            .await
            .map_err(middleware_error)?
            .ok_or(LedgerError::MissingReceipt)?;
        Ok(TxOutcome {
            tx_hash: receipt.transaction_hash,
        })
    }
}

#[async_trait]
impl Ledger for EvmLedger {
    async fn event_counter(&self) -> Result<u64, LedgerError> {
        let counter = self
            .contract
            .event_counter()
            .call()
            .await
            .map_err(contract_error)?;
        narrow_u64(counter, "event counter")
    }

    async fn event_details(&self, event_id: u64) -> Result<EventView, LedgerError> {
        let (name, description, venue, event_date, prices, is_active, creator) = self
            .contract
            .get_event_details(U256::from(event_id))
            .call()
            .await
            .map_err(contract_error)?;
        Ok(EventView {
            name,
            description,
            venue,
            event_date: narrow_u64(event_date, "event date")?,
            prices,
            is_active,
            creator,
        })
    }

    async fn event_supply(&self, event_id: u64) -> Result<SupplyView, LedgerError> {
        let (supply, sold) = self
            .contract
            .get_event_supply(U256::from(event_id))
            .call()
            .await
            .map_err(contract_error)?;
        Ok(SupplyView {
            supply: narrow_triple(supply, "supply")?,
            sold: narrow_triple(sold, "sold")?,
        })
    }

    async fn available_tickets(&self, event_id: u64) -> Result<[u64; 3], LedgerError> {
        let available = self
            .contract
            .get_available_tickets(U256::from(event_id))
            .call()
            .await
            .map_err(contract_error)?;
        narrow_triple(available, "availability")
    }

    async fn balance_of(&self, account: Address) -> Result<U256, LedgerError> {
        self.provider
            .get_balance(account, None)
            .await
            .map_err(middleware_error)
    }

    async fn estimate_purchase(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
    ) -> Result<U256, LedgerError> {
        self.purchase_call(event_id, tier, seat, value)
            .estimate_gas()
            .await
            .map_err(contract_error)
    }

    async fn probe_purchase(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
    ) -> Result<(), LedgerError> {
        self.purchase_call(event_id, tier, seat, value)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn purchase_ticket(
        &self,
        event_id: u64,
        tier: TicketTier,
        seat: &str,
        value: U256,
        gas_limit: U256,
    ) -> Result<TxOutcome, LedgerError> {
        let call = self.purchase_call(event_id, tier, seat, value).gas(gas_limit);
        self.submit(call).await
    }

    async fn user_tickets(&self, owner: Address) -> Result<Vec<u64>, LedgerError> {
        let ids = self
            .contract
            .get_user_tickets(owner)
            .call()
            .await
            .map_err(contract_error)?;
        ids.into_iter()
            .map(|id| narrow_u64(id, "ticket id"))
            .collect()
    }

    async fn ticket_details(&self, ticket_id: u64) -> Result<TicketView, LedgerError> {
        let (event_id, owner, ticket_type, purchase_price, purchase_time, is_used, seat) = self
            .contract
            .get_ticket_details(U256::from(ticket_id))
            .call()
            .await
            .map_err(contract_error)?;
        let ticket_type = TicketTier::try_from(ticket_type)
            .map_err(|_| LedgerError::OutOfRange(format!("ticket tier {ticket_type}")))?;
        Ok(TicketView {
            event_id: narrow_u64(event_id, "event id")?,
            owner,
            ticket_type,
            purchase_price,
            purchase_time: narrow_u64(purchase_time, "purchase time")?,
            is_used,
            seat,
        })
    }

    async fn verify_ticket(&self, ticket_id: u64) -> Result<VerificationView, LedgerError> {
        let (is_valid, is_used, event_name, event_date) = self
            .contract
            .verify_ticket(U256::from(ticket_id))
            .call()
            .await
            .map_err(contract_error)?;
        Ok(VerificationView {
            is_valid,
            is_used,
            event_name,
            event_date: narrow_u64(event_date, "event date")?,
        })
    }

    async fn use_ticket(&self, ticket_id: u64) -> Result<TxOutcome, LedgerError> {
        self.submit(self.contract.use_ticket(U256::from(ticket_id)))
            .await
    }

    async fn create_event(
        &self,
        draft: &EventDraft,
        prices_wei: [U256; 3],
    ) -> Result<TxOutcome, LedgerError> {
        let call = self.contract.create_event(
            draft.name.clone(),
            draft.description.clone(),
            draft.venue.clone(),
            U256::from(draft.event_date),
            prices_wei,
            draft.supply.map(U256::from),
        );
        self.submit(call).await
    }

    async fn update_event(
        &self,
        event_id: u64,
        draft: &EventDraft,
        prices_wei: [U256; 3],
    ) -> Result<TxOutcome, LedgerError> {
        let call = self.contract.update_event_details(
            U256::from(event_id),
            draft.name.clone(),
            draft.description.clone(),
            draft.venue.clone(),
            U256::from(draft.event_date),
            prices_wei,
            draft.supply.map(U256::from),
        );
        self.submit(call).await
    }

    async fn delete_event(&self, event_id: u64) -> Result<TxOutcome, LedgerError> {
        self.submit(self.contract.delete_event(U256::from(event_id)))
            .await
    }

    async fn add_admin(&self, account: Address) -> Result<TxOutcome, LedgerError> {
        self.submit(self.contract.add_admin(account)).await
    }

    async fn remove_admin(&self, account: Address) -> Result<TxOutcome, LedgerError> {
        self.submit(self.contract.remove_admin(account)).await
    }

    async fn is_admin(&self, account: Address) -> Result<bool, LedgerError> {
        self.contract
            .admins(account)
            .call()
            .await
            .map_err(contract_error)
    }

    async fn contract_owner(&self) -> Result<Address, LedgerError> {
        self.contract.owner().call().await.map_err(contract_error)
    }
}

fn contract_error(err: ContractError<EthClient>) -> LedgerError {
    if let Some(reason) = err.decode_revert::<String>() {
        return LedgerError::Revert(reason);
    }
    if err.as_revert().is_some() {
        // revert payload present but not an Error(string)
        return LedgerError::Revert(err.to_string());
    }
    middleware_error(err)
}

fn middleware_error(err: impl std::fmt::Display) -> LedgerError {
    let message = err.to_string();
    LedgerError::Rpc {
        code: extract_rpc_code(&message),
        message,
    }
}

// Provider errors render the JSON-RPC payload as `(code: <n>, message: ...)`.
fn extract_rpc_code(message: &str) -> Option<i64> {
    let rest = &message[message.find("code: ")? + "code: ".len()..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '-')
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

pub fn narrow_u64(value: U256, what: &str) -> Result<u64, LedgerError> {
    if value > U256::from(u64::MAX) {
        Err(LedgerError::OutOfRange(format!("{what} {value}")))
    } else {
        Ok(value.as_u64())
    }
}

fn narrow_triple(values: [U256; 3], what: &str) -> Result<[u64; 3], LedgerError> {
    Ok([
        narrow_u64(values[0], what)?,
        narrow_u64(values[1], what)?,
        narrow_u64(values[2], what)?,
    ])
}

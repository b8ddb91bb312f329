// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Calling out to the EVM node.
//!
//! Wraps the provider/signer pair every storefront command works through.

use anyhow::Result;
use ethers::prelude::*;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::U256;

use std::sync::Arc;
use std::time::Duration;

use crate::abi::TicketOffice;
use crate::config::Config;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The middleware stack used for every contract interaction.
pub type EthClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Client for the ticketing contract's chain.
#[derive(Debug)]
pub struct Client {
    client: Arc<EthClient>,
    wallet: LocalWallet,
    contract_address: H160,
    chain_id: u64,
}

impl Client {
    pub async fn new(config: &Config) -> Result<Self> {
        let provider =
            Provider::<Http>::try_from(config.endpoint())?.interval(DEFAULT_POLL_INTERVAL);

        let chain_id = provider.get_chainid().await?.as_u64();
        let wallet = config
            .wallet()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No wallet is configured. Add one with `blockticket configure --wallet-sk`."
                )
            })?
            .with_chain_id(chain_id);

        let provider = provider.with_signer(wallet.clone());

        Ok(Self {
            client: provider.into(),
            wallet,
            contract_address: config.contract(),
            chain_id,
        })
    }

    pub fn provider(&self) -> Arc<EthClient> {
        self.client.clone()
    }

    /// Handle on the deployed ticketing contract.
    pub fn contract(&self) -> TicketOffice<EthClient> {
        TicketOffice::new(self.contract_address, self.client.clone())
    }

    pub fn address(&self) -> H160 {
        self.wallet.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub async fn gas_price(&self) -> Result<U256> {
        let price = self.client.get_gas_price().await?;
        Ok(price)
    }

    pub async fn balance(&self, address: H160) -> Result<U256> {
        let balance = self.client.get_balance(address, None).await?;
        Ok(balance)
    }
}

// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Storefront configuration.
//!
//! The following is maintained in the config:
//! - EVM RPC endpoint and the address of the deployed ticketing contract
//! - public storefront origin, used for QR verification deep links
//! - base URL of the exchange-rate service
//! - optional signing account for purchases and admin actions
//!
//! The config lives at `$XDG_CONFIG_DIR/blockticket/config.json` by default.

use anyhow::Result;
use ethers::core::k256::elliptic_curve::SecretKey;
use ethers::core::k256::Secp256k1;
use ethers::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::fs::{read, write};
use tokio::task::spawn_blocking;

use std::path::{Path, PathBuf};

pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    endpoint: String,
    contract: H160,
    origin: String,
    rate_endpoint: String,
    wallet: Option<Account>,
}

/// Fields that `blockticket configure` may set or overwrite.
#[derive(Debug, Default)]
pub struct ConfigUpdate {
    pub endpoint: Option<String>,
    pub contract: Option<H160>,
    pub origin: Option<String>,
    pub rate_endpoint: Option<String>,
    pub wallet_sk: Option<String>,
}

impl Config {
    pub async fn configure(
        path: &(impl AsRef<Path> + std::fmt::Debug),
        update: ConfigUpdate,
    ) -> Result<()> {
        let mut config = match Self::load(path).await {
            Ok(config) => config,
            Err(_) => {
                let endpoint = update
                    .endpoint
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("--endpoint is required on first configure"))?;
                let contract = update
                    .contract
                    .ok_or_else(|| anyhow::anyhow!("--contract is required on first configure"))?;
                Config {
                    endpoint,
                    contract,
                    origin: DEFAULT_ORIGIN.to_string(),
                    rate_endpoint: DEFAULT_ORIGIN.to_string(),
                    wallet: None,
                }
            }
        };

        if let Some(endpoint) = update.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(contract) = update.contract {
            config.contract = contract;
        }
        if let Some(origin) = update.origin {
            config.origin = origin;
        }
        if let Some(rate_endpoint) = update.rate_endpoint {
            config.rate_endpoint = rate_endpoint;
        }
        if let Some(sk) = update.wallet_sk {
            config.wallet = Some(Account {
                sk: eth_sk_from_str(sk)?,
            });
        }

        config.save(path).await?;
        Ok(())
    }

    pub async fn load(path: &impl AsRef<Path>) -> Result<Self> {
        let config = read(path).await?;
        let config = serde_json::from_slice(config.as_ref())?;
        Ok(config)
    }

    pub async fn save(&self, path: &impl AsRef<Path>) -> Result<()> {
        let config = serde_json::to_vec_pretty(self)?;
        write(path, config).await?;
        Ok(())
    }

    /// `$XDG_CONFIG_DIR/blockticket/config.json`
    pub async fn config_path() -> Result<PathBuf> {
        let path = spawn_blocking(move || {
            xdg::BaseDirectories::with_prefix("blockticket")
                .map(|dirs| dirs.place_config_file("config.json"))
        })
        .await???;

        Ok(path)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn contract(&self) -> H160 {
        self.contract
    }

    pub fn origin(&self) -> &str {
        self.origin.as_str()
    }

    pub fn rate_endpoint(&self) -> &str {
        self.rate_endpoint.as_str()
    }

    pub fn wallet(&self) -> Option<LocalWallet> {
        self.wallet.clone().map(Into::into)
    }
}

/// A signing account, stored as a hex-encoded secret key.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(into = "AccountRepr", try_from = "AccountRepr")]
pub struct Account {
    sk: SecretKey<Secp256k1>,
}

impl From<Account> for LocalWallet {
    fn from(val: Account) -> Self {
        LocalWallet::from(val.sk.clone())
    }
}

// Account representation used when serializing/deserializing
#[derive(Debug, Clone, Deserialize, Serialize)]
struct AccountRepr {
    sk: String,
}

impl From<Account> for AccountRepr {
    fn from(a: Account) -> Self {
        Self {
            sk: hex::encode(a.sk.to_bytes()),
        }
    }
}

impl TryFrom<AccountRepr> for Account {
    type Error = anyhow::Error;

    fn try_from(a: AccountRepr) -> Result<Self> {
        let sk = eth_sk_from_str(a.sk)?;
        Ok(Self { sk })
    }
}

fn eth_sk_from_str(sk: impl AsRef<str>) -> Result<SecretKey<Secp256k1>> {
    let sk = sk.as_ref().trim_start_matches("0x");
    let sk = match hex::decode(sk) {
        Ok(sk) => SecretKey::from_slice(sk.as_ref())?,
        Err(err) => anyhow::bail!("Expected hex for private key: {err}"),
    };

    Ok(sk)
}

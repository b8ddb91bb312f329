// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Wallet session tracking.
//!
//! The session is the single owner of the connected/address state; flows
//! read it but never mutate it. Providers are behind a narrow capability
//! trait so tests can script account behaviour.

use async_trait::async_trait;
use ethers::types::Address;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{StorefrontError, WalletError};

/// What the session needs from a wallet: prompt for access, silently list
/// already-authorized accounts, and stream account-set changes.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    async fn authorized_accounts(&self) -> Result<Vec<Address>, WalletError>;

    fn accounts_stream(&self) -> broadcast::Receiver<Vec<Address>>;
}

#[derive(Debug, Default, Clone)]
struct SessionState {
    is_connected: bool,
    address: Option<Address>,
    is_connecting: bool,
}

pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    state: Mutex<SessionState>,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            state: Mutex::new(SessionState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("wallet session state poisoned")
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected
    }

    pub fn is_connecting(&self) -> bool {
        self.state().is_connecting
    }

    pub fn address(&self) -> Option<Address> {
        self.state().address
    }

    /// Adopt an already-authorized account without prompting. Errors are
    /// deliberately swallowed: an unavailable provider on startup simply
    /// leaves the session disconnected.
    pub async fn restore(&self) {
        if let Ok(accounts) = self.provider.authorized_accounts().await {
            if let Some(first) = accounts.first() {
                let mut state = self.state();
                state.is_connected = true;
                state.address = Some(*first);
            }
        }
    }

    /// Request account access. Returns `Ok(None)` when another connect is
    /// already in flight.
    pub async fn connect(&self) -> Result<Option<Address>, StorefrontError> {
        {
            let mut state = self.state();
            if state.is_connecting {
                return Ok(None);
            }
            state.is_connecting = true;
        }

        let result = self.provider.request_accounts().await;

        let mut state = self.state();
        state.is_connecting = false;
        match result {
            Ok(accounts) => match accounts.first() {
                Some(first) => {
                    state.is_connected = true;
                    state.address = Some(*first);
                    info!(address = ?first, "wallet connected");
                    Ok(Some(*first))
                }
                None => Err(StorefrontError::Unclassified(
                    "Wallet returned no accounts".to_string(),
                )),
            },
            Err(WalletError::Rejected) => Err(StorefrontError::Unclassified(
                "Please connect your wallet to continue.".to_string(),
            )),
            Err(WalletError::ProviderUnavailable) => Err(StorefrontError::WalletProviderMissing),
            Err(other) => Err(StorefrontError::Unclassified(format!(
                "Failed to connect wallet: {other}"
            ))),
        }
    }

    pub fn disconnect(&self) {
        let mut state = self.state();
        state.is_connected = false;
        state.address = None;
    }

    /// Follow the provider's account-set stream for the life of the
    /// session. An empty set disconnects; a new head address is adopted
    /// without touching the connected flag. Ends when the provider's
    /// stream closes.
    pub fn watch(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        let mut accounts = self.provider.accounts_stream();
        tokio::spawn(async move {
            loop {
                match accounts.recv().await {
                    Ok(accounts) => match accounts.first() {
                        None => session.disconnect(),
                        Some(first) => session.state().address = Some(*first),
                    },
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Production provider backed by the configured signing account. The
/// account set never changes underneath a CLI run, so the stream stays
/// silent until dropped.
pub struct ConfiguredWallet {
    address: Option<Address>,
    accounts: broadcast::Sender<Vec<Address>>,
}

impl ConfiguredWallet {
    pub fn new(address: Option<Address>) -> Self {
        let (accounts, _) = broadcast::channel(8);
        Self { address, accounts }
    }
}

#[async_trait]
impl WalletProvider for ConfiguredWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        match self.address {
            Some(address) => Ok(vec![address]),
            None => Err(WalletError::ProviderUnavailable),
        }
    }

    async fn authorized_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.address.into_iter().collect())
    }

    fn accounts_stream(&self) -> broadcast::Receiver<Vec<Address>> {
        self.accounts.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct ScriptedProvider {
        request: Result<Vec<Address>, WalletError>,
        authorized: Vec<Address>,
        accounts: broadcast::Sender<Vec<Address>>,
    }

    impl ScriptedProvider {
        fn new(request: Result<Vec<Address>, WalletError>, authorized: Vec<Address>) -> Self {
            let (accounts, _) = broadcast::channel(8);
            Self {
                request,
                authorized,
                accounts,
            }
        }
    }

    #[async_trait]
    impl WalletProvider for ScriptedProvider {
        async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
            self.request.clone()
        }

        async fn authorized_accounts(&self) -> Result<Vec<Address>, WalletError> {
            Ok(self.authorized.clone())
        }

        fn accounts_stream(&self) -> broadcast::Receiver<Vec<Address>> {
            self.accounts.subscribe()
        }
    }

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    #[tokio::test]
    async fn connect_adopts_first_account() {
        let provider = ScriptedProvider::new(Ok(vec![addr(1), addr(2)]), vec![]);
        let session = WalletSession::new(Arc::new(provider));

        let connected = session.connect().await.unwrap();
        assert_eq!(connected, Some(addr(1)));
        assert!(session.is_connected());
        assert_eq!(session.address(), Some(addr(1)));
    }

    #[tokio::test]
    async fn rejection_keeps_session_disconnected() {
        let provider = ScriptedProvider::new(Err(WalletError::Rejected), vec![]);
        let session = WalletSession::new(Arc::new(provider));

        let err = session.connect().await.unwrap_err();
        assert!(err.to_string().contains("Please connect your wallet"));
        assert!(!session.is_connected());
        assert_eq!(session.address(), None);
    }

    #[tokio::test]
    async fn restore_is_silent() {
        let provider = ScriptedProvider::new(Err(WalletError::ProviderUnavailable), vec![addr(3)]);
        let session = WalletSession::new(Arc::new(provider));

        session.restore().await;
        assert!(session.is_connected());
        assert_eq!(session.address(), Some(addr(3)));
    }

    #[tokio::test]
    async fn empty_account_set_disconnects() {
        let provider = ScriptedProvider::new(Ok(vec![addr(1)]), vec![]);
        let accounts = provider.accounts.clone();
        let session = WalletSession::new(Arc::new(provider));
        session.connect().await.unwrap();

        let watcher = session.watch();
        accounts.send(vec![]).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!session.is_connected());
        assert_eq!(session.address(), None);
        watcher.abort();
    }

    #[tokio::test]
    async fn new_head_address_is_adopted_in_place() {
        let provider = ScriptedProvider::new(Ok(vec![addr(1)]), vec![]);
        let accounts = provider.accounts.clone();
        let session = WalletSession::new(Arc::new(provider));
        session.connect().await.unwrap();

        let watcher = session.watch();
        accounts.send(vec![addr(9)]).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(session.is_connected());
        assert_eq!(session.address(), Some(addr(9)));
        watcher.abort();
    }

    #[tokio::test]
    async fn configured_wallet_without_key_cannot_connect() {
        let session = WalletSession::new(Arc::new(ConfiguredWallet::new(None)));
        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, StorefrontError::WalletProviderMissing));
    }
}

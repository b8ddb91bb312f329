// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Graceful shutdown helper.

use anyhow::Result;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tracing::info;

pub struct Shutdown {
    tx_shutdown: broadcast::Sender<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        let (tx_shutdown, _) = broadcast::channel(1);
        Self { tx_shutdown }
    }
}

impl Shutdown {
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx_shutdown.subscribe()
    }

    /// Wait for SIGTERM/SIGINT, then notify all subscribers.
    pub async fn run(self) -> Result<()> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown..."),
            _ = sigint.recv() => info!("Received SIGINT, initiating shutdown..."),
        };

        let _ = self.tx_shutdown.send(());
        Ok(())
    }
}

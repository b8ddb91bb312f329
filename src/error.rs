// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! Error taxonomy for the storefront.
//!
//! [StorefrontError] is what flows surface to users; [LedgerError] is the
//! raw contract/provider failure it is classified from.

/// JSON-RPC error code emitted when the user declines to sign.
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC error code for an internal node failure.
pub const RPC_INTERNAL_CODE: i64 = -32603;

#[derive(Debug, thiserror::Error)]
pub enum StorefrontError {
    #[error("Wallet is not connected. Please connect your wallet first.")]
    WalletNotConnected,
    #[error("No wallet is configured. Add one with `blockticket configure --wallet-sk`.")]
    WalletProviderMissing,
    #[error("Transaction was rejected by user")]
    UserRejected,
    #[error("Transaction failed - please check your network connection")]
    NetworkOrNodeFailure,
    #[error("Event does not exist")]
    EventNotFound,
    #[error("Event is not currently active")]
    EventInactive,
    #[error("Invalid ticket type selected")]
    InvalidTicketTier,
    #[error("No tickets available for this type")]
    SoldOut,
    #[error("Insufficient payment. Required: {required} ETH")]
    InsufficientPayment { required: String },
    #[error("This seat is already taken")]
    SeatTaken,
    #[error("Insufficient ETH balance. You have {available} ETH but need {required} ETH")]
    InsufficientFunds { available: String, required: String },
    #[error("QR generation failed: {0}")]
    QrEncodingFailed(String),
    #[error("Invalid ticket")]
    InvalidTicket,
    #[error("{0}")]
    Unclassified(String),
}

/// Failures coming back from the ledger boundary, before classification.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// The call reverted; carries the decoded revert reason when one was
    /// present in the error payload.
    #[error("{0}")]
    Revert(String),
    /// Provider or node level failure, with the JSON-RPC error code when
    /// one could be extracted from the response.
    #[error("{message}")]
    Rpc { code: Option<i64>, message: String },
    #[error("transaction receipt was not returned")]
    MissingReceipt,
    #[error("value does not fit the expected range: {0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletError {
    #[error("connection request was rejected")]
    Rejected,
    #[error("no wallet provider is available")]
    ProviderUnavailable,
    #[error("{0}")]
    Other(String),
}

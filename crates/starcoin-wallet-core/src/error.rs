use thiserror::Error;

use crate::domain::ReadyState;
use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet not ready: {0:?}")]
    NotReady(ReadyState),
    #[error("wallet not connected")]
    NotConnected,
    #[error("wallet connection rejected: {0}")]
    ConnectionRejected(#[source] PortError),
    #[error("wallet network query failed: {0}")]
    NetworkQueryFailed(#[source] PortError),
    #[error("wallet disconnection failed: {0}")]
    DisconnectionFailed(#[source] PortError),
    #[error("sign transaction failed: {0}")]
    SignTransactionFailed(#[source] PortError),
    #[error("sign and submit transaction failed: {0}")]
    SignAndSubmitFailed(#[source] PortError),
    #[error("sign message failed: {0}")]
    SignMessageFailed(#[source] PortError),
    #[error("account change registration failed: {0}")]
    AccountChangeFailed(#[source] PortError),
    #[error("network change registration failed: {0}")]
    NetworkChangeFailed(#[source] PortError),
}

impl WalletError {
    /// Stable name of the failure kind, as surfaced to JS-style consumers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotReady(_) => "WalletNotReadyError",
            Self::NotConnected => "WalletNotConnectedError",
            Self::ConnectionRejected(_) => "WalletConnectionError",
            Self::NetworkQueryFailed(_) => "WalletGetNetworkError",
            Self::DisconnectionFailed(_) => "WalletDisconnectionError",
            Self::SignTransactionFailed(_) => "WalletSignTransactionError",
            Self::SignAndSubmitFailed(_) => "WalletSignAndSubmitMessageError",
            Self::SignMessageFailed(_) => "WalletSignMessageError",
            Self::AccountChangeFailed(_) => "WalletAccountChangeError",
            Self::NetworkChangeFailed(_) => "WalletNetworkChangeError",
        }
    }

    pub fn port_error(&self) -> Option<&PortError> {
        match self {
            Self::NotReady(_) | Self::NotConnected => None,
            Self::ConnectionRejected(e)
            | Self::NetworkQueryFailed(e)
            | Self::DisconnectionFailed(e)
            | Self::SignTransactionFailed(e)
            | Self::SignAndSubmitFailed(e)
            | Self::SignMessageFailed(e)
            | Self::AccountChangeFailed(e)
            | Self::NetworkChangeFailed(e) => Some(e),
        }
    }
}

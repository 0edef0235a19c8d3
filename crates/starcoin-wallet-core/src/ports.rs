use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{AccountInfo, ProviderResponse, SignMessagePayload, SignMessageResponse};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("no response: {0}")]
    NoResponse(&'static str),
}

pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Invoked by the provider with the newly selected account, or `None` once the wallet
/// has no account exposed to this origin. The provider drives the returned future.
pub type AccountChangeHandler = Arc<dyn Fn(Option<AccountInfo>) -> LocalBoxFuture<'static, ()>>;

/// Invoked by the provider with the numeric id of the newly selected chain.
pub type NetworkChangeHandler = Arc<dyn Fn(u64) -> LocalBoxFuture<'static, ()>>;

/// The injected wallet provider. Futures are `?Send`: the browser runtime is single
/// threaded and every call suspends only on the provider's own promise.
#[async_trait(?Send)]
pub trait ProviderPort {
    /// Whether the host environment could ever expose a provider.
    fn environment_supported(&self) -> bool {
        true
    }

    /// Whether the provider object is reachable right now.
    fn is_present(&self) -> bool;

    async fn is_connected(&self) -> Result<bool, PortError>;

    /// `stc_requestAccounts`.
    async fn request_accounts(&self) -> Result<Vec<AccountInfo>, PortError>;

    /// `chain.id`.
    async fn chain_id(&self) -> Result<u64, PortError>;

    /// Raw signed-transaction bytes.
    async fn sign_transaction(
        &self,
        payload: &Value,
        options: Option<&Value>,
    ) -> Result<Vec<u8>, PortError>;

    /// `None` when the provider resolved without a response object.
    async fn sign_and_submit(
        &self,
        payload: &Value,
        options: Option<&Value>,
    ) -> Result<Option<ProviderResponse<String>>, PortError>;

    async fn sign_message(
        &self,
        payload: &SignMessagePayload,
    ) -> Result<Option<ProviderResponse<SignMessageResponse>>, PortError>;

    async fn disconnect(&self) -> Result<(), PortError>;

    fn on_account_change(&self, handler: AccountChangeHandler) -> Result<(), PortError>;

    fn on_network_change(&self, handler: NetworkChangeHandler) -> Result<(), PortError>;
}

#[async_trait(?Send)]
pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;

    async fn sleep(&self, duration: Duration);
}

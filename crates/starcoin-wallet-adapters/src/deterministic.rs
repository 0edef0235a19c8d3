use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use starcoin_wallet_core::{
    AccountChangeHandler, AccountInfo, NetworkChangeHandler, PortError, ProviderPort,
    ProviderResponse, SignMessagePayload, SignMessageResponse,
};

pub const DETERMINISTIC_ACCOUNT: &str = "0x00000000000000000000000000000001";
pub const DETERMINISTIC_CHAIN_ID: u64 = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderMethod {
    IsConnected,
    RequestAccounts,
    ChainId,
    SignTransaction,
    SignAndSubmit,
    SignMessage,
    Disconnect,
    OnAccountChange,
    OnNetworkChange,
}

/// In-memory provider with scripted responses, a call log and failure injection.
#[derive(Clone, Default)]
pub struct DeterministicProvider {
    state: Arc<Mutex<DeterministicState>>,
}

struct DeterministicState {
    supported: bool,
    present: bool,
    /// Presence checks that still report "absent" before `present` applies.
    hidden_checks: u32,
    presence_checks: u32,
    connected: bool,
    accounts: Vec<AccountInfo>,
    chain_id: u64,
    submit_seq: u64,
    submit_response: Option<Option<ProviderResponse<String>>>,
    sign_message_response: Option<Option<ProviderResponse<SignMessageResponse>>>,
    failures: HashMap<ProviderMethod, PortError>,
    calls: Vec<ProviderMethod>,
    account_handlers: Vec<AccountChangeHandler>,
    network_handlers: Vec<NetworkChangeHandler>,
}

impl Default for DeterministicState {
    fn default() -> Self {
        Self {
            supported: true,
            present: true,
            hidden_checks: 0,
            presence_checks: 0,
            connected: false,
            accounts: vec![AccountInfo::from_address(DETERMINISTIC_ACCOUNT)],
            chain_id: DETERMINISTIC_CHAIN_ID,
            submit_seq: 0,
            submit_response: None,
            sign_message_response: None,
            failures: HashMap::new(),
            calls: Vec::new(),
            account_handlers: Vec::new(),
            network_handlers: Vec::new(),
        }
    }
}

impl fmt::Debug for DeterministicProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.state();
        f.debug_struct("DeterministicProvider")
            .field("present", &g.present)
            .field("connected", &g.connected)
            .field("accounts", &g.accounts)
            .field("chain_id", &g.chain_id)
            .field("calls", &g.calls.len())
            .finish()
    }
}

impl DeterministicProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that can never expose a provider.
    pub fn unsupported() -> Self {
        let provider = Self::default();
        provider.state().supported = false;
        provider.state().present = false;
        provider
    }

    /// A supported host where the provider is not injected.
    pub fn absent() -> Self {
        let provider = Self::default();
        provider.state().present = false;
        provider
    }

    /// Present, but only after `checks` presence checks reported it missing.
    pub fn appearing_after(checks: u32) -> Self {
        let provider = Self::default();
        provider.state().hidden_checks = checks;
        provider
    }

    pub fn with_accounts(self, accounts: Vec<AccountInfo>) -> Self {
        self.state().accounts = accounts;
        self
    }

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        self.state().chain_id = chain_id;
        self
    }

    fn state(&self) -> MutexGuard<'_, DeterministicState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_present(&self, present: bool) {
        self.state().present = present;
    }

    /// Every later call to `method` fails with `err` until cleared.
    pub fn fail(&self, method: ProviderMethod, err: PortError) {
        self.state().failures.insert(method, err);
    }

    pub fn clear_failure(&self, method: ProviderMethod) {
        self.state().failures.remove(&method);
    }

    /// Overrides the value `sign_and_submit` resolves with.
    pub fn set_submit_response(&self, response: Option<ProviderResponse<String>>) {
        self.state().submit_response = Some(response);
    }

    pub fn set_sign_message_response(
        &self,
        response: Option<ProviderResponse<SignMessageResponse>>,
    ) {
        self.state().sign_message_response = Some(response);
    }

    pub fn calls(&self) -> Vec<ProviderMethod> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, method: ProviderMethod) -> usize {
        self.state().calls.iter().filter(|m| **m == method).count()
    }

    pub fn presence_checks(&self) -> u32 {
        self.state().presence_checks
    }

    pub fn provider_connected(&self) -> bool {
        self.state().connected
    }

    /// Replaces the exposed accounts and runs every registered account handler.
    pub async fn debug_inject_account_changed(&self, account: Option<AccountInfo>) {
        let handlers = {
            let mut g = self.state();
            g.accounts = account.iter().cloned().collect();
            if account.is_none() {
                g.connected = false;
            }
            g.account_handlers.clone()
        };
        for handler in handlers {
            handler(account.clone()).await;
        }
    }

    pub async fn debug_inject_network_changed(&self, chain_id: u64) {
        let handlers = {
            let mut g = self.state();
            g.chain_id = chain_id;
            g.network_handlers.clone()
        };
        for handler in handlers {
            handler(chain_id).await;
        }
    }

    fn enter(&self, method: ProviderMethod) -> Result<(), PortError> {
        let mut g = self.state();
        g.calls.push(method);
        match g.failures.get(&method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl ProviderPort for DeterministicProvider {
    fn environment_supported(&self) -> bool {
        self.state().supported
    }

    fn is_present(&self) -> bool {
        let mut g = self.state();
        g.presence_checks = g.presence_checks.saturating_add(1);
        if g.hidden_checks > 0 {
            g.hidden_checks -= 1;
            return false;
        }
        g.present
    }

    async fn is_connected(&self) -> Result<bool, PortError> {
        self.enter(ProviderMethod::IsConnected)?;
        Ok(self.state().connected)
    }

    async fn request_accounts(&self) -> Result<Vec<AccountInfo>, PortError> {
        self.enter(ProviderMethod::RequestAccounts)?;
        let mut g = self.state();
        g.connected = !g.accounts.is_empty();
        Ok(g.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, PortError> {
        self.enter(ProviderMethod::ChainId)?;
        Ok(self.state().chain_id)
    }

    async fn sign_transaction(
        &self,
        payload: &Value,
        options: Option<&Value>,
    ) -> Result<Vec<u8>, PortError> {
        self.enter(ProviderMethod::SignTransaction)?;
        let envelope = serde_json::json!({ "payload": payload, "options": options });
        let mut signed = b"signed:".to_vec();
        signed.extend(
            serde_json::to_vec(&envelope)
                .map_err(|e| PortError::Validation(format!("payload serialization failed: {e}")))?,
        );
        Ok(signed)
    }

    async fn sign_and_submit(
        &self,
        _payload: &Value,
        _options: Option<&Value>,
    ) -> Result<Option<ProviderResponse<String>>, PortError> {
        self.enter(ProviderMethod::SignAndSubmit)?;
        let mut g = self.state();
        if let Some(scripted) = g.submit_response.clone() {
            return Ok(scripted);
        }
        g.submit_seq = g.submit_seq.saturating_add(1);
        Ok(Some(ProviderResponse::ok(format!("0x{:064x}", g.submit_seq))))
    }

    async fn sign_message(
        &self,
        payload: &SignMessagePayload,
    ) -> Result<Option<ProviderResponse<SignMessageResponse>>, PortError> {
        self.enter(ProviderMethod::SignMessage)?;
        let g = self.state();
        if let Some(scripted) = g.sign_message_response.clone() {
            return Ok(scripted);
        }

        let address = g.accounts.first().map(|a| a.address.clone());
        let mut full_message = String::from("STARCOIN\n");
        if payload.address {
            if let Some(address) = &address {
                full_message.push_str(&format!("address: {address}\n"));
            }
        }
        if payload.chain_id {
            full_message.push_str(&format!("chainId: {}\n", g.chain_id));
        }
        full_message.push_str(&format!(
            "message: {}\nnonce: {}",
            payload.message, payload.nonce
        ));

        Ok(Some(ProviderResponse::ok(SignMessageResponse {
            signature: format!("0x{}", hex::encode(full_message.as_bytes())),
            address: address.filter(|_| payload.address),
            application: None,
            chain_id: payload.chain_id.then_some(g.chain_id),
            full_message: Some(full_message),
            message: Some(payload.message.clone()),
            nonce: Some(payload.nonce.clone()),
            prefix: Some("STARCOIN".to_owned()),
        })))
    }

    async fn disconnect(&self) -> Result<(), PortError> {
        self.enter(ProviderMethod::Disconnect)?;
        self.state().connected = false;
        Ok(())
    }

    fn on_account_change(&self, handler: AccountChangeHandler) -> Result<(), PortError> {
        self.enter(ProviderMethod::OnAccountChange)?;
        self.state().account_handlers.push(handler);
        Ok(())
    }

    fn on_network_change(&self, handler: NetworkChangeHandler) -> Result<(), PortError> {
        self.enter(ProviderMethod::OnNetworkChange)?;
        self.state().network_handlers.push(handler);
        Ok(())
    }
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use starcoin_wallet_core::{
    parse_chain_id, AccountChangeHandler, AccountInfo, NetworkChangeHandler, PortError,
    ProviderPort, ProviderResponse, SignMessagePayload, SignMessageResponse,
};

use crate::{DeterministicProvider, WalletAdapterConfig};

pub const METHOD_REQUEST_ACCOUNTS: &str = "stc_requestAccounts";
pub const METHOD_CHAIN_ID: &str = "chain.id";

/// The StarMask extension provider.
///
/// In the browser this talks to `window.starcoin`. Natively it forwards the same calls
/// as JSON-RPC to a bridge in front of the extension. Outside the production profile,
/// a missing runtime falls back to [`DeterministicProvider`].
#[derive(Debug, Clone)]
pub struct StarMaskProvider {
    mode: ProviderMode,
    handlers: Arc<Mutex<ChangeHandlers>>,
    #[cfg(target_arch = "wasm32")]
    hooks: Arc<Mutex<BrowserHooks>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic(DeterministicProvider),
    #[cfg(not(target_arch = "wasm32"))]
    Bridge(BridgeRuntime),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct BridgeRuntime {
    base_url: String,
    client: reqwest::Client,
}

/// Handlers and last snapshot, used by the bridge which has no push channel.
#[derive(Default)]
struct ChangeHandlers {
    accounts: Vec<AccountChangeHandler>,
    networks: Vec<NetworkChangeHandler>,
    last_accounts: Option<Vec<AccountInfo>>,
    last_chain_id: Option<u64>,
    next_request_id: u64,
}

impl std::fmt::Debug for ChangeHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHandlers")
            .field("accounts", &self.accounts.len())
            .field("networks", &self.networks.len())
            .field("last_chain_id", &self.last_chain_id)
            .finish()
    }
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
struct BrowserHooks {
    closures: Vec<wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>>,
}

/// What a [`StarMaskProvider::poll_changes`] pass observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderChanges {
    pub accounts_changed: bool,
    pub chain_changed: bool,
}

impl StarMaskProvider {
    #[cfg_attr(target_arch = "wasm32", allow(unused_variables))]
    pub fn with_config(config: &WalletAdapterConfig) -> Self {
        // The browser provider may be injected late; detection polls for it.
        #[cfg(target_arch = "wasm32")]
        let mode = ProviderMode::Browser;

        #[cfg(not(target_arch = "wasm32"))]
        let mode = if let Some(ref base_url) = config.bridge_url {
            let timeout = std::time::Duration::from_millis(config.timeout_ms);
            match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => ProviderMode::Bridge(BridgeRuntime {
                    base_url: base_url.clone(),
                    client,
                }),
                Err(e) => {
                    if config.strict_runtime_required() {
                        ProviderMode::Disabled(format!(
                            "failed to initialize StarMask bridge client in production profile: {e}"
                        ))
                    } else {
                        tracing::warn!(
                            error = %e,
                            "bridge client unavailable, using deterministic provider"
                        );
                        ProviderMode::Deterministic(DeterministicProvider::new())
                    }
                }
            }
        } else if config.strict_runtime_required() {
            ProviderMode::Disabled(
                "StarMask bridge URL not configured in production runtime profile".to_owned(),
            )
        } else {
            ProviderMode::Deterministic(DeterministicProvider::new())
        };

        Self {
            mode,
            handlers: Arc::new(Mutex::new(ChangeHandlers::default())),
            #[cfg(target_arch = "wasm32")]
            hooks: Arc::new(Mutex::new(BrowserHooks::default())),
        }
    }

    /// Wraps an existing deterministic provider, sharing its scripted state.
    pub fn from_deterministic(provider: DeterministicProvider) -> Self {
        Self {
            mode: ProviderMode::Deterministic(provider),
            handlers: Arc::new(Mutex::new(ChangeHandlers::default())),
            #[cfg(target_arch = "wasm32")]
            hooks: Arc::new(Mutex::new(BrowserHooks::default())),
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            ProviderMode::Disabled(_) => "disabled",
            ProviderMode::Deterministic(_) => "deterministic",
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Bridge(_) => "bridge",
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => "browser",
        }
    }

    fn handlers(&self) -> MutexGuard<'_, ChangeHandlers> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn deterministic(&self) -> Option<&DeterministicProvider> {
        match &self.mode {
            ProviderMode::Deterministic(p) => Some(p),
            _ => None,
        }
    }

    /// Dispatches one provider call. `params` is the argument list.
    async fn call(&self, method: &str, params: Value) -> Result<Value, PortError> {
        self.check_mode()?;
        match &self.mode {
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Bridge(bridge) => self.bridge_call(bridge, method, params).await,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => browser_call(method, params).await,
            _ => Err(PortError::NotImplemented("starmask runtime not enabled")),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn bridge_call(
        &self,
        bridge: &BridgeRuntime,
        method: &str,
        params: Value,
    ) -> Result<Value, PortError> {
        let id = {
            let mut g = self.handlers();
            g.next_request_id = g.next_request_id.saturating_add(1);
            g.next_request_id
        };
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = bridge
            .client
            .post(&bridge.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("starmask bridge request failed: {e}")))?;
        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            PortError::Transport(format!("starmask bridge json decode failed: {e}"))
        })?;
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "starmask bridge status {}: {}",
                status, body
            )));
        }
        if let Some(err) = body.get("error") {
            return Err(PortError::Transport(format!(
                "starmask bridge returned error: {err}"
            )));
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Re-reads accounts and chain id and runs the registered handlers for whatever
    /// differs from the last observed snapshot. Needed for the bridge runtime; the
    /// browser pushes changes itself.
    pub async fn poll_changes(&self) -> Result<ProviderChanges, PortError> {
        self.check_mode()?;
        if self.deterministic().is_some() {
            return Ok(ProviderChanges::default());
        }
        let accounts = self
            .call(METHOD_REQUEST_ACCOUNTS, Value::Array(vec![]))
            .await
            .and_then(|v| parse_accounts(&v))?;
        let chain_id = self
            .call(METHOD_CHAIN_ID, Value::Array(vec![]))
            .await
            .and_then(|v| parse_chain_value(&v))?;

        let (account_handlers, network_handlers, changes) = {
            let mut g = self.handlers();
            let changes = ProviderChanges {
                accounts_changed: g
                    .last_accounts
                    .as_ref()
                    .is_some_and(|prev| *prev != accounts),
                chain_changed: g.last_chain_id.is_some_and(|prev| prev != chain_id),
            };
            g.last_accounts = Some(accounts.clone());
            g.last_chain_id = Some(chain_id);
            (g.accounts.clone(), g.networks.clone(), changes)
        };

        if changes.accounts_changed {
            let selected = accounts.first().cloned();
            for handler in account_handlers {
                handler(selected.clone()).await;
            }
        }
        if changes.chain_changed {
            for handler in network_handlers {
                handler(chain_id).await;
            }
        }
        Ok(changes)
    }

    #[cfg(target_arch = "wasm32")]
    fn register_browser_hook(
        &self,
        event: &str,
        callback: wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>,
    ) -> Result<(), PortError> {
        use wasm_bindgen::{JsCast, JsValue};

        let provider = browser_provider()?;
        let on_fn = get_prop(&provider, "on")
            .ok()
            .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
            .ok_or(PortError::NotImplemented("window.starcoin.on is unavailable"))?;
        on_fn
            .call2(
                &provider,
                &JsValue::from_str(event),
                callback.as_ref().unchecked_ref(),
            )
            .map_err(|e| PortError::Transport(format!("register {event} failed: {e:?}")))?;

        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closures
            .push(callback);
        Ok(())
    }
}

#[async_trait(?Send)]
impl ProviderPort for StarMaskProvider {
    fn environment_supported(&self) -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            web_sys::window().is_some()
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            true
        }
    }

    fn is_present(&self) -> bool {
        match &self.mode {
            ProviderMode::Disabled(_) => false,
            ProviderMode::Deterministic(p) => p.is_present(),
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Bridge(_) => true,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => browser_provider_available(),
        }
    }

    async fn is_connected(&self) -> Result<bool, PortError> {
        if let Some(p) = self.deterministic() {
            return p.is_connected().await;
        }
        let result = self.call("isConnected", Value::Array(vec![])).await?;
        result
            .as_bool()
            .ok_or_else(|| PortError::Validation("isConnected must return a boolean".to_owned()))
    }

    async fn request_accounts(&self) -> Result<Vec<AccountInfo>, PortError> {
        if let Some(p) = self.deterministic() {
            return p.request_accounts().await;
        }
        let result = self.call(METHOD_REQUEST_ACCOUNTS, Value::Array(vec![])).await?;
        let accounts = parse_accounts(&result)?;
        self.handlers().last_accounts = Some(accounts.clone());
        Ok(accounts)
    }

    async fn chain_id(&self) -> Result<u64, PortError> {
        if let Some(p) = self.deterministic() {
            return p.chain_id().await;
        }
        let result = self.call(METHOD_CHAIN_ID, Value::Array(vec![])).await?;
        let chain_id = parse_chain_value(&result)?;
        self.handlers().last_chain_id = Some(chain_id);
        Ok(chain_id)
    }

    async fn sign_transaction(
        &self,
        payload: &Value,
        options: Option<&Value>,
    ) -> Result<Vec<u8>, PortError> {
        if let Some(p) = self.deterministic() {
            return p.sign_transaction(payload, options).await;
        }
        let result = self
            .call("signTransaction", call_params(payload, options))
            .await?;
        let raw = result.as_str().ok_or_else(|| {
            PortError::Validation("signTransaction must return a hex string".to_owned())
        })?;
        decode_hex(raw)
    }

    async fn sign_and_submit(
        &self,
        payload: &Value,
        options: Option<&Value>,
    ) -> Result<Option<ProviderResponse<String>>, PortError> {
        if let Some(p) = self.deterministic() {
            return p.sign_and_submit(payload, options).await;
        }
        let result = self
            .call("signAndSubmit", call_params(payload, options))
            .await?;
        parse_response(result)
    }

    async fn sign_message(
        &self,
        payload: &SignMessagePayload,
    ) -> Result<Option<ProviderResponse<SignMessageResponse>>, PortError> {
        if let Some(p) = self.deterministic() {
            return p.sign_message(payload).await;
        }
        let payload = serde_json::to_value(payload)
            .map_err(|e| PortError::Validation(format!("sign message payload: {e}")))?;
        let result = self
            .call("signMessage", Value::Array(vec![payload]))
            .await?;
        parse_response(result)
    }

    async fn disconnect(&self) -> Result<(), PortError> {
        if let Some(p) = self.deterministic() {
            return p.disconnect().await;
        }
        self.call("disconnect", Value::Array(vec![])).await?;
        self.handlers().last_accounts = None;
        Ok(())
    }

    fn on_account_change(&self, handler: AccountChangeHandler) -> Result<(), PortError> {
        self.check_mode()?;
        if let Some(p) = self.deterministic() {
            return p.on_account_change(handler);
        }

        #[cfg(target_arch = "wasm32")]
        if matches!(self.mode, ProviderMode::Browser) {
            use wasm_bindgen::{closure::Closure, JsValue};

            let callback = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
                let selected = serde_wasm_bindgen::from_value::<Value>(value)
                    .ok()
                    .and_then(|v| parse_accounts(&v).ok())
                    .and_then(|accounts| accounts.into_iter().next());
                wasm_bindgen_futures::spawn_local(handler(selected));
            });
            return self.register_browser_hook("accountsChanged", callback);
        }

        self.handlers().accounts.push(handler);
        Ok(())
    }

    fn on_network_change(&self, handler: NetworkChangeHandler) -> Result<(), PortError> {
        self.check_mode()?;
        if let Some(p) = self.deterministic() {
            return p.on_network_change(handler);
        }

        #[cfg(target_arch = "wasm32")]
        if matches!(self.mode, ProviderMode::Browser) {
            use wasm_bindgen::{closure::Closure, JsValue};

            let callback = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
                let chain_id = serde_wasm_bindgen::from_value::<Value>(value)
                    .ok()
                    .and_then(|v| parse_chain_value(&v).ok());
                match chain_id {
                    Some(chain_id) => wasm_bindgen_futures::spawn_local(handler(chain_id)),
                    None => tracing::warn!("ignoring unparseable chainChanged payload"),
                }
            });
            return self.register_browser_hook("chainChanged", callback);
        }

        self.handlers().networks.push(handler);
        Ok(())
    }
}

fn call_params(payload: &Value, options: Option<&Value>) -> Value {
    match options {
        Some(options) => Value::Array(vec![payload.clone(), options.clone()]),
        None => Value::Array(vec![payload.clone()]),
    }
}

fn parse_response<T: DeserializeOwned>(
    result: Value,
) -> Result<Option<ProviderResponse<T>>, PortError> {
    if result.is_null() {
        return Ok(None);
    }
    serde_json::from_value(result)
        .map(Some)
        .map_err(|e| PortError::Validation(format!("invalid provider response: {e}")))
}

/// `stc_requestAccounts` yields either address strings or account objects.
pub fn parse_accounts(value: &Value) -> Result<Vec<AccountInfo>, PortError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let items = value.as_array().ok_or_else(|| {
        PortError::Validation(format!("{METHOD_REQUEST_ACCOUNTS}: array expected"))
    })?;
    items
        .iter()
        .map(|item| match item {
            Value::String(address) => Ok(AccountInfo::from_address(address.clone())),
            Value::Object(_) => serde_json::from_value(item.clone())
                .map_err(|e| PortError::Validation(format!("invalid account object: {e}"))),
            other => Err(PortError::Validation(format!(
                "{METHOD_REQUEST_ACCOUNTS}: unexpected item {other}"
            ))),
        })
        .collect()
}

/// `chain.id` yields `{ id, name }`; change notifications carry a bare hex or number.
pub fn parse_chain_value(value: &Value) -> Result<u64, PortError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| PortError::Validation(format!("invalid chain id: {n}"))),
        Value::String(s) => parse_chain_id(s),
        Value::Object(map) => map
            .get("id")
            .or_else(|| map.get("chainId"))
            .ok_or_else(|| PortError::Validation("chain object without id".to_owned()))
            .and_then(parse_chain_value),
        other => Err(PortError::Validation(format!(
            "chain id must be string, number or object: {other}"
        ))),
    }
}

pub fn decode_hex(raw: &str) -> Result<Vec<u8>, PortError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    hex::decode(digits).map_err(|e| PortError::Validation(format!("invalid hex: {e}")))
}

#[cfg(target_arch = "wasm32")]
fn browser_provider_available() -> bool {
    browser_provider().is_ok()
}

#[cfg(target_arch = "wasm32")]
fn browser_provider() -> Result<wasm_bindgen::JsValue, PortError> {
    let window =
        web_sys::window().ok_or_else(|| PortError::Transport("missing window".to_owned()))?;
    let provider = get_prop(&window.into(), "starcoin")?;
    if provider.is_null() || provider.is_undefined() {
        return Err(PortError::NotFound("window.starcoin missing".to_owned()));
    }
    Ok(provider)
}

#[cfg(target_arch = "wasm32")]
fn get_prop(target: &wasm_bindgen::JsValue, key: &str) -> Result<wasm_bindgen::JsValue, PortError> {
    js_sys::Reflect::get(target, &wasm_bindgen::JsValue::from_str(key))
        .map_err(|e| PortError::Transport(format!("read provider property {key} failed: {e:?}")))
}

/// `stc_*` and `chain.*` go through `request({ method, params })`; everything else is a
/// method on the provider object itself.
#[cfg(target_arch = "wasm32")]
async fn browser_call(method: &str, params: Value) -> Result<Value, PortError> {
    use wasm_bindgen::JsCast;

    let provider = browser_provider()?;
    let (function_name, args) = if method.starts_with("stc_") || method.starts_with("chain.") {
        let request = serde_json::json!({ "method": method, "params": params });
        ("request", Value::Array(vec![request]))
    } else {
        (method, params)
    };

    let function = get_prop(&provider, function_name)
        .ok()
        .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
        .ok_or(PortError::NotImplemented(
            "window.starcoin does not expose the requested method",
        ))?;
    let args_js = serde_wasm_bindgen::to_value(&args)
        .map_err(|e| PortError::Transport(format!("failed to encode wasm request: {e}")))?;
    let args_array: js_sys::Array = args_js
        .dyn_into()
        .map_err(|_| PortError::Transport("provider arguments must be an array".to_owned()))?;

    let returned = function
        .apply(&provider, &args_array)
        .map_err(|e| PortError::Transport(format!("provider {method} dispatch failed: {e:?}")))?;
    let result_js = if returned.has_type::<js_sys::Promise>() {
        let promise: js_sys::Promise = returned.unchecked_into();
        wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(|e| PortError::Transport(format!("provider {method} rejected: {e:?}")))?
    } else {
        returned
    };
    if result_js.is_undefined() || result_js.is_null() {
        return Ok(Value::Null);
    }
    if let Some(bytes) = result_js.dyn_ref::<js_sys::Uint8Array>() {
        return Ok(Value::String(format!("0x{}", hex::encode(bytes.to_vec()))));
    }
    serde_wasm_bindgen::from_value(result_js)
        .map_err(|e| PortError::Transport(format!("failed to decode wasm response: {e}")))
}

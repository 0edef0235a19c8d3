use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{
    AccountInfo, NetworkInfo, ProviderResponse, PublicAccount, ReadyState, SignMessagePayload,
    SignMessageResponse, SubmittedTransaction, WalletMetadata, WalletOptions,
};
use crate::error::WalletError;
use crate::events::{EventBus, WalletEvent};
use crate::ports::{
    AccountChangeHandler, ClockPort, LocalBoxFuture, NetworkChangeHandler, PortError,
    ProviderPort,
};
use crate::state_machine::{initial_ready_state, ready_transition, TransitionError};

/// Stateful proxy in front of an injected wallet provider.
///
/// Clones share session state and the event channel. Every failure is emitted as
/// [`WalletEvent::Error`] before it is returned.
pub struct WalletAdapter<P, C> {
    inner: Arc<Inner<P, C>>,
}

struct Inner<P, C> {
    provider: Arc<P>,
    clock: Arc<C>,
    options: WalletOptions,
    state: Mutex<AdapterState>,
    events: EventBus,
}

#[derive(Debug, Clone)]
struct AdapterState {
    ready_state: ReadyState,
    account: Option<PublicAccount>,
    network: NetworkInfo,
    connecting: bool,
    /// Provider hooks live as long as the adapter; repeat registrations reuse them.
    account_hook: bool,
    network_hook: bool,
}

/// Clears `connecting` on every exit path of `connect`.
struct ConnectingGuard<'a, P, C> {
    inner: &'a Inner<P, C>,
}

impl<P, C> Drop for ConnectingGuard<'_, P, C> {
    fn drop(&mut self) {
        self.inner.state().connecting = false;
    }
}

impl<P, C> Inner<P, C> {
    fn state(&self) -> MutexGuard<'_, AdapterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P, C> Clone for WalletAdapter<P, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, C> fmt::Debug for WalletAdapter<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletAdapter")
            .field("name", &self.inner.options.metadata.name)
            .field("state", &*self.inner.state())
            .finish()
    }
}

impl<P, C> WalletAdapter<P, C>
where
    P: ProviderPort + 'static,
    C: ClockPort + 'static,
{
    pub fn new(provider: P, clock: C, options: WalletOptions) -> Self {
        Self::from_shared(Arc::new(provider), Arc::new(clock), options)
    }

    pub fn from_shared(provider: Arc<P>, clock: Arc<C>, options: WalletOptions) -> Self {
        let ready_state = initial_ready_state(provider.environment_supported());
        Self {
            inner: Arc::new(Inner {
                provider,
                clock,
                options,
                state: Mutex::new(AdapterState {
                    ready_state,
                    account: None,
                    network: NetworkInfo::default(),
                    connecting: false,
                    account_hook: false,
                    network_hook: false,
                }),
                events: EventBus::new(),
            }),
        }
    }

    pub fn provider(&self) -> &P {
        &self.inner.provider
    }

    pub fn metadata(&self) -> &WalletMetadata {
        &self.inner.options.metadata
    }

    pub fn options(&self) -> &WalletOptions {
        &self.inner.options
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn ready_state(&self) -> ReadyState {
        self.inner.state().ready_state
    }

    pub fn public_account(&self) -> Option<PublicAccount> {
        self.inner.state().account.clone()
    }

    pub fn network(&self) -> NetworkInfo {
        self.inner.state().network.clone()
    }

    pub fn connecting(&self) -> bool {
        self.inner.state().connecting
    }

    pub fn connected(&self) -> bool {
        self.inner
            .state()
            .account
            .as_ref()
            .is_some_and(|a| a.is_connected)
    }

    fn fail(&self, err: WalletError) -> WalletError {
        warn!(kind = err.kind(), error = %err, "wallet adapter error");
        self.inner.events.emit(&WalletEvent::Error(err.clone()));
        err
    }

    /// Moves readiness forward, e.g. to `Loadable` when a selection layer knows the
    /// provider can be loaded on demand. Emits `readyStateChange` on success.
    pub fn set_ready_state(&self, to: ReadyState) -> Result<(), TransitionError> {
        {
            let mut g = self.inner.state();
            g.ready_state = ready_transition(g.ready_state, to)?;
        }
        self.inner.events.emit(&WalletEvent::ReadyStateChange(to));
        Ok(())
    }

    fn mark_ready(&self, to: ReadyState) {
        if let Err(e) = self.set_ready_state(to) {
            debug!(error = %e, "ready state unchanged");
        }
    }

    /// Polls for the provider until found or `max_poll_attempts` checks have run.
    /// Terminal readiness states return immediately.
    pub async fn detect(&self) -> ReadyState {
        let current = self.ready_state();
        if current.is_terminal() {
            return current;
        }

        let attempts = self.inner.options.max_poll_attempts.max(1);
        let interval = Duration::from_millis(self.inner.options.poll_interval_ms);
        let started = self.inner.clock.now_ms().ok();

        for attempt in 1..=attempts {
            if self.inner.provider.is_present() {
                let elapsed_ms = match (started, self.inner.clock.now_ms()) {
                    (Some(a), Ok(b)) => b.saturating_sub(a),
                    _ => 0,
                };
                debug!(attempt, elapsed_ms, "wallet provider detected");
                self.mark_ready(ReadyState::Installed);
                return self.ready_state();
            }
            if attempt < attempts {
                self.inner.clock.sleep(interval).await;
            }
        }

        debug!(attempts, "wallet provider not detected");
        self.ready_state()
    }

    pub async fn connect(&self) -> Result<(), WalletError> {
        let guard = {
            let mut g = self.inner.state();
            if g.connecting || g.account.as_ref().is_some_and(|a| a.is_connected) {
                return Ok(());
            }
            if !g.ready_state.is_usable() {
                let ready_state = g.ready_state;
                drop(g);
                return Err(self.fail(WalletError::NotReady(ready_state)));
            }
            g.connecting = true;
            ConnectingGuard { inner: &*self.inner }
        };

        let accounts = self
            .inner
            .provider
            .request_accounts()
            .await
            .map_err(|e| self.fail(WalletError::ConnectionRejected(e)))?;
        let account = accounts.into_iter().next().ok_or_else(|| {
            self.fail(WalletError::ConnectionRejected(PortError::NoResponse(
                "stc_requestAccounts returned no account",
            )))
        })?;

        let chain_id = self
            .inner
            .provider
            .chain_id()
            .await
            .map_err(|e| self.fail(WalletError::NetworkQueryFailed(e)))?;
        let network = NetworkInfo::from_chain_id(chain_id);

        let address = account.address.clone();
        {
            let mut g = self.inner.state();
            g.account = Some(PublicAccount::connected(account));
            g.network = network.clone();
        }
        drop(guard);

        info!(%address, network = %network.name, "wallet connected");
        self.inner.events.emit(&WalletEvent::Connect(address));
        Ok(())
    }

    /// Without a session this is a no-op. Provider failures are emitted, not returned.
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        let Some(account) = self.inner.state().account.take() else {
            debug!("disconnect requested without a session");
            return Ok(());
        };

        if self.inner.provider.is_present() {
            match self.inner.provider.disconnect().await {
                Ok(()) => {}
                Err(PortError::NotImplemented(what)) => {
                    debug!(what, "provider has no disconnect");
                }
                Err(e) => {
                    self.fail(WalletError::DisconnectionFailed(e));
                }
            }
        }

        info!(address = %account.address, "wallet disconnected");
        self.inner.events.emit(&WalletEvent::Disconnect);
        Ok(())
    }

    fn require_session(&self) -> Result<PublicAccount, WalletError> {
        let account = self
            .inner
            .state()
            .account
            .clone()
            .filter(|a| a.is_connected);
        match account {
            Some(account) if self.inner.provider.is_present() => Ok(account),
            _ => Err(self.fail(WalletError::NotConnected)),
        }
    }

    pub async fn sign_transaction(
        &self,
        payload: &Value,
        options: Option<&Value>,
    ) -> Result<Vec<u8>, WalletError> {
        self.require_session()?;
        self.inner
            .provider
            .sign_transaction(payload, options)
            .await
            .map_err(|e| self.fail(WalletError::SignTransactionFailed(e)))
    }

    pub async fn sign_and_submit_transaction(
        &self,
        payload: &Value,
        options: Option<&Value>,
    ) -> Result<SubmittedTransaction, WalletError> {
        self.require_session()?;
        let response = self
            .inner
            .provider
            .sign_and_submit(payload, options)
            .await
            .map_err(|e| self.fail(WalletError::SignAndSubmitFailed(e)))?;

        match response
            .and_then(ProviderResponse::into_success)
            .filter(|hash| !hash.is_empty())
        {
            Some(hash) => {
                debug!(%hash, "transaction submitted");
                Ok(SubmittedTransaction { hash })
            }
            None => Err(self.fail(WalletError::SignAndSubmitFailed(PortError::NoResponse(
                "signAndSubmit returned no successful result",
            )))),
        }
    }

    pub async fn sign_message(
        &self,
        payload: &SignMessagePayload,
    ) -> Result<SignMessageResponse, WalletError> {
        self.require_session()?;
        let response = self
            .inner
            .provider
            .sign_message(payload)
            .await
            .map_err(|e| self.fail(WalletError::SignMessageFailed(e)))?;

        response
            .and_then(ProviderResponse::into_success)
            .ok_or_else(|| {
                self.fail(WalletError::SignMessageFailed(PortError::NoResponse(
                    "signMessage returned no successful result",
                )))
            })
    }

    /// Registers with the provider once per adapter; later calls only re-check the session.
    pub fn on_account_change(&self) -> Result<(), WalletError> {
        self.require_session()?;
        if self.inner.state().account_hook {
            return Ok(());
        }
        let weak = Arc::downgrade(&self.inner);
        let handler: AccountChangeHandler = Arc::new(move |account: Option<AccountInfo>| {
            let adapter = upgrade(&weak);
            let fut: LocalBoxFuture<'static, ()> = Box::pin(async move {
                if let Some(adapter) = adapter {
                    adapter.apply_account_change(account).await;
                }
            });
            fut
        });
        self.inner
            .provider
            .on_account_change(handler)
            .map_err(|e| self.fail(WalletError::AccountChangeFailed(e)))?;
        self.inner.state().account_hook = true;
        Ok(())
    }

    pub fn on_network_change(&self) -> Result<(), WalletError> {
        self.require_session()?;
        if self.inner.state().network_hook {
            return Ok(());
        }
        let weak = Arc::downgrade(&self.inner);
        let handler: NetworkChangeHandler = Arc::new(move |chain_id: u64| {
            let adapter = upgrade(&weak);
            let fut: LocalBoxFuture<'static, ()> = Box::pin(async move {
                if let Some(adapter) = adapter {
                    adapter.apply_network_change(chain_id);
                }
            });
            fut
        });
        self.inner
            .provider
            .on_network_change(handler)
            .map_err(|e| self.fail(WalletError::NetworkChangeFailed(e)))?;
        self.inner.state().network_hook = true;
        Ok(())
    }

    async fn apply_account_change(&self, account: Option<AccountInfo>) {
        let Some(account) = account else {
            debug!("provider exposes no account; dropping session");
            if self.connected() {
                // disconnect reports provider failures on the event channel itself
                let _ = self.disconnect().await;
            }
            return;
        };

        let address = account.address.clone();
        {
            let mut g = self.inner.state();
            let Some(current) = g.account.as_mut().filter(|a| a.is_connected) else {
                debug!(%address, "account change ignored without a session");
                return;
            };
            current.address = account.address;
            current.public_key = account.public_key;
            current.auth_key = account.auth_key;
        }
        debug!(%address, "account changed");
        self.inner.events.emit(&WalletEvent::AccountChange(address));
    }

    fn apply_network_change(&self, chain_id: u64) {
        let network = NetworkInfo::from_chain_id(chain_id);
        self.inner.state().network = network.clone();
        debug!(network = %network.name, chain_id, "network changed");
        self.inner.events.emit(&WalletEvent::NetworkChange(network));
    }
}

fn upgrade<P, C>(weak: &Weak<Inner<P, C>>) -> Option<WalletAdapter<P, C>> {
    weak.upgrade().map(|inner| WalletAdapter { inner })
}

mod common;

use std::rc::Rc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use starcoin_wallet_adapters::{DeterministicProvider, ProviderMethod};
use starcoin_wallet_core::{
    AccountChangeHandler, AccountInfo, EventName, NetworkChangeHandler, PortError, ProviderPort,
    ProviderResponse, ReadyState, SignMessagePayload, SignMessageResponse, WalletAdapter,
    WalletError, WalletEvent, WalletOptions,
};

use common::{account, connected_adapter, installed_adapter, new_adapter, EventLog, TestClock};

#[tokio::test]
async fn connect_populates_session_and_network() {
    let provider = DeterministicProvider::new()
        .with_accounts(vec![account("0xABC")])
        .with_chain_id(254);
    let adapter = installed_adapter(provider).await;
    let log = EventLog::attach(adapter.events());

    adapter.connect().await.expect("connect");

    let session = adapter.public_account().expect("session after connect");
    assert_eq!(session.address, "0xABC");
    assert!(session.is_connected);
    assert_eq!(adapter.network().chain_id.as_deref(), Some("0xfe"));
    assert_eq!(adapter.network().name, "dev");
    assert!(adapter.connected());
    assert!(!adapter.connecting());
    assert_eq!(log.events(), vec![WalletEvent::Connect("0xABC".to_owned())]);
}

#[tokio::test]
async fn connect_before_detection_fails_not_ready() {
    let provider = DeterministicProvider::new();
    let adapter = new_adapter(provider.clone());
    let log = EventLog::attach(adapter.events());
    assert_eq!(adapter.ready_state(), ReadyState::NotDetected);

    let err = adapter.connect().await.expect_err("must fail");
    assert_eq!(err, WalletError::NotReady(ReadyState::NotDetected));
    assert!(adapter.public_account().is_none());
    assert!(!adapter.connecting());
    assert_eq!(provider.call_count(ProviderMethod::RequestAccounts), 0);
    assert_eq!(log.errors(), vec![err]);
}

#[tokio::test]
async fn connect_from_loadable_succeeds() {
    let provider = DeterministicProvider::new();
    let adapter = new_adapter(provider.clone());
    let log = EventLog::attach(adapter.events());

    adapter
        .set_ready_state(ReadyState::Loadable)
        .expect("not detected -> loadable");
    assert_eq!(adapter.ready_state(), ReadyState::Loadable);
    adapter.connect().await.expect("connect");

    assert!(adapter.connected());
    assert_eq!(
        log.names(),
        vec![EventName::ReadyStateChange, EventName::Connect]
    );
    assert_eq!(
        log.events()[0],
        WalletEvent::ReadyStateChange(ReadyState::Loadable)
    );
    assert_eq!(provider.call_count(ProviderMethod::RequestAccounts), 1);
}

#[tokio::test]
async fn illegal_ready_state_is_rejected_without_event() {
    let adapter = installed_adapter(DeterministicProvider::new()).await;
    let log = EventLog::attach(adapter.events());

    let err = adapter
        .set_ready_state(ReadyState::Loadable)
        .expect_err("installed is terminal");
    assert_eq!(err.from, ReadyState::Installed);
    assert_eq!(err.to, ReadyState::Loadable);
    assert_eq!(adapter.ready_state(), ReadyState::Installed);
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn connect_on_unsupported_host_fails_not_ready() {
    let adapter = new_adapter(DeterministicProvider::unsupported());
    assert_eq!(adapter.ready_state(), ReadyState::Unsupported);
    assert_eq!(adapter.detect().await, ReadyState::Unsupported);

    let err = adapter.connect().await.expect_err("must fail");
    assert_eq!(err, WalletError::NotReady(ReadyState::Unsupported));
    assert!(!adapter.connected());
}

#[tokio::test]
async fn connect_when_connected_is_a_noop() {
    let provider = DeterministicProvider::new();
    let adapter = connected_adapter(provider.clone()).await;
    let log = EventLog::attach(adapter.events());

    adapter.connect().await.expect("second connect");

    assert_eq!(log.count(EventName::Connect), 0);
    assert_eq!(provider.call_count(ProviderMethod::RequestAccounts), 1);
    assert!(adapter.connected());
}

#[tokio::test]
async fn connect_rejection_is_emitted_and_returned() {
    let provider = DeterministicProvider::new();
    provider.fail(
        ProviderMethod::RequestAccounts,
        PortError::Transport("user rejected the request".to_owned()),
    );
    let adapter = installed_adapter(provider).await;
    let log = EventLog::attach(adapter.events());

    let err = adapter.connect().await.expect_err("must fail");
    assert!(matches!(
        err,
        WalletError::ConnectionRejected(PortError::Transport(_))
    ));
    assert!(!adapter.connected());
    assert!(!adapter.connecting());
    assert_eq!(log.errors(), vec![err]);
    assert_eq!(log.count(EventName::Connect), 0);
}

#[tokio::test]
async fn connect_without_any_account_is_rejected() {
    let provider = DeterministicProvider::new().with_accounts(vec![]);
    let adapter = installed_adapter(provider).await;

    let err = adapter.connect().await.expect_err("must fail");
    assert!(matches!(
        err,
        WalletError::ConnectionRejected(PortError::NoResponse(_))
    ));
    assert!(adapter.public_account().is_none());
}

#[tokio::test]
async fn network_failure_leaves_adapter_disconnected() {
    let provider = DeterministicProvider::new();
    provider.fail(
        ProviderMethod::ChainId,
        PortError::Transport("chain.id timed out".to_owned()),
    );
    let adapter = installed_adapter(provider.clone()).await;
    let log = EventLog::attach(adapter.events());

    let err = adapter.connect().await.expect_err("must fail");
    assert!(matches!(err, WalletError::NetworkQueryFailed(_)));
    assert!(!adapter.connected());
    assert!(!adapter.connecting());
    assert_eq!(log.errors().len(), 1);

    provider.clear_failure(ProviderMethod::ChainId);
    adapter.connect().await.expect("connect after recovery");
    assert!(adapter.connected());
    assert_eq!(log.count(EventName::Connect), 1);
}

#[tokio::test]
async fn disconnect_clears_session_and_emits() {
    let provider = DeterministicProvider::new();
    let adapter = connected_adapter(provider.clone()).await;
    let log = EventLog::attach(adapter.events());

    adapter.disconnect().await.expect("disconnect");

    assert!(!adapter.connected());
    assert!(adapter.public_account().is_none());
    assert_eq!(log.events(), vec![WalletEvent::Disconnect]);
    assert_eq!(provider.call_count(ProviderMethod::Disconnect), 1);
    assert!(!provider.provider_connected());
}

#[tokio::test]
async fn disconnect_without_session_is_a_noop() {
    let provider = DeterministicProvider::new();
    let adapter = installed_adapter(provider.clone()).await;
    let log = EventLog::attach(adapter.events());

    adapter.disconnect().await.expect("disconnect");

    assert!(log.events().is_empty());
    assert_eq!(provider.call_count(ProviderMethod::Disconnect), 0);
}

#[tokio::test]
async fn provider_disconnect_failure_is_not_returned() {
    let provider = DeterministicProvider::new();
    provider.fail(
        ProviderMethod::Disconnect,
        PortError::Transport("extension went away".to_owned()),
    );
    let adapter = connected_adapter(provider).await;
    let log = EventLog::attach(adapter.events());

    adapter.disconnect().await.expect("disconnect stays ok");

    assert!(!adapter.connected());
    assert_eq!(
        log.names(),
        vec![EventName::Error, EventName::Disconnect]
    );
    assert!(matches!(
        log.errors()[0],
        WalletError::DisconnectionFailed(PortError::Transport(_))
    ));
}

#[tokio::test]
async fn connected_tracks_the_last_lifecycle_event() {
    let adapter = installed_adapter(DeterministicProvider::new()).await;
    assert!(!adapter.connected());

    adapter.connect().await.expect("connect");
    assert!(adapter.connected());
    adapter.disconnect().await.expect("disconnect");
    assert!(!adapter.connected());
    adapter.connect().await.expect("reconnect");
    assert!(adapter.connected());
}

/// Holds `stc_requestAccounts` open until released.
struct GatedProvider {
    inner: DeterministicProvider,
    gate: Rc<Notify>,
}

#[async_trait(?Send)]
impl ProviderPort for GatedProvider {
    fn is_present(&self) -> bool {
        self.inner.is_present()
    }

    async fn is_connected(&self) -> Result<bool, PortError> {
        self.inner.is_connected().await
    }

    async fn request_accounts(&self) -> Result<Vec<AccountInfo>, PortError> {
        self.gate.notified().await;
        self.inner.request_accounts().await
    }

    async fn chain_id(&self) -> Result<u64, PortError> {
        self.inner.chain_id().await
    }

    async fn sign_transaction(
        &self,
        payload: &Value,
        options: Option<&Value>,
    ) -> Result<Vec<u8>, PortError> {
        self.inner.sign_transaction(payload, options).await
    }

    async fn sign_and_submit(
        &self,
        payload: &Value,
        options: Option<&Value>,
    ) -> Result<Option<ProviderResponse<String>>, PortError> {
        self.inner.sign_and_submit(payload, options).await
    }

    async fn sign_message(
        &self,
        payload: &SignMessagePayload,
    ) -> Result<Option<ProviderResponse<SignMessageResponse>>, PortError> {
        self.inner.sign_message(payload).await
    }

    async fn disconnect(&self) -> Result<(), PortError> {
        self.inner.disconnect().await
    }

    fn on_account_change(&self, handler: AccountChangeHandler) -> Result<(), PortError> {
        self.inner.on_account_change(handler)
    }

    fn on_network_change(&self, handler: NetworkChangeHandler) -> Result<(), PortError> {
        self.inner.on_network_change(handler)
    }
}

#[tokio::test]
async fn connect_while_connecting_is_a_noop() {
    let inner = DeterministicProvider::new();
    let gate = Rc::new(Notify::new());
    let adapter = WalletAdapter::new(
        GatedProvider {
            inner: inner.clone(),
            gate: Rc::clone(&gate),
        },
        TestClock::default(),
        WalletOptions::default(),
    );
    adapter.detect().await;
    let log = EventLog::attach(adapter.events());

    let first = adapter.connect();
    let second = async {
        assert!(adapter.connecting());
        adapter.connect().await.expect("reentrant connect");
        assert!(!adapter.connected());
        gate.notify_one();
    };
    let (first, ()) = tokio::join!(first, second);
    first.expect("first connect");

    assert!(adapter.connected());
    assert!(!adapter.connecting());
    assert_eq!(log.count(EventName::Connect), 1);
    assert_eq!(inner.call_count(ProviderMethod::RequestAccounts), 1);
}

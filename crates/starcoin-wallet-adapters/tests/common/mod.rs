#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use starcoin_wallet_adapters::DeterministicProvider;
use starcoin_wallet_core::{
    AccountInfo, ClockPort, EventBus, EventName, PortError, ReadyState, WalletAdapter,
    WalletError, WalletEvent, WalletOptions,
};

/// Virtual clock: `sleep` advances time instantly.
#[derive(Debug, Default)]
pub struct TestClock {
    elapsed: AtomicU64,
    sleeps: AtomicU32,
}

impl TestClock {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    pub fn sleeps(&self) -> u32 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.elapsed.load(Ordering::SeqCst) + 1_739_750_400_000)
    }

    async fn sleep(&self, duration: Duration) {
        self.elapsed
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
        self.sleeps.fetch_add(1, Ordering::SeqCst);
    }
}

pub type TestAdapter = WalletAdapter<DeterministicProvider, TestClock>;

pub fn new_adapter(provider: DeterministicProvider) -> TestAdapter {
    new_adapter_with(provider, WalletOptions::default()).0
}

pub fn new_adapter_with(
    provider: DeterministicProvider,
    options: WalletOptions,
) -> (TestAdapter, Arc<TestClock>) {
    let clock = Arc::new(TestClock::default());
    let adapter = WalletAdapter::from_shared(Arc::new(provider), Arc::clone(&clock), options);
    (adapter, clock)
}

pub async fn installed_adapter(provider: DeterministicProvider) -> TestAdapter {
    let adapter = new_adapter(provider);
    assert_eq!(adapter.detect().await, ReadyState::Installed);
    adapter
}

pub async fn connected_adapter(provider: DeterministicProvider) -> TestAdapter {
    let adapter = installed_adapter(provider).await;
    adapter.connect().await.expect("connect");
    assert!(adapter.connected());
    adapter
}

/// Records every event emitted on a bus.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<WalletEvent>>>);

impl EventLog {
    pub fn attach(bus: &EventBus) -> Self {
        let log = Self::default();
        let sink = Arc::clone(&log.0);
        bus.on_any(move |event| {
            sink.lock().expect("event log lock").push(event.clone());
        });
        log
    }

    pub fn events(&self) -> Vec<WalletEvent> {
        self.0.lock().expect("event log lock").clone()
    }

    pub fn names(&self) -> Vec<EventName> {
        self.events().iter().map(WalletEvent::name).collect()
    }

    pub fn count(&self, name: EventName) -> usize {
        self.names().into_iter().filter(|n| *n == name).count()
    }

    pub fn errors(&self) -> Vec<WalletError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WalletEvent::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().expect("event log lock").clear();
    }
}

pub fn account(address: &str) -> AccountInfo {
    AccountInfo::from_address(address)
}

pub fn transfer_payload() -> Value {
    json!({
        "function": "0x1::TransferScripts::peer_to_peer_v2",
        "type_args": ["0x1::STC::STC"],
        "args": ["0x0000000000000000000000000a550c18", "1000000u128"]
    })
}

mod common;

use starcoin_wallet_adapters::DeterministicProvider;
use starcoin_wallet_core::{EventName, ReadyState, WalletEvent, WalletOptions};

use common::{new_adapter, new_adapter_with, EventLog};

#[tokio::test]
async fn present_provider_is_installed_without_waiting() {
    let provider = DeterministicProvider::new();
    let (adapter, clock) = new_adapter_with(provider.clone(), WalletOptions::default());
    let log = EventLog::attach(adapter.events());

    assert_eq!(adapter.detect().await, ReadyState::Installed);

    assert_eq!(clock.sleeps(), 0);
    assert_eq!(provider.presence_checks(), 1);
    assert_eq!(
        log.events(),
        vec![WalletEvent::ReadyStateChange(ReadyState::Installed)]
    );
}

#[tokio::test]
async fn late_injection_is_found_by_polling() {
    let provider = DeterministicProvider::appearing_after(3);
    let (adapter, clock) = new_adapter_with(provider.clone(), WalletOptions::default());

    assert_eq!(adapter.detect().await, ReadyState::Installed);

    assert_eq!(clock.sleeps(), 3);
    assert_eq!(clock.elapsed_ms(), 3_000);
    assert_eq!(provider.presence_checks(), 4);
}

#[tokio::test]
async fn polling_gives_up_after_max_attempts() {
    let provider = DeterministicProvider::absent();
    let options = WalletOptions {
        poll_interval_ms: 250,
        max_poll_attempts: 5,
        ..WalletOptions::default()
    };
    let (adapter, clock) = new_adapter_with(provider.clone(), options);
    let log = EventLog::attach(adapter.events());

    assert_eq!(adapter.detect().await, ReadyState::NotDetected);

    assert_eq!(provider.presence_checks(), 5);
    assert_eq!(clock.sleeps(), 4);
    assert_eq!(clock.elapsed_ms(), 1_000);
    assert_eq!(log.count(EventName::ReadyStateChange), 0);
}

#[tokio::test]
async fn detection_can_be_retried_after_giving_up() {
    let provider = DeterministicProvider::absent();
    let options = WalletOptions {
        max_poll_attempts: 2,
        ..WalletOptions::default()
    };
    let (adapter, _clock) = new_adapter_with(provider.clone(), options);
    assert_eq!(adapter.detect().await, ReadyState::NotDetected);

    provider.set_present(true);
    assert_eq!(adapter.detect().await, ReadyState::Installed);
}

#[tokio::test]
async fn unsupported_host_is_never_polled() {
    let provider = DeterministicProvider::unsupported();
    let (adapter, clock) = new_adapter_with(provider.clone(), WalletOptions::default());

    assert_eq!(adapter.detect().await, ReadyState::Unsupported);

    assert_eq!(provider.presence_checks(), 0);
    assert_eq!(clock.sleeps(), 0);
}

#[tokio::test]
async fn installed_adapter_skips_repeat_detection() {
    let provider = DeterministicProvider::new();
    let adapter = new_adapter(provider.clone());
    adapter.detect().await;
    let log = EventLog::attach(adapter.events());

    assert_eq!(adapter.detect().await, ReadyState::Installed);

    assert_eq!(provider.presence_checks(), 1);
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn zero_attempts_still_checks_once() {
    let provider = DeterministicProvider::new();
    let options = WalletOptions {
        max_poll_attempts: 0,
        ..WalletOptions::default()
    };
    let (adapter, clock) = new_adapter_with(provider.clone(), options);

    assert_eq!(adapter.detect().await, ReadyState::Installed);
    assert_eq!(provider.presence_checks(), 1);
    assert_eq!(clock.sleeps(), 0);
}

#[tokio::test]
async fn ready_state_listener_sees_installed() {
    let adapter = new_adapter(DeterministicProvider::appearing_after(1));
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&seen);
    adapter.events().once(EventName::ReadyStateChange, move |event| {
        sink.lock().expect("sink lock").push(event.clone());
    });

    adapter.detect().await;

    assert_eq!(
        *seen.lock().expect("seen lock"),
        vec![WalletEvent::ReadyStateChange(ReadyState::Installed)]
    );
    assert_eq!(adapter.events().listener_count(EventName::ReadyStateChange), 0);
}

//! starcoin-wallet-probe: detect StarMask, connect, and report the session.
//!
//! Configured from `STARCOIN_WALLET_*`. `STARCOIN_PROBE_MESSAGE` additionally signs a
//! message, and `STARCOIN_PROBE_WATCH` polls the bridge for that many rounds.

#[cfg(not(target_arch = "wasm32"))]
use starcoin_wallet_adapters::{starmask_adapter, WalletAdapterConfig};
#[cfg(not(target_arch = "wasm32"))]
use starcoin_wallet_core::{ProviderPort, ReadyState, SignMessagePayload, WalletEvent};

#[cfg(not(target_arch = "wasm32"))]
const ENV_PROBE_MESSAGE: &str = "STARCOIN_PROBE_MESSAGE";
#[cfg(not(target_arch = "wasm32"))]
const ENV_PROBE_WATCH: &str = "STARCOIN_PROBE_WATCH";

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = WalletAdapterConfig::from_env()?;
    let adapter = starmask_adapter(&config);
    tracing::info!(
        wallet = %adapter.metadata().name,
        mode = adapter.provider().mode_name(),
        "Starting starcoin-wallet-probe"
    );

    adapter.events().on_any(|event| match event {
        WalletEvent::Error(err) => tracing::warn!(kind = err.kind(), error = %err, "event"),
        other => tracing::info!(event = %other.name(), "{other:?}"),
    });

    let ready = adapter.detect().await;
    if ready != ReadyState::Installed {
        eyre::bail!("StarMask not available: {ready:?}");
    }

    adapter.connect().await?;
    let account = adapter
        .public_account()
        .ok_or_else(|| eyre::eyre!("connected without a session"))?;
    let network = adapter.network();
    let provider_connected = adapter.provider().is_connected().await?;
    tracing::info!(
        address = %account.address,
        network = %network.name,
        chain_id = network.chain_id.as_deref().unwrap_or("?"),
        provider_connected,
        "session established"
    );

    if let Ok(message) = std::env::var(ENV_PROBE_MESSAGE) {
        let signed = adapter
            .sign_message(&SignMessagePayload {
                message,
                nonce: "1".to_owned(),
                address: true,
                application: false,
                chain_id: true,
            })
            .await?;
        println!("{}", serde_json::to_string_pretty(&signed)?);
    }

    let rounds: u32 = match std::env::var(ENV_PROBE_WATCH) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| eyre::eyre!("invalid {ENV_PROBE_WATCH}: {e}"))?,
        Err(_) => 0,
    };
    if rounds > 0 {
        adapter.on_account_change()?;
        adapter.on_network_change()?;
        let interval = std::time::Duration::from_millis(config.poll_interval_ms);
        for _ in 0..rounds {
            tokio::time::sleep(interval).await;
            let changes = adapter.provider().poll_changes().await?;
            tracing::debug!(?changes, "polled provider");
            if !adapter.connected() {
                break;
            }
        }
    }

    adapter.disconnect().await?;
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}

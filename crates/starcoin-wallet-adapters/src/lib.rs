pub mod clock;
pub mod config;
pub mod deterministic;
pub mod starmask;

pub use clock::SystemClockAdapter;
pub use config::{ConfigError, RuntimeProfile, WalletAdapterConfig};
pub use deterministic::{DeterministicProvider, ProviderMethod};
pub use starmask::{ProviderChanges, StarMaskProvider};

use starcoin_wallet_core::WalletAdapter;

/// The adapter as wired for a real host.
pub type StarMaskWalletAdapter = WalletAdapter<StarMaskProvider, SystemClockAdapter>;

pub fn starmask_adapter(config: &WalletAdapterConfig) -> StarMaskWalletAdapter {
    WalletAdapter::new(
        StarMaskProvider::with_config(config),
        SystemClockAdapter,
        config.wallet_options(),
    )
}

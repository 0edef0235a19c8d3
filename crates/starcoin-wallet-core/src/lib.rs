pub mod adapter;
pub mod domain;
pub mod error;
pub mod events;
pub mod network;
pub mod ports;
pub mod state_machine;

pub use adapter::WalletAdapter;
pub use domain::{
    AccountInfo, NetworkInfo, ProviderResponse, PublicAccount, ReadyState, SignMessagePayload,
    SignMessageResponse, SubmittedTransaction, WalletMetadata, WalletOptions,
};
pub use error::WalletError;
pub use events::{EventBus, EventName, ListenerId, WalletEvent};
pub use network::{chain_id_hex, parse_chain_id, StarcoinNetwork};
pub use ports::{
    AccountChangeHandler, ClockPort, LocalBoxFuture, NetworkChangeHandler, PortError,
    ProviderPort,
};
pub use state_machine::{initial_ready_state, ready_transition, TransitionError};

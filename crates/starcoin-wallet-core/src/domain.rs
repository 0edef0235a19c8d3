use serde::{Deserialize, Serialize};

/// Adapter belief about whether a compatible provider is usable in this environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadyState {
    Unsupported,
    NotDetected,
    Loadable,
    Installed,
}

impl ReadyState {
    /// `connect` is only attempted from these states.
    pub fn is_usable(self) -> bool {
        matches!(self, ReadyState::Loadable | ReadyState::Installed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReadyState::Unsupported | ReadyState::Installed)
    }
}

/// One account as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<String>,
}

impl AccountInfo {
    pub fn from_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            public_key: None,
            auth_key: None,
        }
    }
}

/// The session record of the currently connected account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub address: String,
    pub public_key: Option<String>,
    pub auth_key: Option<String>,
    pub is_connected: bool,
}

impl PublicAccount {
    pub fn connected(account: AccountInfo) -> Self {
        Self {
            address: account.address,
            public_key: account.public_key,
            auth_key: account.auth_key,
            is_connected: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub name: String,
    pub api: Option<String>,
    /// Hex form of the numeric chain id, e.g. `0xfe` for 254.
    pub chain_id: Option<String>,
}

/// Static description of the wallet shown by a selection layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMetadata {
    pub name: String,
    pub url: String,
    pub icon: String,
}

impl Default for WalletMetadata {
    fn default() -> Self {
        Self {
            name: "StarMask".to_owned(),
            url: "https://chrome.google.com/webstore/detail/starmask/mfhbebgoclkghebffdldpobeajmbecfk"
                .to_owned(),
            icon: "https://raw.githubusercontent.com/starcoinorg/starmask-extension/main/app/images/logo/starmask-fox.svg"
                .to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletOptions {
    pub metadata: WalletMetadata,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Carried for transports that honor it; the adapter does not cancel calls itself.
    pub timeout_ms: u64,
}

impl Default for WalletOptions {
    fn default() -> Self {
        Self {
            metadata: WalletMetadata::default(),
            poll_interval_ms: 1_000,
            max_poll_attempts: 10,
            timeout_ms: 10_000,
        }
    }
}

/// Envelope the provider wraps `signAndSubmit` and `signMessage` results in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResponse<T> {
    pub success: bool,
    pub result: Option<T>,
}

impl<T> ProviderResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            result: Some(result),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            result: None,
        }
    }

    /// The result, only when the provider reports success.
    pub fn into_success(self) -> Option<T> {
        if self.success {
            self.result
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessagePayload {
    pub message: String,
    pub nonce: String,
    #[serde(default)]
    pub address: bool,
    #[serde(default)]
    pub application: bool,
    #[serde(default)]
    pub chain_id: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignMessageResponse {
    pub signature: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub application: Option<String>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub full_message: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

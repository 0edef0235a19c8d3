use crate::domain::NetworkInfo;
use crate::ports::PortError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarcoinNetwork {
    Main,
    Barnard,
    Proxima,
    Halley,
    Dev,
}

impl StarcoinNetwork {
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(Self::Main),
            251 => Some(Self::Barnard),
            252 => Some(Self::Proxima),
            253 => Some(Self::Halley),
            254 => Some(Self::Dev),
            _ => None,
        }
    }

    pub fn chain_id(self) -> u64 {
        match self {
            Self::Main => 1,
            Self::Barnard => 251,
            Self::Proxima => 252,
            Self::Halley => 253,
            Self::Dev => 254,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Barnard => "barnard",
            Self::Proxima => "proxima",
            Self::Halley => "halley",
            Self::Dev => "dev",
        }
    }

    pub fn api(self) -> &'static str {
        match self {
            Self::Main => "https://main-seed.starcoin.org",
            Self::Barnard => "https://barnard-seed.starcoin.org",
            Self::Proxima => "https://proxima-seed.starcoin.org",
            Self::Halley => "https://halley-seed.starcoin.org",
            Self::Dev => "http://localhost:9850",
        }
    }
}

pub fn chain_id_hex(chain_id: u64) -> String {
    format!("0x{chain_id:x}")
}

/// Accepts decimal or `0x`-prefixed hex.
pub fn parse_chain_id(raw: &str) -> Result<u64, PortError> {
    let raw = raw.trim();
    if raw.starts_with("0x") || raw.starts_with("0X") {
        u64::from_str_radix(&raw[2..], 16)
            .map_err(|e| PortError::Validation(format!("invalid hex chain id: {e}")))
    } else {
        raw.parse()
            .map_err(|e| PortError::Validation(format!("invalid chain id: {e}")))
    }
}

impl NetworkInfo {
    pub fn from_chain_id(chain_id: u64) -> Self {
        match StarcoinNetwork::from_chain_id(chain_id) {
            Some(known) => Self {
                name: known.name().to_owned(),
                api: Some(known.api().to_owned()),
                chain_id: Some(chain_id_hex(chain_id)),
            },
            None => Self {
                name: "unknown".to_owned(),
                api: None,
                chain_id: Some(chain_id_hex(chain_id)),
            },
        }
    }

    pub fn numeric_chain_id(&self) -> Option<u64> {
        self.chain_id
            .as_deref()
            .and_then(|raw| parse_chain_id(raw).ok())
    }
}

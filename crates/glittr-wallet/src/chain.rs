//! Chain presets and endpoint configuration.
//!
//! A [`ChainConfig`] is passed explicitly to every client and to the
//! assembler; there is no process-wide chain selection.

use std::fmt;
use std::str::FromStr;

use bitcoin::Network;
use url::Url;

use crate::error::ChainConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainType {
    GlittrDevnet,
    GlittrTestnet,
    GlittrMainnet,
}

impl ChainType {
    pub const ALL: [Self; 3] = [Self::GlittrDevnet, Self::GlittrTestnet, Self::GlittrMainnet];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GlittrDevnet => "glittr-devnet",
            Self::GlittrTestnet => "glittr-testnet",
            Self::GlittrMainnet => "glittr-mainnet",
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainType {
    type Err = ChainConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|chain| chain.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ChainConfigError::UnknownChain(s.to_string()))
    }
}

/// Network type reported by the wallet, mapped onto a Bitcoin network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletNetworkType {
    Mainnet,
    Testnet,
    Other,
}

impl From<WalletNetworkType> for Network {
    fn from(value: WalletNetworkType) -> Self {
        match value {
            WalletNetworkType::Mainnet => Self::Bitcoin,
            WalletNetworkType::Testnet => Self::Testnet,
            WalletNetworkType::Other => Self::Regtest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain: ChainType,
    pub label: &'static str,
    pub network: Network,
    pub glittr_api: String,
    pub electrum_api: String,
    pub api_key: Option<String>,
    pub disabled: bool,
}

impl ChainConfig {
    #[must_use]
    pub fn preset(chain: ChainType) -> Self {
        match chain {
            ChainType::GlittrDevnet => Self {
                chain,
                label: "Glittr Devnet",
                network: WalletNetworkType::Other.into(),
                glittr_api: "https://devnet-core-api.glittr.fi".to_string(),
                electrum_api: "https://devnet-electrum.glittr.fi".to_string(),
                api_key: None,
                disabled: false,
            },
            ChainType::GlittrTestnet => Self {
                chain,
                label: "Glittr Testnet",
                network: WalletNetworkType::Testnet.into(),
                glittr_api: "https://testnet-core-api.glittr.fi".to_string(),
                electrum_api: "https://testnet-electrum.glittr.fi".to_string(),
                api_key: None,
                disabled: false,
            },
            ChainType::GlittrMainnet => Self {
                chain,
                label: "Glittr Mainnet",
                network: WalletNetworkType::Mainnet.into(),
                glittr_api: "https://core-api.glittr.fi".to_string(),
                electrum_api: "https://electrum.glittr.fi".to_string(),
                api_key: None,
                disabled: true,
            },
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Whether switching to this chain needs an API key first.
    #[must_use]
    pub const fn requires_api_key(&self) -> bool {
        matches!(self.chain, ChainType::GlittrDevnet)
    }

    /// Check that this chain may be selected and its endpoints are usable.
    pub fn validate(&self) -> Result<(), ChainConfigError> {
        if self.disabled {
            return Err(ChainConfigError::Disabled(self.label.to_string()));
        }

        if self.requires_api_key()
            && self
                .api_key
                .as_deref()
                .is_none_or(|key| key.trim().is_empty())
        {
            return Err(ChainConfigError::MissingApiKey(self.label.to_string()));
        }

        validate_http_url("glittr_api", &self.glittr_api)?;
        validate_http_url("electrum_api", &self.electrum_api)?;

        Ok(())
    }

    /// Shortened API key for display, e.g. `abcd...wxyz`.
    #[must_use]
    pub fn masked_api_key(&self) -> Option<String> {
        let key = self.api_key.as_deref()?;
        if key.chars().count() > 12 {
            let head: String = key.chars().take(4).collect();
            let tail: String = key.chars().skip(key.chars().count() - 4).collect();
            Some(format!("{head}...{tail}"))
        } else {
            Some(key.to_string())
        }
    }
}

fn validate_http_url(field: &'static str, value: &str) -> Result<(), ChainConfigError> {
    let url = Url::parse(value).map_err(|error| ChainConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        message: error.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        other => Err(ChainConfigError::InvalidUrl {
            field,
            value: value.to_string(),
            message: format!("scheme must be http or https with a host; got '{other}'"),
        }),
    }
}

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use glittr_wallet::client::DEFAULT_TIMEOUT_SECS;
use glittr_wallet::{ChainConfig, ChainType};

pub const DEFAULT_CHAIN: ChainType = ChainType::GlittrTestnet;

/// Chain selection and endpoint overrides, shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ChainArgs {
    /// Chain to operate on (glittr-devnet, glittr-testnet, glittr-mainnet)
    #[arg(long, env = "GLITTR_CHAIN", default_value_t = DEFAULT_CHAIN, global = true)]
    pub chain: ChainType,
    /// Override the Glittr core API base URL
    #[arg(long = "api-url", env = "GLITTR_API_URL", global = true)]
    pub api_url: Option<String>,
    /// Override the Esplora (electrum REST) base URL
    #[arg(long = "electrum-url", env = "GLITTR_ELECTRUM_URL", global = true)]
    pub electrum_url: Option<String>,
    /// API key sent as a bearer token; required on devnet
    #[arg(
        long = "api-key",
        env = "GLITTR_API_KEY",
        hide_env_values = true,
        global = true
    )]
    pub api_key: Option<String>,
    /// HTTP request timeout in seconds
    #[arg(
        long = "timeout-secs",
        env = "GLITTR_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        global = true
    )]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub chain: ChainConfig,
    pub timeout_secs: u64,
}

impl CliConfig {
    pub fn from_args(args: &ChainArgs) -> Self {
        let mut chain = ChainConfig::preset(args.chain);

        if let Some(api_url) = non_empty(args.api_url.as_deref()) {
            chain.glittr_api = api_url.to_string();
        }
        if let Some(electrum_url) = non_empty(args.electrum_url.as_deref()) {
            chain.electrum_api = electrum_url.to_string();
        }
        if let Some(api_key) = non_empty(args.api_key.as_deref()) {
            chain = chain.with_api_key(api_key);
        }

        Self {
            chain,
            timeout_secs: args.timeout_secs,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.chain
            .validate()
            .with_context(|| format!("cannot use chain {}", self.chain.chain))?;

        if self.timeout_secs == 0 {
            bail!("GLITTR_HTTP_TIMEOUT_SECS must be > 0");
        }

        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

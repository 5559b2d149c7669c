mod assets;
mod chains;
mod transfer;

use anyhow::{Context, Result};
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network};
use clap::Subcommand;
use glittr_wallet::AssetId;

use crate::config::CliConfig;

pub use assets::Listing;
pub use transfer::SendArgs;

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List known chains and check the selected one
    Chains,
    /// List every asset held by an address
    Balance {
        /// Address to inspect
        address: String,
    },
    /// List fungible tokens held by an address
    Tokens {
        /// Address to inspect
        address: String,
    },
    /// List NFTs held by an address
    Nfts {
        /// Address to inspect
        address: String,
    },
    /// Show one asset held by an address
    Token {
        /// Address to inspect
        address: String,
        /// Asset id as `<block>:<txIndex>`
        asset_id: AssetId,
    },
    /// Build an unsigned transfer and print its PSBT hex
    Send(Box<SendArgs>),
    /// Extract the final transaction from a signed PSBT
    Extract {
        /// Signed PSBT, hex encoded
        psbt_hex: String,
    },
    /// Broadcast a raw transaction through the chain's Esplora endpoint
    Broadcast {
        /// Raw transaction, hex encoded
        raw_tx_hex: String,
    },
}

impl Commands {
    pub async fn handle(self, config: CliConfig) -> Result<()> {
        match self {
            Self::Chains => {
                chains::list(&config);
                Ok(())
            }
            Self::Balance { address } => assets::list(&config, &address, Listing::All).await,
            Self::Tokens { address } => assets::list(&config, &address, Listing::Fungible).await,
            Self::Nfts { address } => assets::list(&config, &address, Listing::Nft).await,
            Self::Token { address, asset_id } => assets::show(&config, &address, asset_id).await,
            Self::Send(args) => transfer::send(&config, *args).await,
            Self::Extract { psbt_hex } => transfer::extract(&psbt_hex),
            Self::Broadcast { raw_tx_hex } => transfer::broadcast(&config, &raw_tx_hex).await,
        }
    }
}

fn parse_address(address: &str, network: Network) -> Result<Address> {
    address
        .trim()
        .parse::<Address<NetworkUnchecked>>()
        .with_context(|| format!("invalid address '{address}'"))?
        .require_network(network)
        .with_context(|| format!("address '{address}' is not valid for {network}"))
}

use anyhow::{Context, Result, bail};
use bitcoin::Address;
use glittr_wallet::client::GlittrClient;
use glittr_wallet::contract::AssetHolding;
use glittr_wallet::{AddressBalance, AssetId, AssetKind, BalanceIndex};

use crate::config::CliConfig;

use super::parse_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    All,
    Fungible,
    Nft,
}

async fn fetch_balance(config: &CliConfig, address: &str) -> Result<AddressBalance> {
    config.validate()?;
    let address = parse_address(address, config.chain.network)?;

    let client = GlittrClient::from_chain(&config.chain, config.timeout())?;
    query_balance(&client, &address).await
}

pub async fn query_balance<I: BalanceIndex>(
    index: &I,
    address: &Address,
) -> Result<AddressBalance> {
    index
        .address_balance(address)
        .await
        .with_context(|| format!("failed to fetch balance of {address}"))
}

pub async fn list(config: &CliConfig, address: &str, listing: Listing) -> Result<()> {
    let balance = fetch_balance(config, address).await?;

    let holdings: Vec<AssetHolding<'_>> = match listing {
        Listing::All => balance.assets().collect(),
        Listing::Fungible => balance.fungible_tokens().collect(),
        Listing::Nft => balance.nfts().collect(),
    };

    if holdings.is_empty() {
        println!("no assets");
        return Ok(());
    }

    for holding in holdings {
        let mut line = format!(
            "{:<16} {:<12} {:>24} {}",
            holding.id,
            holding.ticker(),
            holding.display_amount(),
            kind_label(holding.kind())
        );
        if listing == Listing::Nft
            && let Some(image) = holding.contract.and_then(|contract| contract.image())
        {
            line.push(' ');
            line.push_str(image_label(image.url()));
        }
        println!("{line}");
    }

    Ok(())
}

pub async fn show(config: &CliConfig, address: &str, asset_id: AssetId) -> Result<()> {
    let balance = fetch_balance(config, address).await?;

    let Some(holding) = balance.asset(asset_id) else {
        bail!("{address} holds no {asset_id}");
    };

    println!("asset: {}", holding.id);
    println!("ticker: {}", holding.ticker());
    println!("type: {}", kind_label(holding.kind()));
    println!("balance: {}", holding.display_amount());

    if let Some(contract) = holding.contract {
        println!("divisibility: {}", contract.divisibility.unwrap_or(0));
        println!(
            "total supply: {}",
            contract.display_amount(contract.total_supply)
        );
        if let Some(cap) = contract.supply_cap {
            println!("supply cap: {}", contract.display_amount(cap));
        }
        if let Some(label) = contract.mint_label() {
            println!("mint: {label}");
        }
        if let Some(image) = contract.image() {
            println!("image: {}", image_label(image.url()));
        }
    }

    Ok(())
}

const fn kind_label(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Fungible => "fungible",
        AssetKind::Nft => "nft",
        AssetKind::Unknown => "unknown",
    }
}

/// Data URLs are long; show only their media type.
fn image_label(url: &str) -> &str {
    if url.starts_with("data:") {
        url.split_once(',').map_or(url, |(header, _)| header)
    } else {
        url
    }
}

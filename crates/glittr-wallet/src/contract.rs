//! Balance index payloads and asset classification.
//!
//! The wire payload of `/helper/address/{address}/balance` is decoded into
//! private `Raw*` types and validated into [`AddressBalance`] before anything
//! else sees it.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cid::Cid;
use flate2::read::ZlibDecoder;
use serde::Deserialize;

use crate::asset::{AssetId, format_amount, parse_raw_amount};

pub const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Mint policy of a fungible contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MintType {
    pub free_mint: bool,
}

/// Token-economics metadata of one asset contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInfo {
    pub ticker: Option<String>,
    pub divisibility: Option<u8>,
    pub supply_cap: Option<u128>,
    pub total_supply: u128,
    pub mint: Option<MintType>,
    pub embedded_asset: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Fungible,
    Nft,
    Unknown,
}

impl ContractInfo {
    #[must_use]
    pub fn kind(&self) -> AssetKind {
        match (&self.mint, self.divisibility, &self.embedded_asset) {
            (None, _, _) => AssetKind::Nft,
            (Some(_), Some(_), None) => AssetKind::Fungible,
            _ => AssetKind::Unknown,
        }
    }

    #[must_use]
    pub fn ticker_or_unknown(&self) -> &str {
        self.ticker.as_deref().unwrap_or("Unknown")
    }

    /// Render a raw amount of this asset for display.
    #[must_use]
    pub fn display_amount(&self, raw: u128) -> String {
        format_amount(raw, self.divisibility.unwrap_or(0))
    }

    #[must_use]
    pub fn mint_label(&self) -> Option<&'static str> {
        self.mint.map(|mint| {
            if mint.free_mint {
                "Free Mint"
            } else {
                "Paid Mint"
            }
        })
    }

    #[must_use]
    pub fn image(&self) -> Option<NftImage> {
        self.embedded_asset.as_deref().map(NftImage::from_embedded)
    }
}

/// One summarized holding joined with its contract metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHolding<'a> {
    pub id: AssetId,
    pub amount: u128,
    pub contract: Option<&'a ContractInfo>,
}

impl AssetHolding<'_> {
    #[must_use]
    pub fn kind(&self) -> AssetKind {
        self.contract.map_or(AssetKind::Unknown, ContractInfo::kind)
    }

    #[must_use]
    pub fn ticker(&self) -> &str {
        self.contract
            .map_or("Unknown", ContractInfo::ticker_or_unknown)
    }

    #[must_use]
    pub fn display_amount(&self) -> String {
        self.contract.map_or_else(
            || self.amount.to_string(),
            |contract| contract.display_amount(self.amount),
        )
    }
}

/// Validated holdings of one address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBalance {
    pub summarized: BTreeMap<AssetId, u128>,
    pub contracts: BTreeMap<AssetId, ContractInfo>,
}

impl AddressBalance {
    /// Every summarized holding, in asset id order.
    pub fn assets(&self) -> impl Iterator<Item = AssetHolding<'_>> {
        self.summarized.iter().map(|(id, amount)| AssetHolding {
            id: *id,
            amount: *amount,
            contract: self.contracts.get(id),
        })
    }

    pub fn fungible_tokens(&self) -> impl Iterator<Item = AssetHolding<'_>> {
        self.assets()
            .filter(|holding| holding.kind() == AssetKind::Fungible)
    }

    pub fn nfts(&self) -> impl Iterator<Item = AssetHolding<'_>> {
        self.assets().filter(|holding| holding.kind() == AssetKind::Nft)
    }

    #[must_use]
    pub fn asset(&self, id: AssetId) -> Option<AssetHolding<'_>> {
        self.summarized.get(&id).map(|amount| AssetHolding {
            id,
            amount: *amount,
            contract: self.contracts.get(&id),
        })
    }
}

/// Renderable location of an NFT's embedded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NftImage {
    Ipfs(String),
    DataUrl(String),
}

impl NftImage {
    /// Decode the embedded asset bytes of an NFT contract.
    ///
    /// UTF-8 CIDs resolve through the public IPFS gateway. Anything else is a
    /// zlib-compressed bitmap, or an uncompressed one when inflation fails.
    #[must_use]
    pub fn from_embedded(bytes: &[u8]) -> Self {
        if let Ok(text) = std::str::from_utf8(bytes)
            && Cid::from_str(text).is_ok()
        {
            return Self::Ipfs(format!("{IPFS_GATEWAY}{text}"));
        }

        let mut inflated = Vec::new();
        let image = match ZlibDecoder::new(bytes).read_to_end(&mut inflated) {
            Ok(_) => inflated.as_slice(),
            Err(error) => {
                tracing::debug!("embedded asset is not zlib data, using raw bytes: {error}");
                bytes
            }
        };

        Self::DataUrl(format!("data:image/bmp;base64,{}", STANDARD.encode(image)))
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Ipfs(url) | Self::DataUrl(url) => url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawBalanceResponse {
    balance: RawBalance,
    #[serde(default)]
    contract_info: HashMap<String, RawContractInfo>,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    #[serde(default)]
    summarized: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawContractInfo {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    divisibility: Option<u8>,
    #[serde(default)]
    supply_cap: Option<String>,
    #[serde(default)]
    total_supply: Option<String>,
    #[serde(default, rename = "type")]
    mint: Option<MintType>,
    #[serde(default)]
    asset: Option<Vec<u8>>,
}

impl TryFrom<RawBalanceResponse> for AddressBalance {
    type Error = String;

    fn try_from(raw: RawBalanceResponse) -> Result<Self, Self::Error> {
        let summarized = raw
            .balance
            .summarized
            .into_iter()
            .map(|(key, amount)| {
                let id = key
                    .parse::<AssetId>()
                    .map_err(|error| format!("balance key: {error}"))?;
                let amount = parse_raw_amount(&amount)
                    .map_err(|error| format!("balance of {id}: {error}"))?;
                Ok((id, amount))
            })
            .collect::<Result<BTreeMap<_, _>, String>>()?;

        let contracts = raw
            .contract_info
            .into_iter()
            .map(|(key, info)| {
                let id = key
                    .parse::<AssetId>()
                    .map_err(|error| format!("contract_info key: {error}"))?;
                let info =
                    ContractInfo::try_from(info).map_err(|error| format!("contract {id}: {error}"))?;
                Ok((id, info))
            })
            .collect::<Result<BTreeMap<_, _>, String>>()?;

        Ok(Self {
            summarized,
            contracts,
        })
    }
}

impl TryFrom<RawContractInfo> for ContractInfo {
    type Error = String;

    fn try_from(raw: RawContractInfo) -> Result<Self, Self::Error> {
        let supply_cap = raw
            .supply_cap
            .as_deref()
            .map(parse_raw_amount)
            .transpose()
            .map_err(|error| format!("supply_cap: {error}"))?;
        let total_supply = raw
            .total_supply
            .as_deref()
            .map(parse_raw_amount)
            .transpose()
            .map_err(|error| format!("total_supply: {error}"))?
            .unwrap_or(0);

        Ok(Self {
            ticker: raw.ticker,
            divisibility: raw.divisibility,
            supply_cap,
            total_supply,
            mint: raw.mint,
            embedded_asset: raw.asset,
        })
    }
}

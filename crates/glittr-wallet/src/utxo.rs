use bitcoin::OutPoint;
use serde::{Deserialize, Serialize};

use crate::asset::AssetId;

/// Confirmation state as reported by Esplora.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoStatus {
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_time: Option<u64>,
}

/// A spendable base-chain output owned by the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcoinUtxo {
    pub outpoint: OutPoint,
    /// Value in satoshis.
    pub value: u64,
    pub status: UtxoStatus,
}

/// A base-chain output that also carries units of one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUtxo {
    pub utxo: BitcoinUtxo,
    pub asset_amount: u128,
    /// Other assets the index reports on the same output. Spending it does
    /// not carry them forward.
    pub other_assets: Vec<AssetId>,
}

impl AssetUtxo {
    #[must_use]
    pub const fn outpoint(&self) -> OutPoint {
        self.utxo.outpoint
    }
}

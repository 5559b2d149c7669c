use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{Address, OutPoint, Transaction, Txid};
use serde::Deserialize;
use url::Url;

use crate::chain::ChainConfig;
use crate::error::FetchError;
use crate::utxo::{BitcoinUtxo, UtxoStatus};

use super::{base_url, endpoint, http_client, read_json, read_text};

/// Fee estimates response from Esplora.
/// Key: confirmation target (in blocks as string), Value: fee rate (sat/vB).
pub type FeeEstimates = HashMap<String, f64>;

/// Confirmation targets Esplora reports, in ascending order.
const FEE_TARGETS: [u32; 28] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 144,
    504, 1008,
];

/// Client for the Esplora REST API of the selected chain.
#[derive(Debug, Clone)]
pub struct EsploraClient {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: Txid,
    vout: u32,
    value: u64,
    #[serde(default)]
    status: UtxoStatus,
}

impl From<EsploraUtxo> for BitcoinUtxo {
    fn from(raw: EsploraUtxo) -> Self {
        Self {
            outpoint: OutPoint {
                txid: raw.txid,
                vout: raw.vout,
            },
            value: raw.value,
            status: raw.status,
        }
    }
}

impl EsploraClient {
    pub fn new(base_url_str: &str, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url(base_url_str)?,
        })
    }

    pub fn from_chain(chain: &ChainConfig, timeout: Duration) -> Result<Self, FetchError> {
        Self::new(&chain.electrum_api, timeout)
    }

    /// All unspent outputs of `address`.
    pub async fn address_utxos(&self, address: &Address) -> Result<Vec<BitcoinUtxo>, FetchError> {
        let url = endpoint(&self.base_url, &format!("address/{address}/utxo"))?;
        let raw: Vec<EsploraUtxo> = read_json(self.http.get(url).send().await?).await?;

        Ok(raw.into_iter().map(BitcoinUtxo::from).collect())
    }

    /// Fetch fee estimates for various confirmation targets.
    ///
    /// Example response: `{ "1": 87.882, "2": 87.882, ..., "144": 1.027, "1008": 1.027 }`
    pub async fn fee_estimates(&self) -> Result<FeeEstimates, FetchError> {
        let url = endpoint(&self.base_url, "fee-estimates")?;
        read_json(self.http.get(url).send().await?).await
    }

    /// Fee rate in sat/vB for confirmation within `target_blocks`.
    ///
    /// If the exact target is not available, falls back to the next higher
    /// target, then to any available target.
    pub async fn fee_rate(&self, target_blocks: u32) -> Result<f64, FetchError> {
        let estimates = self.fee_estimates().await?;

        select_fee_rate(&estimates, target_blocks).ok_or_else(|| FetchError::NoFeeEstimates {
            url: self.url_string("fee-estimates"),
        })
    }

    /// Broadcast a raw transaction given as hex and return its txid.
    pub async fn broadcast_hex(&self, raw_tx_hex: &str) -> Result<Txid, FetchError> {
        let url = endpoint(&self.base_url, "tx")?;
        let body = read_text(
            self.http
                .post(url)
                .body(raw_tx_hex.trim().to_string())
                .send()
                .await?,
        )
        .await?;

        let body = body.trim();
        Txid::from_str(body).map_err(|error| FetchError::Malformed {
            url: self.url_string("tx"),
            message: format!("expected txid, got '{body}': {error}"),
        })
    }

    pub async fn broadcast(&self, tx: &Transaction) -> Result<Txid, FetchError> {
        self.broadcast_hex(&serialize_hex(tx)).await
    }

    fn url_string(&self, path: &str) -> String {
        endpoint(&self.base_url, path).map_or_else(|_| path.to_string(), String::from)
    }
}

fn select_fee_rate(estimates: &FeeEstimates, target_blocks: u32) -> Option<f64> {
    let lookup = |target: u32| {
        estimates
            .get(&target.to_string())
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    };

    lookup(target_blocks)
        .or_else(|| {
            FEE_TARGETS
                .iter()
                .filter(|&&target| target >= target_blocks)
                .find_map(|&target| lookup(target))
        })
        .or_else(|| FEE_TARGETS.iter().find_map(|&target| lookup(target)))
}

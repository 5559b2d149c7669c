//! HTTP implementations of the collaborator traits.
//!
//! [`GlittrClient`] talks to the Glittr core API, [`EsploraClient`] to the
//! chain's Esplora (electrum REST) endpoint, and [`GlittrUtxoProvider`] joins
//! the two into asset-aware UTXO listings.

mod esplora;
mod glittr;

use std::collections::HashSet;
use std::time::Duration;

use bitcoin::{Address, OutPoint};
use futures_util::future::try_join;
use serde::de::DeserializeOwned;
use url::Url;

use crate::asset::AssetId;
use crate::chain::ChainConfig;
use crate::error::FetchError;
use crate::provider::UtxoProvider;
use crate::utxo::{AssetUtxo, BitcoinUtxo};

pub use esplora::{EsploraClient, FeeEstimates};
pub use glittr::{GlittrClient, ValidOutput};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Parse `base` as a directory URL so relative joins keep its path.
pub(crate) fn base_url(base: &str) -> Result<Url, FetchError> {
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };
    Ok(Url::parse(&normalized)?)
}

pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, FetchError> {
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// Read the body, failing on non-2xx status.
pub(crate) async fn read_text(response: reqwest::Response) -> Result<String, FetchError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url,
            message: text.trim().to_string(),
        });
    }

    Ok(text)
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, FetchError> {
    let url = response.url().to_string();
    let text = read_text(response).await?;

    serde_json::from_str(&text).map_err(|error| FetchError::Malformed {
        url,
        message: error.to_string(),
    })
}

/// UTXO provider backed by the Glittr index and Esplora.
#[derive(Debug, Clone)]
pub struct GlittrUtxoProvider {
    glittr: GlittrClient,
    esplora: EsploraClient,
}

impl GlittrUtxoProvider {
    #[must_use]
    pub const fn new(glittr: GlittrClient, esplora: EsploraClient) -> Self {
        Self { glittr, esplora }
    }

    pub fn from_chain(chain: &ChainConfig, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self::new(
            GlittrClient::from_chain(chain, timeout)?,
            EsploraClient::from_chain(chain, timeout)?,
        ))
    }

    #[must_use]
    pub const fn glittr(&self) -> &GlittrClient {
        &self.glittr
    }

    #[must_use]
    pub const fn esplora(&self) -> &EsploraClient {
        &self.esplora
    }

    async fn snapshot(
        &self,
        address: &Address,
    ) -> Result<(Vec<BitcoinUtxo>, Vec<ValidOutput>), FetchError> {
        try_join(
            self.esplora.address_utxos(address),
            self.glittr.valid_outputs(address),
        )
        .await
    }
}

impl UtxoProvider for GlittrUtxoProvider {
    async fn plain_utxos(&self, address: &Address) -> Result<Vec<BitcoinUtxo>, FetchError> {
        let (utxos, valid_outputs) = self.snapshot(address).await?;

        let tagged: HashSet<OutPoint> = valid_outputs
            .iter()
            .filter(|output| output.carries_assets())
            .map(|output| output.outpoint)
            .collect();

        Ok(utxos
            .into_iter()
            .filter(|utxo| !tagged.contains(&utxo.outpoint))
            .collect())
    }

    async fn asset_utxos(
        &self,
        address: &Address,
        asset_id: AssetId,
    ) -> Result<Vec<AssetUtxo>, FetchError> {
        let (utxos, valid_outputs) = self.snapshot(address).await?;

        let mut asset_utxos = Vec::new();
        for output in valid_outputs {
            let Some(asset_amount) = output.amount_of(asset_id).filter(|amount| *amount > 0)
            else {
                continue;
            };

            match utxos.iter().find(|utxo| utxo.outpoint == output.outpoint) {
                Some(utxo) => asset_utxos.push(AssetUtxo {
                    utxo: utxo.clone(),
                    asset_amount,
                    other_assets: output
                        .asset_balances
                        .iter()
                        .filter(|(id, amount)| **id != asset_id && **amount > 0)
                        .map(|(id, _)| *id)
                        .collect(),
                }),
                None => tracing::warn!(
                    outpoint = %output.outpoint,
                    %asset_id,
                    "indexed asset output is not in the address UTXO set, skipping"
                ),
            }
        }

        tracing::debug!(%address, %asset_id, count = asset_utxos.len(), "fetched asset utxos");
        Ok(asset_utxos)
    }
}


#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use axum::Json;
    use axum::Router;
    use axum::routing::get;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::{CompressedPublicKey, Network};
    use serde_json::json;

    use super::*;

    const TXID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const TXID_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const TXID_C: &str = "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";

    fn address() -> Address {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[3u8; 32]).expect("secret key");
        Address::p2wpkh(
            &CompressedPublicKey(secret.public_key(&secp)),
            Network::Regtest,
        )
    }

    async fn provider() -> GlittrUtxoProvider {
        let app = Router::new()
            .route(
                "/address/{address}/utxo",
                get(|| async {
                    Json(json!([
                        { "txid": TXID_A, "vout": 0, "value": 600, "status": { "confirmed": true, "block_height": 10 } },
                        { "txid": TXID_B, "vout": 1, "value": 600, "status": { "confirmed": false } },
                        { "txid": TXID_C, "vout": 2, "value": 50000, "status": { "confirmed": true } }
                    ]))
                }),
            )
            .route(
                "/helper/address/{address}/valid-outputs",
                get(|| async {
                    Json(json!({
                        "valid_outputs": [
                            { "output": format!("{TXID_B}:1"), "asset_balances": { "5000:12": "300" } },
                            { "output": format!("{TXID_A}:0"), "asset_balances": { "5000:12": "700", "7:1": "1" } },
                            { "output": format!("{TXID_C}:9"), "asset_balances": { "5000:12": "50" } },
                            { "output": format!("{TXID_C}:2"), "asset_balances": {} }
                        ]
                    }))
                }),
            );
        let base = test_server::spawn(app).await;
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

        GlittrUtxoProvider::new(
            GlittrClient::new(&base, None, timeout).expect("glittr client"),
            EsploraClient::new(&base, timeout).expect("esplora client"),
        )
    }

    #[tokio::test]
    async fn asset_utxos_follow_index_order_and_skip_unknown_outputs() {
        let provider = provider().await;
        let asset = AssetId::from_str("5000:12").expect("asset id");

        let utxos = provider
            .asset_utxos(&address(), asset)
            .await
            .expect("asset utxos");

        let summary: Vec<_> = utxos
            .iter()
            .map(|utxo| (utxo.outpoint().txid.to_string(), utxo.asset_amount))
            .collect();
        assert_eq!(
            summary,
            vec![(TXID_B.to_string(), 300), (TXID_A.to_string(), 700)]
        );
        assert!(!utxos[0].utxo.status.confirmed);
        assert_eq!(utxos[1].utxo.status.block_height, Some(10));
    }

    #[tokio::test]
    async fn asset_utxos_report_co_located_assets() {
        let provider = provider().await;
        let asset = AssetId::new(5000, 12);

        let utxos = provider
            .asset_utxos(&address(), asset)
            .await
            .expect("asset utxos");

        assert!(utxos[0].other_assets.is_empty());
        assert_eq!(utxos[1].other_assets, vec![AssetId::new(7, 1)]);

        let co_located = provider
            .asset_utxos(&address(), AssetId::new(7, 1))
            .await
            .expect("asset utxos");
        assert_eq!(co_located.len(), 1);
        assert_eq!(co_located[0].other_assets, vec![asset]);
    }

    #[tokio::test]
    async fn plain_utxos_exclude_asset_bearing_outputs() {
        let provider = provider().await;

        let utxos = provider.plain_utxos(&address()).await.expect("plain utxos");

        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].outpoint.txid.to_string(), TXID_C);
        assert_eq!(utxos[0].value, 50_000);
    }

    #[test]
    fn endpoints_keep_base_path() {
        let base = base_url("https://example.com/api").expect("base");
        assert_eq!(
            endpoint(&base, "/fee-estimates").expect("join").as_str(),
            "https://example.com/api/fee-estimates"
        );
        base_url("not a url").expect_err("invalid");
    }
}

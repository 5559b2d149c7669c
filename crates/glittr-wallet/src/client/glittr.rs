use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use bitcoin::{Address, OutPoint};
use serde::Deserialize;
use url::Url;

use crate::asset::{AssetId, parse_raw_amount};
use crate::chain::ChainConfig;
use crate::contract::{AddressBalance, RawBalanceResponse};
use crate::error::FetchError;
use crate::provider::BalanceIndex;

use super::{base_url, endpoint, http_client, read_json};

/// Client for the Glittr core API.
#[derive(Debug, Clone)]
pub struct GlittrClient {
    http: reqwest::Client,
    api_base: Url,
    api_key: Option<String>,
}

/// An output the Glittr index considers valid, with its asset holdings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidOutput {
    pub outpoint: OutPoint,
    pub asset_balances: BTreeMap<AssetId, u128>,
}

impl ValidOutput {
    #[must_use]
    pub fn amount_of(&self, asset_id: AssetId) -> Option<u128> {
        self.asset_balances.get(&asset_id).copied()
    }

    #[must_use]
    pub fn carries_assets(&self) -> bool {
        self.asset_balances.values().any(|amount| *amount > 0)
    }
}

#[derive(Debug, Deserialize)]
struct RawValidOutputs {
    valid_outputs: Vec<RawValidOutput>,
}

#[derive(Debug, Deserialize)]
struct RawValidOutput {
    output: String,
    #[serde(default)]
    asset_balances: BTreeMap<String, String>,
}

impl TryFrom<RawValidOutput> for ValidOutput {
    type Error = String;

    fn try_from(raw: RawValidOutput) -> Result<Self, Self::Error> {
        let outpoint = OutPoint::from_str(&raw.output)
            .map_err(|error| format!("output '{}': {error}", raw.output))?;

        let asset_balances = raw
            .asset_balances
            .into_iter()
            .map(|(id, amount)| {
                let id = AssetId::from_str(&id).map_err(|error| format!("asset key: {error}"))?;
                let amount =
                    parse_raw_amount(&amount).map_err(|error| format!("balance of {id}: {error}"))?;
                Ok((id, amount))
            })
            .collect::<Result<_, String>>()?;

        Ok(Self {
            outpoint,
            asset_balances,
        })
    }
}

impl GlittrClient {
    pub fn new(
        api_base: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            http: http_client(timeout)?,
            api_base: base_url(api_base)?,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn from_chain(chain: &ChainConfig, timeout: Duration) -> Result<Self, FetchError> {
        Self::new(&chain.glittr_api, chain.api_key.clone(), timeout)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = endpoint(&self.api_base, path)?;
        let mut request = self.http.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        read_json(request.send().await?).await
    }

    /// Outputs of `address` known to the index, in index order.
    pub async fn valid_outputs(&self, address: &Address) -> Result<Vec<ValidOutput>, FetchError> {
        let path = format!("helper/address/{address}/valid-outputs");
        let raw: RawValidOutputs = self.get_json(&path).await?;

        raw.valid_outputs
            .into_iter()
            .map(ValidOutput::try_from)
            .collect::<Result<_, _>>()
            .map_err(|message| FetchError::Malformed {
                url: self.url_string(&path),
                message,
            })
    }

    fn url_string(&self, path: &str) -> String {
        endpoint(&self.api_base, path).map_or_else(|_| path.to_string(), String::from)
    }
}

impl BalanceIndex for GlittrClient {
    async fn address_balance(&self, address: &Address) -> Result<AddressBalance, FetchError> {
        let path = format!("helper/address/{address}/balance");
        let raw: RawBalanceResponse = self.get_json(&path).await?;

        AddressBalance::try_from(raw).map_err(|message| FetchError::Malformed {
            url: self.url_string(&path),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::Json;
    use axum::Router;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::get;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::{CompressedPublicKey, Network};
    use serde_json::{Value, json};

    use super::*;
    use crate::client::DEFAULT_TIMEOUT_SECS;
    use crate::client::test_server;
    use crate::contract::AssetKind;

    fn address() -> Address {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[9u8; 32]).expect("secret key");
        Address::p2wpkh(
            &CompressedPublicKey(secret.public_key(&secp)),
            Network::Regtest,
        )
    }

    fn timeout() -> Duration {
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    }

    async fn balance(
        Path(address): Path<String>,
        headers: HeaderMap,
    ) -> Result<Json<Value>, (StatusCode, String)> {
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            == Some("Bearer devnet-key");
        if !authorized {
            return Err((StatusCode::UNAUTHORIZED, "missing api key".to_string()));
        }
        if address == "broken" {
            return Ok(Json(json!({ "balance": { "summarized": { "oops": "1" } } })));
        }

        Ok(Json(json!({
            "balance": { "summarized": { "5000:12": "1000", "6000:1": "1" } },
            "contract_info": {
                "5000:12": {
                    "ticker": "GLTR",
                    "divisibility": 2,
                    "total_supply": "100000",
                    "supply_cap": "1000000",
                    "type": { "free_mint": true }
                },
                "6000:1": {
                    "total_supply": "1",
                    "asset": [1, 2, 3]
                }
            }
        })))
    }

    async fn spawn() -> String {
        test_server::spawn(
            Router::new()
                .route("/helper/address/{address}/balance", get(balance))
                .route(
                    "/helper/address/{address}/valid-outputs",
                    get(|| async {
                        Json(json!({
                            "valid_outputs": [{ "output": "not-an-outpoint", "asset_balances": {} }]
                        }))
                    }),
                ),
        )
        .await
    }

    #[tokio::test]
    async fn balance_is_fetched_with_bearer_key() {
        let base = spawn().await;
        let client =
            GlittrClient::new(&base, Some("devnet-key".to_string()), timeout()).expect("client");

        let balance = client.address_balance(&address()).await.expect("balance");

        let token = balance
            .asset(AssetId::new(5000, 12))
            .expect("token listed");
        assert_eq!(token.amount, 1000);
        assert_eq!(token.kind(), AssetKind::Fungible);
        assert_eq!(token.display_amount(), "10");

        assert_eq!(balance.nfts().count(), 1);
    }

    #[tokio::test]
    async fn missing_key_surfaces_http_status() {
        let base = spawn().await;
        let client = GlittrClient::new(&base, Some("  ".to_string()), timeout()).expect("client");

        let err = client
            .address_balance(&address())
            .await
            .expect_err("unauthorized");

        let FetchError::Status {
            status, message, ..
        } = err
        else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(status, 401);
        assert_eq!(message, "missing api key");
    }

    #[tokio::test]
    async fn schema_violations_are_malformed() {
        let base = spawn().await;
        let client = GlittrClient::new(&base, Some("devnet-key".to_string()), timeout())
            .expect("client");

        let err = client
            .get_json::<RawBalanceResponse>("helper/address/broken/balance")
            .await
            .map(AddressBalance::try_from)
            .expect("raw payload decodes")
            .expect_err("invalid asset key");
        assert!(err.starts_with("balance key:"));

        let err = client
            .valid_outputs(&address())
            .await
            .expect_err("bad outpoint");
        assert!(matches!(err, FetchError::Malformed { .. }));
        assert!(err.to_string().contains("not-an-outpoint"));
    }

    #[test]
    fn valid_output_parsing() {
        let raw = RawValidOutput {
            output: format!("{}:3", "11".repeat(32)),
            asset_balances: BTreeMap::from([
                ("1:2".to_string(), "5".to_string()),
                ("3:4".to_string(), "0".to_string()),
            ]),
        };
        let output = ValidOutput::try_from(raw).expect("valid");
        assert_eq!(output.outpoint.vout, 3);
        assert_eq!(output.amount_of(AssetId::new(1, 2)), Some(5));
        assert_eq!(output.amount_of(AssetId::new(9, 9)), None);
        assert!(output.carries_assets());

        let empty = ValidOutput {
            outpoint: output.outpoint,
            asset_balances: BTreeMap::from([(AssetId::new(3, 4), 0)]),
        };
        assert!(!empty.carries_assets());
    }
}

//! Asset input selection for a batch of transfer requests.
//!
//! # Algorithm
//!
//! Requests are processed in order. For each one, candidate UTXOs of the
//! requested asset are taken in provider order and accumulated until the
//! accumulated amount reaches the requested amount (first fit, no reordering).
//!
//! Any excess becomes a change record pointing at a new change output. Change
//! outputs follow the recipient outputs, so the `k`-th change record (counting
//! from zero) points at output `requests + k + 1`; output `0` is the carrier.
//!
//! # Determinism
//!
//! The result depends only on the request order and the provider order of
//! each asset's candidates. Outpoints consumed by an earlier request are
//! skipped by later ones.
//!
//! # Failure modes
//!
//! - Exhausting the candidates fails with `InsufficientBalance`, reporting the
//!   total of the candidates still unused at that point.
//! - Arithmetic overflow fails with `InvalidRequest`.

use std::collections::{HashMap, HashSet};

use bitcoin::OutPoint;

use crate::asset::AssetId;
use crate::error::TransferError;
use crate::utxo::AssetUtxo;

use super::{TransferRecord, TransferRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct AssetSelection {
    /// Consumed asset UTXOs, in selection order.
    pub inputs: Vec<AssetUtxo>,
    /// One record per request, then one per change output.
    pub records: Vec<TransferRecord>,
    pub change_outputs: usize,
}

pub(super) fn select_asset_inputs(
    requests: &[TransferRequest],
    candidates: &HashMap<AssetId, Vec<AssetUtxo>>,
) -> Result<AssetSelection, TransferError> {
    let request_count = u32::try_from(requests.len())
        .map_err(|_| TransferError::InvalidRequest("too many transfer requests".to_string()))?;

    let mut used_outpoints: HashSet<OutPoint> = HashSet::new();
    let mut inputs = Vec::new();
    let mut records = Vec::with_capacity(requests.len());
    let mut excess_records = Vec::new();

    for (position, request) in (1..=request_count).zip(requests) {
        let available = candidates
            .get(&request.asset_id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut accumulated = 0u128;
        let mut selected = 0usize;
        for utxo in available {
            if accumulated >= request.amount {
                break;
            }
            if !used_outpoints.insert(utxo.outpoint()) {
                continue;
            }

            accumulated = add_amount(accumulated, utxo.asset_amount, request.asset_id)?;
            if !utxo.other_assets.is_empty() {
                tracing::warn!(
                    outpoint = %utxo.outpoint(),
                    asset_id = %request.asset_id,
                    other_assets = ?utxo.other_assets,
                    "selected input also carries other assets, they receive no transfer record"
                );
            }
            inputs.push(utxo.clone());
            selected += 1;
        }

        if accumulated < request.amount {
            return Err(TransferError::InsufficientBalance {
                asset_id: request.asset_id,
                required: request.amount,
                available: accumulated,
            });
        }

        tracing::debug!(
            asset_id = %request.asset_id,
            required = %request.amount,
            accumulated = %accumulated,
            selected,
            "selected asset inputs"
        );

        records.push(TransferRecord {
            asset_id: request.asset_id,
            amount: request.amount,
            output: position,
        });

        let excess = accumulated - request.amount;
        if excess > 0 {
            let change_index = u32::try_from(excess_records.len())
                .ok()
                .and_then(|count| request_count.checked_add(count)?.checked_add(1))
                .ok_or_else(|| {
                    TransferError::InvalidRequest("too many change outputs".to_string())
                })?;
            excess_records.push(TransferRecord {
                asset_id: request.asset_id,
                amount: excess,
                output: change_index,
            });
        }
    }

    let change_outputs = excess_records.len();
    records.extend(excess_records);

    Ok(AssetSelection {
        inputs,
        records,
        change_outputs,
    })
}

fn add_amount(total: u128, amount: u128, asset_id: AssetId) -> Result<u128, TransferError> {
    total.checked_add(amount).ok_or_else(|| {
        TransferError::InvalidRequest(format!(
            "asset amount overflow while accumulating inputs for {asset_id}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::Txid;

    use super::*;
    use crate::utxo::{BitcoinUtxo, UtxoStatus};

    fn asset() -> AssetId {
        AssetId::new(5000, 12)
    }

    fn asset_utxo(tag: u8, amount: u128) -> AssetUtxo {
        AssetUtxo {
            utxo: BitcoinUtxo {
                outpoint: OutPoint {
                    txid: Txid::from_str(&format!("{tag:02x}").repeat(32)).expect("txid"),
                    vout: 0,
                },
                value: 600,
                status: UtxoStatus::default(),
            },
            asset_amount: amount,
            other_assets: Vec::new(),
        }
    }

    fn request(amount: u128) -> TransferRequest {
        TransferRequest {
            asset_id: asset(),
            amount,
            recipient: "bcrt1qrecipient".to_string(),
        }
    }

    fn record(amount: u128, output: u32) -> TransferRecord {
        TransferRecord {
            asset_id: asset(),
            amount,
            output,
        }
    }

    #[test]
    fn stops_once_requirement_is_met() {
        let candidates = HashMap::from([(asset(), vec![asset_utxo(1, 700), asset_utxo(2, 300)])]);

        let selection = select_asset_inputs(&[request(400)], &candidates).expect("selection");

        assert_eq!(selection.inputs, vec![asset_utxo(1, 700)]);
        assert_eq!(selection.records, vec![record(400, 1), record(300, 2)]);
        assert_eq!(selection.change_outputs, 1);
    }

    #[test]
    fn exact_match_has_no_change() {
        let candidates = HashMap::from([(asset(), vec![asset_utxo(1, 700), asset_utxo(2, 300)])]);

        let selection = select_asset_inputs(&[request(1000)], &candidates).expect("selection");

        assert_eq!(selection.inputs.len(), 2);
        assert_eq!(selection.records, vec![record(1000, 1)]);
        assert_eq!(selection.change_outputs, 0);
    }

    #[test]
    fn shortfall_reports_unused_total() {
        let candidates = HashMap::from([(asset(), vec![asset_utxo(1, 700), asset_utxo(2, 300)])]);

        let err = select_asset_inputs(&[request(1500)], &candidates).expect_err("short");
        assert_eq!(
            err.to_string(),
            "Insufficient balance for asset 5000:12. Required: 1500, balance: 1000"
        );

        let err = select_asset_inputs(&[request(400), request(700)], &candidates)
            .expect_err("second request short");
        assert!(matches!(
            err,
            TransferError::InsufficientBalance {
                required: 700,
                available: 300,
                ..
            }
        ));
    }

    #[test]
    fn later_requests_skip_consumed_outpoints() {
        let candidates = HashMap::from([(
            asset(),
            vec![asset_utxo(1, 700), asset_utxo(2, 300), asset_utxo(3, 600)],
        )]);

        let selection =
            select_asset_inputs(&[request(400), request(500)], &candidates).expect("selection");

        assert_eq!(
            selection.inputs,
            vec![asset_utxo(1, 700), asset_utxo(2, 300), asset_utxo(3, 600)]
        );
        assert_eq!(
            selection.records,
            vec![
                record(400, 1),
                record(500, 2),
                record(300, 3),
                record(400, 4)
            ]
        );
        assert_eq!(selection.change_outputs, 2);
    }

    #[test]
    fn missing_asset_is_insufficient() {
        let err = select_asset_inputs(&[request(1)], &HashMap::new()).expect_err("no utxos");
        assert!(matches!(
            err,
            TransferError::InsufficientBalance { available: 0, .. }
        ));
    }

    #[test]
    fn co_located_assets_stay_on_selected_inputs() {
        let mut shared = asset_utxo(1, 700);
        shared.other_assets = vec![AssetId::new(7, 1)];
        let candidates = HashMap::from([(asset(), vec![shared.clone(), asset_utxo(2, 300)])]);

        let selection = select_asset_inputs(&[request(400)], &candidates).expect("selection");

        assert_eq!(selection.inputs, vec![shared]);
        assert_eq!(selection.records, vec![record(400, 1), record(300, 2)]);
    }
}

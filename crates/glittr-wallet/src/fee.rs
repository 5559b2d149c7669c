//! Fee estimation and plain-currency funding of a draft transaction.
//!
//! The assembler hands over the asset-bearing inputs and the draft outputs;
//! the estimator adds sender UTXOs until the outputs and the fee are covered
//! and appends a change output when it is worth keeping.

use std::cmp::Reverse;
use std::collections::HashSet;

use bitcoin::{Amount, OutPoint, Script, TxOut};

use crate::error::FeeError;
use crate::utxo::BitcoinUtxo;

/// Version and lock time, in weight units.
const TX_FIXED_WEIGHT: u64 = 8 * 4;
/// Segwit marker and flag bytes.
const SEGWIT_MARKER_WEIGHT: u64 = 2;

/// Outpoint, sequence and script length prefix shared by every input.
const INPUT_BASE_BYTES: u64 = 32 + 4 + 4 + 1;
const P2WPKH_INPUT_WEIGHT: u64 = INPUT_BASE_BYTES * 4 + 108;
const P2TR_KEYSPEND_INPUT_WEIGHT: u64 = INPUT_BASE_BYTES * 4 + 66;
const P2SH_P2WPKH_INPUT_WEIGHT: u64 = (INPUT_BASE_BYTES + 23) * 4 + 108;
const P2PKH_INPUT_WEIGHT: u64 = (INPUT_BASE_BYTES + 107) * 4;

/// Everything the estimator needs to fund one transaction.
#[derive(Debug, Clone, Copy)]
pub struct FundingRequest<'a> {
    /// Script of the sender; every input spends it and change returns to it.
    pub sender_script: &'a Script,
    /// Inputs that must be spent, in order.
    pub mandatory_inputs: &'a [BitcoinUtxo],
    /// Draft outputs, in order.
    pub outputs: &'a [TxOut],
    /// Plain-currency UTXOs available for paying the fee.
    pub candidates: &'a [BitcoinUtxo],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundedTransaction {
    pub inputs: Vec<BitcoinUtxo>,
    pub outputs: Vec<TxOut>,
    /// Fee in satoshis, including any leftover too small for a change output.
    pub fee: u64,
}

pub trait FeeEstimator {
    fn fund(&self, request: FundingRequest<'_>) -> Result<FundedTransaction, FeeError>;
}

/// Weight-based estimator with largest-first funding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardFeeEstimator {
    pub fee_rate_sat_vb: f64,
}

impl StandardFeeEstimator {
    pub fn new(fee_rate_sat_vb: f64) -> Result<Self, FeeError> {
        if !fee_rate_sat_vb.is_finite() || fee_rate_sat_vb <= 0.0 {
            return Err(FeeError::InvalidFeeRate(fee_rate_sat_vb));
        }
        Ok(Self { fee_rate_sat_vb })
    }
}

impl FeeEstimator for StandardFeeEstimator {
    fn fund(&self, request: FundingRequest<'_>) -> Result<FundedTransaction, FeeError> {
        if !self.fee_rate_sat_vb.is_finite() || self.fee_rate_sat_vb <= 0.0 {
            return Err(FeeError::InvalidFeeRate(self.fee_rate_sat_vb));
        }

        let sender_input_weight = input_weight(request.sender_script)?;
        let dust_sat = request.sender_script.minimal_non_dust().to_sat();
        let change_weight = script_output_weight(request.sender_script);

        let output_total = request.outputs.iter().try_fold(0u64, |sum, output| {
            sum.checked_add(output.value.to_sat())
                .ok_or_else(|| FeeError::Overflow("summing draft outputs".to_string()))
        })?;

        let mut inputs = request.mandatory_inputs.to_vec();
        let mut input_total = sum_values(&inputs)?;

        let mandatory: HashSet<OutPoint> = inputs.iter().map(|utxo| utxo.outpoint).collect();
        let mut candidates: Vec<&BitcoinUtxo> = request
            .candidates
            .iter()
            .filter(|utxo| !mandatory.contains(&utxo.outpoint))
            .collect();
        candidates.sort_by_key(|utxo| {
            (
                Reverse(utxo.value),
                utxo.outpoint.txid.to_string(),
                utxo.outpoint.vout,
            )
        });
        let mut candidates = candidates.into_iter();

        loop {
            let base_weight = estimate_weight(
                inputs.len(),
                sender_input_weight,
                request.outputs.iter().map(output_weight),
                request.outputs.len(),
            );
            let fee_without_change = fee_for_weight(base_weight, self.fee_rate_sat_vb);
            let required = output_total
                .checked_add(fee_without_change)
                .ok_or_else(|| FeeError::Overflow("adding fee to outputs".to_string()))?;

            if input_total >= required {
                let with_change_weight = estimate_weight(
                    inputs.len(),
                    sender_input_weight,
                    request
                        .outputs
                        .iter()
                        .map(output_weight)
                        .chain(std::iter::once(change_weight)),
                    request.outputs.len() + 1,
                );
                let fee_with_change = fee_for_weight(with_change_weight, self.fee_rate_sat_vb);

                let mut outputs = request.outputs.to_vec();
                let change = input_total
                    .checked_sub(output_total)
                    .and_then(|left| left.checked_sub(fee_with_change))
                    .filter(|change| *change >= dust_sat);

                let fee = if let Some(change) = change {
                    outputs.push(TxOut {
                        value: Amount::from_sat(change),
                        script_pubkey: request.sender_script.to_owned(),
                    });
                    fee_with_change
                } else {
                    input_total - output_total
                };

                tracing::debug!(
                    inputs = inputs.len(),
                    outputs = outputs.len(),
                    fee,
                    change = change.unwrap_or(0),
                    "funded transaction"
                );

                return Ok(FundedTransaction {
                    inputs,
                    outputs,
                    fee,
                });
            }

            let Some(next) = candidates.next() else {
                return Err(FeeError::InsufficientFunds {
                    required,
                    available: input_total,
                });
            };
            input_total = input_total
                .checked_add(next.value)
                .ok_or_else(|| FeeError::Overflow("summing funding inputs".to_string()))?;
            inputs.push(next.clone());
        }
    }
}

fn sum_values(utxos: &[BitcoinUtxo]) -> Result<u64, FeeError> {
    utxos.iter().try_fold(0u64, |sum, utxo| {
        sum.checked_add(utxo.value)
            .ok_or_else(|| FeeError::Overflow("summing mandatory inputs".to_string()))
    })
}

/// Spend weight of one input locked by `script`.
pub fn input_weight(script: &Script) -> Result<u64, FeeError> {
    if script.is_p2wpkh() {
        Ok(P2WPKH_INPUT_WEIGHT)
    } else if script.is_p2tr() {
        Ok(P2TR_KEYSPEND_INPUT_WEIGHT)
    } else if script.is_p2sh() {
        Ok(P2SH_P2WPKH_INPUT_WEIGHT)
    } else if script.is_p2pkh() {
        Ok(P2PKH_INPUT_WEIGHT)
    } else {
        Err(FeeError::UnsupportedScript(script.to_asm_string()))
    }
}

#[must_use]
pub fn output_weight(output: &TxOut) -> u64 {
    script_output_weight(&output.script_pubkey)
}

fn script_output_weight(script: &Script) -> u64 {
    let len = script.len() as u64;
    (8 + compact_size_len(len) + len) * 4
}

fn estimate_weight(
    input_count: usize,
    per_input_weight: u64,
    output_weights: impl Iterator<Item = u64>,
    output_count: usize,
) -> u64 {
    let inputs = input_count as u64;
    let counts = (compact_size_len(inputs) + compact_size_len(output_count as u64)) * 4;

    TX_FIXED_WEIGHT
        + SEGWIT_MARKER_WEIGHT
        + counts
        + inputs * per_input_weight
        + output_weights.sum::<u64>()
}

const fn compact_size_len(n: u64) -> u64 {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn fee_for_weight(weight: u64, fee_rate_sat_vb: f64) -> u64 {
    let vbytes = weight.div_ceil(4);
    ((vbytes as f64) * fee_rate_sat_vb).ceil() as u64
}

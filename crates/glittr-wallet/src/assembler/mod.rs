//! Transfer assembly: from transfer requests to a signable transaction.
//!
//! The assembler validates the requests, selects asset-bearing inputs,
//! encodes the protocol message, lets the [`FeeEstimator`] fund the draft and
//! wraps the result in a PSBT. [`TransferAssembler::assemble`] additionally
//! hands the PSBT to the [`TransferSigner`] and extracts the final transaction.

mod selection;

use std::collections::HashMap;
use std::str::FromStr;

use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Amount, CompressedPublicKey, Network, Psbt, ScriptBuf, TxOut};
use futures_util::future::{try_join, try_join_all};

use crate::asset::AssetId;
use crate::error::TransferError;
use crate::fee::{FeeEstimator, FundingRequest};
use crate::message::{CompressedJsonCodec, MessageCodec, OpReturnMessage, TxTypeTransfer};
use crate::provider::{TransferSigner, UtxoProvider};
use crate::psbt::{build_psbt, extract_signed, psbt_to_hex};
use crate::utxo::AssetUtxo;

pub use crate::psbt::SignedTransfer;

use self::selection::select_asset_inputs;

/// Default value of recipient and change outputs, in satoshis.
pub const DEFAULT_OUTPUT_VALUE_SAT: u64 = 600;

/// Request to move `amount` raw units of `asset_id` to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub asset_id: AssetId,
    pub amount: u128,
    pub recipient: String,
}

impl TransferRequest {
    #[must_use]
    pub fn new(asset_id: AssetId, amount: u128, recipient: impl Into<String>) -> Self {
        Self {
            asset_id,
            amount,
            recipient: recipient.into(),
        }
    }
}

/// Who is sending, and on which network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferContext {
    sender: Address,
    public_key: CompressedPublicKey,
    network: Network,
}

impl TransferContext {
    pub fn new(
        sender: &str,
        public_key: CompressedPublicKey,
        network: Network,
    ) -> Result<Self, TransferError> {
        Ok(Self {
            sender: parse_address(sender, network)?,
            public_key,
            network,
        })
    }

    #[must_use]
    pub const fn sender(&self) -> &Address {
        &self.sender
    }

    #[must_use]
    pub const fn public_key(&self) -> &CompressedPublicKey {
        &self.public_key
    }

    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }
}

/// Values of the outputs the assembler creates itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPolicy {
    pub recipient_output_value: u64,
    pub change_output_value: u64,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            recipient_output_value: DEFAULT_OUTPUT_VALUE_SAT,
            change_output_value: DEFAULT_OUTPUT_VALUE_SAT,
        }
    }
}

/// One asset movement embedded in the protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    pub asset_id: AssetId,
    pub amount: u128,
    /// Index of the output receiving the units.
    pub output: u32,
}

impl From<TransferRecord> for TxTypeTransfer {
    fn from(record: TransferRecord) -> Self {
        Self::new(record.asset_id, record.amount, record.output)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransfer {
    pub psbt: Psbt,
    /// Requested transfers first, then asset change.
    pub transfers: Vec<TransferRecord>,
    pub asset_inputs: Vec<AssetUtxo>,
    /// Fee in satoshis.
    pub fee: u64,
}

impl UnsignedTransfer {
    #[must_use]
    pub fn psbt_hex(&self) -> String {
        psbt_to_hex(&self.psbt)
    }
}

/// Builds transfer transactions from requests.
///
/// `S` only needs to implement [`TransferSigner`] for [`Self::assemble`];
/// callers that sign elsewhere can use `()` and [`Self::build_unsigned`].
pub struct TransferAssembler<P, F, S, C = CompressedJsonCodec> {
    provider: P,
    fee_estimator: F,
    signer: S,
    codec: C,
    policy: TransferPolicy,
}

impl<P, F, S> TransferAssembler<P, F, S> {
    pub fn new(provider: P, fee_estimator: F, signer: S) -> Self {
        Self {
            provider,
            fee_estimator,
            signer,
            codec: CompressedJsonCodec::default(),
            policy: TransferPolicy::default(),
        }
    }
}

impl<P, F, S, C> TransferAssembler<P, F, S, C>
where
    P: UtxoProvider,
    F: FeeEstimator,
    C: MessageCodec,
{
    #[must_use]
    pub fn with_policy(mut self, policy: TransferPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_codec<C2: MessageCodec>(self, codec: C2) -> TransferAssembler<P, F, S, C2> {
        TransferAssembler {
            provider: self.provider,
            fee_estimator: self.fee_estimator,
            signer: self.signer,
            codec,
            policy: self.policy,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &TransferPolicy {
        &self.policy
    }

    /// Check requests without touching the network.
    ///
    /// Returns the parsed recipient addresses in request order.
    pub fn validate(
        &self,
        context: &TransferContext,
        requests: &[TransferRequest],
    ) -> Result<Vec<Address>, TransferError> {
        if requests.is_empty() {
            return Err(TransferError::InvalidRequest(
                "at least one transfer is required".to_string(),
            ));
        }

        let sender_dust = context.sender.script_pubkey().minimal_non_dust().to_sat();
        if self.policy.change_output_value < sender_dust {
            return Err(TransferError::OutputBelowDust {
                value: self.policy.change_output_value,
                dust: sender_dust,
            });
        }

        requests
            .iter()
            .map(|request| {
                if request.amount == 0 {
                    return Err(TransferError::InvalidRequest(format!(
                        "amount for asset {} must be greater than zero",
                        request.asset_id
                    )));
                }

                let recipient = parse_address(&request.recipient, context.network)?;
                let dust = recipient
                    .script_pubkey()
                    .minimal_non_dust()
                    .to_sat()
                    .max(sender_dust);
                if self.policy.recipient_output_value < dust {
                    return Err(TransferError::OutputBelowDust {
                        value: self.policy.recipient_output_value,
                        dust,
                    });
                }

                Ok(recipient)
            })
            .collect()
    }

    /// Build the unsigned transfer transaction.
    pub async fn build_unsigned(
        &self,
        context: &TransferContext,
        requests: &[TransferRequest],
    ) -> Result<UnsignedTransfer, TransferError> {
        let recipients = self.validate(context, requests)?;

        let mut asset_ids: Vec<AssetId> = Vec::new();
        for request in requests {
            if !asset_ids.contains(&request.asset_id) {
                asset_ids.push(request.asset_id);
            }
        }

        let (asset_utxos, plain_utxos) = try_join(
            try_join_all(
                asset_ids
                    .iter()
                    .map(|asset_id| self.provider.asset_utxos(&context.sender, *asset_id)),
            ),
            self.provider.plain_utxos(&context.sender),
        )
        .await?;
        let candidates: HashMap<AssetId, Vec<AssetUtxo>> =
            asset_ids.into_iter().zip(asset_utxos).collect();

        let selection = select_asset_inputs(requests, &candidates)?;

        let message = OpReturnMessage::transfer(
            selection
                .records
                .iter()
                .copied()
                .map(TxTypeTransfer::from)
                .collect(),
        );
        let carrier = self.codec.carrier_script(&message)?;

        let sender_script = context.sender.script_pubkey();
        let outputs = draft_outputs(
            carrier,
            &recipients,
            &sender_script,
            selection.change_outputs,
            self.policy,
        );

        let mandatory_inputs: Vec<_> = selection
            .inputs
            .iter()
            .map(|asset_utxo| asset_utxo.utxo.clone())
            .collect();

        let funded = self.fee_estimator.fund(FundingRequest {
            sender_script: &sender_script,
            mandatory_inputs: &mandatory_inputs,
            outputs: &outputs,
            candidates: &plain_utxos,
        })?;

        let psbt = build_psbt(
            &sender_script,
            &context.public_key,
            &funded.inputs,
            funded.outputs,
        )?;

        tracing::info!(
            sender = %context.sender,
            transfers = selection.records.len(),
            asset_inputs = selection.inputs.len(),
            inputs = psbt.inputs.len(),
            outputs = psbt.outputs.len(),
            fee = funded.fee,
            "assembled unsigned transfer"
        );

        Ok(UnsignedTransfer {
            psbt,
            transfers: selection.records,
            asset_inputs: selection.inputs,
            fee: funded.fee,
        })
    }
}

impl<P, F, S, C> TransferAssembler<P, F, S, C>
where
    P: UtxoProvider,
    F: FeeEstimator,
    S: TransferSigner,
    C: MessageCodec,
{
    /// Build, sign and extract the transfer transaction.
    pub async fn assemble(
        &self,
        context: &TransferContext,
        requests: &[TransferRequest],
    ) -> Result<SignedTransfer, TransferError> {
        let unsigned = self.build_unsigned(context, requests).await?;

        let signed_hex = self.signer.sign_psbt_hex(&unsigned.psbt_hex()).await?;
        let signed = extract_signed(&signed_hex)?;

        tracing::info!(txid = %signed.txid, "signed transfer");

        Ok(signed)
    }
}

/// `[carrier, recipients..., asset change...]`
fn draft_outputs(
    carrier: ScriptBuf,
    recipients: &[Address],
    sender_script: &ScriptBuf,
    change_outputs: usize,
    policy: TransferPolicy,
) -> Vec<TxOut> {
    let mut outputs = Vec::with_capacity(1 + recipients.len() + change_outputs);
    outputs.push(TxOut {
        value: Amount::ZERO,
        script_pubkey: carrier,
    });
    outputs.extend(recipients.iter().map(|recipient| TxOut {
        value: Amount::from_sat(policy.recipient_output_value),
        script_pubkey: recipient.script_pubkey(),
    }));
    outputs.extend((0..change_outputs).map(|_| TxOut {
        value: Amount::from_sat(policy.change_output_value),
        script_pubkey: sender_script.clone(),
    }));
    outputs
}

fn parse_address(address: &str, network: Network) -> Result<Address, TransferError> {
    let invalid = |reason: String| TransferError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    Address::<NetworkUnchecked>::from_str(address.trim())
        .map_err(|error| invalid(error.to_string()))?
        .require_network(network)
        .map_err(|error| invalid(error.to_string()))
}

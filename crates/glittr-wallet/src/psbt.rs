//! PSBT construction for the signing handoff and extraction of the signed result.

use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{
    CompressedPublicKey, Psbt, Script, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness, absolute::LockTime, transaction::Version,
};

use crate::error::SignerError;
use crate::utxo::BitcoinUtxo;

/// Final artifact of a transfer: the signed PSBT and the broadcast-ready transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub psbt_hex: String,
    pub raw_tx_hex: String,
    pub txid: Txid,
}

/// Build an unsigned PSBT spending `inputs`, all locked by `sender_script`.
pub fn build_psbt(
    sender_script: &Script,
    public_key: &CompressedPublicKey,
    inputs: &[BitcoinUtxo],
    outputs: Vec<TxOut>,
) -> Result<Psbt, bitcoin::psbt::Error> {
    let unsigned_tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs
            .iter()
            .map(|utxo| TxIn {
                previous_output: utxo.outpoint,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            })
            .collect(),
        output: outputs,
    };

    let mut psbt = Psbt::from_unsigned_tx(unsigned_tx)?;

    let tap_internal_key = sender_script
        .is_p2tr()
        .then(|| public_key.0.x_only_public_key().0);
    let redeem_script = sender_script
        .is_p2sh()
        .then(|| ScriptBuf::new_p2wpkh(&public_key.wpubkey_hash()));

    for (input, utxo) in psbt.inputs.iter_mut().zip(inputs) {
        input.witness_utxo = Some(TxOut {
            value: bitcoin::Amount::from_sat(utxo.value),
            script_pubkey: sender_script.to_owned(),
        });
        input.tap_internal_key = tap_internal_key;
        input.redeem_script.clone_from(&redeem_script);
    }

    Ok(psbt)
}

#[must_use]
pub fn psbt_to_hex(psbt: &Psbt) -> String {
    psbt.serialize_hex()
}

pub fn psbt_from_hex(psbt_hex: &str) -> Result<Psbt, SignerError> {
    let bytes = hex::decode(psbt_hex.trim())?;
    Ok(Psbt::deserialize(&bytes)?)
}

/// Decode a signed PSBT and extract its final transaction.
///
/// Every input must carry a final script witness or script sig.
pub fn extract_signed(signed_psbt_hex: &str) -> Result<SignedTransfer, SignerError> {
    let psbt = psbt_from_hex(signed_psbt_hex)?;

    if let Some(index) = psbt
        .inputs
        .iter()
        .position(|input| input.final_script_witness.is_none() && input.final_script_sig.is_none())
    {
        return Err(SignerError::Rejected(format!("input {index} is not finalized")));
    }

    let psbt_hex = psbt.serialize_hex();
    let tx = psbt.extract_tx()?;

    Ok(SignedTransfer {
        psbt_hex,
        raw_tx_hex: serialize_hex(&tx),
        txid: tx.compute_txid(),
    })
}

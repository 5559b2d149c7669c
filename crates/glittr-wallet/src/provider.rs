//! Collaborators the assembler reads from and hands off to.
//!
//! The HTTP implementations live in [`crate::client`]; tests substitute
//! in-memory ones.

use std::future::Future;

use bitcoin::Address;

use crate::asset::AssetId;
use crate::contract::AddressBalance;
use crate::error::{FetchError, SignerError};
use crate::utxo::{AssetUtxo, BitcoinUtxo};

/// Per-address asset balances and contract metadata.
pub trait BalanceIndex {
    fn address_balance(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<AddressBalance, FetchError>> + Send;
}

/// Spendable outputs of an address.
pub trait UtxoProvider {
    /// Outputs carrying no asset, usable for fees.
    fn plain_utxos(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<Vec<BitcoinUtxo>, FetchError>> + Send;

    /// Outputs carrying `asset_id`, in the order they should be consumed.
    fn asset_utxos(
        &self,
        address: &Address,
        asset_id: AssetId,
    ) -> impl Future<Output = Result<Vec<AssetUtxo>, FetchError>> + Send;
}

/// Wallet signing API: unsigned PSBT hex in, finalized PSBT hex out.
pub trait TransferSigner {
    fn sign_psbt_hex(
        &self,
        psbt_hex: &str,
    ) -> impl Future<Output = Result<String, SignerError>> + Send;
}

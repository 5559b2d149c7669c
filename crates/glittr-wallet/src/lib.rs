#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![cfg_attr(
    test,
    allow(
        clippy::cast_possible_truncation,
        clippy::default_trait_access,
        clippy::needless_pass_by_value,
        clippy::too_many_lines
    )
)]

pub mod assembler;
pub mod asset;
pub mod chain;
pub mod client;
pub mod contract;
pub mod error;
pub mod fee;
pub mod message;
pub mod provider;
pub mod psbt;
pub mod utxo;

pub use assembler::{
    SignedTransfer, TransferAssembler, TransferContext, TransferPolicy, TransferRecord,
    TransferRequest, UnsignedTransfer,
};
pub use asset::{AssetId, format_amount, parse_amount};
pub use chain::{ChainConfig, ChainType};
pub use contract::{AddressBalance, AssetKind, ContractInfo, MintType, NftImage};
pub use error::TransferError;
pub use fee::{FeeEstimator, FundedTransaction, FundingRequest, StandardFeeEstimator};
pub use message::{CompressedJsonCodec, MessageCodec, OpReturnMessage, Varuint};
pub use provider::{BalanceIndex, TransferSigner, UtxoProvider};
pub use utxo::{AssetUtxo, BitcoinUtxo, UtxoStatus};

pub use bitcoin::Network;

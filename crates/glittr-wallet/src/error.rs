use crate::asset::AssetId;

/// Errors from parsing `"<block>:<txIndex>"` asset identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetIdError {
    #[error("Invalid asset id '{input}': expected '<block>:<txIndex>'")]
    InvalidFormat { input: String },

    #[error("Invalid asset id '{input}': {part} is not an unsigned integer")]
    InvalidPart { input: String, part: &'static str },
}

/// Errors from parsing raw or decimal asset amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("Amount '{0}' contains invalid characters")]
    InvalidDigits(String),

    #[error("Amount '{input}' has more than {divisibility} fractional digits")]
    TooPrecise { input: String, divisibility: u8 },

    #[error("Amount '{0}' exceeds the maximum representable value")]
    Overflow(String),
}

/// Errors that occur when talking to the Glittr index or Esplora.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Request to {url} failed with HTTP {status}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    /// Returned when a response decodes but violates the expected schema.
    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("No fee estimates available from {url}")]
    NoFeeEstimates { url: String },

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors from funding a draft transaction with plain-currency inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeeError {
    #[error("Fee rate must be finite and greater than zero, got {0}")]
    InvalidFeeRate(f64),

    #[error(
        "Insufficient funds to cover outputs and fee: need {required} sats, have {available} sats"
    )]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Unsupported sender script type: {0}")]
    UnsupportedScript(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
}

/// Errors from the signing handoff and final transaction extraction.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Signer rejected the transaction: {0}")]
    Rejected(String),

    #[error("Signed PSBT is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Failed to decode signed PSBT: {0}")]
    Psbt(#[from] bitcoin::psbt::Error),

    #[error("Failed to extract final transaction: {0}")]
    Extract(#[from] bitcoin::psbt::ExtractTxError),
}

/// Errors from encoding or decoding the protocol message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("Failed to serialize protocol message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to compress protocol message: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Protocol message does not fit a carrier output: {0} bytes")]
    TooLarge(usize),

    #[error("Invalid varuint encoding: {0}")]
    Varuint(String),
}

/// Errors from chain selection and endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainConfigError {
    #[error("Unknown chain '{0}'")]
    UnknownChain(String),

    #[error("Chain {0} is not available")]
    Disabled(String),

    #[error("Chain {0} requires an API key")]
    MissingApiKey(String),

    #[error("Invalid {field} URL '{value}': {message}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        message: String,
    },
}

/// Failures surfaced by transfer assembly.
///
/// Nothing is committed when any of these is returned: the caller may retry
/// against the same UTXO snapshot.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Insufficient balance for asset {asset_id}. Required: {required}, balance: {available}")]
    InsufficientBalance {
        asset_id: AssetId,
        required: u128,
        available: u128,
    },

    #[error("Output value {value} is below the dust threshold {dust}")]
    OutputBelowDust { value: u64, dust: u64 },

    #[error("Network fetch failed: {0}")]
    NetworkFetch(#[from] FetchError),

    #[error("Fee estimation failed: {0}")]
    FeeEstimation(#[from] FeeError),

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Protocol message encoding failed: {0}")]
    Message(#[from] MessageError),

    #[error("Failed to build PSBT: {0}")]
    Psbt(#[from] bitcoin::psbt::Error),
}

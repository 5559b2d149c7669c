//! Glittr protocol message carried in the zero-value `OP_RETURN` output.

use std::fmt;

use bitcoin::ScriptBuf;
use bitcoin::script::PushBytesBuf;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::asset::AssetId;
use crate::error::MessageError;

/// Longest LEB128 encoding of a `u128`.
const MAX_VARUINT_LEN: usize = 19;

/// Unsigned integer serialized as its LEB128 byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Varuint(pub u128);

impl Varuint {
    #[must_use]
    pub fn to_bytes(self) -> Vec<u8> {
        let mut value = self.0;
        let mut out = Vec::with_capacity(MAX_VARUINT_LEN);
        loop {
            #[allow(clippy::cast_possible_truncation)]
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut value = 0u128;
        for (index, byte) in bytes.iter().enumerate() {
            if index >= MAX_VARUINT_LEN {
                return Err(MessageError::Varuint("encoding exceeds 128 bits".to_string()));
            }
            let chunk = u128::from(byte & 0x7f);
            let shifted = chunk
                .checked_shl(7 * u32::try_from(index).unwrap_or(u32::MAX))
                .filter(|shifted| shifted >> (7 * index) == chunk)
                .ok_or_else(|| MessageError::Varuint("encoding exceeds 128 bits".to_string()))?;
            value |= shifted;

            if byte & 0x80 == 0 {
                if index + 1 != bytes.len() {
                    return Err(MessageError::Varuint(
                        "trailing bytes after final group".to_string(),
                    ));
                }
                return Ok(Self(value));
            }
        }

        Err(MessageError::Varuint("unterminated encoding".to_string()))
    }
}

impl From<u128> for Varuint {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Serialize for Varuint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for Varuint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VaruintVisitor;

        impl<'de> Visitor<'de> for VaruintVisitor {
            type Value = Varuint;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("LEB128 encoded bytes")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Varuint::from_bytes(v).map_err(E::custom)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut bytes = Vec::with_capacity(MAX_VARUINT_LEN);
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                Varuint::from_bytes(&bytes).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_bytes(VaruintVisitor)
    }
}

/// `(block, txIndex)` pair locating an asset contract.
pub type BlockTxTuple = (Varuint, Varuint);

/// One asset movement: `amount` units of `asset` assigned to output `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxTypeTransfer {
    pub asset: BlockTxTuple,
    pub amount: Varuint,
    pub output: Varuint,
}

impl TxTypeTransfer {
    #[must_use]
    pub fn new(asset: AssetId, amount: u128, output: u32) -> Self {
        Self {
            asset: (
                Varuint(u128::from(asset.block)),
                Varuint(u128::from(asset.tx_index)),
            ),
            amount: Varuint(amount),
            output: Varuint(u128::from(output)),
        }
    }

    /// Recover the asset id, failing when a component is out of range.
    pub fn asset_id(&self) -> Result<AssetId, MessageError> {
        let block = u64::try_from(self.asset.0.0)
            .map_err(|_| MessageError::Varuint(format!("block {} out of range", self.asset.0.0)))?;
        let tx_index = u32::try_from(self.asset.1.0).map_err(|_| {
            MessageError::Varuint(format!("tx index {} out of range", self.asset.1.0))
        })?;
        Ok(AssetId::new(block, tx_index))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub transfers: Vec<TxTypeTransfer>,
}

/// Top-level protocol message. Only the transfer variant is produced here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpReturnMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<Transfer>,
}

impl OpReturnMessage {
    #[must_use]
    pub const fn transfer(transfers: Vec<TxTypeTransfer>) -> Self {
        Self {
            transfer: Some(Transfer { transfers }),
        }
    }
}

/// Turns a protocol message into the bytes embedded in the carrier output.
pub trait MessageCodec {
    fn encode(&self, message: &OpReturnMessage) -> Result<Vec<u8>, MessageError>;

    fn decode(&self, payload: &[u8]) -> Result<OpReturnMessage, MessageError>;

    /// Build the `OP_RETURN` script holding the encoded message.
    fn carrier_script(&self, message: &OpReturnMessage) -> Result<ScriptBuf, MessageError> {
        let payload = self.encode(message)?;
        let len = payload.len();
        let push = PushBytesBuf::try_from(payload).map_err(|_| MessageError::TooLarge(len))?;
        Ok(ScriptBuf::new_op_return(push))
    }
}

/// JSON serialization followed by zstd compression.
#[derive(Debug, Clone, Copy)]
pub struct CompressedJsonCodec {
    level: i32,
}

impl CompressedJsonCodec {
    pub const DEFAULT_LEVEL: i32 = 19;

    #[must_use]
    pub const fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Default for CompressedJsonCodec {
    fn default() -> Self {
        Self::with_level(Self::DEFAULT_LEVEL)
    }
}

impl MessageCodec for CompressedJsonCodec {
    fn encode(&self, message: &OpReturnMessage) -> Result<Vec<u8>, MessageError> {
        let json = serde_json::to_vec(message)?;
        Ok(zstd::encode_all(json.as_slice(), self.level)?)
    }

    fn decode(&self, payload: &[u8]) -> Result<OpReturnMessage, MessageError> {
        let json = zstd::decode_all(payload)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

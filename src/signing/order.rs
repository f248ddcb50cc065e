//! Wire shape of an incoming order and its strict parsing.
//!
//! Numeric fields travel as decimal strings so no value is ever rounded by a
//! JSON number parser on either side. Anything malformed is rejected here,
//! before the session core is touched.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::types::SignerError;

use super::eip712::{Address, Order, Side};

/// Highest signature type accepted (0 = EOA, 1 = proxy, 2 = Gnosis Safe)
pub const MAX_SIGNATURE_TYPE: u8 = 2;

/// Order descriptor as submitted by callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub salt: String,
    pub maker: String,
    pub signer: String,
    #[serde(default)]
    pub taker: Option<String>,
    pub token_id: String,
    pub maker_amount: String,
    pub taker_amount: String,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub fee_rate_bps: Option<String>,
    pub side: Side,
    #[serde(default)]
    pub signature_type: u8,
}

impl OrderRequest {
    /// Validate every field and build the typed order.
    pub fn parse(&self) -> Result<Order, SignerError> {
        if self.signature_type > MAX_SIGNATURE_TYPE {
            return Err(SignerError::InvalidInput(format!(
                "invalid signatureType: {}",
                self.signature_type
            )));
        }

        Ok(Order {
            salt: parse_uint256("salt", &self.salt)?,
            maker: parse_address("maker", &self.maker)?,
            signer: parse_address("signer", &self.signer)?,
            taker: match &self.taker {
                Some(taker) => parse_address("taker", taker)?,
                None => [0u8; 20],
            },
            token_id: parse_uint256("tokenId", &self.token_id)?,
            maker_amount: parse_uint256("makerAmount", &self.maker_amount)?,
            taker_amount: parse_uint256("takerAmount", &self.taker_amount)?,
            expiration: parse_optional_uint256("expiration", self.expiration.as_deref())?,
            nonce: parse_optional_uint256("nonce", self.nonce.as_deref())?,
            fee_rate_bps: parse_optional_uint256("feeRateBps", self.fee_rate_bps.as_deref())?,
            side: self.side,
            signature_type: self.signature_type,
        })
    }
}

/// Parse a non-negative decimal integer of any size.
///
/// Only ASCII digits are accepted: no sign, no separators, no whitespace,
/// no exponent.
pub fn parse_decimal(field: &str, value: &str) -> Result<BigUint, SignerError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SignerError::InvalidInput(format!("invalid {}: {:?}", field, value)));
    }
    BigUint::parse_bytes(value.as_bytes(), 10)
        .ok_or_else(|| SignerError::InvalidInput(format!("invalid {}: {:?}", field, value)))
}

fn parse_uint256(field: &str, value: &str) -> Result<BigUint, SignerError> {
    let parsed = parse_decimal(field, value)?;
    if parsed.bits() > 256 {
        return Err(SignerError::InvalidInput(format!("{} does not fit in uint256", field)));
    }
    Ok(parsed)
}

fn parse_optional_uint256(field: &str, value: Option<&str>) -> Result<BigUint, SignerError> {
    match value {
        Some(v) => parse_uint256(field, v),
        None => Ok(BigUint::default()),
    }
}

/// Parse a `0x`-prefixed 20-byte hex address (checksum not enforced).
pub fn parse_address(field: &str, value: &str) -> Result<Address, SignerError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| SignerError::InvalidInput(format!("invalid {}: missing 0x prefix", field)))?;

    let bytes = hex::decode(digits)
        .map_err(|_| SignerError::InvalidInput(format!("invalid {}: {:?}", field, value)))?;

    <Address>::try_from(bytes.as_slice()).map_err(|_| {
        SignerError::InvalidInput(format!("invalid {}: expected 20 bytes", field))
    })
}

//! EIP-712 typed-data hashing for exchange orders.
//!
//! Produces the 32-byte digest that the signing primitive signs:
//!
//! ```text
//! keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ hashStruct(order))
//! ```

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// 20-byte account address
pub type Address = [u8; 20];

/// Default EIP-712 domain name of the CTF exchange
pub const DEFAULT_DOMAIN_NAME: &str = "Polymarket CTF Exchange";

/// Default EIP-712 domain version
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

/// Polygon mainnet
pub const DEFAULT_CHAIN_ID: u64 = 137;

/// CTF exchange contract on Polygon mainnet
pub const DEFAULT_EXCHANGE_ADDRESS: &str = "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E";

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const ORDER_TYPE: &str = "Order(uint256 salt,address maker,address signer,address taker,uint256 tokenId,uint256 makerAmount,uint256 takerAmount,uint256 expiration,uint256 nonce,uint256 feeRateBps,uint8 side,uint8 signatureType)";

/// Errors while encoding typed data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Eip712Error {
    #[error("{0} does not fit in uint256")]
    Overflow(&'static str),
}

fn keccak(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

fn encode_uint256(field: &'static str, value: &BigUint) -> Result<[u8; 32], Eip712Error> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(Eip712Error::Overflow(field));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

fn encode_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn encode_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

/// Signing domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Eip712Domain {
    /// `hashStruct(domain)`
    pub fn separator(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(32 * 5);
        encoded.extend_from_slice(&keccak(DOMAIN_TYPE.as_bytes()));
        encoded.extend_from_slice(&keccak(self.name.as_bytes()));
        encoded.extend_from_slice(&keccak(self.version.as_bytes()));
        encoded.extend_from_slice(&encode_u64(self.chain_id));
        encoded.extend_from_slice(&encode_address(&self.verifying_contract));
        keccak(&encoded)
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_u8(self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }
}

/// Exchange order as signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub salt: BigUint,
    pub maker: Address,
    pub signer: Address,
    pub taker: Address,
    pub token_id: BigUint,
    pub maker_amount: BigUint,
    pub taker_amount: BigUint,
    pub expiration: BigUint,
    pub nonce: BigUint,
    pub fee_rate_bps: BigUint,
    pub side: Side,
    pub signature_type: u8,
}

impl Order {
    /// `hashStruct(order)`
    pub fn struct_hash(&self) -> Result<[u8; 32], Eip712Error> {
        let mut encoded = Vec::with_capacity(32 * 13);
        encoded.extend_from_slice(&keccak(ORDER_TYPE.as_bytes()));
        encoded.extend_from_slice(&encode_uint256("salt", &self.salt)?);
        encoded.extend_from_slice(&encode_address(&self.maker));
        encoded.extend_from_slice(&encode_address(&self.signer));
        encoded.extend_from_slice(&encode_address(&self.taker));
        encoded.extend_from_slice(&encode_uint256("tokenId", &self.token_id)?);
        encoded.extend_from_slice(&encode_uint256("makerAmount", &self.maker_amount)?);
        encoded.extend_from_slice(&encode_uint256("takerAmount", &self.taker_amount)?);
        encoded.extend_from_slice(&encode_uint256("expiration", &self.expiration)?);
        encoded.extend_from_slice(&encode_uint256("nonce", &self.nonce)?);
        encoded.extend_from_slice(&encode_uint256("feeRateBps", &self.fee_rate_bps)?);
        encoded.extend_from_slice(&encode_u64(u64::from(self.side.as_u8())));
        encoded.extend_from_slice(&encode_u64(u64::from(self.signature_type)));
        Ok(keccak(&encoded))
    }
}

/// Final digest handed to the signing primitive.
pub fn typed_data_digest(domain: &Eip712Domain, order: &Order) -> Result<[u8; 32], Eip712Error> {
    let mut encoded = Vec::with_capacity(2 + 32 + 32);
    encoded.extend_from_slice(&[0x19, 0x01]);
    encoded.extend_from_slice(&domain.separator());
    encoded.extend_from_slice(&order.struct_hash()?);
    Ok(keccak(&encoded))
}

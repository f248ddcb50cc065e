//! Order signing
//!
//! - `primitive`: secp256k1 signing and EVM address derivation
//! - `eip712`: typed-data hashing of exchange orders
//! - `order`: wire shape and strict parsing of incoming orders
//! - `service`: the authorization facade used by the HTTP routes

pub mod eip712;
pub mod order;
pub mod primitive;
pub mod service;

pub use eip712::{typed_data_digest, Address, Eip712Domain, Eip712Error, Order, Side};
pub use order::{parse_address, parse_decimal, OrderRequest};
pub use primitive::{Secp256k1Signer, Signature, SigningError, SigningPrimitive, SIGNATURE_LEN};
pub use service::{
    SessionStatusResponse, SignOrderRequest, SignOrderResponse, SigningConfig, SigningService,
};

//! Session Signer - time-boxed custody of an order signing key
//!
//! Holds one signing key sealed in memory for a bounded session and signs
//! exchange orders on request, as long as the session has not expired and the
//! cumulative order value stays under the session's ceiling.
//!
//! ## Components
//!
//! - **Custody**: sealed key storage with scoped, zeroizing reveal
//! - **Session**: the custody core (activate / sign / status / destroy)
//! - **Signing**: secp256k1 signer, typed-data order hashing, and the
//!   authorization facade
//! - **Server**: hyper HTTP front end and admin routes

pub mod config;
pub mod custody;
pub mod key_source;
pub mod logging;
pub mod routes;
pub mod server;
pub mod session;
pub mod signing;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use session::{SessionError, SessionManager, SessionStatus, Teardown};
pub use signing::{SigningConfig, SigningService};
pub use types::{Result, SignerError};

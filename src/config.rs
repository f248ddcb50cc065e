//! Configuration for the session signer
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use num_bigint::BigUint;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::key_source::{EnvKeySource, HexFileKeySource, KeySource, KeySourceError};
use crate::signing::eip712::{
    DEFAULT_CHAIN_ID, DEFAULT_DOMAIN_NAME, DEFAULT_DOMAIN_VERSION, DEFAULT_EXCHANGE_ADDRESS,
};
use crate::signing::{parse_address, parse_decimal, Eip712Domain};

/// Session signer - time-boxed, value-capped custody of an order signing key
#[derive(Parser, Debug, Clone)]
#[command(name = "session-signer")]
#[command(about = "Rate-limited signing gateway holding one session key in sealed memory")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "127.0.0.1:8090")]
    pub listen: SocketAddr,

    /// Session lifetime in seconds
    #[arg(long, env = "SESSION_TTL_SECONDS", default_value = "3600")]
    pub session_ttl_seconds: u64,

    /// Default cumulative value ceiling per session, in the smallest
    /// settlement unit (USDC has 6 decimals, so 1000000000 = 1,000 USDC)
    #[arg(long, env = "MAX_VALUE_LIMIT", default_value = "1000000000")]
    pub max_value_limit: String,

    /// File holding the hex-encoded signing key
    #[arg(long, env = "SIGNER_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Name of the environment variable holding the hex-encoded signing key
    /// (removed from the environment once read)
    #[arg(long, env = "SIGNER_KEY_ENV")]
    pub key_env: Option<String>,

    /// Activate a session from the key source at startup
    #[arg(long, env = "ACTIVATE_ON_START", default_value_t = true, action = clap::ArgAction::Set)]
    pub activate_on_start: bool,

    /// API key for session administration (activate / destroy).
    /// Admin routes are disabled when unset.
    #[arg(long, env = "API_KEY_ADMIN")]
    pub api_key_admin: Option<String>,

    /// Chain id of the typed-data domain
    #[arg(long, env = "CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,

    /// Exchange contract orders are signed for
    #[arg(long, env = "EXCHANGE_ADDRESS", default_value = DEFAULT_EXCHANGE_ADDRESS)]
    pub exchange_address: String,

    /// Typed-data domain name
    #[arg(long, env = "EIP712_DOMAIN_NAME", default_value = DEFAULT_DOMAIN_NAME)]
    pub domain_name: String,

    /// Typed-data domain version
    #[arg(long, env = "EIP712_DOMAIN_VERSION", default_value = DEFAULT_DOMAIN_VERSION)]
    pub domain_version: String,

    /// Append custody audit events (JSONL) to this file
    #[arg(long = "audit-log", env = "AUDIT_LOG_PATH")]
    pub audit_log_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.session_ttl_seconds == 0 {
            return Err("SESSION_TTL_SECONDS must be greater than zero".to_string());
        }

        if parse_decimal("MAX_VALUE_LIMIT", &self.max_value_limit).is_err() {
            return Err(format!(
                "MAX_VALUE_LIMIT must be a non-negative decimal integer, got {:?}",
                self.max_value_limit
            ));
        }

        if self.key_file.is_some() && self.key_env.is_some() {
            return Err("Set only one of SIGNER_KEY_FILE and SIGNER_KEY_ENV".to_string());
        }

        if let Err(e) = parse_address("EXCHANGE_ADDRESS", &self.exchange_address) {
            return Err(e.to_string());
        }

        Ok(())
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    /// Default ceiling; call after `validate`
    pub fn default_max_value_limit(&self) -> Result<BigUint, String> {
        parse_decimal("MAX_VALUE_LIMIT", &self.max_value_limit).map_err(|e| e.to_string())
    }

    /// Typed-data domain orders are hashed under
    pub fn domain(&self) -> Result<Eip712Domain, String> {
        let verifying_contract =
            parse_address("EXCHANGE_ADDRESS", &self.exchange_address).map_err(|e| e.to_string())?;
        Ok(Eip712Domain {
            name: self.domain_name.clone(),
            version: self.domain_version.clone(),
            chain_id: self.chain_id,
            verifying_contract,
        })
    }

    /// Configured key source, if any.
    ///
    /// With `SIGNER_KEY_ENV` this consumes the named variable, so call it
    /// once, before the async runtime starts.
    pub fn key_source(&self) -> Result<Option<Arc<dyn KeySource>>, KeySourceError> {
        if let Some(path) = &self.key_file {
            return Ok(Some(Arc::new(HexFileKeySource::new(path.clone()))));
        }
        match &self.key_env {
            Some(var) => Ok(Some(Arc::new(EnvKeySource::consume(var.clone())?))),
            None => Ok(None),
        }
    }

    /// Whether admin routes are enabled
    pub fn admin_enabled(&self) -> bool {
        self.api_key_admin.as_ref().is_some_and(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["session-signer"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults_validate() {
        let args = args(&[]);
        assert!(args.validate().is_ok());
        assert!(args.activate_on_start);
        assert_eq!(args.session_ttl(), Duration::from_secs(3600));
        assert_eq!(args.default_max_value_limit().unwrap(), BigUint::from(1_000_000_000u64));
        assert_eq!(args.domain().unwrap().chain_id, 137);
        assert!(args.key_source().unwrap().is_none());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert!(args(&["--session-ttl-seconds", "0"]).validate().is_err());
    }

    #[test]
    fn test_bad_limit_rejected() {
        assert!(args(&["--max-value-limit", "1e9"]).validate().is_err());
        assert!(args(&["--max-value-limit=-5"]).validate().is_err());
    }

    #[test]
    fn test_two_key_sources_rejected() {
        let args = args(&["--key-file", "/tmp/k", "--key-env", "SIGNER_KEY"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_bad_exchange_rejected() {
        assert!(args(&["--exchange-address", "0x1234"]).validate().is_err());
    }

    #[test]
    fn test_activate_on_start_can_be_disabled() {
        assert!(!args(&["--activate-on-start", "false"]).activate_on_start);
    }

    #[test]
    fn test_key_file_source_described() {
        let args = args(&["--key-file", "/run/secrets/key.hex"]);
        let source = args.key_source().unwrap().unwrap();
        assert_eq!(source.describe(), "file:/run/secrets/key.hex");
    }

    #[test]
    fn test_missing_key_env_fails_at_startup() {
        let args = args(&["--key-env", "SESSION_SIGNER_TEST_UNSET_KEY_VAR"]);
        assert!(matches!(args.key_source(), Err(KeySourceError::MissingEnv(_))));
    }
}

//! Session Signer - time-boxed custody of an order signing key

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_signer::{
    config::Args,
    custody::generate_random_bytes,
    key_source::KeySource,
    logging::AuditLogger,
    server::{self, AppState},
    signing::{Secp256k1Signer, SigningConfig, SigningService},
    SessionManager,
};

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("session_signer={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Env key sources unset their variable; no runtime threads exist yet
    let key_source = match args.key_source() {
        Ok(source) => source,
        Err(e) => {
            error!("Key source error: {}", e);
            std::process::exit(1);
        }
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args, key_source))
}

async fn run(args: Args, key_source: Option<Arc<dyn KeySource>>) -> anyhow::Result<()> {
    let domain = args.domain().map_err(anyhow::Error::msg)?;
    let default_limit = args.default_max_value_limit().map_err(anyhow::Error::msg)?;

    let instance_id = format!("signer-{}", hex::encode(generate_random_bytes::<4>()));
    let audit = AuditLogger::new(instance_id);

    info!("======================================");
    info!("  Session Signer");
    info!("======================================");
    info!("Instance: {}", audit.instance_id());
    info!("Listen: {}", args.listen);
    info!("Session TTL: {}s", args.session_ttl_seconds);
    info!("Default value limit: {}", default_limit);
    info!(
        "Domain: {} v{} (chain {}, exchange {})",
        domain.name, domain.version, domain.chain_id, args.exchange_address
    );
    info!(
        "Key source: {}",
        key_source
            .as_ref()
            .map(|s| s.describe())
            .unwrap_or_else(|| "none".to_string())
    );
    info!("Admin routes: {}", if args.admin_enabled() { "enabled" } else { "disabled" });
    info!("======================================");

    if let Some(path) = &args.audit_log_path {
        if let Err(e) = audit.init_file(path.clone()).await {
            error!("Failed to open audit log {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    let sessions = Arc::new(SessionManager::new(
        args.session_ttl(),
        Arc::new(Secp256k1Signer::new()),
    ));
    let signing = Arc::new(SigningService::new(
        SigningConfig {
            domain,
            default_max_value_limit: default_limit,
        },
        sessions,
        audit,
    ));

    match (&key_source, args.activate_on_start) {
        (Some(source), true) => match signing.activate_from(source.as_ref(), None).await {
            Ok(status) => info!(
                address = %status.session_address,
                ttl_secs = status.ttl_seconds,
                "Startup session active"
            ),
            Err(e) => {
                error!("Startup activation failed: {}", e);
                std::process::exit(1);
            }
        },
        (Some(_), false) => info!("ACTIVATE_ON_START disabled - waiting for admin activation"),
        (None, _) => warn!("No key source configured - signing requests will be refused"),
    }

    let state = Arc::new(AppState::new(args, signing, key_source));
    server::run(state).await?;

    info!("Session signer stopped");
    Ok(())
}

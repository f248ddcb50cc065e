//! Authorization facade integration tests
//!
//! Drives `SigningService` the way the HTTP routes do and checks the
//! caller-visible error taxonomy and response shapes.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use num_bigint::BigUint;
use session_signer::key_source::HexFileKeySource;
use session_signer::logging::AuditLogger;
use session_signer::session::SessionManager;
use session_signer::signing::primitive::evm_address;
use session_signer::signing::{
    typed_data_digest, Eip712Domain, OrderRequest, Secp256k1Signer, SignOrderRequest,
    SigningConfig, SigningService,
};
use session_signer::{SignerError, Teardown};

const KEY_HEX: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const KEY_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

fn domain() -> Eip712Domain {
    Eip712Domain {
        name: "Polymarket CTF Exchange".to_string(),
        version: "1".to_string(),
        chain_id: 137,
        verifying_contract: session_signer::signing::parse_address(
            "exchange",
            "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E",
        )
        .unwrap(),
    }
}

fn service_with_audit(audit: AuditLogger) -> SigningService {
    let sessions = Arc::new(SessionManager::new(
        Duration::from_secs(60),
        Arc::new(Secp256k1Signer::new()),
    ));
    SigningService::new(
        SigningConfig {
            domain: domain(),
            default_max_value_limit: BigUint::from(1_000_000u32),
        },
        sessions,
        audit,
    )
}

fn service() -> SigningService {
    service_with_audit(AuditLogger::new("test".to_string()))
}

fn key_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", KEY_HEX).unwrap();
    file
}

fn order_request(maker_amount: &str) -> OrderRequest {
    serde_json::from_value(serde_json::json!({
        "salt": "479249096354",
        "maker": KEY_ADDRESS,
        "signer": KEY_ADDRESS,
        "taker": "0x0000000000000000000000000000000000000000",
        "tokenId": "71321045679252212594626385532706912750332728571942532289631379312455583992563",
        "makerAmount": maker_amount,
        "takerAmount": "1000000",
        "expiration": "0",
        "nonce": "0",
        "feeRateBps": "0",
        "side": "BUY",
        "signatureType": 0
    }))
    .unwrap()
}

fn sign_request(maker_amount: &str) -> SignOrderRequest {
    SignOrderRequest {
        order: Some(order_request(maker_amount)),
    }
}

async fn activated(limit: u64) -> (SigningService, tempfile::NamedTempFile) {
    let service = service();
    let file = key_file();
    service
        .activate_from(&HexFileKeySource::new(file.path()), Some(BigUint::from(limit)))
        .await
        .unwrap();
    (service, file)
}

#[tokio::test]
async fn test_signature_recovers_to_session_address() {
    let (service, _file) = activated(1_000_000).await;

    let response = service.sign_order(sign_request("600000")).await.unwrap();
    assert_eq!(response.signer_address, KEY_ADDRESS);

    let order = order_request("600000").parse().unwrap();
    let digest = typed_data_digest(&domain(), &order).unwrap();

    let bytes = hex::decode(response.signature.trim_start_matches("0x")).unwrap();
    assert_eq!(bytes.len(), 65);
    let signature = EcdsaSignature::from_slice(&bytes[..64]).unwrap();
    let recovery_id = RecoveryId::from_byte(bytes[64] - 27).unwrap();
    let recovered = VerifyingKey::recover_from_prehash(&digest, &signature, recovery_id).unwrap();

    assert_eq!(evm_address(&recovered.into()), KEY_ADDRESS);
}

#[tokio::test]
async fn test_status_reports_decimal_strings() {
    let (service, _file) = activated(1_000_000).await;
    service.sign_order(sign_request("600000")).await.unwrap();

    let status = service.session_status().await;
    assert!(status.active);
    assert_eq!(status.max_value_limit, "1000000");
    assert_eq!(status.value_used, "600000");
    assert_eq!(status.session_address, KEY_ADDRESS);

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["valueUsed"], "600000");
    assert_eq!(json["maxValueLimit"], "1000000");
    assert!(json["ttlSeconds"].is_u64());
}

#[tokio::test]
async fn test_error_taxonomy_statuses() {
    let service = service();

    let err = service.sign_order(sign_request("100")).await.unwrap_err();
    assert!(matches!(err, SignerError::NoActiveSession));
    assert_eq!(err.status_code().as_u16(), 412);

    let file = key_file();
    service
        .activate_from(&HexFileKeySource::new(file.path()), Some(BigUint::from(100u32)))
        .await
        .unwrap();
    service.sign_order(sign_request("100")).await.unwrap();

    let err = service.sign_order(sign_request("1")).await.unwrap_err();
    assert!(matches!(err, SignerError::ValueLimitExceeded));
    assert_eq!(err.status_code().as_u16(), 429);

    let err = service.sign_order(sign_request("1.0")).await.unwrap_err();
    assert!(matches!(err, SignerError::InvalidInput(_)));
    assert_eq!(err.status_code().as_u16(), 400);
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_maps_to_gone() {
    let (service, _file) = activated(1_000_000).await;

    tokio::time::advance(Duration::from_secs(61)).await;

    let err = service.sign_order(sign_request("1")).await.unwrap_err();
    assert!(matches!(err, SignerError::SessionExpired));
    assert_eq!(err.status_code().as_u16(), 410);
    assert!(!service.session_status().await.active);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_core() {
    let (service, _file) = activated(1_000).await;

    let mut bad_maker = order_request("10");
    bad_maker.maker = "0x1234".to_string();
    let mut negative = order_request("10");
    negative.taker_amount = "-1".to_string();
    let mut bad_type = order_request("10");
    bad_type.signature_type = 9;

    for request in [bad_maker, negative, bad_type] {
        let err = service
            .sign_order(SignOrderRequest {
                order: Some(request),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    assert_eq!(service.session_status().await.value_used, "0");
}

#[tokio::test]
async fn test_inactive_status_shape() {
    let service = service();
    let status = service.session_status().await;

    assert!(!status.active);
    assert_eq!(status.ttl_seconds, 0);
    assert_eq!(status.max_value_limit, "0");
    assert_eq!(status.value_used, "0");
    assert_eq!(status.session_address, "");
}

#[tokio::test]
async fn test_destroy_then_sign_is_no_active_session() {
    let (service, _file) = activated(1_000).await;
    service.destroy().await;

    let err = service.sign_order(sign_request("1")).await.unwrap_err();
    assert_eq!(err.code(), "NO_ACTIVE_SESSION");
}

#[tokio::test]
async fn test_audit_trail_records_custody_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let audit = AuditLogger::new("signer-test".to_string());
    audit.init_file(path.clone()).await.unwrap();

    let service = service_with_audit(audit);
    let file = key_file();
    service
        .activate_from(&HexFileKeySource::new(file.path()), Some(BigUint::from(10u32)))
        .await
        .unwrap();
    service.sign_order(sign_request("10")).await.unwrap();
    service.sign_order(sign_request("1")).await.unwrap_err();
    service.destroy().await;

    let contents = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let types: Vec<&str> = events
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();

    assert_eq!(
        types,
        ["session_activated", "order_signed", "sign_rejected", "session_destroyed"]
    );
    assert_eq!(events[1]["value_used"], "10");
    assert_eq!(events[2]["reason"], "VALUE_LIMIT_EXCEEDED");
    assert!(!contents.contains(KEY_HEX.trim_start_matches("0x")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_activation_report_survives_concurrent_destroy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let audit = AuditLogger::new("signer-race".to_string());
    audit.init_file(path.clone()).await.unwrap();

    let service = Arc::new(service_with_audit(audit));
    let file = key_file();
    let source = HexFileKeySource::new(file.path());

    let destroyer = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            for _ in 0..400 {
                service.destroy().await;
                tokio::task::yield_now().await;
            }
        })
    };

    for _ in 0..400 {
        let status = service
            .activate_from(&source, Some(BigUint::from(10u32)))
            .await
            .unwrap();
        assert!(status.active);
        assert_eq!(status.session_address, KEY_ADDRESS);
        assert_eq!(status.max_value_limit, "10");
        assert_eq!(status.value_used, "0");
    }
    destroyer.await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let activations: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .filter(|e| e["event_type"] == "session_activated")
        .collect();
    assert_eq!(activations.len(), 400);
    assert!(activations.iter().all(|e| e["address"] == KEY_ADDRESS));
}

#[tokio::test(start_paused = true)]
async fn test_status_teardown_is_audited() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let audit = AuditLogger::new("signer-test".to_string());
    audit.init_file(path.clone()).await.unwrap();

    let service = service_with_audit(audit);
    let file = key_file();
    service
        .activate_from(&HexFileKeySource::new(file.path()), None)
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(!service.session_status().await.active);
    // Already gone, nothing further to record
    assert!(!service.session_status().await.active);

    let contents = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1]["event_type"], "session_expired");
    assert_eq!(events[1]["reason"], "status_check");
}

#[tokio::test(start_paused = true)]
async fn test_destroy_reports_expired_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let audit = AuditLogger::new("signer-test".to_string());
    audit.init_file(path.clone()).await.unwrap();

    let service = service_with_audit(audit);
    let file = key_file();
    service
        .activate_from(&HexFileKeySource::new(file.path()), None)
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(service.destroy().await, Teardown::Expired);
    assert_eq!(service.destroy().await, Teardown::Empty);

    let contents = std::fs::read_to_string(&path).unwrap();
    let types: Vec<String> = contents
        .lines()
        .map(|line| {
            let event: serde_json::Value = serde_json::from_str(line).unwrap();
            event["event_type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(types, ["session_activated", "session_expired"]);
}

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use checkout_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    traits::{PaymentResult, ProviderPaymentStatus},
    CheckoutApi,
};
use crate::{
    config::ServerOptions,
    endpoint_tests::{
        helpers::{get_request, sample_order},
        mocks::{MockCheckoutManager, MockGateway},
    },
    routes::PaymentStatusRoute,
};

const STATUS_PATH: &str = "/payment_status/ord-0000000000000001/ws_CO_TEST_0001";

fn register(cfg: &mut ServiceConfig, db: MockCheckoutManager, gateway: MockGateway) {
    let api = CheckoutApi::new(db, gateway, EventProducers::default());
    cfg.service(PaymentStatusRoute::<MockCheckoutManager, MockGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(ServerOptions { use_x_forwarded_for: false }));
}

#[actix_web::test]
async fn settled_order_reports_completed_without_polling() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(STATUS_PATH, configure_settled).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["status"], "completed");
    assert_eq!(result["order"]["provider_tx_id"], "NLJ7RT61SV");
}

fn configure_settled(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(sample_order(OrderStatusType::Completed))));
    let mut gateway = MockGateway::new();
    // A settled order must not trigger a provider poll
    gateway.expect_poll_status().never();
    register(cfg, db, gateway);
}

#[actix_web::test]
async fn pending_order_polls_the_provider() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(STATUS_PATH, configure_pending).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["status"], "pending");
}

fn configure_pending(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(sample_order(OrderStatusType::AwaitingPayment))));
    db.expect_fetch_order_by_correlation_id()
        .returning(|_| Ok(Some(sample_order(OrderStatusType::AwaitingPayment))));
    let mut gateway = MockGateway::new();
    gateway.expect_poll_status().times(1).returning(|cid| Ok(PaymentResult::pending(cid)));
    register(cfg, db, gateway);
}

#[actix_web::test]
async fn poll_that_finds_a_failure_reports_it_with_reason() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(STATUS_PATH, configure_poll_failure).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["status"], "failed");
    assert_eq!(result["reason"], "Request cancelled by user");
}

fn configure_poll_failure(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(sample_order(OrderStatusType::AwaitingPayment))));
    db.expect_fetch_order_by_correlation_id()
        .returning(|_| Ok(Some(sample_order(OrderStatusType::AwaitingPayment))));
    db.expect_fail_order().times(1).returning(|_, _| Ok(Some(sample_order(OrderStatusType::Failed))));
    let mut gateway = MockGateway::new();
    gateway.expect_poll_status().times(1).returning(|cid| {
        Ok(PaymentResult {
            correlation_id: cid.to_string(),
            status: ProviderPaymentStatus::Failed,
            transaction_id: None,
            reason: Some("Request cancelled by user".to_string()),
            raw: serde_json::Value::Null,
        })
    });
    register(cfg, db, gateway);
}

#[actix_web::test]
async fn unknown_order_is_reported_as_not_found() {
    let _ = env_logger::try_init().ok();
    let err = get_request(STATUS_PATH, configure_unknown).await.expect_err("Expected error");
    assert_eq!(err, "The requested order #ord-0000000000000001 does not exist");
}

fn configure_unknown(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(None));
    register(cfg, db, MockGateway::new());
}

#[actix_web::test]
async fn mismatched_correlation_id_is_rejected_as_stale() {
    let _ = env_logger::try_init().ok();
    let err = get_request("/payment_status/ord-0000000000000001/ws_CO_OLD_REF", configure_stale)
        .await
        .expect_err("Expected error");
    assert_eq!(err, "Stale or duplicate payment result for reference ws_CO_OLD_REF. No transition was applied");
}

fn configure_stale(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(sample_order(OrderStatusType::AwaitingPayment))));
    let mut gateway = MockGateway::new();
    gateway.expect_poll_status().never();
    register(cfg, db, gateway);
}

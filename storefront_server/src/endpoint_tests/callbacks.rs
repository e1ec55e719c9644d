use actix_web::{http::StatusCode, web, web::ServiceConfig};
use checkout_engine::{db_types::OrderStatusType, events::EventProducers, CheckoutApi};
use serde_json::json;

use crate::{
    config::ServerOptions,
    endpoint_tests::{
        helpers::{post_request, sample_order},
        mocks::{MockCheckoutManager, MockGateway},
    },
    routes::{MpesaCallbackRoute, MtnCallbackRoute},
};

fn mpesa_success_callback() -> serde_json::Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_TEST_0001",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": 20.00 },
                        { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" }
                    ]
                }
            }
        }
    })
}

fn mpesa_failure_callback() -> serde_json::Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_TEST_0001",
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user"
            }
        }
    })
}

fn register(cfg: &mut ServiceConfig, db: MockCheckoutManager) {
    let api = CheckoutApi::new(db, MockGateway::new(), EventProducers::default());
    cfg.service(MpesaCallbackRoute::<MockCheckoutManager, MockGateway>::new())
        .service(MtnCallbackRoute::<MockCheckoutManager, MockGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(ServerOptions { use_x_forwarded_for: false }));
}

#[actix_web::test]
async fn success_callback_completes_the_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/callback/mpesa", mpesa_success_callback(), configure_success).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], true);
    assert!(result["message"].as_str().unwrap().contains("completed"));
}

fn configure_success(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_correlation_id()
        .returning(|_| Ok(Some(sample_order(OrderStatusType::AwaitingPayment))));
    db.expect_complete_order()
        .withf(|_, tx_id| tx_id == "NLJ7RT61SV")
        .times(1)
        .returning(|_, _| Ok(Some(sample_order(OrderStatusType::Completed))));
    register(cfg, db);
}

#[actix_web::test]
async fn failure_callback_fails_the_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/callback/mpesa", mpesa_failure_callback(), configure_failure).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], true);
    assert!(result["message"].as_str().unwrap().contains("failed"));
}

fn configure_failure(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_correlation_id()
        .returning(|_| Ok(Some(sample_order(OrderStatusType::AwaitingPayment))));
    db.expect_fail_order()
        .withf(|_, reason| reason == "Request cancelled by user")
        .times(1)
        .returning(|_, _| Ok(Some(sample_order(OrderStatusType::Failed))));
    register(cfg, db);
}

#[actix_web::test]
async fn unknown_correlation_id_is_acknowledged_with_200() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/callback/mpesa", mpesa_success_callback(), configure_unknown).await.unwrap();
    // The provider must not be asked to retry, even though nothing could be applied
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], true);
    assert!(result["message"].as_str().unwrap().contains("No matching order"));
}

fn configure_unknown(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_correlation_id().returning(|_| Ok(None));
    db.expect_complete_order().never();
    register(cfg, db);
}

#[actix_web::test]
async fn replayed_callback_is_acknowledged_without_reapplying() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/callback/mpesa", mpesa_success_callback(), configure_replay).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["success"], true);
    assert!(result["message"].as_str().unwrap().contains("already applied"));
}

fn configure_replay(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_correlation_id().returning(|_| Ok(Some(sample_order(OrderStatusType::Completed))));
    // Terminal orders are never re-processed
    db.expect_complete_order().never();
    db.expect_commit_reservation().never();
    register(cfg, db);
}

#[actix_web::test]
async fn mtn_callback_shape_is_supported() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "referenceId": "ws_CO_TEST_0001",
        "financialTransactionId": "1308705818",
        "status": "SUCCESSFUL"
    });
    let (status, response) = post_request("/callback/mtn", body, configure_mtn).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(result["success"], true);
}

fn configure_mtn(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    db.expect_fetch_order_by_correlation_id()
        .returning(|_| Ok(Some(sample_order(OrderStatusType::AwaitingPayment))));
    db.expect_complete_order()
        .withf(|_, tx_id| tx_id == "1308705818")
        .times(1)
        .returning(|_, _| Ok(Some(sample_order(OrderStatusType::Completed))));
    register(cfg, db);
}

#[actix_web::test]
async fn uninterpretable_mtn_callback_is_still_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "status": "SUCCESSFUL" });
    let (status, response) = post_request("/callback/mtn", body, configure_no_order_calls).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&response).unwrap();
    assert_eq!(result["success"], false);
}

fn configure_no_order_calls(cfg: &mut ServiceConfig) {
    let db = MockCheckoutManager::new();
    register(cfg, db);
}

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use checkout_engine::{
    db_types::{OrderStatusType, PaymentProvider, Product, ProductId, ReservationId, StockLevel},
    events::EventProducers,
    traits::{GatewayError, PaymentInitiation},
    CheckoutApi,
};
use serde_json::json;
use spg_common::Money;

use crate::{
    config::ServerOptions,
    endpoint_tests::{
        helpers::{post_request, sample_order},
        mocks::{MockCheckoutManager, MockGateway},
    },
    routes::CheckoutRoute,
};

fn checkout_body(declared_total: f64) -> serde_json::Value {
    json!({
        "buyer_id": "buyer-001",
        "phone_number": "254722000001",
        "delivery_address": "14 Biashara St, Nairobi",
        "declared_total": declared_total,
        "items": [{ "product_id": "P1", "color": "red", "quantity": 2 }]
    })
}

fn catalog_expectations(db: &mut MockCheckoutManager, available: i64) {
    db.expect_fetch_product().returning(|id| {
        Ok(Some(Product {
            id: id.clone(),
            seller_id: "seller-01".to_string(),
            name: "Canvas sneaker".to_string(),
            unit_price: Money::from_whole(10),
        }))
    });
    db.expect_fetch_product_stock().returning(move |id, color| {
        Ok(Some(StockLevel { product_id: id.clone(), color: color.to_string(), quantity: available }))
    });
}

fn register(cfg: &mut ServiceConfig, db: MockCheckoutManager, gateway: MockGateway) {
    let api = CheckoutApi::new(db, gateway, EventProducers::default());
    cfg.service(CheckoutRoute::<MockCheckoutManager, MockGateway>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(ServerOptions { use_x_forwarded_for: false }));
}

#[actix_web::test]
async fn successful_checkout_returns_order_and_correlation_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/checkout", checkout_body(20.00), configure_success).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(result["order_id"], "ord-0000000000000001");
    assert_eq!(result["correlation_id"], "ws_CO_TEST_0001");
}

fn configure_success(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    catalog_expectations(&mut db, 5);
    db.expect_reserve_stock().times(1).returning(|_| Ok(ReservationId("rsv-0000000000000001".into())));
    db.expect_insert_order().times(1).returning(|_| Ok(sample_order(OrderStatusType::New)));
    db.expect_attach_correlation_id().times(1).returning(|_, _| Ok(sample_order(OrderStatusType::AwaitingPayment)));
    let mut gateway = MockGateway::new();
    gateway.expect_provider().returning(|| PaymentProvider::Mpesa);
    gateway.expect_initiate().times(1).returning(|_, _, _| {
        Ok(PaymentInitiation { correlation_id: "ws_CO_TEST_0001".to_string(), provider: PaymentProvider::Mpesa })
    });
    register(cfg, db, gateway);
}

#[actix_web::test]
async fn price_mismatch_is_rejected_with_no_side_effects() {
    let _ = env_logger::try_init().ok();
    let err = post_request("/checkout", checkout_body(25.00), configure_mismatch).await.expect_err("Expected error");
    assert_eq!(err, "Total price mismatch: declared 25.00, calculated 20.00");
}

fn configure_mismatch(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    catalog_expectations(&mut db, 5);
    // No reservation, order or gateway expectations: validation must fail before any mutation.
    db.expect_reserve_stock().never();
    db.expect_insert_order().never();
    let mut gateway = MockGateway::new();
    gateway.expect_initiate().never();
    register(cfg, db, gateway);
}

#[actix_web::test]
async fn insufficient_stock_is_rejected() {
    let _ = env_logger::try_init().ok();
    let err = post_request("/checkout", checkout_body(20.00), configure_out_of_stock).await.expect_err("Expected error");
    assert_eq!(err, "Insufficient stock for product P1, color red: requested 2, available 1");
}

fn configure_out_of_stock(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    catalog_expectations(&mut db, 1);
    db.expect_reserve_stock().never();
    let gateway = MockGateway::new();
    register(cfg, db, gateway);
}

#[actix_web::test]
async fn failed_initiation_compensates_and_surfaces_the_gateway_error() {
    let _ = env_logger::try_init().ok();
    let err = post_request("/checkout", checkout_body(20.00), configure_gateway_failure).await.expect_err("Expected error");
    assert!(err.contains("Failed to initiate payment") || err.contains("payment provider rejected"));
}

fn configure_gateway_failure(cfg: &mut ServiceConfig) {
    let mut db = MockCheckoutManager::new();
    catalog_expectations(&mut db, 5);
    db.expect_reserve_stock().times(1).returning(|_| Ok(ReservationId("rsv-0000000000000001".into())));
    db.expect_insert_order().times(1).returning(|_| Ok(sample_order(OrderStatusType::New)));
    // The compensating transaction must delete the order and release the reservation
    db.expect_delete_new_order().times(1).returning(|_| Ok(()));
    db.expect_release_reservation().times(1).returning(|_| Ok(true));
    db.expect_attach_correlation_id().never();
    let mut gateway = MockGateway::new();
    gateway.expect_provider().returning(|| PaymentProvider::Mpesa);
    gateway
        .expect_initiate()
        .times(1)
        .returning(|_, _, _| Err(GatewayError::Api { status: 503, message: "Service unavailable".to_string() }));
    register(cfg, db, gateway);
}

#[actix_web::test]
async fn non_finite_total_is_rejected() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "buyer_id": "buyer-001",
        "phone_number": "254722000001",
        "delivery_address": "14 Biashara St, Nairobi",
        "declared_total": "not-a-number",
        "items": [{ "product_id": "P1", "color": "red", "quantity": 2 }]
    });
    let err = post_request("/checkout", body, configure_no_calls).await.expect_err("Expected a payload rejection");
    assert!(err.contains("Json deserialize error"));
}

fn configure_no_calls(cfg: &mut ServiceConfig) {
    let db = MockCheckoutManager::new();
    let gateway = MockGateway::new();
    register(cfg, db, gateway);
}

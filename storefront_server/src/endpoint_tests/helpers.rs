use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use checkout_engine::db_types::{Order, OrderId, OrderStatusType, ReservationId};
use chrono::{TimeZone, Utc};
use spg_common::Money;

pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let req = TestRequest::get().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub async fn post_request(
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::post().uri(path).set_json(body).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

/// A fixture order in the given state, correlated with `ws_CO_TEST_0001` once payment has been
/// initiated.
pub fn sample_order(status: OrderStatusType) -> Order {
    let correlation_id = match status {
        OrderStatusType::New => None,
        _ => Some("ws_CO_TEST_0001".to_string()),
    };
    let provider_tx_id = matches!(status, OrderStatusType::Completed).then(|| "NLJ7RT61SV".to_string());
    let failure_reason = matches!(status, OrderStatusType::Failed).then(|| "Request cancelled by user".to_string());
    Order {
        id: 1,
        order_id: OrderId("ord-0000000000000001".into()),
        buyer_id: "buyer-001".to_string(),
        seller_id: "seller-01".to_string(),
        total_price: Money::from_whole(20),
        delivery_address: "14 Biashara St, Nairobi".to_string(),
        status,
        correlation_id,
        provider_tx_id,
        failure_reason,
        reservation_id: ReservationId("rsv-0000000000000001".into()),
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
    }
}

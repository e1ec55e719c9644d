use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CheckoutApi,
    SqliteDatabase,
};
use log::*;
use momo_gateway::MomoApi;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::MomoGateway,
    poll_worker::start_poll_worker,
    routes::{health, CheckoutRoute, MpesaCallbackRoute, MtnCallbackRoute, PaymentStatusRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let momo = MomoApi::new(config.momo_config.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = MomoGateway::new(momo);
    let producers = start_event_handlers().await;
    let _worker = start_poll_worker(
        db.clone(),
        gateway.clone(),
        producers.clone(),
        config.poll_interval,
        config.poll_grace,
    );
    let srv = create_server_instance(config, db, gateway, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wire up the engine's event hooks. Settled orders are logged here; notification delivery (buyer
/// receipts, seller alerts) subscribes at this seam.
async fn start_event_handlers() -> EventProducers {
    let mut hooks = EventHooks::default();
    hooks.on_order_completed(|ev| {
        Box::pin(async move {
            info!("📦️ Order {} settled. Provider receipt: {}", ev.order.order_id, ev.provider_tx_id);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks.on_order_failed(|ev| {
        Box::pin(async move {
            info!("📦️ Order {} failed: {}", ev.order.order_id, ev.reason);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(100, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    producers
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: MomoGateway,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let gateway_timeout = config.gateway_timeout;
    let srv = HttpServer::new(move || {
        let checkout_api =
            CheckoutApi::new(db.clone(), gateway.clone(), producers.clone()).with_gateway_timeout(gateway_timeout);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(options))
            .service(health)
            .service(CheckoutRoute::<SqliteDatabase, MomoGateway>::new())
            .service(MpesaCallbackRoute::<SqliteDatabase, MomoGateway>::new())
            .service(MtnCallbackRoute::<SqliteDatabase, MomoGateway>::new())
            .service(PaymentStatusRoute::<SqliteDatabase, MomoGateway>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

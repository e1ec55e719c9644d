#![allow(dead_code)]
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use checkout_engine::{
    db_types::{OrderId, PaymentProvider, Product, ProductId},
    sqlite::db::products,
    traits::{GatewayError, PaymentGateway, PaymentInitiation, PaymentResult},
    SqliteDatabase,
};
use log::*;
use spg_common::Money;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    std::fs::create_dir_all("data").ok();
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn seed_product(db: &SqliteDatabase, id: &str, seller_id: &str, unit_price: Money, stock: &[(&str, i64)]) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let product =
        Product { id: ProductId::from(id), seller_id: seller_id.to_string(), name: format!("Product {id}"), unit_price };
    products::upsert_product(&product, &mut conn).await.expect("Error seeding product");
    for (color, quantity) in stock {
        products::set_stock_level(&product.id, color, *quantity, &mut conn).await.expect("Error seeding stock");
    }
}

pub async fn stock_quantity(db: &SqliteDatabase, id: &str, color: &str) -> i64 {
    sqlx::query_scalar("SELECT quantity FROM product_stock WHERE product_id = $1 AND color = $2")
        .bind(id)
        .bind(color)
        .fetch_one(db.pool())
        .await
        .expect("Error fetching stock quantity")
}

pub async fn order_count(db: &SqliteDatabase) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.expect("Error counting orders")
}

pub async fn reservation_status(db: &SqliteDatabase, id: &str) -> Option<String> {
    sqlx::query_scalar("SELECT status FROM stock_reservations WHERE id = $1")
        .bind(id)
        .fetch_optional(db.pool())
        .await
        .expect("Error fetching reservation status")
}

pub async fn backdate_order(db: &SqliteDatabase, order_id: &OrderId, seconds: i64) {
    sqlx::query("UPDATE orders SET updated_at = datetime('now', $1) WHERE order_id = $2")
        .bind(format!("-{seconds} seconds"))
        .bind(order_id.as_str())
        .execute(db.pool())
        .await
        .expect("Error backdating order");
}

#[derive(Debug, Clone)]
pub struct InitiationRecord {
    pub order_id: OrderId,
    pub amount: Money,
    pub phone_number: String,
}

#[derive(Default)]
struct GatewayState {
    fail_with: Option<GatewayError>,
    poll_results: HashMap<String, PaymentResult>,
    initiations: Vec<InitiationRecord>,
    counter: u64,
}

/// A scripted in-memory stand-in for the mobile-money provider client.
#[derive(Clone, Default)]
pub struct TestGateway {
    inner: Arc<Mutex<GatewayState>>,
}

impl TestGateway {
    pub fn failing_with(err: GatewayError) -> Self {
        let gw = Self::default();
        gw.inner.lock().unwrap().fail_with = Some(err);
        gw
    }

    pub fn set_poll_result(&self, result: PaymentResult) {
        self.inner.lock().unwrap().poll_results.insert(result.correlation_id.clone(), result);
    }

    pub fn initiations(&self) -> Vec<InitiationRecord> {
        self.inner.lock().unwrap().initiations.clone()
    }
}

impl PaymentGateway for TestGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Mpesa
    }

    async fn initiate(
        &self,
        phone_number: &str,
        amount: Money,
        order_id: &OrderId,
    ) -> Result<PaymentInitiation, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(e) = &state.fail_with {
            return Err(e.clone());
        }
        state.counter += 1;
        let correlation_id = format!("ws_CO_TEST_{:04}", state.counter);
        state.initiations.push(InitiationRecord {
            order_id: order_id.clone(),
            amount,
            phone_number: phone_number.to_string(),
        });
        Ok(PaymentInitiation { correlation_id, provider: PaymentProvider::Mpesa })
    }

    async fn poll_status(&self, correlation_id: &str) -> Result<PaymentResult, GatewayError> {
        let state = self.inner.lock().unwrap();
        match state.poll_results.get(correlation_id) {
            Some(result) => Ok(result.clone()),
            None => Err(GatewayError::NotFound(correlation_id.to_string())),
        }
    }
}

pub fn success_result(correlation_id: &str, tx_id: &str) -> PaymentResult {
    PaymentResult {
        correlation_id: correlation_id.to_string(),
        status: checkout_engine::traits::ProviderPaymentStatus::Completed,
        transaction_id: Some(tx_id.to_string()),
        reason: None,
        raw: serde_json::json!({"ResultCode": 0, "ResultDesc": "The service request is processed successfully."}),
    }
}

pub fn failure_result(correlation_id: &str, reason: &str) -> PaymentResult {
    PaymentResult {
        correlation_id: correlation_id.to_string(),
        status: checkout_engine::traits::ProviderPaymentStatus::Failed,
        transaction_id: None,
        reason: Some(reason.to_string()),
        raw: serde_json::json!({"ResultCode": 1032, "ResultDesc": reason}),
    }
}

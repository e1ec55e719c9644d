//! `SqliteDatabase` is a concrete implementation of a checkout engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the traits defined in the
//! [`crate::traits`] module. All multi-step mutations run inside a single transaction; an error
//! anywhere rolls the whole step back.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, payments, products, reservations};
use crate::{
    db_types::{
        NewOrder,
        NewOrderItem,
        NewPaymentAttempt,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        PaymentAttempt,
        PaymentAttemptStatus,
        Product,
        ProductId,
        ReservationId,
        StockLevel,
    },
    traits::{CheckoutError, CheckoutGatewayDatabase},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl CheckoutGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_product_stock(
        &self,
        product_id: &ProductId,
        color: &str,
    ) -> Result<Option<StockLevel>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let stock = products::fetch_stock_level(product_id, color, &mut conn).await?;
        Ok(stock)
    }

    async fn reserve_stock(&self, lines: &[NewOrderItem]) -> Result<ReservationId, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let id = ReservationId::random();
        // An insufficient line aborts here; dropping the transaction undoes earlier decrements.
        reservations::reserve_lines(&id, lines, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Reservation {id} held for {} line(s)", lines.len());
        Ok(id)
    }

    async fn release_reservation(&self, id: &ReservationId) -> Result<bool, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let released = reservations::release(id, &mut tx).await?;
        tx.commit().await?;
        if released {
            debug!("🗃️ Reservation {id} released; stock restored");
        } else {
            debug!("🗃️ Reservation {id} was not held. Release is a no-op");
        }
        Ok(released)
    }

    async fn commit_reservation(&self, id: &ReservationId) -> Result<bool, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let committed = reservations::commit(id, &mut tx).await?;
        tx.commit().await?;
        Ok(committed)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_id, order.id);
        Ok(order)
    }

    async fn delete_new_order(&self, order_id: &OrderId) -> Result<(), CheckoutError> {
        let mut tx = self.pool.begin().await?;
        orders::delete_new_order(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn attach_correlation_id(
        &self,
        order_id: &OrderId,
        attempt: NewPaymentAttempt,
    ) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let correlation_id = attempt.correlation_id.clone();
        let order = match orders::attach_correlation_id(order_id, &correlation_id, &mut tx).await? {
            Some(order) => order,
            None => {
                return match orders::fetch_order_by_order_id(order_id, &mut tx).await? {
                    Some(_) => Err(CheckoutError::CorrelationIdAlreadySet(order_id.clone())),
                    None => Err(CheckoutError::OrderNotFound(order_id.clone())),
                };
            },
        };
        payments::insert_attempt(attempt, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} is awaiting payment under reference {correlation_id}", order.order_id);
        Ok(order)
    }

    async fn fetch_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_correlation_id(&self, correlation_id: &str) -> Result<Option<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_correlation_id(correlation_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_payment_attempt(&self, correlation_id: &str) -> Result<Option<PaymentAttempt>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        let attempt = payments::fetch_attempt_by_correlation_id(correlation_id, &mut conn).await?;
        Ok(attempt)
    }

    async fn complete_order(&self, order_id: &OrderId, provider_tx_id: &str) -> Result<Option<Order>, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) =
            orders::settle_order(order_id, OrderStatusType::Completed, Some(provider_tx_id), None, &mut tx).await?
        else {
            trace!("🗃️ Order {order_id} was not AwaitingPayment. Completion not applied");
            return Ok(None);
        };
        if let Some(cid) = order.correlation_id.as_deref() {
            payments::update_attempt_status(cid, PaymentAttemptStatus::Completed, &mut tx).await?;
        }
        let committed = reservations::commit(&order.reservation_id, &mut tx).await?;
        if !committed {
            warn!("🗃️ Reservation {} for completed order {} was not held", order.reservation_id, order.order_id);
        }
        tx.commit().await?;
        debug!("🗃️ Order {} marked Completed with provider tx {provider_tx_id}", order.order_id);
        Ok(Some(order))
    }

    async fn fail_order(&self, order_id: &OrderId, reason: &str) -> Result<Option<Order>, CheckoutError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) =
            orders::settle_order(order_id, OrderStatusType::Failed, None, Some(reason), &mut tx).await?
        else {
            trace!("🗃️ Order {order_id} was not AwaitingPayment. Failure not applied");
            return Ok(None);
        };
        if let Some(cid) = order.correlation_id.as_deref() {
            payments::update_attempt_status(cid, PaymentAttemptStatus::Failed, &mut tx).await?;
        }
        let released = reservations::release(&order.reservation_id, &mut tx).await?;
        if !released {
            warn!("🗃️ Reservation {} for failed order {} was not held", order.reservation_id, order.order_id);
        }
        tx.commit().await?;
        debug!("🗃️ Order {} marked Failed: {reason}", order.order_id);
        Ok(Some(order))
    }

    async fn fetch_stale_awaiting_payment(&self, older_than: Duration) -> Result<Vec<Order>, CheckoutError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_stale_awaiting_payment(older_than, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), CheckoutError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, CheckoutError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, CheckoutError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

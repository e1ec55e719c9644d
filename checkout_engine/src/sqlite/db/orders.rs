use chrono::Duration;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType},
    traits::CheckoutError,
};

/// Inserts a new order and its line items. Call this inside a transaction and pass `&mut *tx` as
/// the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, CheckoutError> {
    if fetch_order_by_order_id(&order.order_id, conn).await?.is_some() {
        return Err(CheckoutError::OrderAlreadyExists(order.order_id));
    }
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                buyer_id,
                seller_id,
                total_price,
                delivery_address,
                status,
                reservation_id
            ) VALUES ($1, $2, $3, $4, $5, 'New', $6)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.buyer_id)
    .bind(&order.seller_id)
    .bind(order.total_price.value())
    .bind(&order.delivery_address)
    .bind(order.reservation_id.as_str())
    .fetch_one(&mut *conn)
    .await?;
    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, color, quantity, unit_price) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(order.order_id.as_str())
        .bind(item.product_id.as_str())
        .bind(&item.color)
        .bind(item.quantity)
        .bind(item.unit_price.value())
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order [{}] inserted with id {}", inserted.order_id, inserted.id);
    Ok(inserted)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_correlation_id(
    correlation_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE correlation_id = $1")
        .bind(correlation_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Remove an order and its line items. Only legal while the order is still `New` — the
/// compensation path for a failed payment initiation, before any correlation id exists.
pub async fn delete_new_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<(), CheckoutError> {
    let order = fetch_order_by_order_id(order_id, conn)
        .await?
        .ok_or_else(|| CheckoutError::OrderNotFound(order_id.clone()))?;
    if order.status != OrderStatusType::New {
        return Err(CheckoutError::OrderNotDeletable(order_id.clone()));
    }
    sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(order_id.as_str()).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM orders WHERE order_id = $1 AND status = 'New'")
        .bind(order_id.as_str())
        .execute(&mut *conn)
        .await?;
    debug!("📝️ Order [{order_id}] deleted");
    Ok(())
}

/// Attach the provider's correlation id and move the order to `AwaitingPayment`, conditional on
/// no correlation id being set yet. Returns `None` if the guard did not match.
pub(crate) async fn attach_correlation_id(
    order_id: &OrderId,
    correlation_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, CheckoutError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders SET correlation_id = $1, status = 'AwaitingPayment', updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $2 AND status = 'New' AND correlation_id IS NULL
        RETURNING *
        "#,
    )
    .bind(correlation_id)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Compare-and-swap transition into a terminal state, conditional on the order still being
/// `AwaitingPayment`. Returns `None` when the guard does not match — the caller decides whether
/// that means a stale or duplicate event.
pub(crate) async fn settle_order(
    order_id: &OrderId,
    new_status: OrderStatusType,
    provider_tx_id: Option<&str>,
    failure_reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, CheckoutError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = $1, provider_tx_id = $2, failure_reason = $3, updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $4 AND status = 'AwaitingPayment'
        RETURNING *
        "#,
    )
    .bind(new_status.to_string())
    .bind(provider_tx_id)
    .bind(failure_reason)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Orders that have been waiting for a provider verdict for longer than `older_than` (based on
/// `updated_at`). These are the candidates for the poll-reconciliation sweep.
pub(crate) async fn fetch_stale_awaiting_payment(
    older_than: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, CheckoutError> {
    let rows = sqlx::query_as(
        format!(
            "SELECT * FROM orders WHERE status = 'AwaitingPayment' AND (unixepoch(CURRENT_TIMESTAMP) - \
             unixepoch(updated_at)) > {} ORDER BY updated_at ASC",
            older_than.num_seconds()
        )
        .as_str(),
    )
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

use chrono::Duration;
use spg_common::Money;
use thiserror::Error;

use crate::{
    db_types::{
        NewOrder,
        NewOrderItem,
        NewPaymentAttempt,
        Order,
        OrderId,
        OrderItem,
        PaymentAttempt,
        Product,
        ProductId,
        ReservationId,
        StockLevel,
    },
    traits::GatewayError,
};

/// This trait defines the persistence behaviour required to back the checkout engine.
///
/// This behaviour includes:
/// * Read access to the catalog's product and stock projections.
/// * Atomic, all-or-nothing stock reservation with idempotent release/commit.
/// * Order persistence, including the compensating delete for failed initiations.
/// * Conditional (compare-and-swap) status transitions, which are the engine's idempotency guard
///   against duplicate or delayed provider callbacks.
#[allow(async_fn_in_trait)]
pub trait CheckoutGatewayDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, CheckoutError>;

    async fn fetch_product_stock(
        &self,
        product_id: &ProductId,
        color: &str,
    ) -> Result<Option<StockLevel>, CheckoutError>;

    /// Atomically reserve stock for every line, in a single transaction.
    ///
    /// If any line cannot be satisfied, no quantities are decremented for any line and
    /// [`CheckoutError::InsufficientStock`] is returned. Two concurrent reservations against the
    /// same stock row serialize through the conditional decrement; oversell is impossible.
    async fn reserve_stock(&self, lines: &[NewOrderItem]) -> Result<ReservationId, CheckoutError>;

    /// Restore exactly the quantities the reservation held.
    ///
    /// Idempotent: releasing an already-released, committed, or unknown reservation is a no-op
    /// and returns `false`. Returns `true` if stock was restored by this call.
    async fn release_reservation(&self, id: &ReservationId) -> Result<bool, CheckoutError>;

    /// Mark the reservation as committed, leaving its decrement in place permanently.
    ///
    /// Same idempotency contract as [`release_reservation`][Self::release_reservation].
    async fn commit_reservation(&self, id: &ReservationId) -> Result<bool, CheckoutError>;

    /// Persist a new order and its line items in `New` status, in a single transaction.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, CheckoutError>;

    /// Remove an order and its line items. Compensation path for a failed payment initiation;
    /// only legal while the order is still `New`.
    async fn delete_new_order(&self, order_id: &OrderId) -> Result<(), CheckoutError>;

    /// Attach the provider's correlation id to the order and move it to `AwaitingPayment`,
    /// recording the payment attempt in the same transaction.
    ///
    /// The update is conditional on `correlation_id` being unset; a second attach returns
    /// [`CheckoutError::CorrelationIdAlreadySet`]. A correlation id is attached at most once in
    /// an order's lifetime.
    async fn attach_correlation_id(
        &self,
        order_id: &OrderId,
        attempt: NewPaymentAttempt,
    ) -> Result<Order, CheckoutError>;

    async fn fetch_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, CheckoutError>;

    async fn fetch_order_by_correlation_id(&self, correlation_id: &str) -> Result<Option<Order>, CheckoutError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, CheckoutError>;

    async fn fetch_payment_attempt(&self, correlation_id: &str) -> Result<Option<PaymentAttempt>, CheckoutError>;

    /// Transition the order to `Completed`, conditional on it still being `AwaitingPayment`.
    ///
    /// Returns `None` if the compare-and-swap found the order in any other state, in which case
    /// the caller treats the event as stale or duplicate. On success, the payment attempt record
    /// and the reservation (`Held` → `Committed`, decrement stays) are updated in the same
    /// transaction.
    async fn complete_order(&self, order_id: &OrderId, provider_tx_id: &str) -> Result<Option<Order>, CheckoutError>;

    /// Transition the order to `Failed` with a human-readable reason, conditional on it still
    /// being `AwaitingPayment`. Same compare-and-swap contract as
    /// [`complete_order`][Self::complete_order]. On success, the reservation is released and the
    /// reserved quantities restored to the ledger in the same transaction.
    async fn fail_order(&self, order_id: &OrderId, reason: &str) -> Result<Option<Order>, CheckoutError>;

    /// Orders that have been `AwaitingPayment` for longer than `older_than`, i.e. whose callback
    /// is presumed lost. The poll worker reconciles these against the provider.
    async fn fetch_stale_awaiting_payment(&self, older_than: Duration) -> Result<Vec<Order>, CheckoutError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), CheckoutError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Insufficient stock for product {product_id}, color {color}: requested {requested}, available {available}")]
    InsufficientStock { product_id: ProductId, color: String, requested: i64, available: i64 },
    #[error("Total price mismatch: declared {declared}, calculated {calculated}")]
    PriceMismatch { declared: Money, calculated: Money },
    #[error("Carts spanning more than one seller are not supported")]
    MultiSellerCart,
    #[error("Line quantities must be positive")]
    InvalidQuantity,
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("No order is linked to payment reference {0}")]
    CorrelationIdNotFound(String),
    #[error("A payment reference has already been attached to order {0}")]
    CorrelationIdAlreadySet(OrderId),
    #[error("Stale or duplicate payment result for reference {0}. No transition was applied")]
    StaleOrDuplicateCallback(String),
    #[error("Order {0} is not in a state that can be deleted")]
    OrderNotDeletable(OrderId),
    #[error("Payment gateway error: {0}")]
    GatewayError(#[from] GatewayError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        CheckoutError::DatabaseError(e.to_string())
    }
}

use std::{fmt::Debug, time::Duration};

use log::*;
use spg_common::Money;

use crate::{
    api::checkout_objects::{CheckoutRequest, CheckoutResult, ReconciliationOutcome, ValidatedCart},
    db_types::{CartLine, NewOrder, NewOrderItem, NewPaymentAttempt, Order, OrderId, ReservationId},
    events::{EventProducers, OrderCompletedEvent, OrderFailedEvent},
    traits::{
        CheckoutError,
        CheckoutGatewayDatabase,
        GatewayError,
        PaymentGateway,
        PaymentResult,
        ProviderPaymentStatus,
    },
};

const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// `CheckoutApi` is the primary API for the checkout use case and for reconciling provider
/// payment results against orders.
///
/// It composes the cart validator, the inventory ledger, the order store and the payment gateway
/// client into the end-to-end flow, including the compensating actions when a later step fails.
/// Both reconciliation entry points (push callback and pull poll) funnel through
/// [`Self::apply_payment_result`], so the idempotency guard is defined exactly once.
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
    gateway_timeout: Duration,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers, gateway_timeout: DEFAULT_GATEWAY_TIMEOUT }
    }

    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: CheckoutGatewayDatabase,
    G: PaymentGateway,
{
    /// Turn a client-submitted cart into priced, stock-checked line items.
    ///
    /// Every line is checked against the catalog and stock levels, and the unit price is
    /// snapshotted from the current catalog price. The calculated total must match the declared
    /// total within one minor unit. Validation performs no writes; all failures are reported
    /// before any mutation.
    pub async fn validate_cart(&self, lines: &[CartLine], declared_total: Money) -> Result<ValidatedCart, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let mut seller_id = None;
        let mut items = Vec::with_capacity(lines.len());
        let mut calculated_total = Money::default();
        for line in lines {
            if line.quantity <= 0 {
                return Err(CheckoutError::InvalidQuantity);
            }
            let product = self
                .db
                .fetch_product(&line.product_id)
                .await?
                .ok_or_else(|| CheckoutError::ProductNotFound(line.product_id.clone()))?;
            match &seller_id {
                None => seller_id = Some(product.seller_id.clone()),
                Some(sid) if *sid != product.seller_id => return Err(CheckoutError::MultiSellerCart),
                Some(_) => {},
            }
            let available = self
                .db
                .fetch_product_stock(&line.product_id, &line.color)
                .await?
                .map(|s| s.quantity)
                .unwrap_or(0);
            if available < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    color: line.color.clone(),
                    requested: line.quantity,
                    available,
                });
            }
            let item = NewOrderItem {
                product_id: line.product_id.clone(),
                color: line.color.clone(),
                quantity: line.quantity,
                unit_price: product.unit_price,
            };
            calculated_total = calculated_total + item.line_total();
            items.push(item);
        }
        if !calculated_total.is_within_tolerance(declared_total) {
            return Err(CheckoutError::PriceMismatch { declared: declared_total, calculated: calculated_total });
        }
        let seller_id = seller_id.ok_or(CheckoutError::EmptyCart)?;
        trace!("🔄️🛒️ Cart validated: {} line(s), total {calculated_total} for seller {seller_id}", items.len());
        Ok(ValidatedCart { seller_id, items, calculated_total })
    }

    /// Run the full checkout sequence: validate → reserve → create order → initiate payment.
    ///
    /// On a successful initiation, the provider's correlation id is attached to the order (moving
    /// it to `AwaitingPayment`) and returned to the caller. If initiation fails or times out, the
    /// order is deleted and the reservation released before the gateway error is surfaced, so the
    /// sequence never leaves a reservation without an order nor an order without a reservation.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutResult, CheckoutError> {
        let cart = self.validate_cart(&request.lines, request.declared_total).await?;
        let reservation_id = self.db.reserve_stock(&cart.items).await?;
        debug!("🔄️🛒️ Reserved stock under {reservation_id} for buyer {}", request.buyer_id);
        // Every failure past this point must compensate before returning.
        let new_order = NewOrder::new(
            request.buyer_id,
            cart.seller_id,
            cart.calculated_total,
            request.delivery_address,
            reservation_id.clone(),
            cart.items,
        );
        let order = match self.db.insert_order(new_order).await {
            Ok(order) => order,
            Err(e) => {
                self.release_quietly(&reservation_id).await;
                return Err(e);
            },
        };
        debug!("🔄️🛒️ Order {} created; requesting {} from {}", order.order_id, order.total_price, self.gateway.provider());
        let initiation = match tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.initiate(&request.phone_number, order.total_price, &order.order_id),
        )
        .await
        {
            Ok(Ok(initiation)) => initiation,
            Ok(Err(e)) => {
                warn!("🔄️🛒️ Payment initiation for order {} failed: {e}. Rolling back", order.order_id);
                self.rollback_checkout(&order.order_id, &reservation_id).await;
                return Err(e.into());
            },
            Err(_) => {
                let secs = self.gateway_timeout.as_secs();
                warn!("🔄️🛒️ Payment initiation for order {} timed out after {secs}s. Rolling back", order.order_id);
                self.rollback_checkout(&order.order_id, &reservation_id).await;
                return Err(GatewayError::Timeout(secs).into());
            },
        };
        let attempt = NewPaymentAttempt::new(
            order.order_id.clone(),
            initiation.correlation_id.clone(),
            order.total_price,
            initiation.provider,
        );
        let order = match self.db.attach_correlation_id(&order.order_id, attempt).await {
            Ok(order) => order,
            Err(e) => {
                // The provider has accepted the request, so deleting the order now would orphan
                // the payment. Leave the order and reservation for manual intervention.
                error!(
                    "🔄️🛒️ Payment {} was initiated for order {} but the correlation id could not be stored: {e}. \
                     The order requires manual reconciliation.",
                    initiation.correlation_id, order.order_id
                );
                return Err(e);
            },
        };
        info!(
            "🔄️🛒️ Checkout complete for order {}. Awaiting payment under reference {}",
            order.order_id, initiation.correlation_id
        );
        Ok(CheckoutResult { order_id: order.order_id, correlation_id: initiation.correlation_id })
    }

    /// Apply a provider result to the order it correlates with.
    ///
    /// This is the single funnel for both the push-callback and pull-poll reconciliation paths.
    /// The terminal transition is conditional on the order still being `AwaitingPayment`, so of
    /// two racing results exactly one effects the transition; the loser observes the terminal
    /// state and is reported as [`ReconciliationOutcome::AlreadySettled`].
    pub async fn apply_payment_result(&self, result: PaymentResult) -> Result<ReconciliationOutcome, CheckoutError> {
        let order = self
            .db
            .fetch_order_by_correlation_id(&result.correlation_id)
            .await?
            .ok_or_else(|| CheckoutError::CorrelationIdNotFound(result.correlation_id.clone()))?;
        if order.status.is_terminal() {
            info!(
                "🔄️💰️ Result for reference {} arrived after order {} reached {}. Duplicate ignored",
                result.correlation_id, order.order_id, order.status
            );
            return Ok(ReconciliationOutcome::AlreadySettled(order));
        }
        match result.status {
            ProviderPaymentStatus::Pending => {
                trace!("🔄️💰️ Provider still pending on reference {}", result.correlation_id);
                Ok(ReconciliationOutcome::Pending(order))
            },
            ProviderPaymentStatus::Completed => {
                let tx_id = result.transaction_id.clone().unwrap_or_else(|| result.correlation_id.clone());
                match self.db.complete_order(&order.order_id, &tx_id).await? {
                    Some(updated) => {
                        info!(
                            "🔄️💰️ Order {} completed. Provider transaction {tx_id}. Inventory decrement committed",
                            updated.order_id
                        );
                        self.call_order_completed_hook(&updated, &tx_id).await;
                        Ok(ReconciliationOutcome::Completed(updated))
                    },
                    None => self.resolve_lost_race(&order.order_id, &result.correlation_id).await,
                }
            },
            ProviderPaymentStatus::Failed => {
                let reason = result.reason.clone().unwrap_or_else(|| "Payment failed at provider".to_string());
                match self.db.fail_order(&order.order_id, &reason).await? {
                    Some(updated) => {
                        info!(
                            "🔄️💰️ Order {} failed ({reason}). Reserved stock restored to the ledger",
                            updated.order_id
                        );
                        self.call_order_failed_hook(&updated, &reason).await;
                        Ok(ReconciliationOutcome::Failed(updated))
                    },
                    None => self.resolve_lost_race(&order.order_id, &result.correlation_id).await,
                }
            },
        }
    }

    /// The pull-poll reconciliation path. Equivalent in effect to receiving a push callback: the
    /// provider is polled and the result goes through [`Self::apply_payment_result`].
    ///
    /// The supplied correlation id must match the one stored on the order, otherwise the query is
    /// rejected as stale — a client cannot use an old correlation id to probe a newer attempt.
    pub async fn poll_and_reconcile(
        &self,
        order_id: &OrderId,
        correlation_id: &str,
    ) -> Result<ReconciliationOutcome, CheckoutError> {
        let order =
            self.db.fetch_order_by_id(order_id).await?.ok_or_else(|| CheckoutError::OrderNotFound(order_id.clone()))?;
        match order.correlation_id.as_deref() {
            Some(cid) if cid == correlation_id => {},
            _ => return Err(CheckoutError::StaleOrDuplicateCallback(correlation_id.to_string())),
        }
        if order.status.is_terminal() {
            return Ok(ReconciliationOutcome::AlreadySettled(order));
        }
        let result = match tokio::time::timeout(self.gateway_timeout, self.gateway.poll_status(correlation_id)).await {
            Ok(result) => result?,
            Err(_) => return Err(GatewayError::Timeout(self.gateway_timeout.as_secs()).into()),
        };
        self.apply_payment_result(result).await
    }

    /// Reconcile orders whose provider callback is presumed lost.
    ///
    /// Polling errors are retry-safe no-ops; the order stays `AwaitingPayment` and is picked up
    /// again on the next sweep. Returns the number of orders driven to a terminal state.
    pub async fn reconcile_stale_orders(&self, older_than: chrono::Duration) -> Result<usize, CheckoutError> {
        let stale = self.db.fetch_stale_awaiting_payment(older_than).await?;
        if stale.is_empty() {
            return Ok(0);
        }
        debug!("🔄️💰️ {} order(s) awaiting payment past the grace period", stale.len());
        let mut settled = 0;
        for order in stale {
            let Some(correlation_id) = order.correlation_id.clone() else {
                warn!("🔄️💰️ Order {} is AwaitingPayment without a correlation id. Skipping", order.order_id);
                continue;
            };
            match self.gateway.poll_status(&correlation_id).await {
                Ok(result) => match self.apply_payment_result(result).await {
                    Ok(outcome) if outcome.is_fresh_transition() => settled += 1,
                    Ok(_) => {},
                    Err(e) => warn!("🔄️💰️ Could not reconcile order {}: {e}", order.order_id),
                },
                Err(e) => {
                    warn!("🔄️💰️ Poll for reference {correlation_id} failed: {e}. Will retry on the next sweep");
                },
            }
        }
        Ok(settled)
    }

    async fn resolve_lost_race(
        &self,
        order_id: &OrderId,
        correlation_id: &str,
    ) -> Result<ReconciliationOutcome, CheckoutError> {
        warn!("🔄️💰️ Result for reference {correlation_id} lost the transition race on order {order_id}. Re-reading");
        let order =
            self.db.fetch_order_by_id(order_id).await?.ok_or_else(|| CheckoutError::OrderNotFound(order_id.clone()))?;
        if order.status.is_terminal() {
            Ok(ReconciliationOutcome::AlreadySettled(order))
        } else {
            Err(CheckoutError::StaleOrDuplicateCallback(correlation_id.to_string()))
        }
    }

    async fn rollback_checkout(&self, order_id: &OrderId, reservation_id: &ReservationId) {
        if let Err(e) = self.db.delete_new_order(order_id).await {
            error!("🔄️🛒️ Compensation failure: could not delete order {order_id}. {e}");
        }
        self.release_quietly(reservation_id).await;
    }

    async fn release_quietly(&self, reservation_id: &ReservationId) {
        match self.db.release_reservation(reservation_id).await {
            Ok(true) => debug!("🔄️🛒️ Reservation {reservation_id} released; stock restored"),
            Ok(false) => debug!("🔄️🛒️ Reservation {reservation_id} was already released. No-op"),
            Err(e) => error!("🔄️🛒️ Compensation failure: could not release reservation {reservation_id}. {e}"),
        }
    }

    async fn call_order_completed_hook(&self, order: &Order, tx_id: &str) {
        for emitter in &self.producers.order_completed_producer {
            debug!("🔄️📦️ Notifying order completed hook subscribers");
            let event = OrderCompletedEvent::new(order.clone(), tx_id.to_string());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_failed_hook(&self, order: &Order, reason: &str) {
        for emitter in &self.producers.order_failed_producer {
            debug!("🔄️📦️ Notifying order failed hook subscribers");
            let event = OrderFailedEvent::new(order.clone(), reason.to_string());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

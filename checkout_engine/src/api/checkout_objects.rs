use serde::{Deserialize, Serialize};
use spg_common::Money;

use crate::db_types::{CartLine, NewOrderItem, Order, OrderId};

/// An engine-level checkout request. The HTTP layer has already authenticated the buyer and
/// converted the declared total to minor units by the time this is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub buyer_id: String,
    /// The mobile-money account that will be asked to approve the payment.
    pub phone_number: String,
    pub delivery_address: String,
    /// The total the client believes it is paying. Compared against the calculated total within
    /// one minor unit.
    pub declared_total: Money,
    pub lines: Vec<CartLine>,
}

/// A cart that survived validation: priced from the current catalog, stock-checked, and
/// confirmed to belong to a single seller. Building one has no side effects on inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCart {
    pub seller_id: String,
    pub items: Vec<NewOrderItem>,
    pub calculated_total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order_id: OrderId,
    pub correlation_id: String,
}

/// What applying a provider result did to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReconciliationOutcome {
    /// The result drove the order to `Completed`.
    Completed(Order),
    /// The result drove the order to `Failed`; the reservation has been released.
    Failed(Order),
    /// The order was already terminal. Nothing was re-applied; the current state is returned.
    AlreadySettled(Order),
    /// The provider has not reached a verdict yet. The order remains `AwaitingPayment`.
    Pending(Order),
}

impl ReconciliationOutcome {
    pub fn order(&self) -> &Order {
        match self {
            ReconciliationOutcome::Completed(o)
            | ReconciliationOutcome::Failed(o)
            | ReconciliationOutcome::AlreadySettled(o)
            | ReconciliationOutcome::Pending(o) => o,
        }
    }

    /// True if this call is the one that effected a terminal transition.
    pub fn is_fresh_transition(&self) -> bool {
        matches!(self, ReconciliationOutcome::Completed(_) | ReconciliationOutcome::Failed(_))
    }
}

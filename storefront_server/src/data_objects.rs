use std::fmt::Display;

use checkout_engine::{
    checkout_objects::ReconciliationOutcome,
    db_types::{CartLine, Order, OrderStatusType},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The wire shape of a checkout request. Amounts cross the wire in decimal currency units and
/// are converted to minor units exactly once, at this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutOrderRequest {
    pub buyer_id: String,
    pub phone_number: String,
    pub delivery_address: String,
    pub declared_total: f64,
    pub items: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub order: Order,
}

impl From<ReconciliationOutcome> for PaymentStatusResponse {
    fn from(outcome: ReconciliationOutcome) -> Self {
        let order = outcome.order().clone();
        let status = match order.status {
            OrderStatusType::Completed => "completed",
            OrderStatusType::Failed => "failed",
            OrderStatusType::New | OrderStatusType::AwaitingPayment => "pending",
        }
        .to_string();
        let reason = order.failure_reason.clone();
        Self { status, reason, order }
    }
}

use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Fired when a provider result drives an order to `Completed`. Notification delivery (buyer
/// receipt, seller alert) hooks in here without coupling to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order: Order,
    pub provider_tx_id: String,
}

impl OrderCompletedEvent {
    pub fn new(order: Order, provider_tx_id: String) -> Self {
        Self { order, provider_tx_id }
    }
}

/// Fired when a provider result drives an order to `Failed`. The reservation has already been
/// released by the time subscribers see this event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFailedEvent {
    pub order: Order,
    pub reason: String,
}

impl OrderFailedEvent {
    pub fn new(order: Order, reason: String) -> Self {
        Self { order, reason }
    }
}

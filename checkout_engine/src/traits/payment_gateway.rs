use serde::{Deserialize, Serialize};
use spg_common::Money;
use thiserror::Error;

use crate::db_types::{OrderId, PaymentProvider};

/// The verdict a provider reports for a payment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderPaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// A provider result, normalized from either a push callback payload or a poll response.
///
/// Both reconciliation entry points produce this shape before any order state is touched, so the
/// transition guard is defined exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub correlation_id: String,
    pub status: ProviderPaymentStatus,
    pub transaction_id: Option<String>,
    pub reason: Option<String>,
    /// The provider payload as received, retained for the audit log.
    pub raw: serde_json::Value,
}

impl PaymentResult {
    pub fn pending(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            status: ProviderPaymentStatus::Pending,
            transaction_id: None,
            reason: None,
            raw: serde_json::Value::Null,
        }
    }
}

/// The provider's acknowledgement of a freshly initiated payment request.
#[derive(Debug, Clone)]
pub struct PaymentInitiation {
    /// Opaque identifier the provider will echo back in callbacks and poll responses.
    pub correlation_id: String,
    pub provider: PaymentProvider,
}

/// Contract for mobile-money provider clients.
///
/// Implementations never mutate orders; they return provider facts and leave state transitions to
/// the reconciliation logic.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    fn provider(&self) -> PaymentProvider;

    /// Ask the provider to request payment of `amount` from `phone_number` for the given order.
    /// A successful return means the provider accepted the request, not that payment happened.
    async fn initiate(
        &self,
        phone_number: &str,
        amount: Money,
        order_id: &OrderId,
    ) -> Result<PaymentInitiation, GatewayError>;

    /// Ask the provider for the current status of a previously initiated request.
    async fn poll_status(&self, correlation_id: &str) -> Result<PaymentResult, GatewayError>;
}

/// Provider-side failures, split so callers can choose retry vs terminal-fail semantics.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not initialize the gateway client. {0}")]
    Initialization(String),
    #[error("Could not reach the payment provider. {0}")]
    Network(String),
    #[error("The payment provider rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("The payment provider has no record of {0}")]
    NotFound(String),
    #[error("Could not authenticate with the payment provider. {0}")]
    Auth(String),
    #[error("Could not parse the provider response. {0}")]
    Json(String),
    #[error("The payment provider did not respond within {0}s")]
    Timeout(u64),
}

//! Glue between the provider client crate and the engine's gateway contract.
//!
//! [`MomoApi`] only speaks provider shapes; this adapter translates them into the engine's
//! [`PaymentGateway`] vocabulary so the orchestrator never sees provider-specific types.
use checkout_engine::{
    db_types::{OrderId, PaymentProvider},
    traits::{GatewayError, PaymentGateway, PaymentInitiation, PaymentResult, ProviderPaymentStatus},
};
use momo_gateway::{MomoApi, MomoApiError, ProviderUpdate, ProviderUpdateStatus};
use spg_common::Money;

#[derive(Clone)]
pub struct MomoGateway {
    api: MomoApi,
}

impl MomoGateway {
    pub fn new(api: MomoApi) -> Self {
        Self { api }
    }
}

impl PaymentGateway for MomoGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Mpesa
    }

    async fn initiate(
        &self,
        phone_number: &str,
        amount: Money,
        order_id: &OrderId,
    ) -> Result<PaymentInitiation, GatewayError> {
        let response = self
            .api
            .initiate_stk_push(phone_number, amount, order_id.as_str())
            .await
            .map_err(to_gateway_error)?;
        Ok(PaymentInitiation { correlation_id: response.checkout_request_id, provider: PaymentProvider::Mpesa })
    }

    async fn poll_status(&self, correlation_id: &str) -> Result<PaymentResult, GatewayError> {
        let update = self.api.query_payment_status(correlation_id).await.map_err(to_gateway_error)?;
        Ok(payment_result_from(update))
    }
}

pub fn payment_result_from(update: ProviderUpdate) -> PaymentResult {
    let status = match update.status {
        ProviderUpdateStatus::Pending => ProviderPaymentStatus::Pending,
        ProviderUpdateStatus::Completed => ProviderPaymentStatus::Completed,
        ProviderUpdateStatus::Failed => ProviderPaymentStatus::Failed,
    };
    PaymentResult {
        correlation_id: update.correlation_id,
        status,
        transaction_id: update.transaction_id,
        reason: update.reason,
        raw: update.raw,
    }
}

fn to_gateway_error(e: MomoApiError) -> GatewayError {
    match e {
        MomoApiError::Initialization(m) => GatewayError::Initialization(m),
        MomoApiError::NetworkError(m) => GatewayError::Network(m),
        MomoApiError::AuthenticationError(m) => GatewayError::Auth(m),
        MomoApiError::QueryError { status, message } => GatewayError::Api { status, message },
        MomoApiError::NotFound(reference) => GatewayError::NotFound(reference),
        MomoApiError::JsonError(m) => GatewayError::Json(m),
        MomoApiError::InvalidPhoneNumber(m) => GatewayError::Api { status: 400, message: format!("Invalid phone number: {m}") },
        MomoApiError::InvalidCallback(m) => GatewayError::Json(m),
    }
}

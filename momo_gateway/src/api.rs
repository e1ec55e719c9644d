use std::sync::Arc;

use chrono::Utc;
use log::*;
use reqwest::Client;
use serde::Serialize;
use spg_common::Money;
use tokio::sync::RwLock;

use crate::{
    auth::CachedToken,
    config::MomoConfig,
    data_objects::{
        ProviderErrorResponse,
        ProviderUpdate,
        ProviderUpdateStatus,
        StkPushRequest,
        StkPushResponse,
        StkQueryRequest,
        StkQueryResponse,
    },
    helpers::{normalize_phone_number, provider_amount, stk_password, stk_timestamp},
    MomoApiError,
};

/// Provider error code meaning "the transaction is still being processed" — a pending verdict,
/// not a failure.
const PROCESSING_ERROR_CODE: &str = "500.001.1001";

#[derive(Clone)]
pub struct MomoApi {
    config: MomoConfig,
    client: Arc<Client>,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl MomoApi {
    pub fn new(config: MomoConfig) -> Result<Self, MomoApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| MomoApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), token: Arc::new(RwLock::new(None)) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    pub(crate) fn config(&self) -> &MomoConfig {
        &self.config
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn token_cache(&self) -> &RwLock<Option<CachedToken>> {
        &self.token
    }

    async fn authorized_post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, MomoApiError> {
        let token = self.access_token().await?;
        trace!("💳️ Sending POST {path}");
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| MomoApiError::NetworkError(e.to_string()))
    }

    /// Ask the provider to push a payment approval prompt to the subscriber's handset.
    ///
    /// The returned `CheckoutRequestID` is the correlation id that callbacks and status queries
    /// will reference.
    pub async fn initiate_stk_push(
        &self,
        phone_number: &str,
        amount: Money,
        account_reference: &str,
    ) -> Result<StkPushResponse, MomoApiError> {
        let phone = normalize_phone_number(phone_number)?;
        let timestamp = stk_timestamp(Utc::now());
        let password = stk_password(&self.config.shortcode, self.config.passkey.reveal(), &timestamp);
        let request = StkPushRequest {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount: provider_amount(amount),
            party_a: phone.clone(),
            party_b: self.config.shortcode.clone(),
            phone_number: phone,
            call_back_url: self.config.callback_url.clone(),
            account_reference: account_reference.to_string(),
            transaction_desc: format!("Order {account_reference}"),
        };
        debug!("💳️ Initiating STK push of {amount} for {account_reference}");
        let response = self.authorized_post("/mpesa/stkpush/v1/processrequest", &request).await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|e| e.to_string());
            warn!("💳️ STK push for {account_reference} rejected ({status}): {message}");
            return Err(MomoApiError::QueryError { status: status.as_u16(), message });
        }
        let result: StkPushResponse = response.json().await.map_err(|e| MomoApiError::JsonError(e.to_string()))?;
        if result.response_code != "0" {
            return Err(MomoApiError::QueryError {
                status: status.as_u16(),
                message: format!("{}: {}", result.response_code, result.response_description),
            });
        }
        info!("💳️ STK push accepted for {account_reference}. Reference: {}", result.checkout_request_id);
        Ok(result)
    }

    /// Query the provider for the current verdict on a previously initiated request.
    ///
    /// A "still being processed" rejection is reported as a pending update rather than an error;
    /// an unknown reference maps to [`MomoApiError::NotFound`].
    pub async fn query_payment_status(&self, checkout_request_id: &str) -> Result<ProviderUpdate, MomoApiError> {
        let timestamp = stk_timestamp(Utc::now());
        let password = stk_password(&self.config.shortcode, self.config.passkey.reveal(), &timestamp);
        let request = StkQueryRequest {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            checkout_request_id: checkout_request_id.to_string(),
        };
        trace!("💳️ Querying status of {checkout_request_id}");
        let response = self.authorized_post("/mpesa/stkpushquery/v1/query", &request).await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|e| e.to_string());
            if let Ok(err) = serde_json::from_str::<ProviderErrorResponse>(&message) {
                if err.error_code.as_deref() == Some(PROCESSING_ERROR_CODE) {
                    trace!("💳️ {checkout_request_id} is still being processed");
                    return Ok(ProviderUpdate {
                        correlation_id: checkout_request_id.to_string(),
                        status: ProviderUpdateStatus::Pending,
                        transaction_id: None,
                        reason: None,
                        raw: serde_json::from_str(&message).unwrap_or(serde_json::Value::Null),
                    });
                }
                if err.error_message.as_deref().is_some_and(|m| m.contains("Invalid CheckoutRequestID")) {
                    return Err(MomoApiError::NotFound(checkout_request_id.to_string()));
                }
            }
            if status.as_u16() == 404 {
                return Err(MomoApiError::NotFound(checkout_request_id.to_string()));
            }
            warn!("💳️ Status query for {checkout_request_id} rejected ({status}): {message}");
            return Err(MomoApiError::QueryError { status: status.as_u16(), message });
        }
        let raw: serde_json::Value = response.json().await.map_err(|e| MomoApiError::JsonError(e.to_string()))?;
        let result: StkQueryResponse =
            serde_json::from_value(raw.clone()).map_err(|e| MomoApiError::JsonError(e.to_string()))?;
        let update = match result.result_code() {
            Some(0) => ProviderUpdate {
                correlation_id: result.checkout_request_id,
                status: ProviderUpdateStatus::Completed,
                transaction_id: None,
                reason: None,
                raw,
            },
            Some(_) => ProviderUpdate {
                reason: result.result_desc.clone(),
                correlation_id: result.checkout_request_id,
                status: ProviderUpdateStatus::Failed,
                transaction_id: None,
                raw,
            },
            None => {
                return Err(MomoApiError::JsonError(format!(
                    "Provider returned an unparseable ResultCode: {}",
                    result.result_code
                )))
            },
        };
        debug!("💳️ Status of {}: {:?}", update.correlation_id, update.status);
        Ok(update)
    }
}

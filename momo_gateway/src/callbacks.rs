//! Provider callback payloads.
//!
//! Each provider posts its own envelope shape. Both are validated at the HTTP boundary and
//! translated into the normalized [`ProviderUpdate`] before any reconciliation logic runs, so
//! the engine never sees provider-specific JSON.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    data_objects::{ProviderUpdate, ProviderUpdateStatus},
    MomoApiError,
};

//--------------------------------------   M-Pesa callback   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpesaCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: MpesaCallbackBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpesaCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata", default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item")]
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: Option<Value>,
}

impl StkCallback {
    fn metadata_value(&self, name: &str) -> Option<&Value> {
        self.callback_metadata
            .as_ref()
            .and_then(|m| m.items.iter().find(|i| i.name == name))
            .and_then(|i| i.value.as_ref())
    }

    /// The provider receipt number, e.g. "NLJ7RT61SV". Only present on successful payments.
    pub fn receipt_number(&self) -> Option<String> {
        self.metadata_value("MpesaReceiptNumber").and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }
}

impl MpesaCallbackEnvelope {
    pub fn into_update(self) -> ProviderUpdate {
        let raw = serde_json::to_value(&self).unwrap_or(Value::Null);
        let cb = self.body.stk_callback;
        // ResultCode 0 is the only success; everything else (1032 cancelled, 1037 timeout, ...)
        // is terminal failure. Callbacks never report pending.
        if cb.result_code == 0 {
            ProviderUpdate {
                transaction_id: cb.receipt_number(),
                correlation_id: cb.checkout_request_id,
                status: ProviderUpdateStatus::Completed,
                reason: None,
                raw,
            }
        } else {
            ProviderUpdate {
                correlation_id: cb.checkout_request_id,
                status: ProviderUpdateStatus::Failed,
                transaction_id: None,
                reason: Some(cb.result_desc),
                raw,
            }
        }
    }
}

//--------------------------------------   MTN MoMo callback   -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MtnCallback {
    /// The request-to-pay reference. Some deployments echo it in the body, others only in the
    /// `X-Reference-Id` header; `external_id` is the fallback.
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub financial_transaction_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub reason: Option<MtnReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MtnReason {
    Code(String),
    Detailed { code: Option<String>, message: Option<String> },
}

impl MtnReason {
    fn message(&self) -> String {
        match self {
            MtnReason::Code(code) => code.clone(),
            MtnReason::Detailed { code, message } => {
                message.clone().or_else(|| code.clone()).unwrap_or_else(|| "Unknown reason".to_string())
            },
        }
    }
}

impl MtnCallback {
    pub fn into_update(self) -> Result<ProviderUpdate, MomoApiError> {
        let raw = serde_json::to_value(&self).unwrap_or(Value::Null);
        let correlation_id = self
            .reference_id
            .clone()
            .or_else(|| self.external_id.clone())
            .ok_or_else(|| MomoApiError::InvalidCallback("MTN callback carries no reference id".to_string()))?;
        let status = match self.status.to_ascii_uppercase().as_str() {
            "SUCCESSFUL" => ProviderUpdateStatus::Completed,
            "PENDING" | "CREATED" => ProviderUpdateStatus::Pending,
            "FAILED" | "REJECTED" | "TIMEOUT" | "EXPIRED" => ProviderUpdateStatus::Failed,
            other => return Err(MomoApiError::InvalidCallback(format!("Unknown MTN status: {other}"))),
        };
        let reason = match status {
            ProviderUpdateStatus::Failed => {
                Some(self.reason.as_ref().map(MtnReason::message).unwrap_or_else(|| self.status.clone()))
            },
            _ => None,
        };
        Ok(ProviderUpdate {
            correlation_id,
            status,
            transaction_id: self.financial_transaction_id,
            reason,
            raw,
        })
    }
}

//--------------------------------------   Tagged dispatch   ---------------------------------------------------------
/// Either provider's callback payload. Deserialization tries the M-Pesa envelope first, since an
/// MTN body is a flat object that the M-Pesa shape can never match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderCallback {
    Mpesa(MpesaCallbackEnvelope),
    Mtn(MtnCallback),
}

impl ProviderCallback {
    pub fn into_update(self) -> Result<ProviderUpdate, MomoApiError> {
        match self {
            ProviderCallback::Mpesa(envelope) => Ok(envelope.into_update()),
            ProviderCallback::Mtn(callback) => callback.into_update(),
        }
    }
}

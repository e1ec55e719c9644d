//! Provider credential handling.
//!
//! The OAuth access token is a cached, lazily-refreshed credential. It is fetched on first use,
//! shared across all in-flight requests, and only reacquired when close to expiry — never per
//! call.
use chrono::{DateTime, Duration, Utc};
use log::*;
use spg_common::Secret;

use crate::{api::MomoApi, data_objects::AccessTokenResponse, MomoApiError};

/// Refresh the token this long before the provider would expire it.
const EXPIRY_MARGIN: Duration = Duration::seconds(60);

#[derive(Clone)]
pub(crate) struct CachedToken {
    token: Secret<String>,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at - Utc::now() > EXPIRY_MARGIN
    }
}

impl MomoApi {
    /// The current access token, refreshing it against the provider if absent or near expiry.
    pub(crate) async fn access_token(&self) -> Result<String, MomoApiError> {
        if let Some(cached) = self.token_cache().read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.token.reveal().clone());
            }
        }
        let mut guard = self.token_cache().write().await;
        // Another request may have refreshed while we waited for the write lock.
        if let Some(cached) = guard.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.token.reveal().clone());
            }
        }
        debug!("💳️ Provider access token absent or expiring. Requesting a fresh one");
        let credentials =
            base64::encode(format!("{}:{}", self.config().consumer_key, self.config().consumer_secret.reveal()));
        let url = self.url("/oauth/v1/generate?grant_type=client_credentials");
        let response = self
            .client()
            .get(url)
            .header("Authorization", format!("Basic {credentials}"))
            .send()
            .await
            .map_err(|e| MomoApiError::NetworkError(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|e| e.to_string());
            warn!("💳️ Token request was rejected ({status}): {message}");
            return Err(MomoApiError::AuthenticationError(format!("{status}: {message}")));
        }
        let token: AccessTokenResponse = response.json().await.map_err(|e| MomoApiError::JsonError(e.to_string()))?;
        let expires_in = token.expires_in.parse::<i64>().unwrap_or_else(|_| {
            warn!("💳️ Provider returned a non-numeric expires_in ({}). Assuming an hour", token.expires_in);
            3600
        });
        *guard = Some(CachedToken {
            token: Secret::new(token.access_token.clone()),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        });
        trace!("💳️ Access token refreshed; valid for {expires_in}s");
        Ok(token.access_token)
    }
}

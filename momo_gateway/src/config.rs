use log::*;
use spg_common::Secret;

#[derive(Debug, Clone, Default)]
pub struct MomoConfig {
    /// Base URL for the provider API, e.g. "https://sandbox.safaricom.co.ke"
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: Secret<String>,
    /// The business shortcode (paybill/till number) payments are collected into.
    pub shortcode: String,
    /// The Lipa-na-M-Pesa passkey used to derive the STK push password.
    pub passkey: Secret<String>,
    /// Where the provider posts asynchronous payment results.
    pub callback_url: String,
}

impl MomoConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("SPG_MOMO_BASE_URL").unwrap_or_else(|_| {
            warn!("SPG_MOMO_BASE_URL not set, using the sandbox as default");
            "https://sandbox.safaricom.co.ke".to_string()
        });
        let consumer_key = std::env::var("SPG_MOMO_CONSUMER_KEY").unwrap_or_else(|_| {
            warn!("SPG_MOMO_CONSUMER_KEY not set, using (probably useless) default");
            "0000000000000000".to_string()
        });
        let consumer_secret = Secret::new(std::env::var("SPG_MOMO_CONSUMER_SECRET").unwrap_or_else(|_| {
            warn!("SPG_MOMO_CONSUMER_SECRET not set, using (probably useless) default");
            "0000000000000000".to_string()
        }));
        let shortcode = std::env::var("SPG_MOMO_SHORTCODE").unwrap_or_else(|_| {
            warn!("SPG_MOMO_SHORTCODE not set, using the sandbox shortcode as default");
            "174379".to_string()
        });
        let passkey = Secret::new(std::env::var("SPG_MOMO_PASSKEY").unwrap_or_else(|_| {
            warn!("SPG_MOMO_PASSKEY not set, using (probably useless) default");
            "00000000000000000000".to_string()
        }));
        let callback_url = std::env::var("SPG_MOMO_CALLBACK_URL").unwrap_or_else(|_| {
            warn!("SPG_MOMO_CALLBACK_URL not set, the provider will not be able to deliver results");
            "https://localhost/callback/mpesa".to_string()
        });
        Self { base_url, consumer_key, consumer_secret, shortcode, passkey, callback_url }
    }
}

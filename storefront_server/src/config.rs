use std::{env, time::Duration};

use log::*;
use momo_gateway::MomoConfig;
use spg_common::parse_boolean_flag;

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8410;
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_POLL_GRACE_SECS: i64 = 120;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Upper bound on any single call to the payment provider. A checkout whose initiation
    /// exceeds this is treated as failed and compensated.
    pub gateway_timeout: Duration,
    /// How often the reconciliation worker sweeps for orders with lost callbacks.
    pub poll_interval: Duration,
    /// How long an order may sit in `AwaitingPayment` before the worker polls the provider
    /// for it.
    pub poll_grace: chrono::Duration,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// Mobile-money provider configuration.
    pub momo_config: MomoConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: String::default(),
            gateway_timeout: Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            poll_grace: chrono::Duration::seconds(DEFAULT_POLL_GRACE_SECS),
            use_x_forwarded_for: false,
            momo_config: MomoConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SPG_DATABASE_URL is not set. Please set it to the URL for the SPG database.");
            String::default()
        });
        let gateway_timeout = Duration::from_secs(env_u64("SPG_GATEWAY_TIMEOUT_SECS", DEFAULT_GATEWAY_TIMEOUT_SECS));
        let poll_interval = Duration::from_secs(env_u64("SPG_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS));
        let poll_grace = chrono::Duration::seconds(env_u64("SPG_POLL_GRACE_SECS", DEFAULT_POLL_GRACE_SECS as u64) as i64);
        let use_x_forwarded_for = parse_boolean_flag(env::var("SPG_USE_X_FORWARDED_FOR").ok(), false);
        let momo_config = MomoConfig::new_from_env_or_default();
        Self { host, port, database_url, gateway_timeout, poll_interval, poll_grace, use_x_forwarded_for, momo_config }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers need. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the
/// system.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {default}."))
        .and_then(|s| s.parse::<u64>().map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}")))
        .ok()
        .unwrap_or(default)
}

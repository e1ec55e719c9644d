mod api;
mod auth;
mod callbacks;
mod config;
mod error;

mod data_objects;

pub mod helpers;

pub use api::MomoApi;
pub use callbacks::{MpesaCallbackEnvelope, MtnCallback, ProviderCallback};
pub use config::MomoConfig;
pub use data_objects::{ProviderUpdate, ProviderUpdateStatus, StkPushResponse};
pub use error::MomoApiError;

//! # Storefront payment gateway server
//!
//! This crate hosts the HTTP shell around the checkout engine. It is responsible for:
//! * Accepting checkout requests from authenticated buyers and running the orchestration flow.
//! * Receiving asynchronous payment result callbacks from the mobile-money providers.
//! * Answering payment status queries from clients, polling the provider where necessary.
//! * Running the background worker that reconciles orders whose callbacks were lost.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Routes
//! * `GET  /health`: liveness check, returns 200 OK.
//! * `POST /checkout`: run the checkout sequence; returns `{order_id, correlation_id}`.
//! * `POST /callback/mpesa`, `POST /callback/mtn`: provider result webhooks. Always answer 200.
//! * `GET  /payment_status/{order_id}/{correlation_id}`: poll-based reconciliation.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod poll_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;

//! Behaviour contracts for checkout engine backends.
//!
//! [`CheckoutGatewayDatabase`] is the persistence contract: any store that can atomically reserve
//! stock, persist orders, and perform conditional status transitions can back the engine.
//! [`PaymentGateway`] is the mobile-money provider contract: initiate a payment request and poll
//! its status. Concrete provider clients live outside the engine and only report provider facts.
mod checkout_database;
mod payment_gateway;

pub use checkout_database::{CheckoutError, CheckoutGatewayDatabase};
pub use payment_gateway::{GatewayError, PaymentGateway, PaymentInitiation, PaymentResult, ProviderPaymentStatus};

//! Checkout Engine
//!
//! The checkout engine is the core of the storefront payment gateway. It validates carts,
//! reserves inventory, creates orders, drives mobile-money payment requests, and reconciles each
//! order's terminal state against asynchronous provider results that may arrive late, never, or
//! out of order.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You
//!    should never need to access the database directly; use the public API instead. The
//!    exception is the data types used in the database, defined in [`mod@db_types`].
//! 2. The engine public API ([`mod@api`]). [`CheckoutApi`] composes the cart validator, the
//!    inventory ledger, the order store and a payment gateway client into the checkout use case
//!    and its compensating actions, and funnels both reconciliation paths (push callback, pull
//!    poll) through a single transition guard.
//! 3. The behaviour contracts ([`mod@traits`]) that a persistence backend and a provider client
//!    must implement.
//!
//! The engine also emits events when orders settle. A simple actor framework lets you hook into
//! these events (e.g. to send notifications) without coupling to the engine.
pub mod api;
pub mod db_types;
pub mod events;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use api::{checkout_objects, CheckoutApi};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

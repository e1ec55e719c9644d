use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use spg_common::{Money, DEFAULT_CURRENCY_CODE};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------      ProductId       --------------------------------------------------------
/// A lightweight wrapper around the catalog's product identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S: Into<String>> From<S> for ProductId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        OrderId       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate a fresh order id for a new checkout attempt.
    pub fn random() -> Self {
        Self(format!("ord-{:016x}", rand::random::<u64>()))
    }
}

//--------------------------------------    ReservationId     --------------------------------------------------------
/// Token identifying a provisional stock reservation. Opaque to callers; releasing an unknown
/// token is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ReservationId(pub String);

impl Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ReservationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl ReservationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn random() -> Self {
        Self(format!("rsv-{:016x}", rand::random::<u64>()))
    }
}

//--------------------------------------   OrderStatusType    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created, but no payment request has been sent to the provider yet.
    /// Orders only hold this status inside the checkout sequence.
    New,
    /// A payment request has been initiated and a correlation id attached. The order is waiting
    /// for the provider's verdict.
    AwaitingPayment,
    /// The provider confirmed the payment. Terminal.
    Completed,
    /// The provider rejected or cancelled the payment. Terminal.
    Failed,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Failed)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "New"),
            OrderStatusType::AwaitingPayment => write!(f, "AwaitingPayment"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(Self::New),
            "AwaitingPayment" => Ok(Self::AwaitingPayment),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to New");
            OrderStatusType::New
        })
    }
}

//--------------------------------------       Product        --------------------------------------------------------
/// Catalog projection of a product. Owned by the catalog service; the engine reads the price and
/// seller and never writes to this table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: String,
    pub name: String,
    pub unit_price: Money,
}

//--------------------------------------      StockLevel      --------------------------------------------------------
/// Per-product, per-color quantity counter. `quantity` never goes negative; decrements happen
/// only inside a successful reservation.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub color: String,
    pub quantity: i64,
}

//--------------------------------------       CartLine       --------------------------------------------------------
/// A single client-submitted cart entry, before validation and pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub color: String,
    pub quantity: i64,
}

//--------------------------------------      OrderItem       --------------------------------------------------------
/// A priced order line. `unit_price` is snapshotted from the catalog at order creation and is
/// never recomputed from the current catalog price.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub color: String,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub color: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl NewOrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------        Order         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    pub total_price: Money,
    pub delivery_address: String,
    pub status: OrderStatusType,
    /// Set exactly once, when the payment request is initiated. A stale callback carrying any
    /// other id can never attach to this order.
    pub correlation_id: Option<String>,
    pub provider_tx_id: Option<String>,
    pub failure_reason: Option<String>,
    pub reservation_id: ReservationId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder       --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    pub total_price: Money,
    pub delivery_address: String,
    pub reservation_id: ReservationId,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new(
        buyer_id: String,
        seller_id: String,
        total_price: Money,
        delivery_address: String,
        reservation_id: ReservationId,
        items: Vec<NewOrderItem>,
    ) -> Self {
        Self { order_id: OrderId::random(), buyer_id, seller_id, total_price, delivery_address, reservation_id, items }
    }
}

//--------------------------------------   PaymentProvider    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentProvider {
    Mpesa,
    MtnMomo,
}

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProvider::Mpesa => write!(f, "Mpesa"),
            PaymentProvider::MtnMomo => write!(f, "MtnMomo"),
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mpesa" => Ok(Self::Mpesa),
            "mtn" | "mtnmomo" | "mtn_momo" => Ok(Self::MtnMomo),
            s => Err(ConversionError(format!("Invalid payment provider: {s}"))),
        }
    }
}

impl From<String> for PaymentProvider {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment provider: {value}. But this conversion cannot fail. Defaulting to Mpesa");
            PaymentProvider::Mpesa
        })
    }
}

//------------------------------------- PaymentAttemptStatus --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentAttemptStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for PaymentAttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentAttemptStatus::Pending => write!(f, "Pending"),
            PaymentAttemptStatus::Completed => write!(f, "Completed"),
            PaymentAttemptStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl From<String> for PaymentAttemptStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pending" => Self::Pending,
            "Completed" => Self::Completed,
            "Failed" => Self::Failed,
            _ => {
                error!("Invalid payment attempt status: {value}. Defaulting to Pending");
                Self::Pending
            },
        }
    }
}

//--------------------------------------   PaymentAttempt     --------------------------------------------------------
/// Record of a payment request accepted by the provider. Exists only after a successful
/// initiation; amount and provider are immutable thereafter.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub id: i64,
    pub order_id: OrderId,
    pub correlation_id: String,
    pub amount: Money,
    pub currency: String,
    pub provider: PaymentProvider,
    pub status: PaymentAttemptStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentAttempt {
    pub order_id: OrderId,
    pub correlation_id: String,
    pub amount: Money,
    pub currency: String,
    pub provider: PaymentProvider,
}

impl NewPaymentAttempt {
    pub fn new(order_id: OrderId, correlation_id: String, amount: Money, provider: PaymentProvider) -> Self {
        Self { order_id, correlation_id, amount, currency: DEFAULT_CURRENCY_CODE.to_string(), provider }
    }
}

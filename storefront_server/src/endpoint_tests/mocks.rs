use checkout_engine::{
    db_types::{
        NewOrder,
        NewOrderItem,
        NewPaymentAttempt,
        Order,
        OrderId,
        OrderItem,
        PaymentAttempt,
        PaymentProvider,
        Product,
        ProductId,
        ReservationId,
        StockLevel,
    },
    traits::{CheckoutError, CheckoutGatewayDatabase, GatewayError, PaymentGateway, PaymentInitiation, PaymentResult},
};
use mockall::mock;
use spg_common::Money;

mock! {
    pub CheckoutManager {}
    impl Clone for CheckoutManager {
        fn clone(&self) -> Self;
    }
    impl CheckoutGatewayDatabase for CheckoutManager {
        fn url(&self) -> &str;
        async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, CheckoutError>;
        async fn fetch_product_stock(&self, product_id: &ProductId, color: &str) -> Result<Option<StockLevel>, CheckoutError>;
        async fn reserve_stock(&self, lines: &[NewOrderItem]) -> Result<ReservationId, CheckoutError>;
        async fn release_reservation(&self, id: &ReservationId) -> Result<bool, CheckoutError>;
        async fn commit_reservation(&self, id: &ReservationId) -> Result<bool, CheckoutError>;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, CheckoutError>;
        async fn delete_new_order(&self, order_id: &OrderId) -> Result<(), CheckoutError>;
        async fn attach_correlation_id(&self, order_id: &OrderId, attempt: NewPaymentAttempt) -> Result<Order, CheckoutError>;
        async fn fetch_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, CheckoutError>;
        async fn fetch_order_by_correlation_id(&self, correlation_id: &str) -> Result<Option<Order>, CheckoutError>;
        async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, CheckoutError>;
        async fn fetch_payment_attempt(&self, correlation_id: &str) -> Result<Option<PaymentAttempt>, CheckoutError>;
        async fn complete_order(&self, order_id: &OrderId, provider_tx_id: &str) -> Result<Option<Order>, CheckoutError>;
        async fn fail_order(&self, order_id: &OrderId, reason: &str) -> Result<Option<Order>, CheckoutError>;
        async fn fetch_stale_awaiting_payment(&self, older_than: chrono::Duration) -> Result<Vec<Order>, CheckoutError>;
    }
}

mock! {
    pub Gateway {}
    impl Clone for Gateway {
        fn clone(&self) -> Self;
    }
    impl PaymentGateway for Gateway {
        fn provider(&self) -> PaymentProvider;
        async fn initiate(&self, phone_number: &str, amount: Money, order_id: &OrderId) -> Result<PaymentInitiation, GatewayError>;
        async fn poll_status(&self, correlation_id: &str) -> Result<PaymentResult, GatewayError>;
    }
}

use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentAttempt, PaymentAttempt, PaymentAttemptStatus},
    traits::CheckoutError,
};

pub async fn insert_attempt(
    attempt: NewPaymentAttempt,
    conn: &mut SqliteConnection,
) -> Result<PaymentAttempt, CheckoutError> {
    let inserted: PaymentAttempt = sqlx::query_as(
        r#"
        INSERT INTO payment_attempts (order_id, correlation_id, amount, currency, provider)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(attempt.order_id.as_str())
    .bind(&attempt.correlation_id)
    .bind(attempt.amount.value())
    .bind(&attempt.currency)
    .bind(attempt.provider.to_string())
    .fetch_one(conn)
    .await?;
    debug!("📝️ Payment attempt {} recorded for order {}", inserted.correlation_id, inserted.order_id);
    Ok(inserted)
}

pub async fn fetch_attempt_by_correlation_id(
    correlation_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAttempt>, sqlx::Error> {
    let attempt = sqlx::query_as("SELECT * FROM payment_attempts WHERE correlation_id = $1")
        .bind(correlation_id)
        .fetch_optional(conn)
        .await?;
    Ok(attempt)
}

pub(crate) async fn update_attempt_status(
    correlation_id: &str,
    status: PaymentAttemptStatus,
    conn: &mut SqliteConnection,
) -> Result<(), CheckoutError> {
    sqlx::query("UPDATE payment_attempts SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE correlation_id = $2")
        .bind(status.to_string())
        .bind(correlation_id)
        .execute(conn)
        .await?;
    Ok(())
}

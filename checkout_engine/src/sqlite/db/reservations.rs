use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrderItem, ReservationId},
    traits::CheckoutError,
};

/// Decrement stock for every line and record the reservation, or do nothing at all.
///
/// Each decrement is conditional on the stored quantity (`quantity >= requested`), so two
/// concurrent reservations against the same stock row serialize on the row and a lost-update
/// oversell is impossible. The first line that cannot be satisfied returns
/// [`CheckoutError::InsufficientStock`]; the caller's transaction rolls back, undoing the
/// decrements already applied for earlier lines.
///
/// Call this inside a transaction and pass `&mut *tx` as the connection argument.
pub async fn reserve_lines(
    id: &ReservationId,
    lines: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<(), CheckoutError> {
    sqlx::query("INSERT INTO stock_reservations (id, status) VALUES ($1, 'Held')")
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;
    for line in lines {
        let updated = sqlx::query(
            "UPDATE product_stock SET quantity = quantity - $1 WHERE product_id = $2 AND color = $3 AND quantity >= $1",
        )
        .bind(line.quantity)
        .bind(line.product_id.as_str())
        .bind(&line.color)
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if updated == 0 {
            let available =
                sqlx::query_scalar::<_, i64>("SELECT quantity FROM product_stock WHERE product_id = $1 AND color = $2")
                    .bind(line.product_id.as_str())
                    .bind(&line.color)
                    .fetch_optional(&mut *conn)
                    .await?
                    .unwrap_or(0);
            return Err(CheckoutError::InsufficientStock {
                product_id: line.product_id.clone(),
                color: line.color.clone(),
                requested: line.quantity,
                available,
            });
        }
        sqlx::query("INSERT INTO reservation_lines (reservation_id, product_id, color, quantity) VALUES ($1, $2, $3, $4)")
            .bind(id.as_str())
            .bind(line.product_id.as_str())
            .bind(&line.color)
            .bind(line.quantity)
            .execute(&mut *conn)
            .await?;
    }
    trace!("📝️ Reservation {id} holding {} line(s)", lines.len());
    Ok(())
}

/// Release a held reservation, restoring exactly the quantities it reserved.
///
/// Returns `false` if the reservation does not exist or is no longer `Held` — rollback paths may
/// race with manual intervention, so releasing twice is a no-op, not an error.
pub async fn release(id: &ReservationId, conn: &mut SqliteConnection) -> Result<bool, CheckoutError> {
    if !flip_held_reservation(id, "Released", conn).await? {
        return Ok(false);
    }
    let lines: Vec<(String, String, i64)> =
        sqlx::query_as("SELECT product_id, color, quantity FROM reservation_lines WHERE reservation_id = $1")
            .bind(id.as_str())
            .fetch_all(&mut *conn)
            .await?;
    for (product_id, color, quantity) in lines {
        sqlx::query("UPDATE product_stock SET quantity = quantity + $1 WHERE product_id = $2 AND color = $3")
            .bind(quantity)
            .bind(&product_id)
            .bind(&color)
            .execute(&mut *conn)
            .await?;
    }
    trace!("📝️ Reservation {id} released; quantities restored");
    Ok(true)
}

/// Mark a held reservation as committed. The decrement stays in place, and a later stray release
/// can no longer restore stock for a settled sale.
pub async fn commit(id: &ReservationId, conn: &mut SqliteConnection) -> Result<bool, CheckoutError> {
    let committed = flip_held_reservation(id, "Committed", conn).await?;
    if committed {
        trace!("📝️ Reservation {id} committed");
    }
    Ok(committed)
}

async fn flip_held_reservation(
    id: &ReservationId,
    new_status: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, CheckoutError> {
    let flipped = sqlx::query(
        "UPDATE stock_reservations SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = 'Held'",
    )
    .bind(new_status)
    .bind(id.as_str())
    .execute(conn)
    .await?
    .rows_affected();
    Ok(flipped == 1)
}

use sqlx::SqliteConnection;

use crate::db_types::{Product, ProductId, StockLevel};

pub async fn fetch_product(
    product_id: &ProductId,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id.as_str()).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_stock_level(
    product_id: &ProductId,
    color: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<StockLevel>, sqlx::Error> {
    let stock = sqlx::query_as("SELECT * FROM product_stock WHERE product_id = $1 AND color = $2")
        .bind(product_id.as_str())
        .bind(color)
        .fetch_optional(conn)
        .await?;
    Ok(stock)
}

/// The catalog service owns the product tables. This upsert surface exists for tooling and tests.
pub async fn upsert_product(product: &Product, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO products (id, seller_id, name, unit_price) VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE
        SET seller_id = excluded.seller_id, name = excluded.name, unit_price = excluded.unit_price
        "#,
    )
    .bind(product.id.as_str())
    .bind(&product.seller_id)
    .bind(&product.name)
    .bind(product.unit_price.value())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_stock_level(
    product_id: &ProductId,
    color: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO product_stock (product_id, color, quantity) VALUES ($1, $2, $3)
        ON CONFLICT (product_id, color) DO UPDATE SET quantity = excluded.quantity
        "#,
    )
    .bind(product_id.as_str())
    .bind(color)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}

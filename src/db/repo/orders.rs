//! Order operations for the repository.

use crate::domain::{AccountId, Order, OrderNo, OrderStatus, Side, Ticker};
use crate::error::LedgerError;
use chrono::Utc;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use tracing::warn;

use super::{decode_decimal, decode_millis, encode_millis, Repository};

impl Repository {
    /// Create an order, returning its row id.
    ///
    /// # Errors
    /// `LedgerError::DuplicateOrder` when the order_no already exists; the
    /// original row is kept untouched.
    pub async fn create_order(&self, order: &Order) -> Result<i64, LedgerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (order_no, account_id, ticker, side, qty, price, status, placed_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.order_no.as_str())
        .bind(order.account_id.as_str())
        .bind(order.ticker.as_str())
        .bind(order.side.as_str())
        .bind(order.qty.to_canonical_string())
        .bind(order.price.to_canonical_string())
        .bind(order.status.as_str())
        .bind(encode_millis(order.placed_at))
        .bind(encode_millis(order.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!(order_no = %order.order_no, "rejected duplicate order");
                Err(LedgerError::DuplicateOrder(
                    order.order_no.as_str().to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch an order by broker order number.
    pub async fn get_order_by_no(
        &self,
        order_no: &OrderNo,
    ) -> Result<Option<Order>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT order_no, account_id, ticker, side, qty, price, status, placed_at, updated_at
            FROM orders
            WHERE order_no = ?
            "#,
        )
        .bind(order_no.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| decode_order(&r)))
    }

    /// List orders currently in the given status.
    pub async fn list_orders_by_status(
        &self,
        status: OrderStatus,
    ) -> Result<Vec<Order>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT order_no, account_id, ticker, side, qty, price, status, placed_at, updated_at
            FROM orders
            WHERE status = ?
            ORDER BY id ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(decode_order).collect())
    }

    /// Advance an order's status.
    ///
    /// Broker events may reference orders not yet locally known (event
    /// delivery is not causally ordered with local order creation), so a
    /// missing order is a warning and a no-op success, not an error. The
    /// same applies to transitions the state machine forbids.
    ///
    /// Returns true when a row was updated.
    pub async fn update_order_status(
        &self,
        order_no: &OrderNo,
        status: OrderStatus,
    ) -> Result<bool, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let updated = Self::update_order_status_conn(
            &mut conn,
            order_no,
            status,
            Utc::now().timestamp_millis(),
        )
        .await?;
        Ok(updated)
    }

    pub(crate) async fn update_order_status_conn(
        conn: &mut SqliteConnection,
        order_no: &OrderNo,
        status: OrderStatus,
        now_ms: i64,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT status FROM orders WHERE order_no = ?")
            .bind(order_no.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        let current = match row {
            None => {
                warn!(order_no = %order_no, next = %status, "status event for untracked order, ignoring");
                return Ok(false);
            }
            Some(r) => {
                let raw: String = r.get("status");
                OrderStatus::parse(&raw)
            }
        };

        if let Some(current) = current {
            if !current.can_advance_to(status) {
                warn!(
                    order_no = %order_no,
                    current = %current,
                    next = %status,
                    "dropping non-forward status transition"
                );
                return Ok(false);
            }
        }

        sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE order_no = ?")
            .bind(status.as_str())
            .bind(now_ms)
            .bind(order_no.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(true)
    }
}

fn decode_order(row: &sqlx::sqlite::SqliteRow) -> Order {
    let order_no: String = row.get("order_no");
    let qty: String = row.get("qty");
    let price: String = row.get("price");
    let side: String = row.get("side");
    let status: String = row.get("status");

    Order {
        qty: decode_decimal(&qty, "qty", &order_no),
        price: decode_decimal(&price, "price", &order_no),
        side: Side::parse(&side).unwrap_or(Side::Buy),
        status: OrderStatus::parse(&status).unwrap_or(OrderStatus::Placed),
        account_id: AccountId::new(row.get::<String, _>("account_id")),
        ticker: Ticker::new(row.get::<String, _>("ticker")),
        placed_at: decode_millis(row.get("placed_at")),
        updated_at: decode_millis(row.get("updated_at")),
        order_no: OrderNo::new(order_no),
    }
}

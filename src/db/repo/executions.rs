//! Execution and open-lot operations for the repository.

use crate::domain::{
    AccountId, Decimal, ExecId, Execution, ExecutionEvent, Market, OrderNo, Side, Ticker,
};
use crate::engine::BuyLot;
use crate::error::LedgerError;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use super::{decode_decimal, decode_millis, Repository};

impl Repository {
    /// Record a fill idempotently; returns false when the exec_id was seen
    /// before. Duplicate deliveries must not double-count quantity or fees.
    pub(crate) async fn insert_execution_conn(
        conn: &mut SqliteConnection,
        exec: &ExecutionEvent,
        remaining_qty: Decimal,
        created_ms: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO executions (
                exec_id, order_no, account_id, ticker, market, side,
                qty, price, commission, tax, exec_time, remaining_qty, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(exec_id) DO NOTHING
            "#,
        )
        .bind(exec.exec_id.as_str())
        .bind(
            exec.order_no
                .as_ref()
                .map(|o| o.as_str())
                .unwrap_or("UNKNOWN"),
        )
        .bind(exec.account_id.as_str())
        .bind(exec.ticker.as_str())
        .bind(exec.market.as_str())
        .bind(exec.side.as_str())
        .bind(exec.qty.to_canonical_string())
        .bind(exec.price.to_canonical_string())
        .bind(exec.commission.to_canonical_string())
        .bind(exec.tax.to_canonical_string())
        .bind(exec.exec_time.timestamp_millis())
        .bind(remaining_qty.to_canonical_string())
        .bind(created_ms)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Open BUY lots for FIFO matching, ordered `(exec_time ASC, id ASC)`.
    ///
    /// The ordering must be total: two executions can share a timestamp at
    /// second resolution, so the monotonic row id breaks ties. The
    /// `remaining_qty > 0` filter runs in Rust on the decoded Decimal; the
    /// column is TEXT and SQLite would compare it as a string.
    pub(crate) async fn open_buy_lots_conn(
        conn: &mut SqliteConnection,
        account_id: &AccountId,
        ticker: &Ticker,
    ) -> Result<Vec<BuyLot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, exec_id, qty, price, commission, remaining_qty, exec_time
            FROM executions
            WHERE account_id = ? AND ticker = ? AND side = 'BUY'
            ORDER BY exec_time ASC, id ASC
            "#,
        )
        .bind(account_id.as_str())
        .bind(ticker.as_str())
        .fetch_all(&mut *conn)
        .await?;

        let lots = rows
            .iter()
            .map(|row| {
                let exec_id: String = row.get("exec_id");
                let qty: String = row.get("qty");
                let price: String = row.get("price");
                let commission: String = row.get("commission");
                let remaining: String = row.get("remaining_qty");
                BuyLot {
                    row_id: row.get("id"),
                    qty: decode_decimal(&qty, "qty", &exec_id),
                    price: decode_decimal(&price, "price", &exec_id),
                    commission: decode_decimal(&commission, "commission", &exec_id),
                    remaining_qty: decode_decimal(&remaining, "remaining_qty", &exec_id),
                    exec_time: decode_millis(row.get("exec_time")),
                    exec_id: ExecId::new(exec_id),
                }
            })
            .filter(|lot| lot.remaining_qty.is_positive())
            .collect();

        Ok(lots)
    }

    /// Open BUY lots for one (account, ticker), outside any transaction.
    pub async fn open_buy_lots(
        &self,
        account_id: &AccountId,
        ticker: &Ticker,
    ) -> Result<Vec<BuyLot>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(Self::open_buy_lots_conn(&mut conn, account_id, ticker).await?)
    }

    /// Decrement a lot's unmatched remainder.
    pub(crate) async fn set_lot_remaining_conn(
        conn: &mut SqliteConnection,
        row_id: i64,
        remaining_qty: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE executions SET remaining_qty = ? WHERE id = ?")
            .bind(remaining_qty.to_canonical_string())
            .bind(row_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Current held quantity: the sum of open BUY lot remainders.
    ///
    /// Summed in Rust on decoded Decimals rather than with SQL SUM, which
    /// would run on REAL and drift.
    pub async fn open_position_qty(
        &self,
        account_id: &AccountId,
        ticker: &Ticker,
    ) -> Result<Decimal, LedgerError> {
        let lots = self.open_buy_lots(account_id, ticker).await?;
        let mut total = Decimal::zero();
        for lot in lots {
            total += lot.remaining_qty;
        }
        Ok(total)
    }

    /// List executions with optional side filter, in ledger order.
    pub async fn list_executions(
        &self,
        account_id: &AccountId,
        ticker: Option<&Ticker>,
        side: Option<Side>,
    ) -> Result<Vec<Execution>, LedgerError> {
        let mut sql = String::from(
            r#"
            SELECT exec_id, order_no, account_id, ticker, market, side,
                   qty, price, commission, tax, exec_time, remaining_qty
            FROM executions
            WHERE account_id = ?
            "#,
        );
        if ticker.is_some() {
            sql.push_str(" AND ticker = ?");
        }
        if side.is_some() {
            sql.push_str(" AND side = ?");
        }
        sql.push_str(" ORDER BY exec_time ASC, id ASC");

        let mut query = sqlx::query(&sql).bind(account_id.as_str());
        if let Some(ticker) = ticker {
            query = query.bind(ticker.as_str());
        }
        if let Some(side) = side {
            query = query.bind(side.as_str());
        }

        let rows = query.fetch_all(&self.pool).await?;

        let executions = rows
            .iter()
            .map(|row| {
                let exec_id: String = row.get("exec_id");
                let side: String = row.get("side");
                let qty: String = row.get("qty");
                let price: String = row.get("price");
                let commission: String = row.get("commission");
                let tax: String = row.get("tax");
                let remaining: String = row.get("remaining_qty");

                Execution {
                    order_no: OrderNo::new(row.get::<String, _>("order_no")),
                    account_id: AccountId::new(row.get::<String, _>("account_id")),
                    ticker: Ticker::new(row.get::<String, _>("ticker")),
                    market: Market::new(row.get::<String, _>("market")),
                    side: Side::parse(&side).unwrap_or(Side::Buy),
                    qty: decode_decimal(&qty, "qty", &exec_id),
                    price: decode_decimal(&price, "price", &exec_id),
                    commission: decode_decimal(&commission, "commission", &exec_id),
                    tax: decode_decimal(&tax, "tax", &exec_id),
                    exec_time: decode_millis(row.get("exec_time")),
                    remaining_qty: decode_decimal(&remaining, "remaining_qty", &exec_id),
                    exec_id: ExecId::new(exec_id),
                }
            })
            .collect();

        Ok(executions)
    }
}

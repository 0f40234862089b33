//! Position operations for the repository.

use crate::domain::{AccountId, Market, OrderNo, Position, Ticker};
use crate::error::LedgerError;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use super::{decode_decimal, decode_millis, encode_millis, Repository};

impl Repository {
    /// Fetch the holding for one (account, ticker).
    pub async fn get_position(
        &self,
        account_id: &AccountId,
        ticker: &Ticker,
    ) -> Result<Option<Position>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(Self::get_position_conn(&mut conn, account_id, ticker).await?)
    }

    pub(crate) async fn get_position_conn(
        conn: &mut SqliteConnection,
        account_id: &AccountId,
        ticker: &Ticker,
    ) -> Result<Option<Position>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT account_id, ticker, market, qty, remaining_qty, buy_avg_price,
                   n_trade, buy_time, last_buy_time, target_price, stop_price,
                   fee_accum, tax_accum, last_order_id, updated_at
            FROM positions
            WHERE account_id = ? AND ticker = ?
            "#,
        )
        .bind(account_id.as_str())
        .bind(ticker.as_str())
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|row| {
            let key = format!("{}/{}", account_id.as_str(), ticker.as_str());
            let dec = |column: &str| {
                let raw: String = row.get(column);
                decode_decimal(&raw, column, &key)
            };
            Position {
                account_id: AccountId::new(row.get::<String, _>("account_id")),
                ticker: Ticker::new(row.get::<String, _>("ticker")),
                market: Market::new(row.get::<String, _>("market")),
                qty: dec("qty"),
                remaining_qty: dec("remaining_qty"),
                buy_avg_price: dec("buy_avg_price"),
                n_trade: row.get::<i64, _>("n_trade") as u32,
                buy_time: decode_millis(row.get("buy_time")),
                last_buy_time: decode_millis(row.get("last_buy_time")),
                target_price: dec("target_price"),
                stop_price: dec("stop_price"),
                fee_accum: dec("fee_accum"),
                tax_accum: dec("tax_accum"),
                last_order_id: row
                    .get::<Option<String>, _>("last_order_id")
                    .map(OrderNo::new),
                updated_at: decode_millis(row.get("updated_at")),
            }
        }))
    }

    /// Insert or update the holding, keyed on (account_id, ticker).
    pub(crate) async fn upsert_position_conn(
        conn: &mut SqliteConnection,
        position: &Position,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO positions (
                account_id, ticker, market, qty, remaining_qty, buy_avg_price,
                n_trade, buy_time, last_buy_time, target_price, stop_price,
                fee_accum, tax_accum, last_order_id, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(account_id, ticker) DO UPDATE SET
                market = excluded.market,
                qty = excluded.qty,
                remaining_qty = excluded.remaining_qty,
                buy_avg_price = excluded.buy_avg_price,
                n_trade = excluded.n_trade,
                buy_time = excluded.buy_time,
                last_buy_time = excluded.last_buy_time,
                target_price = excluded.target_price,
                stop_price = excluded.stop_price,
                fee_accum = excluded.fee_accum,
                tax_accum = excluded.tax_accum,
                last_order_id = excluded.last_order_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(position.account_id.as_str())
        .bind(position.ticker.as_str())
        .bind(position.market.as_str())
        .bind(position.qty.to_canonical_string())
        .bind(position.remaining_qty.to_canonical_string())
        .bind(position.buy_avg_price.to_canonical_string())
        .bind(position.n_trade as i64)
        .bind(encode_millis(position.buy_time))
        .bind(encode_millis(position.last_buy_time))
        .bind(position.target_price.to_canonical_string())
        .bind(position.stop_price.to_canonical_string())
        .bind(position.fee_accum.to_canonical_string())
        .bind(position.tax_accum.to_canonical_string())
        .bind(position.last_order_id.as_ref().map(|o| o.as_str()))
        .bind(encode_millis(position.updated_at))
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

//! Trade operations for the repository. Trades are append-only.

use crate::domain::{AccountId, Market, Ticker, Trade};
use crate::error::LedgerError;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use super::{decode_decimal, decode_millis, encode_millis, Repository};

impl Repository {
    /// Append a realized trade, returning its trade_id.
    pub(crate) async fn insert_trade_conn(
        conn: &mut SqliteConnection,
        trade: &Trade,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO trades (
                account_id, ticker, market, qty,
                buy_avg_price, sell_avg_price, buy_value, sell_value,
                buy_commission, sell_commission, sell_tax,
                pnl_gross, pnl_net, pnl_net_pct,
                buy_exec_ids, sell_exec_ids,
                opened_at, closed_at, holding_seconds
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(trade.account_id.as_str())
        .bind(trade.ticker.as_str())
        .bind(trade.market.as_str())
        .bind(trade.qty.to_canonical_string())
        .bind(trade.buy_avg_price.to_canonical_string())
        .bind(trade.sell_avg_price.to_canonical_string())
        .bind(trade.buy_value.to_canonical_string())
        .bind(trade.sell_value.to_canonical_string())
        .bind(trade.buy_commission.to_canonical_string())
        .bind(trade.sell_commission.to_canonical_string())
        .bind(trade.sell_tax.to_canonical_string())
        .bind(trade.pnl_gross.to_canonical_string())
        .bind(trade.pnl_net.to_canonical_string())
        .bind(trade.pnl_net_pct.to_canonical_string())
        .bind(trade.buy_exec_ids.as_str())
        .bind(trade.sell_exec_ids.as_str())
        .bind(encode_millis(trade.opened_at))
        .bind(encode_millis(trade.closed_at))
        .bind(trade.holding_seconds)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Realized trades for one (account, ticker), oldest close first.
    pub async fn list_trades(
        &self,
        account_id: &AccountId,
        ticker: &Ticker,
    ) -> Result<Vec<Trade>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT account_id, ticker, market, qty,
                   buy_avg_price, sell_avg_price, buy_value, sell_value,
                   buy_commission, sell_commission, sell_tax,
                   pnl_gross, pnl_net, pnl_net_pct,
                   buy_exec_ids, sell_exec_ids,
                   opened_at, closed_at, holding_seconds
            FROM trades
            WHERE account_id = ? AND ticker = ?
            ORDER BY trade_id ASC
            "#,
        )
        .bind(account_id.as_str())
        .bind(ticker.as_str())
        .fetch_all(&self.pool)
        .await?;

        let trades = rows
            .iter()
            .map(|row| {
                let key: String = row.get("sell_exec_ids");
                let dec = |column: &str| {
                    let raw: String = row.get(column);
                    decode_decimal(&raw, column, &key)
                };
                Trade {
                    account_id: AccountId::new(row.get::<String, _>("account_id")),
                    ticker: Ticker::new(row.get::<String, _>("ticker")),
                    market: Market::new(row.get::<String, _>("market")),
                    qty: dec("qty"),
                    buy_avg_price: dec("buy_avg_price"),
                    sell_avg_price: dec("sell_avg_price"),
                    buy_value: dec("buy_value"),
                    sell_value: dec("sell_value"),
                    buy_commission: dec("buy_commission"),
                    sell_commission: dec("sell_commission"),
                    sell_tax: dec("sell_tax"),
                    pnl_gross: dec("pnl_gross"),
                    pnl_net: dec("pnl_net"),
                    pnl_net_pct: dec("pnl_net_pct"),
                    buy_exec_ids: row.get("buy_exec_ids"),
                    sell_exec_ids: key.clone(),
                    opened_at: decode_millis(row.get("opened_at")),
                    closed_at: decode_millis(row.get("closed_at")),
                    holding_seconds: row.get("holding_seconds"),
                }
            })
            .collect();

        Ok(trades)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};

use super::TradeStore;
use crate::error::StoreError;
use crate::models::{ExitReason, Side, TradeRecord};

/// Postgres-backed trade log
pub struct PostgresTradeStore {
    pool: PgPool,
}

impl PostgresTradeStore {
    /// Connect to Postgres and run pending migrations
    ///
    /// # Arguments
    /// * `database_url` - Postgres connection URL
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!("Connected to Postgres trade store");

        Ok(Self { pool })
    }

    /// Delete every stored trade (used by tests and manual resets)
    pub async fn clear_all_trades(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM trades").execute(&self.pool).await?;
        tracing::warn!("Cleared all trades from Postgres");
        Ok(())
    }
}

fn to_decimal(value: f64, field: &str) -> Result<Decimal, StoreError> {
    Decimal::from_f64(value)
        .ok_or_else(|| StoreError::InvalidRow(format!("{} is not representable: {}", field, value)))
}

fn from_decimal(row: &PgRow, field: &str) -> Result<f64, StoreError> {
    let value: Decimal = row.try_get(field)?;
    value
        .to_f64()
        .ok_or_else(|| StoreError::InvalidRow(format!("{} out of range", field)))
}

fn record_from_row(row: &PgRow) -> Result<TradeRecord, StoreError> {
    let side_str: String = row.try_get("side")?;
    let reason_str: String = row.try_get("exit_reason")?;
    let timestamp: DateTime<Utc> = row.try_get("closed_at")?;

    Ok(TradeRecord {
        symbol: row.try_get("symbol")?,
        side: Side::parse(&side_str)
            .ok_or_else(|| StoreError::InvalidRow(format!("invalid side {}", side_str)))?,
        entry_price: from_decimal(row, "entry_price")?,
        exit_price: from_decimal(row, "exit_price")?,
        pnl_percent: from_decimal(row, "pnl_percent")?,
        exit_reason: ExitReason::parse(&reason_str)
            .ok_or_else(|| StoreError::InvalidRow(format!("invalid exit reason {}", reason_str)))?,
        timestamp,
    })
}

#[async_trait]
impl TradeStore for PostgresTradeStore {
    async fn save_trade(&self, record: &TradeRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO trades (
                symbol, side, entry_price, exit_price, pnl_percent, exit_reason, closed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&record.symbol)
        .bind(record.side.as_str())
        .bind(to_decimal(record.entry_price, "entry_price")?)
        .bind(to_decimal(record.exit_price, "exit_price")?)
        .bind(to_decimal(record.pnl_percent, "pnl_percent")?)
        .bind(record.exit_reason.as_str())
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Saved {} trade for {} to Postgres ({:.2}%)",
            record.side,
            record.symbol,
            record.pnl_percent
        );

        Ok(())
    }

    async fn all_trades(&self) -> Result<Vec<TradeRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, side, entry_price, exit_price, pnl_percent, exit_reason, closed_at
            FROM trades
            ORDER BY closed_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn trades_by_symbol(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, side, entry_price, exit_price, pnl_percent, exit_reason, closed_at
            FROM trades
            WHERE symbol = $1
            ORDER BY closed_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    #[ignore] // Requires DATABASE_URL pointing at a live Postgres
    async fn test_save_and_load_trades() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let store = PostgresTradeStore::new(&url).await.unwrap();
        store.clear_all_trades().await.unwrap();

        let record = TradeRecord {
            symbol: "PF_ETHUSD".to_string(),
            side: Side::Short,
            entry_price: 2000.0,
            exit_price: 1990.0,
            pnl_percent: 0.5,
            exit_reason: ExitReason::GainThreshold,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        };
        store.save_trade(&record).await.unwrap();

        let loaded = store.trades_by_symbol("PF_ETHUSD", 10).await.unwrap();
        assert_eq!(loaded, vec![record]);
    }

    #[test]
    fn test_decimal_conversion_rejects_nan() {
        assert!(to_decimal(f64::NAN, "pnl_percent").is_err());
        assert_eq!(to_decimal(0.25, "pnl_percent").unwrap().to_string(), "0.25");
    }
}

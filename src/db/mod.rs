// Trade log storage
pub mod postgres;

pub use postgres::PostgresTradeStore;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::models::TradeRecord;

/// Persistent log of closed trades
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn save_trade(&self, record: &TradeRecord) -> Result<(), StoreError>;

    /// Every stored trade, oldest first
    async fn all_trades(&self) -> Result<Vec<TradeRecord>, StoreError>;

    /// Most recent trades for `symbol`, newest first
    async fn trades_by_symbol(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError>;
}

/// Process-local trade store, used when no database is configured
#[derive(Clone, Default)]
pub struct InMemoryTradeStore {
    trades: Arc<Mutex<Vec<TradeRecord>>>,
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Vec<TradeRecord> {
        self.trades.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TradeStore for InMemoryTradeStore {
    async fn save_trade(&self, record: &TradeRecord) -> Result<(), StoreError> {
        self.trades
            .lock()
            .map_err(|e| StoreError::InvalidRow(e.to_string()))?
            .push(record.clone());
        tracing::debug!(symbol = %record.symbol, pnl = record.pnl_percent, "Trade recorded in memory");
        Ok(())
    }

    async fn all_trades(&self) -> Result<Vec<TradeRecord>, StoreError> {
        Ok(self.snapshot())
    }

    async fn trades_by_symbol(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<TradeRecord>, StoreError> {
        let mut trades: Vec<TradeRecord> = self
            .snapshot()
            .into_iter()
            .filter(|t| t.symbol == symbol)
            .collect();
        trades.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        trades.truncate(limit);
        Ok(trades)
    }
}

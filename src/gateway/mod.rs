// Order execution boundary
pub mod paper;

pub use paper::{OrderRequest, PaperGateway};

use async_trait::async_trait;

use crate::error::ExecutionError;
use crate::models::Side;

/// Exchange ids of the take-profit and stop-loss orders, when accepted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TpSlOrders {
    pub tp_order_id: Option<String>,
    pub sl_order_id: Option<String>,
}

/// Outbound order execution
///
/// Calls are fire-and-forget from the trading loop's point of view: the
/// caller logs failures and never waits on fills.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn open_long(&self, symbol: &str, size: f64) -> Result<(), ExecutionError>;

    async fn open_short(&self, symbol: &str, size: f64) -> Result<(), ExecutionError>;

    /// Reduce-only market order that flattens `side`
    async fn close_market(&self, symbol: &str, side: Side, size: f64)
        -> Result<(), ExecutionError>;

    /// Submit take-profit and stop-loss orders for a freshly opened `side`
    async fn place_tp_sl(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        tp_price: f64,
        sl_price: f64,
    ) -> Result<TpSlOrders, ExecutionError>;
}

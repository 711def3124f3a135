use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::{OrderGateway, TpSlOrders};
use crate::error::ExecutionError;
use crate::models::Side;

/// Order payload in the exchange's `sendorder` shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_type: String, // "mkt", "take_profit", "stp"
    pub symbol: String,
    pub side: String, // "buy" / "sell"
    pub size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<f64>,
    pub reduce_only: bool,
    pub cli_ord_id: String,
}

impl OrderRequest {
    fn market(symbol: &str, side: &str, size: f64, reduce_only: bool) -> Self {
        Self {
            order_type: "mkt".to_string(),
            symbol: symbol.to_string(),
            side: side.to_string(),
            size,
            stop_price: None,
            reduce_only,
            cli_ord_id: Uuid::new_v4().to_string(),
        }
    }

    fn trigger(order_type: &str, symbol: &str, side: &str, size: f64, stop_price: f64) -> Self {
        Self {
            order_type: order_type.to_string(),
            symbol: symbol.to_string(),
            side: side.to_string(),
            size,
            stop_price: Some(stop_price),
            reduce_only: true,
            cli_ord_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Paper-trading gateway: logs orders instead of sending them
///
/// Every order is kept in an in-memory log; clones share it.
#[derive(Clone, Default)]
pub struct PaperGateway {
    orders: Arc<Mutex<Vec<OrderRequest>>>,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders submitted so far, oldest first
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }

    fn submit(&self, order: OrderRequest) -> Result<String, ExecutionError> {
        let payload = serde_json::to_string(&order)
            .map_err(|e| ExecutionError::Rejected(e.to_string()))?;
        tracing::info!(%payload, "📝 Paper order");

        let id = order.cli_ord_id.clone();
        self.orders
            .lock()
            .map_err(|e| ExecutionError::Rejected(e.to_string()))?
            .push(order);
        Ok(id)
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn open_long(&self, symbol: &str, size: f64) -> Result<(), ExecutionError> {
        self.submit(OrderRequest::market(symbol, Side::Long.entry_order_side(), size, false))?;
        Ok(())
    }

    async fn open_short(&self, symbol: &str, size: f64) -> Result<(), ExecutionError> {
        self.submit(OrderRequest::market(symbol, Side::Short.entry_order_side(), size, false))?;
        Ok(())
    }

    async fn close_market(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
    ) -> Result<(), ExecutionError> {
        self.submit(OrderRequest::market(symbol, side.exit_order_side(), size, true))?;
        Ok(())
    }

    async fn place_tp_sl(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
        tp_price: f64,
        sl_price: f64,
    ) -> Result<TpSlOrders, ExecutionError> {
        let exit_side = side.exit_order_side();
        let tp_id = self.submit(OrderRequest::trigger("take_profit", symbol, exit_side, size, tp_price))?;
        let sl_id = self.submit(OrderRequest::trigger("stp", symbol, exit_side, size, sl_price))?;

        Ok(TpSlOrders {
            tp_order_id: Some(tp_id),
            sl_order_id: Some(sl_id),
        })
    }
}

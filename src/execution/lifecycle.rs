use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::PositionManager;
use crate::db::TradeStore;
use crate::gateway::OrderGateway;
use crate::models::{round2, Action, Candle, ExitReason, Position, Side, TradeRecord};
use crate::notify::Notifier;

/// Parameters for opening, closing and re-entering positions
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    pub symbol: String,
    pub order_size: f64,
    pub tp_pct: Option<f64>,
    pub sl_pct: Option<f64>,
    pub min_gain_to_close_pct: f64,
    pub flip_settle_delay: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            symbol: "PF_ETHUSD".to_string(),
            order_size: 0.02,
            tp_pct: Some(0.5),
            sl_pct: Some(0.5),
            min_gain_to_close_pct: 0.5,
            flip_settle_delay: Duration::from_secs(1),
        }
    }
}

impl LifecycleConfig {
    /// Take-profit and stop-loss prices for a new position, if both are configured
    pub fn tp_sl_prices(&self, side: Side, entry_price: f64) -> Option<(f64, f64)> {
        let (tp, sl) = (self.tp_pct? / 100.0, self.sl_pct? / 100.0);

        Some(match side {
            Side::Long => (entry_price * (1.0 + tp), entry_price * (1.0 - sl)),
            Side::Short => (entry_price * (1.0 - tp), entry_price * (1.0 + sl)),
        })
    }
}

/// What one candle did to the position slot
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Flat and nothing to do
    Idle,
    /// Position kept open
    Held { side: Side, pnl_pct: f64 },
    Opened { side: Side, entry_price: f64 },
    Closed { record: TradeRecord },
    /// Closed and immediately re-entered on the same candle
    Reopened {
        record: TradeRecord,
        side: Side,
        entry_price: f64,
    },
    /// An invariant check refused the request
    Rejected { reason: String },
}

/// Single-position state machine: Flat <-> Open(side)
///
/// Local state is committed before any remote call; gateway, store and
/// notifier failures are logged and never roll it back.
pub struct PositionLifecycle {
    config: LifecycleConfig,
    positions: PositionManager,
    gateway: Arc<dyn OrderGateway>,
    store: Arc<dyn TradeStore>,
    notifier: Arc<dyn Notifier>,
}

impl PositionLifecycle {
    pub fn new(
        config: LifecycleConfig,
        gateway: Arc<dyn OrderGateway>,
        store: Arc<dyn TradeStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            positions: PositionManager::new(),
            gateway,
            store,
            notifier,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.positions.position()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Apply one finalized candle and its decision
    pub async fn on_candle(&mut self, candle: &Candle, action: Action) -> Transition {
        let min_gain = self.config.min_gain_to_close_pct;

        let exit = self.positions.close_if(|p| {
            let pnl_pct = p.pnl_pct(candle.close);
            if action.opposes(p.side) {
                Ok(ExitReason::OpposingSignal)
            } else if pnl_pct >= min_gain {
                Ok(ExitReason::GainThreshold)
            } else {
                Err(Transition::Held {
                    side: p.side,
                    pnl_pct,
                })
            }
        });

        let (position, reason) = match exit {
            None => {
                return match action.entry_side() {
                    Some(side) => self.open(side, candle.close, candle.timestamp()).await,
                    None => Transition::Idle,
                };
            }
            Some(Err(held)) => {
                tracing::debug!(?held, action = %action, "Holding position");
                return held;
            }
            Some(Ok(closed)) => closed,
        };

        let record = self
            .settle_close(position, candle.close, reason, candle.timestamp())
            .await;

        let Some(next_side) = action.entry_side() else {
            return Transition::Closed { record };
        };

        if !self.config.flip_settle_delay.is_zero() {
            tokio::time::sleep(self.config.flip_settle_delay).await;
        }

        match self.open(next_side, candle.close, candle.timestamp()).await {
            Transition::Opened { side, entry_price } => Transition::Reopened {
                record,
                side,
                entry_price,
            },
            other => {
                tracing::warn!(?other, "Re-entry after close did not open a position");
                Transition::Closed { record }
            }
        }
    }

    /// Open a position on `side` at `entry_price`
    ///
    /// Rejected without touching the gateway when a position is already open.
    pub async fn open(
        &mut self,
        side: Side,
        entry_price: f64,
        open_time: DateTime<Utc>,
    ) -> Transition {
        let symbol = self.config.symbol.clone();
        let size = self.config.order_size;

        if let Err(e) = self
            .positions
            .open_position_at(&symbol, side, entry_price, size, open_time)
        {
            tracing::warn!(symbol = %symbol, side = %side, "Open rejected: {}", e);
            return Transition::Rejected {
                reason: e.to_string(),
            };
        }

        let order_result = match side {
            Side::Long => self.gateway.open_long(&symbol, size).await,
            Side::Short => self.gateway.open_short(&symbol, size).await,
        };
        if let Err(e) = order_result {
            tracing::error!(symbol = %symbol, side = %side, "Entry order failed: {}", e);
        }

        let label = match side {
            Side::Long => "💹 <b>LONG opened</b>",
            Side::Short => "🔻 <b>SHORT opened</b>",
        };
        self.notify(&format!("{} {}\nPrice: {}", label, symbol, entry_price))
            .await;

        if let Some((tp_price, sl_price)) = self.config.tp_sl_prices(side, entry_price) {
            match self
                .gateway
                .place_tp_sl(&symbol, side, size, tp_price, sl_price)
                .await
            {
                Ok(orders) => {
                    if let Err(e) = self
                        .positions
                        .attach_tp_sl(orders.tp_order_id, orders.sl_order_id)
                    {
                        tracing::warn!("Could not attach TP/SL ids: {}", e);
                    }
                }
                Err(e) => {
                    tracing::error!(symbol = %symbol, tp_price, sl_price, "TP/SL placement failed: {}", e)
                }
            }
        }

        Transition::Opened { side, entry_price }
    }

    /// Close the open position at `exit_price`
    ///
    /// Returns the trade record, or `None` when already flat.
    pub async fn close(
        &mut self,
        exit_price: f64,
        reason: ExitReason,
        timestamp: DateTime<Utc>,
    ) -> Option<TradeRecord> {
        let position = self.positions.close_position()?;
        Some(self.settle_close(position, exit_price, reason, timestamp).await)
    }

    /// Report a position already removed from the slot: order, store, notify
    async fn settle_close(
        &self,
        position: Position,
        exit_price: f64,
        reason: ExitReason,
        timestamp: DateTime<Utc>,
    ) -> TradeRecord {
        let record = TradeRecord {
            symbol: position.symbol.clone(),
            side: position.side,
            entry_price: position.entry_price,
            exit_price,
            pnl_percent: round2(position.pnl_pct(exit_price)),
            exit_reason: reason,
            timestamp,
        };

        tracing::info!(
            symbol = %record.symbol,
            side = %record.side,
            entry = record.entry_price,
            exit = record.exit_price,
            pnl_pct = record.pnl_percent,
            reason = record.exit_reason.as_str(),
            "Closing position"
        );

        if let Err(e) = self
            .gateway
            .close_market(&position.symbol, position.side, position.size)
            .await
        {
            tracing::error!(symbol = %position.symbol, "Close order failed: {}", e);
        }

        if let Err(e) = self.store.save_trade(&record).await {
            tracing::error!(symbol = %record.symbol, "Failed to save trade: {}", e);
        }

        let outcome = if record.pnl_percent >= 0.0 { "✅" } else { "❌" };
        self.notify(&format!(
            "📊 <b>Trade closed</b> {}\nType: {}\nPnL: <b>{:.2}%</b> {}",
            record.symbol,
            record.side.as_str().to_uppercase(),
            record.pnl_percent,
            outcome
        ))
        .await;

        record
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.notifier.send_message(text).await {
            tracing::warn!("Notification failed: {}", e);
        }
    }
}

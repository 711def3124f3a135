use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Position, Side};

/// Single-slot position holder for one symbol
///
/// At most one position exists at a time. Opening while one is held is
/// rejected; closing while flat is a no-op.
#[derive(Debug, Default)]
pub struct PositionManager {
    position: Option<Position>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a position with the current time
    pub fn open_position(
        &mut self,
        symbol: &str,
        side: Side,
        entry_price: f64,
        size: f64,
    ) -> anyhow::Result<&Position> {
        self.open_position_at(symbol, side, entry_price, size, Utc::now())
    }

    /// Open a position with an explicit open time
    pub fn open_position_at(
        &mut self,
        symbol: &str,
        side: Side,
        entry_price: f64,
        size: f64,
        open_time: DateTime<Utc>,
    ) -> anyhow::Result<&Position> {
        if let Some(existing) = &self.position {
            anyhow::bail!(
                "Already have open {} position for {}",
                existing.side,
                existing.symbol
            );
        }
        if !(entry_price.is_finite() && entry_price > 0.0) {
            anyhow::bail!("Invalid entry price {}", entry_price);
        }
        if !(size.is_finite() && size > 0.0) {
            anyhow::bail!("Invalid position size {}", size);
        }

        let position = Position {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side,
            entry_price,
            size,
            open_time,
            tp_order_id: None,
            sl_order_id: None,
        };

        tracing::info!(
            symbol = %position.symbol,
            side = %position.side,
            entry_price,
            size,
            "Position opened"
        );

        Ok(self.position.insert(position))
    }

    /// Attach take-profit / stop-loss order ids to the open position
    pub fn attach_tp_sl(
        &mut self,
        tp_order_id: Option<String>,
        sl_order_id: Option<String>,
    ) -> anyhow::Result<()> {
        let position = self
            .position
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No open position to attach TP/SL to"))?;

        position.tp_order_id = tp_order_id;
        position.sl_order_id = sl_order_id;
        Ok(())
    }

    /// Remove and return the open position; `None` when already flat
    pub fn close_position(&mut self) -> Option<Position> {
        let closed = self.position.take();

        match &closed {
            Some(position) => {
                tracing::info!(symbol = %position.symbol, side = %position.side, "Position closed locally")
            }
            None => tracing::debug!("Close requested while flat, ignoring"),
        }

        closed
    }

    /// Close the open position when `exit` returns `Ok`
    ///
    /// `None` when flat. On `Err` the position stays open and the error is
    /// passed through.
    pub fn close_if<R, K>(
        &mut self,
        exit: impl FnOnce(&Position) -> Result<R, K>,
    ) -> Option<Result<(Position, R), K>> {
        let position = self.position.take()?;

        match exit(&position) {
            Ok(reason) => {
                tracing::info!(symbol = %position.symbol, side = %position.side, "Position closed locally");
                Some(Ok((position, reason)))
            }
            Err(keep) => {
                self.position = Some(position);
                Some(Err(keep))
            }
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn has_open_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn tp_sl_ids(&self) -> (Option<&str>, Option<&str>) {
        match &self.position {
            Some(p) => (p.tp_order_id.as_deref(), p.sl_order_id.as_deref()),
            None => (None, None),
        }
    }
}

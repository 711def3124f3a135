use tokio::sync::mpsc;

use super::{PositionLifecycle, Transition};
use crate::models::{Action, Candle};
use crate::strategy::DecisionEngine;

/// Serial consumer of finalized candles: score, decide, act
///
/// Candles are processed strictly one at a time, so no two lifecycle
/// transitions ever overlap.
pub struct DecisionPipeline {
    engine: DecisionEngine,
    lifecycle: PositionLifecycle,
}

impl DecisionPipeline {
    pub fn new(engine: DecisionEngine, lifecycle: PositionLifecycle) -> Self {
        Self { engine, lifecycle }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn lifecycle(&self) -> &PositionLifecycle {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut PositionLifecycle {
        &mut self.lifecycle
    }

    /// Run one finalized candle through the scorer and the lifecycle
    pub async fn process(&mut self, candle: Candle) -> (Action, i32, Transition) {
        self.engine.update(candle.clone());
        let (action, score) = self.engine.decide();

        tracing::info!(
            symbol = %candle.symbol,
            bucket = candle.bucket_start,
            o = candle.open,
            h = candle.high,
            l = candle.low,
            c = candle.close,
            v = candle.volume,
            score,
            action = %action,
            "🕯️ Candle closed"
        );

        let transition = self.lifecycle.on_candle(&candle, action).await;
        match &transition {
            Transition::Idle | Transition::Held { .. } => {}
            other => tracing::info!(?other, "Position transition"),
        }

        (action, score, transition)
    }

    /// Drain the candle channel until every sender is dropped
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Candle>) {
        while let Some(candle) = rx.recv().await {
            self.process(candle).await;
        }
        tracing::info!("Candle channel closed, decision pipeline stopping");
    }
}

use crate::error::IngestError;
use crate::indicators::to_heikin_ashi;
use crate::models::{Candle, Trade};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Receives every finalized candle exactly once, in finalize order
pub type CandleConsumer = dyn Fn(Candle) + Send + Sync;

/// Latest accepted event time (9999-12-31T23:59:59Z)
pub const MAX_EVENT_TIME: i64 = 253_402_300_799;

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub symbol: String,
    pub interval_secs: i64,
    pub heikin_ashi: bool,
    pub history_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            symbol: "PF_ETHUSD".to_string(),
            interval_secs: 10,
            heikin_ashi: true,
            history_capacity: 100,
        }
    }
}

/// What a single ingested trade did to the bucket
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Started,
    Updated,
    Rolled { finalized: Candle },
}

#[derive(Debug, Default)]
struct AggregatorState {
    current: Option<Candle>,
    last_finalized_start: Option<i64>,
    history: VecDeque<Candle>, // Finalized (post-transform) candles, newest last
    outbox: VecDeque<Candle>,  // Finalized, not yet handed to the consumer
}

/// Thread-safe tick-to-candle aggregator
///
/// Owns the single in-progress bucket. Trades and the timeout timer may call
/// in from different tasks; both serialize on one mutex. Finalized candles are
/// queued under that mutex and handed to the consumer after it is released,
/// one deliverer at a time, so the consumer sees them in finalize order.
#[derive(Clone)]
pub struct CandleAggregator {
    config: AggregatorConfig,
    state: Arc<Mutex<AggregatorState>>,
    delivery: Arc<Mutex<()>>,
    consumer: Arc<CandleConsumer>,
}

impl CandleAggregator {
    /// Create an aggregator that hands finalized candles to `consumer`
    pub fn new<F>(config: AggregatorConfig, consumer: F) -> Self
    where
        F: Fn(Candle) + Send + Sync + 'static,
    {
        Self {
            config,
            state: Arc::new(Mutex::new(AggregatorState::default())),
            delivery: Arc::new(Mutex::new(())),
            consumer: Arc::new(consumer),
        }
    }

    pub fn interval_secs(&self) -> i64 {
        self.config.interval_secs
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    fn bucket_start(&self, event_time: i64) -> i64 {
        event_time.div_euclid(self.config.interval_secs) * self.config.interval_secs
    }

    fn bucket_end(&self, bucket_start: i64) -> i64 {
        bucket_start.saturating_add(self.config.interval_secs)
    }

    fn lock(&self) -> Result<MutexGuard<'_, AggregatorState>, IngestError> {
        self.state.lock().map_err(|_| IngestError::Poisoned)
    }

    /// Fold a trade into the current bucket
    ///
    /// A trade at or past the bucket boundary finalizes the current bucket and
    /// seeds the next one. Malformed trades are logged and dropped.
    pub fn ingest_trade(&self, trade: Trade) -> Result<IngestOutcome, IngestError> {
        if let Err(e) = validate_trade(&trade) {
            tracing::warn!(symbol = %self.config.symbol, ?trade, "Dropping trade: {}", e);
            return Err(e);
        }

        let bucket_start = self.bucket_start(trade.event_time);

        let outcome = {
            let mut guard = self.lock()?;
            let state = &mut *guard;

            match state.current.as_mut() {
                None => {
                    if state
                        .last_finalized_start
                        .is_some_and(|last| bucket_start <= last)
                    {
                        tracing::debug!(
                            symbol = %self.config.symbol,
                            event_time = trade.event_time,
                            "Dropping trade for an already finalized bucket"
                        );
                        return Err(IngestError::Stale {
                            event_time: trade.event_time,
                            bucket_start,
                        });
                    }

                    tracing::debug!(
                        symbol = %self.config.symbol,
                        bucket_start,
                        price = trade.price,
                        "Starting new candle"
                    );
                    state.current = Some(Candle::from_trade(&self.config.symbol, bucket_start, &trade));
                    IngestOutcome::Started
                }
                Some(current) if trade.event_time < self.bucket_end(current.bucket_start) => {
                    current.close = trade.price;
                    current.high = current.high.max(trade.price);
                    current.low = current.low.min(trade.price);
                    current.volume += trade.quantity;
                    IngestOutcome::Updated
                }
                Some(_) => {
                    let finalized = self.finalize_locked(state);
                    state.current = Some(Candle::from_trade(&self.config.symbol, bucket_start, &trade));
                    match finalized {
                        Some(finalized) => IngestOutcome::Rolled { finalized },
                        None => IngestOutcome::Started,
                    }
                }
            }
        };

        if let IngestOutcome::Rolled { finalized } = &outcome {
            tracing::info!(symbol = %self.config.symbol, candle = ?finalized, "Candle finalized");
            self.deliver_pending()?;
        }

        Ok(outcome)
    }

    /// Finalize the current bucket if its interval has elapsed at `now` (Unix seconds)
    ///
    /// No replacement bucket is started; the next trade opens a fresh one.
    /// Calling this while the bucket is still open does nothing.
    pub fn check_timeout(&self, now: i64) -> Result<Option<Candle>, IngestError> {
        let finalized = {
            let mut state = self.lock()?;

            let expired = state
                .current
                .as_ref()
                .is_some_and(|c| now >= self.bucket_end(c.bucket_start));
            if !expired {
                return Ok(None);
            }

            self.finalize_locked(&mut state)
        };

        if let Some(candle) = &finalized {
            tracing::info!(symbol = %self.config.symbol, candle = ?candle, "Candle finalized by timeout");
            self.deliver_pending()?;
        }

        Ok(finalized)
    }

    /// Take the current bucket, transform it, record it in history and queue it
    ///
    /// Must run under the state lock so Heikin-Ashi candles chain in finalize order.
    fn finalize_locked(&self, state: &mut AggregatorState) -> Option<Candle> {
        let raw = state.current.take()?;

        let finalized = if self.config.heikin_ashi {
            to_heikin_ashi(&raw, state.history.back())
        } else {
            raw
        };

        state.last_finalized_start = Some(finalized.bucket_start);
        state.history.push_back(finalized.clone());
        while state.history.len() > self.config.history_capacity {
            state.history.pop_front();
        }
        state.outbox.push_back(finalized.clone());

        Some(finalized)
    }

    /// Hand queued candles to the consumer, oldest first
    ///
    /// Only one caller delivers at a time. A caller that finds delivery busy
    /// (another thread, or the consumer calling back in) leaves its candles
    /// to the active deliverer, which re-checks the queue before returning.
    fn deliver_pending(&self) -> Result<(), IngestError> {
        loop {
            let delivering = match self.delivery.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => return Ok(()),
                Err(TryLockError::Poisoned(_)) => return Err(IngestError::Poisoned),
            };

            loop {
                let next = self.lock()?.outbox.pop_front();
                match next {
                    Some(candle) => (self.consumer)(candle),
                    None => break,
                }
            }

            drop(delivering);
            if self.lock()?.outbox.is_empty() {
                return Ok(());
            }
        }
    }

    /// Snapshot of the in-progress bucket
    pub fn current_candle(&self) -> Result<Option<Candle>, IngestError> {
        Ok(self.lock()?.current.clone())
    }

    /// Finalized candles, oldest first
    pub fn history(&self) -> Result<Vec<Candle>, IngestError> {
        Ok(self.lock()?.history.iter().cloned().collect())
    }
}

fn validate_trade(trade: &Trade) -> Result<(), IngestError> {
    if !trade.price.is_finite() || trade.price <= 0.0 {
        return Err(IngestError::Malformed(format!("invalid price {}", trade.price)));
    }
    if !trade.quantity.is_finite() || trade.quantity < 0.0 {
        return Err(IngestError::Malformed(format!(
            "invalid quantity {}",
            trade.quantity
        )));
    }
    if !(0..=MAX_EVENT_TIME).contains(&trade.event_time) {
        return Err(IngestError::Malformed(format!(
            "invalid event time {}",
            trade.event_time
        )));
    }
    Ok(())
}

// Trade transport and aggregator drivers
pub mod kraken;

pub use kraken::{parse_message, KrakenTradeFeed};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::error::IngestError;
use crate::execution::CandleAggregator;
use crate::models::Trade;

/// Feed every received trade into the aggregator until the channel closes
pub async fn ingest_loop(aggregator: CandleAggregator, mut rx: mpsc::Receiver<Trade>) {
    let mut dropped = 0u64;

    while let Some(trade) = rx.recv().await {
        match aggregator.ingest_trade(trade) {
            Ok(_) => {}
            Err(IngestError::Poisoned) => {
                tracing::error!("Aggregator state poisoned, stopping ingest loop");
                return;
            }
            Err(_) => dropped += 1,
        }
    }

    tracing::info!(dropped, "Trade channel closed, ingest loop stopping");
}

/// Periodically close a bucket whose interval elapsed without a new trade
pub async fn timeout_loop(aggregator: CandleAggregator, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match aggregator.check_timeout(Utc::now().timestamp()) {
            Ok(Some(candle)) => {
                tracing::debug!(bucket = candle.bucket_start, "Bucket closed on timeout")
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Timeout check failed: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::AggregatorConfig;
    use crate::models::Candle;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_ingest_loop_drains_channel() {
        let finalized: Arc<Mutex<Vec<Candle>>> = Arc::default();
        let sink = finalized.clone();
        let aggregator = CandleAggregator::new(
            AggregatorConfig {
                heikin_ashi: false,
                ..AggregatorConfig::default()
            },
            move |c| sink.lock().unwrap().push(c),
        );

        let (tx, rx) = mpsc::channel(16);
        tx.send(Trade::new(100.0, 1.0, 0)).await.unwrap();
        tx.send(Trade::new(-1.0, 1.0, 3)).await.unwrap(); // Malformed, dropped
        tx.send(Trade::new(102.0, 2.0, 5)).await.unwrap();
        tx.send(Trade::new(101.0, 1.0, 12)).await.unwrap();
        drop(tx);

        ingest_loop(aggregator.clone(), rx).await;

        let finalized = finalized.lock().unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].close, 102.0);
        assert_eq!(finalized[0].volume, 3.0);
        assert_eq!(aggregator.current_candle().unwrap().unwrap().open, 101.0);
    }

    #[tokio::test]
    async fn test_timeout_loop_closes_stale_bucket() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let aggregator = CandleAggregator::new(AggregatorConfig::default(), move |c| {
            let _ = tx.send(c);
        });

        // A bucket from 1970 is long past its interval
        aggregator.ingest_trade(Trade::new(100.0, 1.0, 0)).unwrap();

        let handle = tokio::spawn(timeout_loop(aggregator.clone(), Duration::from_millis(10)));
        let candle = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        handle.abort();

        assert_eq!(candle.bucket_start, 0);
        assert!(aggregator.current_candle().unwrap().is_none());
    }
}

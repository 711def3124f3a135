use async_trait::async_trait;
use candlebot::db::TradeStore;
use candlebot::error::{ExecutionError, NotifyError, StoreError};
use candlebot::execution::{
    AggregatorConfig, CandleAggregator, DecisionPipeline, LifecycleConfig, PositionLifecycle,
    Transition,
};
use candlebot::gateway::{OrderGateway, TpSlOrders};
use candlebot::notify::Notifier;
use candlebot::strategy::{DecisionEngine, ScoringConfig};
use candlebot::*;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Clone, Default)]
struct RecordingGateway {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingGateway {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl OrderGateway for RecordingGateway {
    async fn open_long(&self, symbol: &str, size: f64) -> std::result::Result<(), ExecutionError> {
        self.record(format!("open_long {} {}", symbol, size));
        Ok(())
    }

    async fn open_short(&self, symbol: &str, size: f64) -> std::result::Result<(), ExecutionError> {
        self.record(format!("open_short {} {}", symbol, size));
        Ok(())
    }

    async fn close_market(
        &self,
        symbol: &str,
        side: Side,
        size: f64,
    ) -> std::result::Result<(), ExecutionError> {
        self.record(format!("close_market {} {} {}", symbol, side, size));
        Ok(())
    }

    async fn place_tp_sl(
        &self,
        _symbol: &str,
        side: Side,
        _size: f64,
        tp_price: f64,
        sl_price: f64,
    ) -> std::result::Result<TpSlOrders, ExecutionError> {
        self.record(format!("place_tp_sl {} {:.4} {:.4}", side, tp_price, sl_price));
        Ok(TpSlOrders {
            tp_order_id: Some("tp-1".to_string()),
            sl_order_id: Some("sl-1".to_string()),
        })
    }
}

#[derive(Clone, Default)]
struct RecordingStore {
    trades: Arc<Mutex<Vec<TradeRecord>>>,
}

#[async_trait]
impl TradeStore for RecordingStore {
    async fn save_trade(&self, record: &TradeRecord) -> std::result::Result<(), StoreError> {
        self.trades.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn all_trades(&self) -> std::result::Result<Vec<TradeRecord>, StoreError> {
        Ok(self.trades.lock().unwrap().clone())
    }

    async fn trades_by_symbol(
        &self,
        symbol: &str,
        limit: usize,
    ) -> std::result::Result<Vec<TradeRecord>, StoreError> {
        Ok(self
            .trades
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|t| t.symbol == symbol)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, text: &str) -> std::result::Result<(), NotifyError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct Harness {
    gateway: RecordingGateway,
    store: RecordingStore,
    notifier: RecordingNotifier,
}

impl Harness {
    fn new() -> Self {
        Self {
            gateway: RecordingGateway::default(),
            store: RecordingStore::default(),
            notifier: RecordingNotifier::default(),
        }
    }

    fn lifecycle(&self) -> PositionLifecycle {
        PositionLifecycle::new(
            LifecycleConfig {
                flip_settle_delay: Duration::ZERO,
                ..LifecycleConfig::default()
            },
            Arc::new(self.gateway.clone()),
            Arc::new(self.store.clone()),
            Arc::new(self.notifier.clone()),
        )
    }

    fn pipeline(&self) -> DecisionPipeline {
        DecisionPipeline::new(DecisionEngine::new(ScoringConfig::default()), self.lifecycle())
    }
}

fn candle(i: usize, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        symbol: "PF_ETHUSD".to_string(),
        bucket_start: 1_700_000_000 + i as i64 * 10,
        open,
        high,
        low,
        close,
        volume: 1.0,
    }
}

/// Closes fall every bar while each body is green: RSI pinned low, bullish pattern
fn falling_bullish(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 100.0 - i as f64;
            candle(i, close - 0.5, close, close - 0.5, close)
        })
        .collect()
}

/// Closes rise every bar while each body is red: RSI pinned high, bearish pattern
fn rising_bearish(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64;
            candle(i, close + 0.5, close + 0.5, close, close)
        })
        .collect()
}

#[tokio::test]
async fn test_bullish_oversold_bars_open_long() {
    let _ = tracing_subscriber::fmt::try_init();

    let harness = Harness::new();
    let mut pipeline = harness.pipeline();

    let mut results = Vec::new();
    for c in falling_bullish(15) {
        results.push(pipeline.process(c).await);
    }

    // Neutral until rsi_period + 1 candles are in the window
    assert!(results[..14]
        .iter()
        .all(|(action, score, _)| *action == Action::Hold && *score == 0));

    let (action, score, transition) = &results[14];
    assert_eq!(*action, Action::Buy);
    assert!(*score >= 60);
    assert_eq!(
        *transition,
        Transition::Opened {
            side: Side::Long,
            entry_price: 86.0
        }
    );

    let position = pipeline.lifecycle().position().unwrap();
    assert_eq!(position.side, Side::Long);
    assert_eq!(position.tp_order_id.as_deref(), Some("tp-1"));
    assert_eq!(position.sl_order_id.as_deref(), Some("sl-1"));

    assert_eq!(
        harness.gateway.calls(),
        vec![
            "open_long PF_ETHUSD 0.02".to_string(),
            "place_tp_sl long 86.4300 85.5700".to_string(),
        ]
    );
    assert_eq!(harness.notifier.messages.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bearish_overbought_bars_close_long_on_opposing_signal() {
    let harness = Harness::new();
    let mut pipeline = harness.pipeline();

    // Long opened just below the final close: pnl stays under the 0.5% gain threshold
    let opened = pipeline
        .lifecycle_mut()
        .open(Side::Long, 113.5, Utc::now())
        .await;
    assert!(matches!(opened, Transition::Opened { .. }));

    let mut last = None;
    for c in rising_bearish(15) {
        last = Some(pipeline.process(c).await);
    }

    let (action, score, transition) = last.unwrap();
    assert_eq!(action, Action::Sell);
    assert!(score <= -60);

    let Transition::Reopened {
        record,
        side,
        entry_price,
    } = transition
    else {
        panic!("expected close and re-entry, got {:?}", transition);
    };
    assert_eq!(record.exit_reason, ExitReason::OpposingSignal);
    assert_eq!(record.side, Side::Long);
    assert_eq!(record.exit_price, 114.0);
    assert_eq!(record.pnl_percent, 0.44);
    assert_eq!(side, Side::Short);
    assert_eq!(entry_price, 114.0);

    let stored = harness.store.trades.lock().unwrap().clone();
    assert_eq!(stored, vec![record]);

    let calls = harness.gateway.calls();
    assert_eq!(calls[2], "close_market PF_ETHUSD long 0.02");
    assert_eq!(calls[3], "open_short PF_ETHUSD 0.02");
    assert_eq!(pipeline.lifecycle().position().unwrap().side, Side::Short);
}

#[tokio::test]
async fn test_gain_threshold_closes_on_hold() {
    let harness = Harness::new();
    let mut lifecycle = harness.lifecycle();

    lifecycle.open(Side::Short, 2000.0, Utc::now()).await;

    // Short gains 0.6% as price drops
    let transition = lifecycle
        .on_candle(&candle(0, 1990.0, 1990.0, 1988.0, 1988.0), Action::Hold)
        .await;
    let Transition::Closed { record } = transition else {
        panic!("expected close, got {:?}", transition);
    };

    assert_eq!(record.exit_reason, ExitReason::GainThreshold);
    assert_eq!(record.pnl_percent, 0.6);
    assert!(lifecycle.position().is_none());
    assert_eq!(
        harness.store.trades_by_symbol("PF_ETHUSD", 5).await.unwrap(),
        vec![record]
    );
}

#[tokio::test]
async fn test_invariants_open_while_open_and_close_while_flat() {
    let harness = Harness::new();
    let mut lifecycle = harness.lifecycle();

    let closed = lifecycle
        .close(100.0, ExitReason::OpposingSignal, Utc::now())
        .await;
    assert!(closed.is_none());
    assert!(harness.gateway.calls().is_empty());

    lifecycle.open(Side::Long, 100.0, Utc::now()).await;
    let second = lifecycle.open(Side::Short, 101.0, Utc::now()).await;
    assert!(matches!(second, Transition::Rejected { .. }));

    assert_eq!(lifecycle.position().unwrap().side, Side::Long);
    assert_eq!(
        harness
            .gateway
            .calls()
            .iter()
            .filter(|c| c.starts_with("open_"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_trades_flow_through_aggregator_into_pipeline() {
    let harness = Harness::new();
    let (candle_tx, candle_rx) = mpsc::unbounded_channel();

    let aggregator = CandleAggregator::new(
        AggregatorConfig {
            symbol: "PF_ETHUSD".to_string(),
            interval_secs: 10,
            heikin_ashi: false,
            history_capacity: 100,
        },
        move |c| {
            candle_tx.send(c).unwrap();
        },
    );

    // Two trades per bucket draw a green bar whose close falls bar over bar
    for i in 0..16i64 {
        let close = 100.0 - i as f64;
        aggregator
            .ingest_trade(Trade::new(close - 0.5, 1.0, i * 10))
            .unwrap();
        aggregator
            .ingest_trade(Trade::new(close, 1.0, i * 10 + 5))
            .unwrap();
    }
    assert_eq!(aggregator.history().unwrap().len(), 15);
    drop(aggregator);

    tokio::time::timeout(Duration::from_secs(5), harness.pipeline().run(candle_rx))
        .await
        .unwrap();

    let calls = harness.gateway.calls();
    assert_eq!(calls.first().map(String::as_str), Some("open_long PF_ETHUSD 0.02"));
    assert!(harness.store.trades.lock().unwrap().is_empty());
}

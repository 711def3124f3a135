use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single executed trade from the exchange feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub price: f64,
    pub quantity: f64,
    pub event_time: i64, // Unix seconds
}

impl Trade {
    pub fn new(price: f64, quantity: f64, event_time: i64) -> Self {
        Self {
            price,
            quantity,
            event_time,
        }
    }
}

/// OHLCV candlestick for one fixed-interval bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub bucket_start: i64, // Unix seconds, aligned to the interval
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Start a new bucket seeded by a single trade
    pub fn from_trade(symbol: &str, bucket_start: i64, trade: &Trade) -> Self {
        Self {
            symbol: symbol.to_string(),
            bucket_start,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: trade.quantity,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Signed body size (close - open)
    pub fn body(&self) -> f64 {
        self.close - self.open
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.bucket_start, 0)
            .single()
            .unwrap_or_default()
    }
}

/// Direction of an open position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }

    /// Order side used to enter this position
    pub fn entry_order_side(&self) -> &'static str {
        match self {
            Side::Long => "buy",
            Side::Short => "sell",
        }
    }

    /// Order side used to exit this position
    pub fn exit_order_side(&self) -> &'static str {
        match self {
            Side::Long => "sell",
            Side::Short => "buy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "long" => Some(Side::Long),
            "short" => Some(Side::Short),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trading action derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// Side a position would take when opened on this action
    pub fn entry_side(&self) -> Option<Side> {
        match self {
            Action::Buy => Some(Side::Long),
            Action::Sell => Some(Side::Short),
            Action::Hold => None,
        }
    }

    /// True when the action points against an open position of `side`
    pub fn opposes(&self, side: Side) -> bool {
        matches!(
            (self, side),
            (Action::Sell, Side::Long) | (Action::Buy, Side::Short)
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::Hold => "hold",
        })
    }
}

/// The single open position for the traded symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub size: f64,
    pub open_time: DateTime<Utc>,
    pub tp_order_id: Option<String>,
    pub sl_order_id: Option<String>,
}

impl Position {
    /// Unrealized P&L in percent at `current_price`
    pub fn pnl_pct(&self, current_price: f64) -> f64 {
        match self.side {
            Side::Long => (current_price - self.entry_price) / self.entry_price * 100.0,
            Side::Short => (self.entry_price - current_price) / self.entry_price * 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    OpposingSignal,
    GainThreshold,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::OpposingSignal => "OpposingSignal",
            ExitReason::GainThreshold => "GainThreshold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OpposingSignal" => Some(ExitReason::OpposingSignal),
            "GainThreshold" => Some(ExitReason::GainThreshold),
            _ => None,
        }
    }
}

/// Closed trade, written once per closed position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl_percent: f64, // Rounded to 2 decimals
    pub exit_reason: ExitReason,
    pub timestamp: DateTime<Utc>,
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_from_trade() {
        let trade = Trade::new(101.5, 0.3, 1_700_000_007);
        let candle = Candle::from_trade("PF_ETHUSD", 1_700_000_000, &trade);

        assert_eq!(candle.open, 101.5);
        assert_eq!(candle.high, 101.5);
        assert_eq!(candle.low, 101.5);
        assert_eq!(candle.close, 101.5);
        assert_eq!(candle.volume, 0.3);
        assert_eq!(candle.timestamp().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_position_pnl_by_side() {
        let mut position = Position {
            id: Uuid::new_v4(),
            symbol: "PF_ETHUSD".to_string(),
            side: Side::Long,
            entry_price: 200.0,
            size: 0.02,
            open_time: Utc::now(),
            tp_order_id: None,
            sl_order_id: None,
        };

        assert_eq!(position.pnl_pct(202.0), 1.0);

        position.side = Side::Short;
        assert_eq!(position.pnl_pct(202.0), -1.0);
        assert_eq!(position.pnl_pct(198.0), 1.0);
    }

    #[test]
    fn test_action_opposes() {
        assert!(Action::Sell.opposes(Side::Long));
        assert!(Action::Buy.opposes(Side::Short));
        assert!(!Action::Buy.opposes(Side::Long));
        assert!(!Action::Hold.opposes(Side::Short));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.456), 0.46);
        assert_eq!(round2(-1.234), -1.23);
    }
}

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::IngestError;
use crate::execution::candle_aggregator::MAX_EVENT_TIME;
use crate::models::Trade;

/// Parse one Kraken futures websocket message into trades
///
/// `event` messages (info, subscribed, heartbeats) and unknown feeds yield
/// nothing. Each trade in a snapshot is parsed independently, so one bad
/// entry does not drop its neighbours.
pub fn parse_message(text: &str) -> Vec<Result<Trade, IngestError>> {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => return vec![Err(IngestError::Malformed(format!("invalid JSON: {}", e)))],
    };

    if value.get("event").is_some() {
        return Vec::new();
    }

    match value.get("feed").and_then(Value::as_str) {
        Some("trade_snapshot") => match value.get("trades").and_then(Value::as_array) {
            Some(trades) => trades.iter().map(parse_trade).collect(),
            None => vec![Err(IngestError::Malformed(
                "trade_snapshot without trades array".to_string(),
            ))],
        },
        Some("trade") => vec![parse_trade(&value)],
        _ => Vec::new(),
    }
}

fn parse_trade(value: &Value) -> Result<Trade, IngestError> {
    let price = number_field(value, "price")?;
    let quantity = number_field(value, "qty")?;
    let time_secs = (number_field(value, "time")? / 1000.0).floor();

    if !(0.0..=MAX_EVENT_TIME as f64).contains(&time_secs) {
        return Err(IngestError::Malformed(format!(
            "trade time out of range: {}",
            time_secs
        )));
    }

    Ok(Trade::new(price, quantity, time_secs as i64))
}

/// Finite numeric field that may arrive as a JSON number or a numeric string
fn number_field(value: &Value, key: &str) -> Result<f64, IngestError> {
    let field = value
        .get(key)
        .ok_or_else(|| IngestError::Malformed(format!("missing field `{}`", key)))?;

    let parsed = match field {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| IngestError::Malformed(format!("field `{}` is not numeric: {}", key, field)))
}

/// Websocket client for the Kraken futures public trade feed
#[derive(Debug, Clone)]
pub struct KrakenTradeFeed {
    url: String,
    symbol: String,
}

impl KrakenTradeFeed {
    pub fn new(url: &str, symbol: &str) -> Self {
        Self {
            url: url.to_string(),
            symbol: symbol.to_string(),
        }
    }

    pub fn subscribe_message(&self) -> String {
        json!({
            "event": "subscribe",
            "feed": "trade",
            "product_ids": [self.symbol],
        })
        .to_string()
    }

    /// Connect, subscribe and forward trades until the socket or the channel closes
    pub async fn run(&self, tx: mpsc::Sender<Trade>) -> Result<()> {
        tracing::info!(url = %self.url, symbol = %self.symbol, "Connecting to trade feed");

        let (ws, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("failed to connect to {}", self.url))?;
        let (mut write, mut read) = ws.split();

        write
            .send(Message::Text(self.subscribe_message()))
            .await
            .context("failed to send subscribe message")?;
        tracing::info!(symbol = %self.symbol, "📡 Subscribed to trade feed");

        while let Some(msg) = read.next().await {
            let text = match msg.context("websocket read failed")? {
                Message::Text(text) => text,
                Message::Ping(payload) => {
                    if let Err(e) = write.send(Message::Pong(payload)).await {
                        tracing::warn!(symbol = %self.symbol, "Failed to answer ping: {}", e);
                    }
                    continue;
                }
                Message::Close(frame) => {
                    tracing::warn!(?frame, "Trade feed closed by server");
                    break;
                }
                _ => continue,
            };

            for parsed in parse_message(&text) {
                match parsed {
                    Ok(trade) => {
                        if tx.send(trade).await.is_err() {
                            tracing::info!("Trade channel closed, stopping feed");
                            return Ok(());
                        }
                    }
                    Err(e) => tracing::warn!(raw = %text, "Skipping trade: {}", e),
                }
            }
        }

        tracing::warn!(symbol = %self.symbol, "Trade feed stream ended");
        Ok(())
    }
}

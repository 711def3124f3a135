use crate::models::Candle;

/// Convert a raw candle into its Heikin-Ashi form
///
/// `previous` must be the last Heikin-Ashi candle produced for this symbol;
/// without one the open is seeded from the raw candle's own open and close.
pub fn to_heikin_ashi(raw: &Candle, previous: Option<&Candle>) -> Candle {
    let ha_open = match previous {
        Some(prev) => (prev.open + prev.close) / 2.0,
        None => (raw.open + raw.close) / 2.0,
    };
    let ha_close = (raw.open + raw.high + raw.low + raw.close) / 4.0;

    Candle {
        symbol: raw.symbol.clone(),
        bucket_start: raw.bucket_start,
        open: ha_open,
        high: raw.high.max(ha_open).max(ha_close),
        low: raw.low.min(ha_open).min(ha_close),
        close: ha_close,
        volume: raw.volume,
    }
}

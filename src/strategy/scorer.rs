use std::collections::VecDeque;

use super::ScoringConfig;
use crate::indicators::{calculate_average_volume, rsi_or_neutral};
use crate::models::Candle;

pub const RSI_OVERSOLD: f64 = 35.0;
pub const RSI_OVERBOUGHT: f64 = 65.0;

/// Share of the high-low range a body must exceed to count as a strong candle
pub const STRONG_BODY_RATIO: f64 = 0.6;

const PATTERN_POINTS: i32 = 30;
const RSI_POINTS: i32 = 30;
const BODY_POINTS: i32 = 20;
const VOLUME_POINTS: i32 = 10;

/// Individual score components for the latest candle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub pattern: i32,
    pub rsi_signal: i32,
    pub body: i32,
    pub volume: i32,
    pub rsi: f64,
}

impl ScoreBreakdown {
    /// Signed total, always within [-90, 90]
    pub fn total(&self) -> i32 {
        self.pattern + self.rsi_signal + self.body + self.volume
    }
}

/// Score a time-ordered candle slice (oldest first)
///
/// Returns a neutral breakdown (score 0, RSI 50) until `rsi_period + 1`
/// candles are available.
pub fn score_candles(candles: &[Candle], config: &ScoringConfig) -> ScoreBreakdown {
    if candles.len() < config.min_candles_required() {
        return ScoreBreakdown {
            rsi: crate::indicators::NEUTRAL_RSI,
            ..ScoreBreakdown::default()
        };
    }

    let latest = &candles[candles.len() - 1];
    let previous = &candles[candles.len() - 2];

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let rsi = rsi_or_neutral(&closes, config.rsi_period);

    let pattern = if latest.is_bullish() && previous.is_bullish() {
        PATTERN_POINTS
    } else if latest.is_bearish() && previous.is_bearish() {
        -PATTERN_POINTS
    } else {
        0
    };

    let rsi_signal = if rsi < RSI_OVERSOLD {
        RSI_POINTS
    } else if rsi > RSI_OVERBOUGHT {
        -RSI_POINTS
    } else {
        0
    };

    let strong_body = latest.range() * STRONG_BODY_RATIO;
    let body = if latest.body() > strong_body {
        BODY_POINTS
    } else if -latest.body() > strong_body {
        -BODY_POINTS
    } else {
        0
    };

    // Volume only amplifies an existing direction; a flat running score stays flat
    let running = pattern + rsi_signal + body;
    let above_average = calculate_average_volume(candles, config.volume_period)
        .is_some_and(|avg| latest.volume > avg);
    let volume = match (above_average, running.signum()) {
        (true, 1) => VOLUME_POINTS,
        (true, -1) => -VOLUME_POINTS,
        _ => 0,
    };

    ScoreBreakdown {
        pattern,
        rsi_signal,
        body,
        volume,
        rsi,
    }
}

/// Rolling window of finalized candles and the indicator score over it
#[derive(Debug, Clone)]
pub struct IndicatorScorer {
    window: VecDeque<Candle>,
    config: ScoringConfig,
}

impl IndicatorScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window_capacity + 1),
            config,
        }
    }

    /// Append a finalized candle, dropping the oldest past capacity
    pub fn update(&mut self, candle: Candle) {
        self.window.push_back(candle);

        while self.window.len() > self.config.window_capacity {
            self.window.pop_front();
        }
    }

    /// RSI at the latest candle (50 with insufficient history)
    pub fn rsi(&self) -> f64 {
        let closes: Vec<f64> = self.window.iter().map(|c| c.close).collect();
        rsi_or_neutral(&closes, self.config.rsi_period)
    }

    pub fn breakdown(&self) -> ScoreBreakdown {
        let candles: Vec<Candle> = self.window.iter().cloned().collect();
        score_candles(&candles, &self.config)
    }

    pub fn score(&self) -> i32 {
        self.breakdown().total()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.window.back()
    }

    pub fn candles(&self) -> impl Iterator<Item = &Candle> {
        self.window.iter()
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }
}

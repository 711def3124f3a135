use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

use crate::execution::LifecycleConfig;
use crate::strategy::ScoringConfig;

/// Process settings, loaded from defaults and `BOT_*` environment variables
///
/// # Example
/// ```
/// use candlebot::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.candle_interval_secs, 10);
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub symbol: String,
    pub ws_url: String,
    pub candle_interval_secs: i64,
    pub use_heikin_ashi: bool,
    pub rsi_period: usize,
    pub score_threshold: i32,
    pub window_capacity: usize,
    pub volume_period: usize,
    pub tp_pct: Option<f64>,
    pub sl_pct: Option<f64>,
    pub min_gain_to_close_pct: f64,
    pub flip_settle_delay_ms: u64,
    pub order_size: f64,
    pub timeout_check_secs: u64,
    pub trade_channel_capacity: usize,
    pub database_url: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbol: "PF_ETHUSD".to_string(),
            ws_url: "wss://futures.kraken.com/ws/v1".to_string(),
            candle_interval_secs: 10,
            use_heikin_ashi: true,
            rsi_period: 14,
            score_threshold: 60,
            window_capacity: 100,
            volume_period: 10,
            tp_pct: Some(0.5),
            sl_pct: Some(0.5),
            min_gain_to_close_pct: 0.5,
            flip_settle_delay_ms: 1000,
            order_size: 0.02,
            timeout_check_secs: 11, // Interval + 1s
            trade_channel_capacity: 1024,
            database_url: None,
            telegram_token: None,
            telegram_chat_id: None,
            log_filter: "candlebot=info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings: built-in defaults overridden by `BOT_*` environment variables
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix("BOT").try_parsing(true))
    }

    fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        let d = Settings::default();

        let settings: Settings = Config::builder()
            .set_default("symbol", d.symbol)?
            .set_default("ws_url", d.ws_url)?
            .set_default("candle_interval_secs", d.candle_interval_secs)?
            .set_default("use_heikin_ashi", d.use_heikin_ashi)?
            .set_default("rsi_period", d.rsi_period as u64)?
            .set_default("score_threshold", d.score_threshold as i64)?
            .set_default("window_capacity", d.window_capacity as u64)?
            .set_default("volume_period", d.volume_period as u64)?
            .set_default("tp_pct", d.tp_pct)?
            .set_default("sl_pct", d.sl_pct)?
            .set_default("min_gain_to_close_pct", d.min_gain_to_close_pct)?
            .set_default("flip_settle_delay_ms", d.flip_settle_delay_ms)?
            .set_default("order_size", d.order_size)?
            .set_default("timeout_check_secs", d.timeout_check_secs)?
            .set_default("trade_channel_capacity", d.trade_channel_capacity as u64)?
            .set_default("log_filter", d.log_filter)?
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject parameter combinations the bot cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Message(msg.to_string()));

        if self.symbol.trim().is_empty() {
            return invalid("symbol must not be empty");
        }
        if self.candle_interval_secs <= 0 {
            return invalid("candle_interval_secs must be positive");
        }
        if self.rsi_period == 0 {
            return invalid("rsi_period must be positive");
        }
        if !(1..=90).contains(&self.score_threshold) {
            return invalid("score_threshold must be within 1..=90");
        }
        if self.window_capacity < self.rsi_period + 1 {
            return invalid("window_capacity must hold at least rsi_period + 1 candles");
        }
        if self.volume_period == 0 {
            return invalid("volume_period must be positive");
        }
        if self.order_size <= 0.0 {
            return invalid("order_size must be positive");
        }
        if self.tp_pct.is_some_and(|p| p < 0.0) || self.sl_pct.is_some_and(|p| p < 0.0) {
            return invalid("tp_pct and sl_pct must not be negative");
        }
        if self.min_gain_to_close_pct < 0.0 {
            return invalid("min_gain_to_close_pct must not be negative");
        }
        if self.trade_channel_capacity == 0 {
            return invalid("trade_channel_capacity must be positive");
        }
        Ok(())
    }

    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            rsi_period: self.rsi_period,
            score_threshold: self.score_threshold,
            window_capacity: self.window_capacity,
            volume_period: self.volume_period,
        }
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            symbol: self.symbol.clone(),
            order_size: self.order_size,
            tp_pct: self.tp_pct,
            sl_pct: self.sl_pct,
            min_gain_to_close_pct: self.min_gain_to_close_pct,
            flip_settle_delay: Duration::from_millis(self.flip_settle_delay_ms),
        }
    }

    /// Telegram credentials, when both halves are present
    pub fn telegram_credentials(&self) -> Option<(String, String)> {
        match (&self.telegram_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => {
                Some((token.clone(), chat.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_from(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_environment(
            Environment::with_prefix("BOT")
                .try_parsing(true)
                .source(Some(source)),
        )
    }

    #[test]
    fn test_defaults_load() {
        let settings = load_from(&[]).unwrap();
        assert_eq!(settings.symbol, "PF_ETHUSD");
        assert_eq!(settings.score_threshold, 60);
        assert_eq!(settings.window_capacity, 100);
        assert_eq!(settings.tp_pct, Some(0.5));
        assert!(settings.use_heikin_ashi);
        assert!(settings.telegram_credentials().is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let settings = load_from(&[
            ("BOT_SYMBOL", "PF_XBTUSD"),
            ("BOT_CANDLE_INTERVAL_SECS", "60"),
            ("BOT_USE_HEIKIN_ASHI", "false"),
            ("BOT_SCORE_THRESHOLD", "50"),
        ])
        .unwrap();

        assert_eq!(settings.symbol, "PF_XBTUSD");
        assert_eq!(settings.candle_interval_secs, 60);
        assert!(!settings.use_heikin_ashi);
        assert_eq!(settings.score_threshold, 50);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        assert!(load_from(&[("BOT_SCORE_THRESHOLD", "95")]).is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let settings = Settings {
            candle_interval_secs: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_lifecycle_config_mapping() {
        let settings = Settings {
            flip_settle_delay_ms: 250,
            ..Settings::default()
        };
        let lifecycle = settings.lifecycle_config();
        assert_eq!(lifecycle.flip_settle_delay, Duration::from_millis(250));
        assert_eq!(lifecycle.order_size, 0.02);
    }
}

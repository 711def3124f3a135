// Technical indicators module
// RSI, volume average and the Heikin-Ashi transform used by the scorer and aggregator

pub mod heikin_ashi;
pub mod rsi;
pub mod volume;

pub use heikin_ashi::to_heikin_ashi;
pub use rsi::{calculate_rsi, rsi_or_neutral, NEUTRAL_RSI};
pub use volume::calculate_average_volume;

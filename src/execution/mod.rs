// Candle aggregation and position execution
pub mod candle_aggregator;
pub mod lifecycle;
pub mod pipeline;
pub mod position_manager;

pub use candle_aggregator::{
    AggregatorConfig, CandleAggregator, CandleConsumer, IngestOutcome, MAX_EVENT_TIME,
};
pub use lifecycle::{LifecycleConfig, PositionLifecycle, Transition};
pub use pipeline::DecisionPipeline;
pub use position_manager::PositionManager;

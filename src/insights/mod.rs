mod aggregator;
pub mod reach;
pub mod strategy;

pub use aggregator::InsightAggregator;

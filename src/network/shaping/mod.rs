//! Rate limiting decisions and the statistics they produce.

pub mod stats;
pub mod token_bucket;

pub use stats::{ShapingStatistics, StatisticsSnapshot};
pub use token_bucket::{admit, refill, BucketState, Decision, ShapingPolicy};

mod dataset;
mod metrics;
mod prediction;
mod rank_key;

pub use dataset::{Dataset, Rating, RatingScale};
pub use metrics::{mean, AlgorithmMetrics, FoldMetrics, MetricsBundle};
pub use prediction::{group_by_user, Prediction, PredictionDetails, ScoredItem};
pub use rank_key::RankKey;

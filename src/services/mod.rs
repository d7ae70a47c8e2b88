pub mod cross_validation;
pub mod folds;
pub mod personalization;
pub mod predictors;
pub mod ranking;
pub mod recommender;
pub mod refit;
pub mod registry;
pub mod selection;
pub mod top_n;

pub use cross_validation::{cross_validate, CvOptions};
pub use folds::{Fold, KFold};
pub use personalization::personalization;
pub use predictors::{PredictorError, RatingPredictor};
pub use ranking::{precision_recall_at_k, rmse, PrecisionRecall};
pub use recommender::Recommender;
pub use refit::{refit, ModelPackage, RefitOutput};
pub use registry::AlgorithmRegistry;
pub use selection::{select_best, MetricsSummary};
pub use top_n::{extract_top_n, TopNMap};

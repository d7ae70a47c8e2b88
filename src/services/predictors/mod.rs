//! Pluggable rating predictors
//!
//! The evaluation pipeline only talks to models through [`RatingPredictor`].
//! Any model that can be fitted on a ratings table and asked for an estimate
//! can be cross-validated, selected, refitted and served. The baselines here
//! let the pipeline run end to end without an external model library.
use thiserror::Error;

use crate::{
    error::{AppError, AppResult},
    models::{Dataset, Prediction, Rating},
};

pub mod baseline;
pub mod global_mean;
pub mod normal;

pub use baseline::BaselineOnly;
pub use global_mean::GlobalMean;
pub use normal::NormalPredictor;

/// Errors raised by a predictor while fitting or estimating
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("predictor has not been fitted")]
    NotFitted,
    #[error("training partition is empty")]
    EmptyTrainset,
    #[error("training failed: {0}")]
    Training(String),
    #[error("model state could not be exported: {0}")]
    State(String),
}

/// Trait for rating predictors
///
/// `fit` may be called repeatedly; each call replaces the previous model.
/// Any randomness must come from `seed` so that the same data and seed give
/// the same model.
#[cfg_attr(test, mockall::automock)]
pub trait RatingPredictor: Send + Sync {
    /// Display name, also the key in the algorithm registry
    fn name(&self) -> &'static str;

    /// Train on `trainset`, replacing any previous fit
    fn fit(&mut self, trainset: &Dataset, seed: u64) -> Result<(), PredictorError>;

    /// Estimate the rating `user_id` would give `item_id`
    fn predict(
        &self,
        user_id: &str,
        item_id: &str,
        true_rating: Option<f64>,
    ) -> Result<Prediction, PredictorError>;

    /// Predict every held-out rating, in input order
    fn test(&self, testset: &[Rating]) -> Result<Vec<Prediction>, PredictorError> {
        testset
            .iter()
            .map(|r| self.predict(&r.user_id, &r.item_id, Some(r.rating)))
            .collect()
    }

    /// Unfitted copy with the same hyperparameters, used to fit folds on worker threads
    fn boxed_clone(&self) -> Box<dyn RatingPredictor>;

    /// Serialized model for persistence
    fn state(&self) -> Result<serde_json::Value, PredictorError>;
}

/// The candidates evaluated by the binary, in ranking tie-break order
pub fn default_candidates() -> Vec<Box<dyn RatingPredictor>> {
    vec![
        Box::new(GlobalMean::default()),
        Box::new(BaselineOnly::default()),
        Box::new(NormalPredictor::default()),
    ]
}

/// Rebuilds a fitted built-in predictor from its persisted state
pub fn restore(name: &str, state: serde_json::Value) -> AppResult<Box<dyn RatingPredictor>> {
    let predictor: Box<dyn RatingPredictor> = match name {
        GlobalMean::NAME => Box::new(serde_json::from_value::<GlobalMean>(state)?),
        BaselineOnly::NAME => Box::new(serde_json::from_value::<BaselineOnly>(state)?),
        NormalPredictor::NAME => Box::new(serde_json::from_value::<NormalPredictor>(state)?),
        other => {
            return Err(AppError::InvalidArgument(format!(
                "no built-in predictor named {}",
                other
            )))
        }
    };
    Ok(predictor)
}

/// Exports a serializable predictor's state
pub(crate) fn export_state<T: serde::Serialize>(model: &T) -> Result<serde_json::Value, PredictorError> {
    serde_json::to_value(model).map_err(|e| PredictorError::State(e.to_string()))
}

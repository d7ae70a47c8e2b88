use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{Dataset, Prediction};
use crate::services::predictors::{self, RatingPredictor};

/// A predictor fitted on the whole dataset together with its predictions
pub struct RefitOutput {
    pub algorithm: String,
    pub predictions: Vec<Prediction>,
    pub predictor: Box<dyn RatingPredictor>,
}

/// Serializable form of a [`RefitOutput`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPackage {
    pub algorithm: String,
    pub trained_at: DateTime<Utc>,
    pub predictions: Vec<Prediction>,
    pub model: serde_json::Value,
}

impl RefitOutput {
    pub fn to_package(&self) -> AppResult<ModelPackage> {
        let model = self
            .predictor
            .state()
            .map_err(|source| AppError::predictor(self.algorithm.as_str(), None, source))?;
        Ok(ModelPackage {
            algorithm: self.algorithm.clone(),
            trained_at: Utc::now(),
            predictions: self.predictions.clone(),
            model,
        })
    }
}

impl ModelPackage {
    /// Restores the packaged model; only built-in predictors can be restored
    pub fn into_output(self) -> AppResult<RefitOutput> {
        let predictor = predictors::restore(&self.algorithm, self.model)?;
        Ok(RefitOutput {
            algorithm: self.algorithm,
            predictions: self.predictions,
            predictor,
        })
    }
}

/// Fits `predictor` on every rating in `dataset` and predicts every known rating
pub fn refit(
    dataset: &Dataset,
    mut predictor: Box<dyn RatingPredictor>,
    seed: u64,
) -> AppResult<RefitOutput> {
    if dataset.is_empty() {
        return Err(AppError::InsufficientData("dataset has no ratings".to_string()));
    }

    let algorithm = predictor.name().to_string();
    predictor
        .fit(dataset, seed)
        .map_err(|source| AppError::predictor(algorithm.as_str(), None, source))?;
    let predictions = predictor
        .test(&dataset.build_testset())
        .map_err(|source| AppError::predictor(algorithm.as_str(), None, source))?;

    tracing::info!(
        algorithm = algorithm.as_str(),
        predictions = predictions.len(),
        "Refit on full dataset"
    );

    Ok(RefitOutput {
        algorithm,
        predictions,
        predictor,
    })
}

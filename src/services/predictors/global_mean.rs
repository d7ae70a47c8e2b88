use serde::{Deserialize, Serialize};

use super::{export_state, PredictorError, RatingPredictor};
use crate::models::{Dataset, Prediction};

/// Predicts the training mean for every pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalMean {
    mean: Option<f64>,
}

impl GlobalMean {
    pub const NAME: &'static str = "GlobalMean";
}

impl RatingPredictor for GlobalMean {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fit(&mut self, trainset: &Dataset, _seed: u64) -> Result<(), PredictorError> {
        self.mean = Some(trainset.global_mean().ok_or(PredictorError::EmptyTrainset)?);
        Ok(())
    }

    fn predict(
        &self,
        user_id: &str,
        item_id: &str,
        true_rating: Option<f64>,
    ) -> Result<Prediction, PredictorError> {
        let mean = self.mean.ok_or(PredictorError::NotFitted)?;
        Ok(Prediction::new(user_id, item_id, true_rating, mean))
    }

    fn boxed_clone(&self) -> Box<dyn RatingPredictor> {
        Box::new(Self::default())
    }

    fn state(&self) -> Result<serde_json::Value, PredictorError> {
        export_state(self)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{export_state, PredictorError, RatingPredictor};
use crate::models::{Dataset, Prediction, PredictionDetails, RatingScale};

/// Global mean plus regularized user and item biases, fitted by alternating least squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineOnly {
    pub n_epochs: usize,
    pub reg_user: f64,
    pub reg_item: f64,
    #[serde(default)]
    model: Option<Biases>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Biases {
    mean: f64,
    scale: RatingScale,
    user: HashMap<String, f64>,
    item: HashMap<String, f64>,
}

impl Default for BaselineOnly {
    fn default() -> Self {
        Self::new(10, 15.0, 10.0)
    }
}

impl BaselineOnly {
    pub const NAME: &'static str = "BaselineOnly";

    pub fn new(n_epochs: usize, reg_user: f64, reg_item: f64) -> Self {
        Self {
            n_epochs,
            reg_user,
            reg_item,
            model: None,
        }
    }
}

impl RatingPredictor for BaselineOnly {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fit(&mut self, trainset: &Dataset, _seed: u64) -> Result<(), PredictorError> {
        let mean = trainset.global_mean().ok_or(PredictorError::EmptyTrainset)?;

        let mut users: HashMap<&str, usize> = HashMap::new();
        let mut items: HashMap<&str, usize> = HashMap::new();
        let mut rows = Vec::with_capacity(trainset.len());
        for rating in &trainset.ratings {
            let next_user = users.len();
            let u = *users.entry(rating.user_id.as_str()).or_insert(next_user);
            let next_item = items.len();
            let i = *items.entry(rating.item_id.as_str()).or_insert(next_item);
            rows.push((u, i, rating.rating));
        }

        let mut user_bias = vec![0.0; users.len()];
        let mut item_bias = vec![0.0; items.len()];
        for _ in 0..self.n_epochs {
            let mut sums = vec![0.0; items.len()];
            let mut counts = vec![0usize; items.len()];
            for &(u, i, r) in &rows {
                sums[i] += r - mean - user_bias[u];
                counts[i] += 1;
            }
            for i in 0..items.len() {
                item_bias[i] = sums[i] / (self.reg_item + counts[i] as f64);
            }

            let mut sums = vec![0.0; users.len()];
            let mut counts = vec![0usize; users.len()];
            for &(u, i, r) in &rows {
                sums[u] += r - mean - item_bias[i];
                counts[u] += 1;
            }
            for u in 0..users.len() {
                user_bias[u] = sums[u] / (self.reg_user + counts[u] as f64);
            }
        }

        self.model = Some(Biases {
            mean,
            scale: trainset.scale,
            user: users
                .into_iter()
                .map(|(id, u)| (id.to_string(), user_bias[u]))
                .collect(),
            item: items
                .into_iter()
                .map(|(id, i)| (id.to_string(), item_bias[i]))
                .collect(),
        });
        Ok(())
    }

    fn predict(
        &self,
        user_id: &str,
        item_id: &str,
        true_rating: Option<f64>,
    ) -> Result<Prediction, PredictorError> {
        let model = self.model.as_ref().ok_or(PredictorError::NotFitted)?;

        let user_bias = model.user.get(user_id).copied();
        let item_bias = model.item.get(item_id).copied();
        let estimate = model.mean + user_bias.unwrap_or(0.0) + item_bias.unwrap_or(0.0);

        let mut details = PredictionDetails::default();
        if user_bias.is_none() && item_bias.is_none() {
            details.was_impossible = true;
            details.reason = Some("user and item are unknown".to_string());
        }

        Ok(Prediction::new(user_id, item_id, true_rating, model.scale.clip(estimate))
            .with_details(details))
    }

    fn boxed_clone(&self) -> Box<dyn RatingPredictor> {
        Box::new(Self::new(self.n_epochs, self.reg_user, self.reg_item))
    }

    fn state(&self) -> Result<serde_json::Value, PredictorError> {
        export_state(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rating;

    fn trainset() -> Dataset {
        Dataset::new(
            vec![
                Rating::new("generous", "hit", 5.0),
                Rating::new("generous", "flop", 4.0),
                Rating::new("harsh", "hit", 3.0),
                Rating::new("harsh", "flop", 1.0),
            ],
            RatingScale::default(),
        )
    }

    #[test]
    fn test_biases_order_users_and_items() {
        let mut predictor = BaselineOnly::new(10, 0.0, 0.0);
        predictor.fit(&trainset(), 0).unwrap();

        let generous = predictor.predict("generous", "hit", None).unwrap().estimate;
        let harsh = predictor.predict("harsh", "hit", None).unwrap().estimate;
        let flop = predictor.predict("harsh", "flop", None).unwrap().estimate;
        assert!(generous > harsh);
        assert!(harsh > flop);
    }

    #[test]
    fn test_unknown_pair_falls_back_to_mean() {
        let mut predictor = BaselineOnly::default();
        predictor.fit(&trainset(), 0).unwrap();

        let prediction = predictor.predict("stranger", "new", None).unwrap();
        assert_eq!(prediction.estimate, 3.25);
        assert!(prediction.details.was_impossible);

        let known_user = predictor.predict("generous", "new", None).unwrap();
        assert!(!known_user.details.was_impossible);
    }

    #[test]
    fn test_estimates_are_clipped() {
        let trainset = Dataset::new(
            vec![Rating::new("u", "i", 5.0), Rating::new("u", "j", 5.0)],
            RatingScale::new(1.0, 5.0).unwrap(),
        );
        let mut predictor = BaselineOnly::new(10, 0.0, 0.0);
        predictor.fit(&trainset, 0).unwrap();
        assert!(predictor.predict("u", "i", None).unwrap().estimate <= 5.0);
    }
}

use crate::error::{AppError, AppResult};
use crate::services::predictors::RatingPredictor;
use crate::services::refit::RefitOutput;
use crate::services::top_n::{extract_top_n, TopNMap};

/// Read-only serving view of a refitted model
pub struct Recommender {
    algorithm: String,
    predictor: Box<dyn RatingPredictor>,
    ranked: TopNMap,
}

impl Recommender {
    /// Ranks every user's full prediction list once so `recommend` is a slice
    pub fn new(output: RefitOutput) -> AppResult<Self> {
        let ranked = extract_top_n(&output.predictions, output.predictions.len().max(1))?;
        Ok(Self {
            algorithm: output.algorithm,
            predictor: output.predictor,
            ranked,
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Estimated rating of `item_id` by `user_id`
    pub fn predict(&self, user_id: &str, item_id: &str) -> AppResult<f64> {
        self.predictor
            .predict(user_id, item_id, None)
            .map(|p| p.estimate)
            .map_err(|source| AppError::predictor(self.algorithm.as_str(), None, source))
    }

    /// The `n` highest-estimated items for `user_id`, best first
    pub fn recommend(&self, user_id: &str, n: usize) -> AppResult<Vec<String>> {
        if n < 1 {
            return Err(AppError::InvalidArgument(format!(
                "number of recommendations must be at least 1, got {}",
                n
            )));
        }
        let items = self
            .ranked
            .get(user_id)
            .ok_or_else(|| AppError::InvalidArgument(format!("unknown user {}", user_id)))?;

        Ok(items
            .iter()
            .take(n)
            .map(|item| item.item_id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dataset, Rating, RatingScale};
    use crate::services::predictors::BaselineOnly;
    use crate::services::refit::refit;

    fn recommender() -> Recommender {
        let dataset = Dataset::new(
            vec![
                Rating::new("alice", "heat", 5.0),
                Rating::new("alice", "alien", 2.0),
                Rating::new("alice", "up", 4.0),
                Rating::new("bob", "heat", 3.0),
                Rating::new("bob", "up", 5.0),
            ],
            RatingScale::default(),
        );
        let output = refit(&dataset, Box::new(BaselineOnly::new(10, 0.0, 0.0)), 0).unwrap();
        Recommender::new(output).unwrap()
    }

    #[test]
    fn test_recommend_orders_by_estimate() {
        let recommender = recommender();
        let all = recommender.recommend("alice", 10).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.last().unwrap(), "alien");
        assert_eq!(recommender.recommend("alice", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_recommend_rejects_unknown_user_and_zero_n() {
        let recommender = recommender();
        assert!(matches!(
            recommender.recommend("carol", 3),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            recommender.recommend("alice", 0),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_predict_unseen_pair() {
        let recommender = recommender();
        let estimate = recommender.predict("carol", "alien").unwrap();
        assert!((1.0..=5.0).contains(&estimate));
        assert_eq!(recommender.algorithm(), "BaselineOnly");
    }
}

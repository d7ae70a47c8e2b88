use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Extra information a predictor attaches to an estimate
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PredictionDetails {
    /// True when the predictor had no data for this pair and fell back to a default
    pub was_impossible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// One estimated rating for a (user, item) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub user_id: String,
    pub item_id: String,
    /// Known rating for held-out pairs, absent for pure inference
    pub true_rating: Option<f64>,
    pub estimate: f64,
    #[serde(default)]
    pub details: PredictionDetails,
}

impl Prediction {
    pub fn new(
        user_id: impl Into<String>,
        item_id: impl Into<String>,
        true_rating: Option<f64>,
        estimate: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            true_rating,
            estimate,
            details: PredictionDetails::default(),
        }
    }

    pub fn with_details(mut self, details: PredictionDetails) -> Self {
        self.details = details;
        self
    }
}

/// An item recommended to a user, with the score it was ranked by
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredItem {
    pub item_id: String,
    pub estimate: f64,
}

/// Groups predictions by user, keeping users in first-seen order and each
/// user's predictions in encounter order
pub fn group_by_user(predictions: &[Prediction]) -> Vec<(&str, Vec<&Prediction>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&Prediction>)> = Vec::new();

    for prediction in predictions {
        let user = prediction.user_id.as_str();
        match index.get(user) {
            Some(&slot) => groups[slot].1.push(prediction),
            None => {
                index.insert(user, groups.len());
                groups.push((user, vec![prediction]));
            }
        }
    }

    groups
}

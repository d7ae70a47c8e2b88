use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// A single observed (user, item, rating) row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    #[serde(alias = "reviewerID", alias = "steamid")]
    pub user_id: String,
    #[serde(alias = "asin", alias = "appid")]
    pub item_id: String,
    #[serde(alias = "overall")]
    pub rating: f64,
}

impl Rating {
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>, rating: f64) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
            rating,
        }
    }
}

/// Inclusive bounds of the rating scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 1.0, max: 5.0 }
    }
}

impl RatingScale {
    pub fn new(min: f64, max: f64) -> AppResult<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(AppError::InvalidArgument(format!(
                "invalid rating scale [{}, {}]",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Fully materialized ratings table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub scale: RatingScale,
}

impl Dataset {
    pub fn new(ratings: Vec<Rating>, scale: RatingScale) -> Self {
        Self { ratings, scale }
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Mean of all ratings, `None` for an empty table
    pub fn global_mean(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        Some(self.ratings.iter().map(|r| r.rating).sum::<f64>() / self.ratings.len() as f64)
    }

    /// Every known rating as a test pair, used when scoring a model fitted on the whole table
    pub fn build_testset(&self) -> Vec<Rating> {
        self.ratings.clone()
    }

    /// Keeps rows whose user has more than `min_user` ratings and whose item
    /// has more than `min_item` ratings, counted on the unfiltered table
    pub fn filter_min_ratings(&self, min_user: usize, min_item: usize) -> Dataset {
        let mut user_counts: HashMap<&str, usize> = HashMap::new();
        let mut item_counts: HashMap<&str, usize> = HashMap::new();
        for rating in &self.ratings {
            *user_counts.entry(rating.user_id.as_str()).or_default() += 1;
            *item_counts.entry(rating.item_id.as_str()).or_default() += 1;
        }

        let ratings = self
            .ratings
            .iter()
            .filter(|r| {
                user_counts[r.user_id.as_str()] > min_user
                    && item_counts[r.item_id.as_str()] > min_item
            })
            .cloned()
            .collect();

        Dataset::new(ratings, self.scale)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::AppError;

/// Metric a model selection ranks candidates by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RankKey {
    Rmse,
    FitTime,
    PredTime,
    Precision,
    Recall,
    Personalization,
}

impl RankKey {
    /// Whether a larger mean is better for this metric
    pub fn higher_is_better(&self) -> bool {
        matches!(
            self,
            RankKey::Precision | RankKey::Recall | RankKey::Personalization
        )
    }
}

impl FromStr for RankKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rmse" => Ok(RankKey::Rmse),
            "fit_time" => Ok(RankKey::FitTime),
            "pred_time" => Ok(RankKey::PredTime),
            "precision" => Ok(RankKey::Precision),
            "recall" => Ok(RankKey::Recall),
            "personalization" => Ok(RankKey::Personalization),
            other => Err(AppError::UnknownMetric(other.to_string())),
        }
    }
}

impl Display for RankKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RankKey::Rmse => "rmse",
            RankKey::FitTime => "fit_time",
            RankKey::PredTime => "pred_time",
            RankKey::Precision => "precision",
            RankKey::Recall => "recall",
            RankKey::Personalization => "personalization",
        };
        write!(f, "{}", name)
    }
}

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::models::{RankKey, RatingScale};
use crate::services::cross_validation::CvOptions;

/// Pipeline configuration loaded from `RECSYS_`-prefixed environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Ratings file (JSON lines or JSON array)
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Directory receiving metrics.json and the model package
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Number of cross-validation folds
    #[serde(default = "default_kfold")]
    pub kfold: usize,

    /// Size of the recommendation list used for personalization
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Rating at or above which an item counts as relevant
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Cutoffs for precision/recall@k
    #[serde(default = "default_k_values")]
    pub k_values: Vec<usize>,

    /// Metric used to pick the winning predictor
    #[serde(default = "default_rank_by")]
    pub rank_by: String,

    /// Cutoff used when ranking by precision or recall
    #[serde(default = "default_rank_k")]
    pub rank_k: usize,

    #[serde(default)]
    pub seed: u64,

    /// Upper bound on a single fit call; unset means no limit
    #[serde(default)]
    pub fit_timeout_secs: Option<u64>,

    /// Folds of one predictor evaluated at the same time
    #[serde(default = "default_fold_concurrency")]
    pub fold_concurrency: usize,

    #[serde(default = "default_min_ratings")]
    pub min_ratings_per_user: usize,

    #[serde(default = "default_min_ratings")]
    pub min_ratings_per_item: usize,

    #[serde(default = "default_rating_min")]
    pub rating_min: f64,

    #[serde(default = "default_rating_max")]
    pub rating_max: f64,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/reviews.jsonl")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_kfold() -> usize {
    5
}

fn default_top_n() -> usize {
    10
}

fn default_threshold() -> f64 {
    3.5
}

fn default_k_values() -> Vec<usize> {
    vec![3, 5, 7, 10]
}

fn default_rank_by() -> String {
    "rmse".to_string()
}

fn default_rank_k() -> usize {
    10
}

fn default_fold_concurrency() -> usize {
    1
}

fn default_min_ratings() -> usize {
    15
}

fn default_rating_min() -> f64 {
    1.0
}

fn default_rating_max() -> f64 {
    5.0
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::prefixed("RECSYS_")
            .from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Rejects settings the pipeline cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.kfold < 2 {
            return Err(AppError::InvalidArgument(format!(
                "kfold must be at least 2, got {}",
                self.kfold
            )));
        }
        self.rating_scale()?;
        self.rank_by.parse::<RankKey>()?;
        self.cv_options().validate()
    }

    pub fn rating_scale(&self) -> AppResult<RatingScale> {
        RatingScale::new(self.rating_min, self.rating_max)
    }

    pub fn cv_options(&self) -> CvOptions {
        CvOptions {
            kfold: self.kfold,
            top_n: self.top_n,
            threshold: self.threshold,
            k_values: self.k_values.clone(),
            seed: self.seed,
            fit_timeout: self.fit_timeout_secs.map(Duration::from_secs),
            fold_concurrency: self.fold_concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(vars: Vec<(&str, &str)>) -> Config {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()));
        envy::prefixed("RECSYS_").from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(vec![]);
        assert_eq!(config.kfold, 5);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.threshold, 3.5);
        assert_eq!(config.k_values, vec![3, 5, 7, 10]);
        assert_eq!(config.rank_by, "rmse");
        assert_eq!(config.fit_timeout_secs, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(vec![
            ("RECSYS_KFOLD", "3"),
            ("RECSYS_K_VALUES", "1,2"),
            ("RECSYS_RANK_BY", "precision"),
            ("RECSYS_FIT_TIMEOUT_SECS", "30"),
        ]);
        assert_eq!(config.kfold, 3);
        assert_eq!(config.k_values, vec![1, 2]);
        let options = config.cv_options();
        assert_eq!(options.fit_timeout, Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_rank_key() {
        let config = config_from(vec![("RECSYS_RANK_BY", "ndcg")]);
        assert!(matches!(config.validate(), Err(AppError::UnknownMetric(_))));
    }

    #[test]
    fn test_validate_rejects_single_fold() {
        let config = config_from(vec![("RECSYS_KFOLD", "1")]);
        assert!(matches!(config.validate(), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_rejects_zero_fit_timeout() {
        let config = config_from(vec![("RECSYS_FIT_TIMEOUT_SECS", "0")]);
        assert!(matches!(config.validate(), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_bounds_fold_concurrency() {
        let too_many = (tokio::sync::Semaphore::MAX_PERMITS + 1).to_string();
        let config = config_from(vec![("RECSYS_FOLD_CONCURRENCY", too_many.as_str())]);
        assert!(matches!(config.validate(), Err(AppError::InvalidArgument(_))));

        let config = config_from(vec![("RECSYS_FOLD_CONCURRENCY", "0")]);
        assert!(matches!(config.validate(), Err(AppError::InvalidArgument(_))));
    }
}

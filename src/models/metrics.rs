use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Measurements taken on a single fold
#[derive(Debug, Clone, PartialEq)]
pub struct FoldMetrics {
    pub rmse: f64,
    /// Seconds spent in `fit`
    pub fit_time: f64,
    /// Seconds spent in `test`
    pub pred_time: f64,
    pub personalization: f64,
    pub precision: BTreeMap<usize, f64>,
    pub recall: BTreeMap<usize, f64>,
}

/// Per-fold series for one algorithm, one entry per fold in fold order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlgorithmMetrics {
    pub algorithm: String,
    pub rmse: Vec<f64>,
    pub fit_time: Vec<f64>,
    pub pred_time: Vec<f64>,
    pub personalization: Vec<f64>,
    pub precision: BTreeMap<usize, Vec<f64>>,
    pub recall: BTreeMap<usize, Vec<f64>>,
}

impl AlgorithmMetrics {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            ..Default::default()
        }
    }

    pub fn push_fold(&mut self, fold: FoldMetrics) {
        self.rmse.push(fold.rmse);
        self.fit_time.push(fold.fit_time);
        self.pred_time.push(fold.pred_time);
        self.personalization.push(fold.personalization);
        for (k, value) in fold.precision {
            self.precision.entry(k).or_default().push(value);
        }
        for (k, value) in fold.recall {
            self.recall.entry(k).or_default().push(value);
        }
    }

    pub fn fold_count(&self) -> usize {
        self.rmse.len()
    }

    pub fn mean_rmse(&self) -> f64 {
        mean(&self.rmse)
    }

    pub fn mean_fit_time(&self) -> f64 {
        mean(&self.fit_time)
    }

    pub fn mean_pred_time(&self) -> f64 {
        mean(&self.pred_time)
    }

    pub fn mean_personalization(&self) -> f64 {
        mean(&self.personalization)
    }

    pub fn mean_precision(&self, k: usize) -> Option<f64> {
        self.precision.get(&k).map(|series| mean(series))
    }

    pub fn mean_recall(&self, k: usize) -> Option<f64> {
        self.recall.get(&k).map(|series| mean(series))
    }
}

/// Everything one cross-validation run measured, per algorithm in candidate order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsBundle {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub kfold: usize,
    pub top_n: usize,
    pub threshold: f64,
    pub k_values: Vec<usize>,
    pub seed: u64,
    pub algorithms: Vec<AlgorithmMetrics>,
}

impl MetricsBundle {
    pub fn algorithm(&self, name: &str) -> Option<&AlgorithmMetrics> {
        self.algorithms.iter().find(|a| a.algorithm == name)
    }

    pub fn algorithm_names(&self) -> Vec<&str> {
        self.algorithms.iter().map(|a| a.algorithm.as_str()).collect()
    }
}

/// Arithmetic mean; NaN for an empty series
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(rmse: f64, precision_at_3: f64) -> FoldMetrics {
        FoldMetrics {
            rmse,
            fit_time: 0.5,
            pred_time: 0.1,
            personalization: 0.9,
            precision: BTreeMap::from([(3, precision_at_3)]),
            recall: BTreeMap::from([(3, 1.0)]),
        }
    }

    #[test]
    fn test_push_fold_appends_series() {
        let mut metrics = AlgorithmMetrics::new("SVD");
        metrics.push_fold(fold(0.9, 0.5));
        metrics.push_fold(fold(0.8, 0.7));

        assert_eq!(metrics.fold_count(), 2);
        assert_eq!(metrics.rmse, vec![0.9, 0.8]);
        assert_eq!(metrics.precision[&3], vec![0.5, 0.7]);
        assert!((metrics.mean_rmse() - 0.85).abs() < 1e-12);
        assert!((metrics.mean_precision(3).unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(metrics.mean_recall(5), None);
    }

    #[test]
    fn test_mean_of_empty_series_is_nan() {
        assert!(mean(&[]).is_nan());
    }
}

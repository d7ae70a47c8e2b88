use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error::{AppError, AppResult};
use crate::models::{AlgorithmMetrics, MetricsBundle, RankKey};
use crate::services::registry::AlgorithmRegistry;

/// Mean of each general metric across folds for one algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralRow {
    pub algorithm: String,
    pub rmse: f64,
    pub fit_time: f64,
    pub pred_time: f64,
    pub personalization: f64,
}

/// Fold means of a cross-validation run, ready for reporting and ranking
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub general: Vec<GeneralRow>,
    /// k -> (algorithm, mean precision@k) in candidate order
    pub precision: BTreeMap<usize, Vec<(String, f64)>>,
    /// k -> (algorithm, mean recall@k) in candidate order
    pub recall: BTreeMap<usize, Vec<(String, f64)>>,
}

impl MetricsSummary {
    pub fn from_bundle(bundle: &MetricsBundle) -> Self {
        let general = bundle
            .algorithms
            .iter()
            .map(|a| GeneralRow {
                algorithm: a.algorithm.clone(),
                rmse: a.mean_rmse(),
                fit_time: a.mean_fit_time(),
                pred_time: a.mean_pred_time(),
                personalization: a.mean_personalization(),
            })
            .collect();

        Self {
            general,
            precision: per_k_table(&bundle.algorithms, AlgorithmMetrics::mean_precision, |a| {
                a.precision.keys().copied().collect()
            }),
            recall: per_k_table(&bundle.algorithms, AlgorithmMetrics::mean_recall, |a| {
                a.recall.keys().copied().collect()
            }),
        }
    }
}

fn per_k_table(
    algorithms: &[AlgorithmMetrics],
    mean_at: fn(&AlgorithmMetrics, usize) -> Option<f64>,
    cutoffs: fn(&AlgorithmMetrics) -> Vec<usize>,
) -> BTreeMap<usize, Vec<(String, f64)>> {
    let mut table: BTreeMap<usize, Vec<(String, f64)>> = BTreeMap::new();
    for algorithm in algorithms {
        for k in cutoffs(algorithm) {
            if let Some(value) = mean_at(algorithm, k) {
                table
                    .entry(k)
                    .or_default()
                    .push((algorithm.algorithm.clone(), value));
            }
        }
    }
    table
}

impl Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RMSE, Personalization, Fit Time, Prediction Time")?;
        writeln!(
            f,
            "{:<20} {:>10} {:>16} {:>12} {:>12}",
            "algorithm", "rmse", "personalization", "fit_time", "pred_time"
        )?;
        for row in &self.general {
            writeln!(
                f,
                "{:<20} {:>10.5} {:>16.5} {:>12.4} {:>12.4}",
                row.algorithm, row.rmse, row.personalization, row.fit_time, row.pred_time
            )?;
        }
        write_k_table(f, "Precision Table", &self.precision)?;
        write_k_table(f, "Recall Table", &self.recall)
    }
}

fn write_k_table(
    f: &mut std::fmt::Formatter<'_>,
    title: &str,
    table: &BTreeMap<usize, Vec<(String, f64)>>,
) -> std::fmt::Result {
    writeln!(f, "{}", title)?;
    for (k, row) in table {
        write!(f, "k={:<4}", k)?;
        for (algorithm, value) in row {
            write!(f, " {}={:.5}", algorithm, value)?;
        }
        writeln!(f)?;
    }
    Ok(())
}

/// Picks the best predictor of a cross-validation run.
///
/// `rank_by` is one of `rmse`, `fit_time`, `pred_time` (lowest mean wins),
/// `personalization`, `precision`, `recall` (highest mean wins). Precision and
/// recall are compared at cutoff `k`, which must have been measured. Ties go
/// to the candidate registered first.
pub fn select_best(
    registry: &AlgorithmRegistry,
    bundle: &MetricsBundle,
    rank_by: &str,
    k: usize,
) -> AppResult<String> {
    let key: RankKey = rank_by.parse()?;
    if matches!(key, RankKey::Precision | RankKey::Recall) && !bundle.k_values.contains(&k) {
        return Err(AppError::InvalidArgument(format!(
            "{} was not measured at k={} (measured: {:?})",
            key, k, bundle.k_values
        )));
    }

    let mut scored = Vec::with_capacity(registry.len());
    for name in registry.names() {
        let metrics = bundle.algorithm(name).ok_or_else(|| {
            AppError::InsufficientData(format!("no metrics recorded for {}", name))
        })?;
        let value = match key {
            RankKey::Rmse => metrics.mean_rmse(),
            RankKey::FitTime => metrics.mean_fit_time(),
            RankKey::PredTime => metrics.mean_pred_time(),
            RankKey::Personalization => metrics.mean_personalization(),
            RankKey::Precision => metrics.mean_precision(k).unwrap_or(f64::NAN),
            RankKey::Recall => metrics.mean_recall(k).unwrap_or(f64::NAN),
        };
        if value.is_nan() {
            return Err(AppError::InsufficientData(format!(
                "{} has no {} measurements",
                name, key
            )));
        }
        scored.push((name, value));
    }

    // stable: equal means keep registry order
    if key.higher_is_better() {
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    } else {
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    }

    let (best, value) = scored[0];
    tracing::info!(rank_by = %key, k, best, value, "Best predictor selected");
    Ok(best.to_string())
}

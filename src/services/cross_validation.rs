use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{AlgorithmMetrics, Dataset, FoldMetrics, MetricsBundle, Prediction},
    services::{
        folds::{Fold, KFold},
        personalization::personalization,
        predictors::RatingPredictor,
        ranking::{precision_recall_at_k, rmse},
        registry::AlgorithmRegistry,
    },
};

/// Settings for one cross-validation run
#[derive(Debug, Clone, PartialEq)]
pub struct CvOptions {
    pub kfold: usize,
    pub top_n: usize,
    pub threshold: f64,
    pub k_values: Vec<usize>,
    pub seed: u64,
    /// Limit on a single `fit` call
    pub fit_timeout: Option<Duration>,
    /// Folds of one predictor running at the same time
    pub fold_concurrency: usize,
}

impl Default for CvOptions {
    fn default() -> Self {
        Self {
            kfold: 5,
            top_n: 10,
            threshold: 3.5,
            k_values: vec![3, 5, 7, 10],
            seed: 0,
            fit_timeout: None,
            fold_concurrency: 1,
        }
    }
}

impl CvOptions {
    pub fn validate(&self) -> AppResult<()> {
        if self.top_n < 1 {
            return Err(AppError::InvalidArgument("top_n must be at least 1".to_string()));
        }
        if self.k_values.is_empty() || self.k_values.contains(&0) {
            return Err(AppError::InvalidArgument(
                "k_values must be a non-empty list of positive cutoffs".to_string(),
            ));
        }
        if self.fold_concurrency < 1 || self.fold_concurrency > Semaphore::MAX_PERMITS {
            return Err(AppError::InvalidArgument(format!(
                "fold_concurrency must be between 1 and {}, got {}",
                Semaphore::MAX_PERMITS,
                self.fold_concurrency
            )));
        }
        if self.fit_timeout.is_some_and(|limit| limit.is_zero()) {
            return Err(AppError::InvalidArgument(
                "fit timeout must be positive; leave it unset for no limit".to_string(),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(AppError::InvalidArgument("threshold must be finite".to_string()));
        }
        Ok(())
    }
}

/// Runs k-fold cross-validation for every registered predictor.
///
/// Predictors are evaluated one after another in registry order. Every
/// predictor sees the same folds (the split is re-seeded per predictor), and
/// fold `i` is fitted with seed `seed + i`, so results do not depend on how
/// folds are scheduled. The first failing fold aborts the run.
#[instrument(skip_all, fields(kfold = options.kfold, candidates = registry.len()))]
pub async fn cross_validate(
    registry: &AlgorithmRegistry,
    dataset: &Dataset,
    options: &CvOptions,
) -> AppResult<MetricsBundle> {
    options.validate()?;

    let run_id = Uuid::new_v4();
    let created_at = Utc::now();
    let settings = Arc::new(options.clone());

    tracing::info!(
        run_id = %run_id,
        ratings = dataset.len(),
        candidates = ?registry.names(),
        "Starting cross-validation"
    );

    let mut algorithms = Vec::with_capacity(registry.len());
    for predictor in registry.iter() {
        let metrics = evaluate_predictor(predictor, dataset, settings.clone(), run_id).await?;
        tracing::info!(
            run_id = %run_id,
            algorithm = metrics.algorithm.as_str(),
            mean_rmse = metrics.mean_rmse(),
            mean_fit_time = metrics.mean_fit_time(),
            mean_personalization = metrics.mean_personalization(),
            "Predictor evaluated"
        );
        algorithms.push(metrics);
    }

    Ok(MetricsBundle {
        run_id,
        created_at,
        kfold: options.kfold,
        top_n: options.top_n,
        threshold: options.threshold,
        k_values: options.k_values.clone(),
        seed: options.seed,
        algorithms,
    })
}

/// Evaluates one predictor on every fold, collecting results in fold order
async fn evaluate_predictor(
    predictor: &dyn RatingPredictor,
    dataset: &Dataset,
    options: Arc<CvOptions>,
    run_id: Uuid,
) -> AppResult<AlgorithmMetrics> {
    let algorithm = predictor.name();
    let folds = KFold::new(options.kfold, options.seed)?.split(dataset)?;
    // never more permits than folds
    let permits = Arc::new(Semaphore::new(options.fold_concurrency.min(folds.len())));

    let mut tasks = Vec::with_capacity(folds.len());
    for fold in folds {
        let worker = predictor.boxed_clone();
        let permits = permits.clone();
        let options = options.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
            run_fold(worker, fold, options).await
        }));
    }

    let mut metrics = AlgorithmMetrics::new(algorithm);
    let mut pending = tasks.into_iter();
    while let Some(task) = pending.next() {
        let outcome = task
            .await
            .unwrap_or_else(|e| Err(AppError::Internal(format!("fold task failed: {}", e))));
        match outcome {
            Ok(fold) => metrics.push_fold(fold),
            Err(e) => {
                for task in pending {
                    task.abort();
                }
                tracing::error!(
                    run_id = %run_id,
                    algorithm,
                    error = %e,
                    "Cross-validation aborted"
                );
                return Err(e);
            }
        }
    }

    Ok(metrics)
}

async fn run_fold(
    mut predictor: Box<dyn RatingPredictor>,
    fold: Fold,
    options: Arc<CvOptions>,
) -> AppResult<FoldMetrics> {
    let algorithm = predictor.name();
    let Fold { index, train, test } = fold;
    if test.is_empty() {
        return Err(AppError::InsufficientData(format!("fold {} has no test ratings", index)));
    }
    let seed = options.seed.wrapping_add(index as u64);

    let fit = tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let result = predictor.fit(&train, seed);
        (predictor, result, start.elapsed())
    });
    // A fit that overruns keeps its blocking thread until it returns; only the
    // fold is abandoned.
    let joined = match options.fit_timeout {
        Some(limit) => tokio::time::timeout(limit, fit)
            .await
            .map_err(|_| AppError::Timeout {
                algorithm: algorithm.to_string(),
                fold: index,
                limit_ms: limit.as_millis(),
            })?,
        None => fit.await,
    };
    let (predictor, fit_result, fit_time) =
        joined.map_err(|e| AppError::Internal(format!("fit task failed: {}", e)))?;
    fit_result.map_err(|source| AppError::predictor(algorithm, Some(index), source))?;

    let scoring = options.clone();
    let (mut fold_metrics, pred_time, predicted) = tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let predictions = predictor
            .test(&test)
            .map_err(|source| AppError::predictor(algorithm, Some(index), source))?;
        let pred_time = start.elapsed();
        let fold_metrics = score_fold(&predictions, &scoring)?;
        Ok::<_, AppError>((fold_metrics, pred_time, predictions.len()))
    })
    .await
    .map_err(|e| AppError::Internal(format!("predict task failed: {}", e)))??;
    fold_metrics.fit_time = fit_time.as_secs_f64();
    fold_metrics.pred_time = pred_time.as_secs_f64();

    tracing::debug!(
        algorithm,
        fold = index,
        predictions = predicted,
        rmse = fold_metrics.rmse,
        fit_time_ms = fit_time.as_millis() as u64,
        pred_time_ms = pred_time.as_millis() as u64,
        "Fold evaluated"
    );

    Ok(fold_metrics)
}

/// Accuracy and ranking metrics of one fold's predictions; timings are left at zero
fn score_fold(predictions: &[Prediction], options: &CvOptions) -> AppResult<FoldMetrics> {
    let mut precision = BTreeMap::new();
    let mut recall = BTreeMap::new();
    for &k in &options.k_values {
        let at_k = precision_recall_at_k(predictions, k, options.threshold)?;
        precision.insert(k, at_k.precision);
        recall.insert(k, at_k.recall);
    }

    Ok(FoldMetrics {
        rmse: rmse(predictions)?,
        fit_time: 0.0,
        pred_time: 0.0,
        personalization: personalization(predictions, options.top_n)?,
        precision,
        recall,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Rating, RatingScale};
    use crate::services::predictors::{default_candidates, MockRatingPredictor, PredictorError};

    /// 8 users x 10 items with a deterministic rating pattern
    pub(crate) fn synthetic_dataset() -> Dataset {
        let mut ratings = Vec::new();
        for user in 0..8 {
            for item in 0..10 {
                let rating = ((user * 3 + item * 7) % 5 + 1) as f64;
                ratings.push(Rating::new(format!("user{}", user), format!("item{}", item), rating));
            }
        }
        Dataset::new(ratings, RatingScale::default())
    }

    fn options() -> CvOptions {
        CvOptions {
            kfold: 4,
            top_n: 3,
            threshold: 3.5,
            k_values: vec![1, 3],
            ..CvOptions::default()
        }
    }

    /// Everything but the wall-clock timings
    fn scores(bundle: &MetricsBundle) -> Vec<(String, Vec<f64>, Vec<f64>, Vec<Vec<f64>>)> {
        bundle
            .algorithms
            .iter()
            .map(|a| {
                (
                    a.algorithm.clone(),
                    a.rmse.clone(),
                    a.personalization.clone(),
                    a.precision.values().chain(a.recall.values()).cloned().collect(),
                )
            })
            .collect()
    }

    fn failing_mock(fold_error: fn() -> PredictorError) -> MockRatingPredictor {
        let mut mock = MockRatingPredictor::new();
        mock.expect_name().return_const("Failing");
        mock.expect_boxed_clone().returning(move || {
            let mut worker = MockRatingPredictor::new();
            worker.expect_name().return_const("Failing");
            worker.expect_fit().returning(move |_, _| Err(fold_error()));
            Box::new(worker)
        });
        mock
    }

    #[tokio::test]
    async fn test_series_have_one_entry_per_fold() {
        let registry = AlgorithmRegistry::new(default_candidates()).unwrap();
        let bundle = cross_validate(&registry, &synthetic_dataset(), &options())
            .await
            .unwrap();

        assert_eq!(bundle.algorithm_names(), vec!["GlobalMean", "BaselineOnly", "NormalPredictor"]);
        for algorithm in &bundle.algorithms {
            assert_eq!(algorithm.fold_count(), 4);
            assert_eq!(algorithm.fit_time.len(), 4);
            assert_eq!(algorithm.pred_time.len(), 4);
            assert_eq!(algorithm.personalization.len(), 4);
            assert_eq!(algorithm.precision.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
            assert!(algorithm.recall.values().all(|series| series.len() == 4));
        }
    }

    #[tokio::test]
    async fn test_runs_are_reproducible() {
        let registry = AlgorithmRegistry::new(default_candidates()).unwrap();
        let first = cross_validate(&registry, &synthetic_dataset(), &options()).await.unwrap();
        let second = cross_validate(&registry, &synthetic_dataset(), &options()).await.unwrap();

        assert_ne!(first.run_id, second.run_id);
        assert_eq!(scores(&first), scores(&second));
    }

    #[tokio::test]
    async fn test_parallel_folds_match_sequential() {
        let registry = AlgorithmRegistry::new(default_candidates()).unwrap();
        let sequential = cross_validate(&registry, &synthetic_dataset(), &options()).await.unwrap();
        let parallel_options = CvOptions {
            fold_concurrency: 4,
            ..options()
        };
        let parallel = cross_validate(&registry, &synthetic_dataset(), &parallel_options)
            .await
            .unwrap();

        assert_eq!(scores(&sequential), scores(&parallel));
    }

    #[tokio::test]
    async fn test_fit_failure_aborts_run() {
        let registry = AlgorithmRegistry::new(vec![
            Box::new(failing_mock(|| PredictorError::Training("diverged".to_string()))),
        ])
        .unwrap();

        let result = cross_validate(&registry, &synthetic_dataset(), &options()).await;
        match result {
            Err(AppError::PredictorFailure { algorithm, fold, source }) => {
                assert_eq!(algorithm, "Failing");
                assert_eq!(fold, Some(0));
                assert!(matches!(source, PredictorError::Training(_)));
            }
            other => panic!("expected predictor failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_slow_fit_times_out() {
        let mut slow = MockRatingPredictor::new();
        slow.expect_name().return_const("Slow");
        slow.expect_boxed_clone().returning(|| {
            let mut worker = MockRatingPredictor::new();
            worker.expect_name().return_const("Slow");
            worker.expect_fit().returning(|_, _| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            });
            Box::new(worker)
        });
        let registry = AlgorithmRegistry::new(vec![Box::new(slow)]).unwrap();
        let options = CvOptions {
            fit_timeout: Some(Duration::from_millis(20)),
            ..options()
        };

        let result = cross_validate(&registry, &synthetic_dataset(), &options).await;
        assert!(matches!(result, Err(AppError::Timeout { fold: 0, .. })));
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let registry = AlgorithmRegistry::new(default_candidates()).unwrap();
        let options = CvOptions {
            k_values: vec![0, 3],
            ..options()
        };
        let result = cross_validate(&registry, &synthetic_dataset(), &options).await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_predict_failure_aborts_run() {
        let mut mock = MockRatingPredictor::new();
        mock.expect_name().return_const("Unpredictable");
        mock.expect_boxed_clone().returning(|| {
            let mut worker = MockRatingPredictor::new();
            worker.expect_name().return_const("Unpredictable");
            worker.expect_fit().returning(|_, _| Ok(()));
            worker
                .expect_test()
                .returning(|_| Err(PredictorError::Training("factor overflow".to_string())));
            Box::new(worker)
        });
        let registry = AlgorithmRegistry::new(vec![Box::new(mock)]).unwrap();

        let result = cross_validate(&registry, &synthetic_dataset(), &options()).await;
        assert!(matches!(
            result,
            Err(AppError::PredictorFailure { fold: Some(0), .. })
        ));
    }

    #[tokio::test]
    async fn test_single_user_fold_fails_personalization() {
        let dataset = Dataset::new(
            (0..8)
                .map(|i| Rating::new("solo", format!("item{}", i), (i % 5 + 1) as f64))
                .collect(),
            RatingScale::default(),
        );
        let registry = AlgorithmRegistry::new(default_candidates()).unwrap();
        let options = CvOptions {
            kfold: 2,
            ..options()
        };

        let result = cross_validate(&registry, &dataset, &options).await;
        assert!(matches!(result, Err(AppError::InsufficientData(_))));
    }

    #[tokio::test]
    async fn test_oversized_fold_concurrency_rejected() {
        let options = CvOptions {
            fold_concurrency: usize::MAX,
            ..options()
        };
        assert!(options.validate().is_err());

        let registry = AlgorithmRegistry::new(default_candidates()).unwrap();
        let result = cross_validate(&registry, &synthetic_dataset(), &options).await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_zero_fit_timeout_rejected() {
        let options = CvOptions {
            fit_timeout: Some(Duration::ZERO),
            ..options()
        };
        let registry = AlgorithmRegistry::new(default_candidates()).unwrap();
        let result = cross_validate(&registry, &synthetic_dataset(), &options).await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }
}

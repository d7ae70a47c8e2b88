use crate::error::{AppError, AppResult};
use crate::models::{group_by_user, Prediction};

/// Precision and recall at one cutoff for one user
#[derive(Debug, Clone, PartialEq)]
pub struct UserPrecisionRecall {
    pub user_id: String,
    pub precision: f64,
    pub recall: f64,
}

/// Precision/recall@k for every user plus their unweighted means
#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionRecall {
    pub k: usize,
    pub per_user: Vec<UserPrecisionRecall>,
    pub precision: f64,
    pub recall: f64,
}

/// Computes precision@k and recall@k per user, then averages over users.
///
/// An item is relevant when its true rating reaches `threshold` and counts as
/// recommended when it sits in the user's first `k` entries (by descending
/// estimate, stable) with an estimate reaching `threshold`. Users with fewer
/// than `k` predictions are scored on all of them.
///
/// Precision is exactly 1 for a user with nothing recommended in the top k,
/// and recall is exactly 1 for a user with no relevant items. The precision
/// convention is intentional; it is not 0 or NaN.
pub fn precision_recall_at_k(
    predictions: &[Prediction],
    k: usize,
    threshold: f64,
) -> AppResult<PrecisionRecall> {
    if k < 1 {
        return Err(AppError::InvalidArgument(format!(
            "k must be at least 1, got {}",
            k
        )));
    }
    if !threshold.is_finite() {
        return Err(AppError::InvalidArgument(format!(
            "relevance threshold must be a finite number, got {}",
            threshold
        )));
    }
    if predictions.is_empty() {
        return Err(AppError::InsufficientData(
            "no predictions to compute precision/recall on".to_string(),
        ));
    }

    let mut per_user = Vec::new();
    for (user, group) in group_by_user(predictions) {
        let mut pairs = Vec::with_capacity(group.len());
        for prediction in group {
            let true_rating = prediction.true_rating.ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "prediction for user {} item {} has no true rating",
                    prediction.user_id, prediction.item_id
                ))
            })?;
            pairs.push((prediction.estimate, true_rating));
        }
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let n_rel = pairs.iter().filter(|(_, r)| *r >= threshold).count();
        let top_k = &pairs[..k.min(pairs.len())];
        let n_rec_k = top_k.iter().filter(|(est, _)| *est >= threshold).count();
        let n_rel_and_rec_k = top_k
            .iter()
            .filter(|(est, r)| *r >= threshold && *est >= threshold)
            .count();

        let precision = if n_rec_k == 0 {
            1.0
        } else {
            n_rel_and_rec_k as f64 / n_rec_k as f64
        };
        let recall = if n_rel == 0 {
            1.0
        } else {
            n_rel_and_rec_k as f64 / n_rel as f64
        };

        per_user.push(UserPrecisionRecall {
            user_id: user.to_string(),
            precision,
            recall,
        });
    }

    let users = per_user.len() as f64;
    let precision = per_user.iter().map(|u| u.precision).sum::<f64>() / users;
    let recall = per_user.iter().map(|u| u.recall).sum::<f64>() / users;

    Ok(PrecisionRecall {
        k,
        per_user,
        precision,
        recall,
    })
}

/// Root-mean-square error between estimates and true ratings
pub fn rmse(predictions: &[Prediction]) -> AppResult<f64> {
    let mut squared_error = 0.0;
    let mut count = 0usize;
    for prediction in predictions {
        if let Some(true_rating) = prediction.true_rating {
            squared_error += (true_rating - prediction.estimate).powi(2);
            count += 1;
        }
    }

    if count == 0 {
        return Err(AppError::InsufficientData(
            "no predictions with a true rating to compute RMSE on".to_string(),
        ));
    }

    Ok((squared_error / count as f64).sqrt())
}

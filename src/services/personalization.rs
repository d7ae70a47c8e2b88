use std::collections::{BTreeSet, HashMap};

use crate::error::{AppError, AppResult};
use crate::models::Prediction;
use crate::services::top_n::extract_top_n;

/// Diversity of top-`n` recommendations across users.
///
/// Builds a binary user x item incidence matrix over every user and item seen
/// in `predictions` (1 when the item is in that user's top-`n` list) and
/// returns 1 minus the mean cosine similarity over all distinct user pairs.
/// Higher means less overlap between users' lists.
///
/// Fewer than two users has no pairs to average and fails with
/// `InsufficientData`. A row with no recommended items has similarity 0 with
/// every other row.
pub fn personalization(predictions: &[Prediction], n: usize) -> AppResult<f64> {
    let top_n = extract_top_n(predictions, n)?;

    let users: BTreeSet<&str> = predictions.iter().map(|p| p.user_id.as_str()).collect();
    if users.len() < 2 {
        return Err(AppError::InsufficientData(format!(
            "personalization needs at least 2 users, got {}",
            users.len()
        )));
    }

    let columns: HashMap<&str, usize> = predictions
        .iter()
        .map(|p| p.item_id.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(column, item)| (item, column))
        .collect();

    // Sparse rows of the incidence matrix: sorted column indices holding a 1
    let rows: Vec<Vec<usize>> = users
        .iter()
        .map(|user| {
            let mut row: Vec<usize> = top_n
                .get(user)
                .unwrap_or_default()
                .iter()
                .map(|item| columns[item.item_id.as_str()])
                .collect();
            row.sort_unstable();
            row.dedup();
            row
        })
        .collect();

    let mut similarity_sum = 0.0;
    let mut pairs = 0usize;
    for i in 0..rows.len() {
        for j in (i + 1)..rows.len() {
            similarity_sum += binary_cosine(&rows[i], &rows[j]);
            pairs += 1;
        }
    }

    Ok(1.0 - similarity_sum / pairs as f64)
}

/// Cosine similarity of two 0/1 rows given as sorted column indices
fn binary_cosine(a: &[usize], b: &[usize]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (mut i, mut j, mut overlap) = (0, 0, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                overlap += 1;
                i += 1;
                j += 1;
            }
        }
    }

    overlap as f64 / ((a.len() as f64) * (b.len() as f64)).sqrt()
}

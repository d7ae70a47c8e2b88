use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::models::{group_by_user, Prediction, ScoredItem};

/// Each user's highest-scored items, users kept in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopNMap {
    users: Vec<String>,
    lists: HashMap<String, Vec<ScoredItem>>,
}

impl TopNMap {
    pub fn get(&self, user_id: &str) -> Option<&[ScoredItem]> {
        self.lists.get(user_id).map(Vec::as_slice)
    }

    /// Users in the order they first appeared in the predictions
    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ScoredItem])> {
        self.users
            .iter()
            .map(move |user| (user.as_str(), self.lists[user].as_slice()))
    }

    /// Recommended item ids for a user, best first
    pub fn item_ids(&self, user_id: &str) -> Option<Vec<&str>> {
        self.get(user_id)
            .map(|items| items.iter().map(|i| i.item_id.as_str()).collect())
    }
}

/// Builds the top-`n` recommendation list of every user in `predictions`.
///
/// Within a user, items are ordered by descending estimate; equal estimates
/// keep their encounter order. Users with fewer than `n` predictions get all
/// of them.
pub fn extract_top_n(predictions: &[Prediction], n: usize) -> AppResult<TopNMap> {
    if n < 1 {
        return Err(AppError::InvalidArgument(format!(
            "top-N size must be at least 1, got {}",
            n
        )));
    }

    let mut top_n = TopNMap::default();
    for (user, group) in group_by_user(predictions) {
        let mut items: Vec<ScoredItem> = group
            .into_iter()
            .map(|p| ScoredItem {
                item_id: p.item_id.clone(),
                estimate: p.estimate,
            })
            .collect();
        // slice::sort_by is stable
        items.sort_by(|a, b| b.estimate.total_cmp(&a.estimate));
        items.truncate(n);

        top_n.users.push(user.to_string());
        top_n.lists.insert(user.to_string(), items);
    }

    Ok(top_n)
}

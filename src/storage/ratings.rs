use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::models::{Dataset, Rating, RatingScale};

/// Reads a ratings file into a [`Dataset`].
///
/// Accepts either a JSON array of rating objects or JSON lines (one object
/// per line, blank lines ignored). Review dumps with `reviewerID`, `asin` and
/// `overall` fields load as-is; unrelated fields are skipped.
pub async fn load_dataset(path: impl AsRef<Path>, scale: RatingScale) -> AppResult<Dataset> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    let ratings = parse_ratings(&text).map_err(|e| match e {
        AppError::InvalidArgument(message) => {
            AppError::InvalidArgument(format!("{}: {}", path.display(), message))
        }
        other => other,
    })?;

    tracing::info!(path = %path.display(), ratings = ratings.len(), "Ratings loaded");
    Ok(Dataset::new(ratings, scale))
}

/// Parses ratings text; malformed input is `InvalidArgument`
pub fn parse_ratings(text: &str) -> AppResult<Vec<Rating>> {
    let ratings: Vec<Rating> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text).map_err(|e| AppError::InvalidArgument(e.to_string()))?
    } else {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|e| AppError::InvalidArgument(format!("line {}: {}", i + 1, e)))
            })
            .collect::<Result<_, _>>()?
    };

    if let Some(bad) = ratings.iter().find(|r| !r.rating.is_finite()) {
        return Err(AppError::InvalidArgument(format!(
            "non-finite rating for user {} item {}",
            bad.user_id, bad.item_id
        )));
    }
    Ok(ratings)
}

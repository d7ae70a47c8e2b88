use crate::error::{AppError, AppResult};
use crate::services::predictors::RatingPredictor;

/// Candidate predictors keyed by display name, in candidate order
pub struct AlgorithmRegistry {
    candidates: Vec<Box<dyn RatingPredictor>>,
}

impl AlgorithmRegistry {
    /// Builds the registry; names come from each predictor and must be unique
    pub fn new(candidates: Vec<Box<dyn RatingPredictor>>) -> AppResult<Self> {
        if candidates.is_empty() {
            return Err(AppError::InvalidArgument(
                "at least one candidate predictor is required".to_string(),
            ));
        }
        for (position, candidate) in candidates.iter().enumerate() {
            if candidates[..position]
                .iter()
                .any(|earlier| earlier.name() == candidate.name())
            {
                return Err(AppError::InvalidArgument(format!(
                    "duplicate candidate name {}",
                    candidate.name()
                )));
            }
        }
        Ok(Self { candidates })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.candidates.iter().map(|c| c.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn RatingPredictor> {
        self.candidates.iter().map(|c| c.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&dyn RatingPredictor> {
        self.iter().find(|c| c.name() == name)
    }

    /// Fresh unfitted instance of the named candidate
    pub fn instantiate(&self, name: &str) -> AppResult<Box<dyn RatingPredictor>> {
        self.get(name)
            .map(|c| c.boxed_clone())
            .ok_or_else(|| AppError::InvalidArgument(format!("no candidate named {}", name)))
    }
}

use crate::services::predictors::PredictorError;

/// Evaluation pipeline errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Predictor {algorithm} failed{}: {source}", fold_suffix(.fold))]
    PredictorFailure {
        algorithm: String,
        fold: Option<usize>,
        #[source]
        source: PredictorError,
    },

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Predictor {algorithm} exceeded the {limit_ms}ms fit limit on fold {fold}")]
    Timeout {
        algorithm: String,
        fold: usize,
        limit_ms: u128,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn fold_suffix(fold: &Option<usize>) -> String {
    match fold {
        Some(fold) => format!(" on fold {}", fold),
        None => String::new(),
    }
}

impl AppError {
    /// Wraps a predictor error raised while evaluating `algorithm`
    pub fn predictor(algorithm: impl Into<String>, fold: Option<usize>, source: PredictorError) -> Self {
        AppError::PredictorFailure {
            algorithm: algorithm.into(),
            fold,
            source,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

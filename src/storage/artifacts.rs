use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::error::AppResult;
use crate::models::MetricsBundle;
use crate::services::refit::ModelPackage;

/// Names of the artifacts a training run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    Metrics,
    BestModel,
}

impl Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKey::Metrics => write!(f, "metrics.json"),
            ArtifactKey::BestModel => write!(f, "best_model_predictions.json"),
        }
    }
}

/// Durable storage for training run outputs
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save_metrics(&self, bundle: &MetricsBundle) -> AppResult<()>;

    /// `None` when no run has been saved yet
    async fn load_metrics(&self) -> AppResult<Option<MetricsBundle>>;

    async fn save_package(&self, package: &ModelPackage) -> AppResult<()>;

    /// `None` when no model has been saved yet
    async fn load_package(&self) -> AppResult<Option<ModelPackage>>;
}

/// Stores each artifact as a pretty-printed JSON file in one directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, key: ArtifactKey) -> PathBuf {
        self.dir.join(key.to_string())
    }

    /// Writes through a temporary file so readers never see a partial artifact
    pub async fn put<T: Serialize + Sync>(&self, key: ArtifactKey, value: &T) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(value)?;

        let path = self.path_of(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::info!(path = %path.display(), bytes = json.len(), "Artifact saved");
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, key: ArtifactKey) -> AppResult<Option<T>> {
        let path = self.path_of(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ArtifactStore for JsonFileStore {
    async fn save_metrics(&self, bundle: &MetricsBundle) -> AppResult<()> {
        self.put(ArtifactKey::Metrics, bundle).await
    }

    async fn load_metrics(&self) -> AppResult<Option<MetricsBundle>> {
        self.get(ArtifactKey::Metrics).await
    }

    async fn save_package(&self, package: &ModelPackage) -> AppResult<()> {
        self.put(ArtifactKey::BestModel, package).await
    }

    async fn load_package(&self) -> AppResult<Option<ModelPackage>> {
        self.get(ArtifactKey::BestModel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlgorithmMetrics, Prediction};
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tokio_test::assert_ok;
    use uuid::Uuid;

    fn bundle() -> MetricsBundle {
        let mut metrics = AlgorithmMetrics::new("BaselineOnly");
        metrics.rmse = vec![0.93, 0.91];
        metrics.precision = BTreeMap::from([(3, vec![0.8, 0.75]), (10, vec![0.7, 0.72])]);
        MetricsBundle {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            kfold: 2,
            top_n: 10,
            threshold: 3.5,
            k_values: vec![3, 10],
            seed: 0,
            algorithms: vec![metrics],
        }
    }

    #[test]
    fn test_artifact_file_names() {
        assert_eq!(ArtifactKey::Metrics.to_string(), "metrics.json");
        assert_eq!(ArtifactKey::BestModel.to_string(), "best_model_predictions.json");
    }

    #[tokio::test]
    async fn test_metrics_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("out"));
        let bundle = bundle();

        assert_ok!(store.save_metrics(&bundle).await);
        let loaded = store.load_metrics().await.unwrap();
        assert_eq!(loaded, Some(bundle));
    }

    #[tokio::test]
    async fn test_missing_artifacts_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert_eq!(store.load_metrics().await.unwrap(), None);
        assert_eq!(store.load_package().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_package_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        let package = |algorithm: &str| ModelPackage {
            algorithm: algorithm.to_string(),
            trained_at: Utc::now(),
            predictions: vec![Prediction::new("u", "i", Some(4.0), 3.75)],
            model: serde_json::json!({ "mean": 3.75 }),
        };

        assert_ok!(store.save_package(&package("GlobalMean")).await);
        assert_ok!(store.save_package(&package("BaselineOnly")).await);

        let loaded = store.load_package().await.unwrap().unwrap();
        assert_eq!(loaded.algorithm, "BaselineOnly");
        assert!(!store.path_of(ArtifactKey::BestModel).with_extension("json.tmp").exists());
    }
}

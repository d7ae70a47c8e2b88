use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recsys_eval::config::Config;
use recsys_eval::services::{
    cross_validate, predictors, refit, select_best, AlgorithmRegistry, MetricsSummary,
};
use recsys_eval::storage::{load_dataset, ArtifactStore, JsonFileStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let raw = load_dataset(&config.data_path, config.rating_scale()?)
        .await
        .with_context(|| format!("Failed to load ratings from {}", config.data_path.display()))?;
    let dataset = raw.filter_min_ratings(config.min_ratings_per_user, config.min_ratings_per_item);
    tracing::info!(
        before = raw.len(),
        after = dataset.len(),
        "Filtered sparse users and items"
    );

    let registry = AlgorithmRegistry::new(predictors::default_candidates())?;
    let bundle = cross_validate(&registry, &dataset, &config.cv_options()).await?;
    println!("{}", MetricsSummary::from_bundle(&bundle));

    let store = JsonFileStore::new(&config.output_dir);
    store.save_metrics(&bundle).await?;

    let best = select_best(&registry, &bundle, &config.rank_by, config.rank_k)?;
    let winner = registry.instantiate(&best)?;
    let seed = config.seed;
    let output = tokio::task::spawn_blocking(move || refit(&dataset, winner, seed))
        .await
        .context("Refit task panicked")??;

    store.save_package(&output.to_package()?).await?;

    tracing::info!(
        algorithm = output.algorithm.as_str(),
        output_dir = %store.dir().display(),
        run_id = %bundle.run_id,
        "Best model saved"
    );

    Ok(())
}

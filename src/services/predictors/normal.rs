use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};

use super::{export_state, PredictorError, RatingPredictor};
use crate::models::{Dataset, Prediction, RatingScale};

/// Draws estimates from a normal distribution fitted to the training ratings
///
/// Each (user, item) pair gets its own generator derived from the fit seed,
/// so an estimate does not depend on how many other pairs were predicted first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalPredictor {
    #[serde(default)]
    model: Option<Distribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Distribution {
    mean: f64,
    std_dev: f64,
    seed: u64,
    scale: RatingScale,
}

impl NormalPredictor {
    pub const NAME: &'static str = "NormalPredictor";
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over the seed and both ids, each field terminated by 0xff.
/// Must stay stable: persisted models only store the fit seed.
fn pair_seed(seed: u64, user_id: &str, item_id: &str) -> u64 {
    let seed_bytes = seed.to_le_bytes();
    let fields: [&[u8]; 3] = [&seed_bytes, user_id.as_bytes(), item_id.as_bytes()];
    let mut hash = FNV_OFFSET;
    for field in fields {
        for &byte in field.iter().chain(std::iter::once(&0xff)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

impl RatingPredictor for NormalPredictor {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn fit(&mut self, trainset: &Dataset, seed: u64) -> Result<(), PredictorError> {
        let mean = trainset.global_mean().ok_or(PredictorError::EmptyTrainset)?;
        let variance = trainset
            .ratings
            .iter()
            .map(|r| (r.rating - mean).powi(2))
            .sum::<f64>()
            / trainset.len() as f64;

        self.model = Some(Distribution {
            mean,
            std_dev: variance.sqrt(),
            seed,
            scale: trainset.scale,
        });
        Ok(())
    }

    fn predict(
        &self,
        user_id: &str,
        item_id: &str,
        true_rating: Option<f64>,
    ) -> Result<Prediction, PredictorError> {
        let model = self.model.as_ref().ok_or(PredictorError::NotFitted)?;

        let mut rng = StdRng::seed_from_u64(pair_seed(model.seed, user_id, item_id));
        let normal = Normal::new(model.mean, model.std_dev)
            .map_err(|e| PredictorError::Training(e.to_string()))?;
        let sample = normal.sample(&mut rng);

        let estimate = model.scale.clip(sample);
        Ok(Prediction::new(user_id, item_id, true_rating, estimate))
    }

    fn boxed_clone(&self) -> Box<dyn RatingPredictor> {
        Box::new(Self::default())
    }

    fn state(&self) -> Result<serde_json::Value, PredictorError> {
        export_state(self)
    }
}

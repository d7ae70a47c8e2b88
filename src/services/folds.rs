use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::error::{AppError, AppResult};
use crate::models::{Dataset, Rating};

/// One train/test partition of a k-fold split
#[derive(Debug, Clone)]
pub struct Fold {
    pub index: usize,
    pub train: Dataset,
    pub test: Vec<Rating>,
}

/// Shuffled k-fold splitter
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    n_splits: usize,
    seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> AppResult<Self> {
        if n_splits < 2 {
            return Err(AppError::InvalidArgument(format!(
                "k-fold needs at least 2 splits, got {}",
                n_splits
            )));
        }
        Ok(Self { n_splits, seed })
    }

    /// Partitions `dataset` into `n_splits` folds.
    ///
    /// Row indices are shuffled with the seed, then cut into consecutive
    /// blocks of `len / n_splits` rows; the first `len % n_splits` blocks get
    /// one extra row. Each fold tests on its block and trains on the rest.
    pub fn split(&self, dataset: &Dataset) -> AppResult<Vec<Fold>> {
        if dataset.is_empty() {
            return Err(AppError::InsufficientData("dataset has no ratings".to_string()));
        }
        if self.n_splits > dataset.len() {
            return Err(AppError::InvalidArgument(format!(
                "cannot split {} ratings into {} folds",
                dataset.len(),
                self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let base = dataset.len() / self.n_splits;
        let extra = dataset.len() % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut stop = 0;
        for index in 0..self.n_splits {
            let start = stop;
            stop += base + usize::from(index < extra);

            let test = indices[start..stop]
                .iter()
                .map(|&i| dataset.ratings[i].clone())
                .collect();
            let train = indices[..start]
                .iter()
                .chain(indices[stop..].iter())
                .map(|&i| dataset.ratings[i].clone())
                .collect();

            folds.push(Fold {
                index,
                train: Dataset::new(train, dataset.scale),
                test,
            });
        }

        Ok(folds)
    }
}

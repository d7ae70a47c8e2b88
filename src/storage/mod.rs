pub mod artifacts;
pub mod ratings;

pub use artifacts::{ArtifactKey, ArtifactStore, JsonFileStore};
pub use ratings::load_dataset;

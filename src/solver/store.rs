//! JSON persistence of sample sets.
//!
//! Lets an expensive solver run be reused: results are saved under a name
//! and loaded back instead of solving again.

use std::fs;
use std::path::{Path, PathBuf};

use super::SampleSet;
use crate::error::{ArrangeError, Result};

/// Directory of saved sample sets, one `{name}.json` file each.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Creates a store rooted at `dir` (created on first save).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a result is saved under.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Whether a result exists.
    pub fn contains(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Saves a sample set, overwriting any previous one.
    pub fn save(&self, name: &str, samples: &SampleSet) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(name);
        fs::write(&path, serde_json::to_string(samples)?)?;
        log::info!("saved {} samples to {}", samples.len(), path.display());
        Ok(path)
    }

    /// Loads a saved sample set.
    ///
    /// # Errors
    ///
    /// [`ArrangeError::MissingResult`] if nothing was saved under `name`.
    pub fn load(&self, name: &str) -> Result<SampleSet> {
        let path = self.path(name);
        if !path.is_file() {
            return Err(ArrangeError::MissingResult(path));
        }
        let samples: SampleSet = serde_json::from_str(&fs::read_to_string(&path)?)?;
        log::info!("loaded {} samples from {}", samples.len(), path.display());
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Sample;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("results"));
        let set = SampleSet::from_samples([
            Sample::new(vec![1, 0, 1], -2.5),
            Sample::new(vec![0, 0, 1], 1.0),
        ])
        .with_info(serde_json::json!({ "solver": "test" }));

        assert!(!store.contains("piece"));
        let path = store.save("piece", &set).unwrap();
        assert!(path.ends_with("piece.json"));
        assert!(store.contains("piece"));
        assert_eq!(store.load("piece").unwrap(), set);
    }

    #[test]
    fn test_missing_result() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path());
        assert!(matches!(
            store.load("nothing"),
            Err(ArrangeError::MissingResult(_))
        ));
    }
}

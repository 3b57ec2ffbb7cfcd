//! On-disk phrase cache.
//!
//! Segmentation results are stored per score and voice as JSON. Each entry
//! carries a digest of everything the segmentation depends on (the voice's
//! events, the boundary weights and the search parameters); an entry whose
//! digest differs from the current one is treated as a miss and rewritten.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::PhraseSegmenter;
use crate::error::Result;
use crate::models::{Phrase, Score, Voice};

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    voice: usize,
    key: String,
    phrases: Vec<Phrase>,
}

/// Digest identifying one voice's segmentation inputs.
pub fn cache_key(voice: &Voice, segmenter: &PhraseSegmenter) -> Result<String> {
    let payload = serde_json::to_vec(&(
        &voice.events,
        segmenter.detector().weights(),
        segmenter.config(),
    ))?;
    let mut hasher = Sha256::new();
    hasher.update(&payload);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Directory-backed phrase cache.
#[derive(Debug, Clone)]
pub struct PhraseCache {
    dir: PathBuf,
}

impl PhraseCache {
    /// Creates a cache rooted at `dir` (created on first store).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, score_name: &str, voice: usize) -> PathBuf {
        self.dir.join(format!("{score_name}_v{voice}.json"))
    }

    /// Reads cached phrases. Missing, unreadable or stale entries yield `None`.
    pub fn load(&self, score_name: &str, voice: usize, key: &str) -> Option<Vec<Phrase>> {
        let path = self.entry_path(score_name, voice);
        let text = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&text) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("ignoring unreadable phrase cache {}: {e}", path.display());
                return None;
            }
        };
        if entry.voice != voice || entry.key != key {
            log::info!("phrase cache {} is stale; regenerating", path.display());
            return None;
        }
        Some(entry.phrases)
    }

    /// Writes phrases for one voice.
    pub fn store(
        &self,
        score_name: &str,
        voice: usize,
        key: &str,
        phrases: &[Phrase],
    ) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let entry = CacheEntry {
            voice,
            key: key.to_string(),
            phrases: phrases.to_vec(),
        };
        fs::write(
            self.entry_path(score_name, voice),
            serde_json::to_string_pretty(&entry)?,
        )?;
        Ok(())
    }

    /// Returns the phrases of every voice, segmenting and storing the ones
    /// not cached under the current key.
    pub fn get_or_segment(
        &self,
        score_name: &str,
        score: &Score,
        segmenter: &PhraseSegmenter,
    ) -> Result<Vec<Vec<Phrase>>> {
        let mut all = Vec::with_capacity(score.voice_count());
        for (index, voice) in score.voices.iter().enumerate() {
            let key = cache_key(voice, segmenter)?;
            let phrases = match self.load(score_name, index, &key) {
                Some(phrases) => phrases,
                None => {
                    let seg = segmenter.segment_voice(voice, index);
                    self.store(score_name, index, &key, &seg.phrases)?;
                    seg.phrases
                }
            };
            all.push(phrases);
        }
        Ok(all)
    }
}

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Lookup of alternative words for a noun.
pub trait SynonymSource: Send + Sync {
    fn synonyms(&self, word: &str) -> Vec<String>;
}

/// Synonyms held in memory, keyed by lowercase word.
#[derive(Debug, Default, Clone)]
pub struct MapSynonyms {
    map: HashMap<String, Vec<String>>,
}

impl MapSynonyms {
    pub fn new(map: HashMap<String, Vec<String>>) -> Self {
        let map = map
            .into_iter()
            .map(|(k, v)| {
                let values = v
                    .into_iter()
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect();
                (k.trim().to_lowercase(), values)
            })
            .collect();
        Self { map }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a JSON object of `{"word": ["synonym", ...]}`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read synonyms from {}", path.display()))?;
        let map: HashMap<String, Vec<String>> =
            serde_json::from_str(&data).context("Failed to parse synonyms file")?;
        Ok(Self::new(map))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl SynonymSource for MapSynonyms {
    fn synonyms(&self, word: &str) -> Vec<String> {
        self.map
            .get(&word.trim().to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

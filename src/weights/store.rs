use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{WeightConfig, WeightValidationError};

/// Why a candidate snapshot was not installed.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("failed to read weight source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse weight document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("weight document rejected: {}", format_violations(.0))]
    Invalid(Vec<WeightValidationError>),
}

fn format_violations(errors: &[WeightValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Holds the current weight snapshot.
///
/// Readers clone an `Arc` out from under a read lock that is only ever held
/// for a pointer copy; the single writer swaps in a fully validated
/// replacement. A reader therefore always sees one complete snapshot.
pub struct WeightStore {
    current: RwLock<Arc<WeightConfig>>,
    source: Option<PathBuf>,
}

impl WeightStore {
    /// A store with a fixed starting snapshot and no backing source.
    pub fn new(initial: WeightConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            source: None,
        }
    }

    /// Open a store backed by a JSON document on disk. If the document is
    /// missing or invalid at startup, the hardcoded default is served until
    /// a valid version appears.
    pub fn with_source(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = match load_candidate(&path) {
            Ok(config) => {
                tracing::info!(
                    "Loaded weight config v{} ({}) from {}",
                    config.version,
                    config.fingerprint(),
                    path.display()
                );
                config
            }
            Err(e) => {
                tracing::warn!("Using default weight config: {e}");
                WeightConfig::default()
            }
        };
        Self {
            current: RwLock::new(Arc::new(initial)),
            source: Some(path),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Current snapshot. Never fails.
    pub fn snapshot(&self) -> Arc<WeightConfig> {
        Arc::clone(&self.current.read())
    }

    /// Validate `candidate` and, if every field is in range, make it the
    /// current snapshot. On rejection the previous snapshot stays untouched.
    pub fn reload(&self, candidate: WeightConfig) -> Result<(), ReloadError> {
        candidate.validate().map_err(ReloadError::Invalid)?;
        *self.current.write() = Arc::new(candidate);
        Ok(())
    }

    /// Re-read the backing source. Returns `Ok(true)` when a new snapshot was
    /// installed and `Ok(false)` when the source is absent or unchanged.
    pub fn reload_from_source(&self) -> Result<bool, ReloadError> {
        let Some(path) = &self.source else {
            return Ok(false);
        };
        let candidate = load_candidate(path)?;
        if *self.snapshot() == candidate {
            return Ok(false);
        }
        let fingerprint = candidate.fingerprint();
        let version = candidate.version.clone();
        self.reload(candidate)?;
        tracing::info!("Weight config reloaded: v{version} ({fingerprint})");
        Ok(true)
    }

    /// Poll the backing source on a fixed interval. Failures are logged and
    /// the previous snapshot keeps serving.
    pub fn spawn_reloader(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; startup already loaded.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = self.reload_from_source() {
                    tracing::warn!("Keeping previous weight config: {e}");
                }
            }
        })
    }
}

fn load_candidate(path: &Path) -> Result<WeightConfig, ReloadError> {
    let data = std::fs::read_to_string(path).map_err(|source| ReloadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let candidate: WeightConfig = serde_json::from_str(&data)?;
    candidate.validate().map_err(ReloadError::Invalid)?;
    Ok(candidate)
}

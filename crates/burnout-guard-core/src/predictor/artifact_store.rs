use std::{fs, path::PathBuf, sync::Arc};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::info;

use super::forest::{DecisionForestModel, ModelValidationError};
use super::scaler::{ScalerValidationError, StandardScaler};
use super::{BurnoutPredictor, FeatureScaler, RiskModel, FEATURE_COUNT};

const MODEL_FILE: &str = "burnout_model.json";
const SCALER_FILE: &str = "scaler.json";

/// The fitted pair loaded from the artifact store. Both halves are immutable
/// and shared read-only across all inference calls.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub model: Arc<DecisionForestModel>,
    pub scaler: Arc<StandardScaler>,
}

/// Errors raised while loading the fitted artifacts. All of these are fatal
/// to the request path: predictions must not run with a partial pair.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact `{name}` not found at {path}")]
    Missing { name: &'static str, path: PathBuf },
    #[error("failed to read artifact `{name}` at {path}")]
    Unreadable {
        name: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact `{name}` at {path} is not a valid serialized object")]
    Malformed {
        name: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("model artifact at {path} failed validation")]
    InvalidModel {
        path: PathBuf,
        #[source]
        source: ModelValidationError,
    },
    #[error("scaler artifact at {path} failed validation")]
    InvalidScaler {
        path: PathBuf,
        #[source]
        source: ScalerValidationError,
    },
    #[error("model was fitted on {model} features but scaler on {scaler}; the pair is mismatched")]
    MismatchedPair { model: usize, scaler: usize },
    #[error("artifact pack was fitted on {fitted} features but this system's schema has {expected}")]
    IncompatibleSchema { fitted: usize, expected: usize },
}

/// Loads the fitted classifier and scaler from `burnout_model.json` and
/// `scaler.json` under a base directory, validating both and caching the pair
/// for the lifetime of the store. Repeated loads after the first are O(1) and
/// return the same shared `Arc`s; the cache is invalidated only by dropping
/// the store.
pub struct FileArtifactStore {
    base_path: PathBuf,
    cache: OnceCell<Artifacts>,
}

impl FileArtifactStore {
    /// Create a store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            cache: OnceCell::new(),
        }
    }

    fn model_path(&self) -> PathBuf {
        self.base_path.join(MODEL_FILE)
    }

    fn scaler_path(&self) -> PathBuf {
        self.base_path.join(SCALER_FILE)
    }

    /// Load and validate the fitted pair, or return the cached copy.
    pub fn load(&self) -> Result<Artifacts, ArtifactError> {
        let artifacts = self.cache.get_or_try_init(|| {
            let model = self.load_model()?;
            let scaler = self.load_scaler()?;
            if model.n_features() != scaler.n_features() {
                return Err(ArtifactError::MismatchedPair {
                    model: model.n_features(),
                    scaler: scaler.n_features(),
                });
            }
            // A consistent pair can still disagree with the six-indicator
            // schema; that is an incompatible artifact, not a request error.
            if model.n_features() != FEATURE_COUNT {
                return Err(ArtifactError::IncompatibleSchema {
                    fitted: model.n_features(),
                    expected: FEATURE_COUNT,
                });
            }
            info!(
                path = %self.base_path.display(),
                n_features = model.n_features(),
                n_trees = model.n_trees(),
                "loaded fitted artifacts"
            );
            Ok(Artifacts {
                model: Arc::new(model),
                scaler: Arc::new(scaler),
            })
        })?;
        Ok(artifacts.clone())
    }

    /// Build a predictor wired to the cached artifact pair.
    pub fn predictor(&self) -> Result<BurnoutPredictor, ArtifactError> {
        let artifacts = self.load()?;
        Ok(BurnoutPredictor::new(artifacts.scaler, artifacts.model))
    }

    fn load_model(&self) -> Result<DecisionForestModel, ArtifactError> {
        let path = self.model_path();
        let raw = read_artifact("model", &path)?;
        let model: DecisionForestModel =
            serde_json::from_str(&raw).map_err(|source| ArtifactError::Malformed {
                name: "model",
                path: path.clone(),
                source,
            })?;
        model
            .validate()
            .map_err(|source| ArtifactError::InvalidModel { path, source })?;
        Ok(model)
    }

    fn load_scaler(&self) -> Result<StandardScaler, ArtifactError> {
        let path = self.scaler_path();
        let raw = read_artifact("scaler", &path)?;
        let scaler: StandardScaler =
            serde_json::from_str(&raw).map_err(|source| ArtifactError::Malformed {
                name: "scaler",
                path: path.clone(),
                source,
            })?;
        scaler
            .validate()
            .map_err(|source| ArtifactError::InvalidScaler { path, source })?;
        Ok(scaler)
    }
}

fn read_artifact(name: &'static str, path: &PathBuf) -> Result<String, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            name,
            path: path.clone(),
        });
    }
    fs::read_to_string(path).map_err(|source| ArtifactError::Unreadable {
        name,
        path: path.clone(),
        source,
    })
}

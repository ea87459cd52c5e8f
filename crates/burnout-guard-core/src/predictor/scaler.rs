use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{FeatureScaler, PredictError, ScaledVector};

/// Per-feature standardization fitted offline: `(x - mean) / scale`.
///
/// The mean and scale vectors are learned statistics from the training run and
/// are treated as opaque here; the scaler is read-only after loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Construct a scaler, validating invariants before returning.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScalerValidationError> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Validate invariants for a deserialized scaler artifact.
    pub fn validate(&self) -> Result<(), ScalerValidationError> {
        if self.mean.is_empty() {
            return Err(ScalerValidationError::Empty);
        }
        if self.mean.len() != self.scale.len() {
            return Err(ScalerValidationError::LengthMismatch {
                mean: self.mean.len(),
                scale: self.scale.len(),
            });
        }
        for (idx, value) in self.mean.iter().enumerate() {
            if !value.is_finite() {
                return Err(ScalerValidationError::NonFiniteMean { idx, value: *value });
            }
        }
        for (idx, value) in self.scale.iter().enumerate() {
            if !value.is_finite() || *value <= 0.0 {
                return Err(ScalerValidationError::InvalidScale { idx, value: *value });
            }
        }
        Ok(())
    }
}

/// Errors emitted while validating scaler artifacts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScalerValidationError {
    #[error("scaler has no fitted features")]
    Empty,
    #[error("scaler mean has {mean} entries but scale has {scale}")]
    LengthMismatch { mean: usize, scale: usize },
    #[error("scaler mean[{idx}] is not finite (got {value})")]
    NonFiniteMean { idx: usize, value: f64 },
    #[error("scaler scale[{idx}] must be finite and > 0 (got {value})")]
    InvalidScale { idx: usize, value: f64 },
}

impl FeatureScaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, raw: &[f64]) -> Result<ScaledVector, PredictError> {
        if raw.len() != self.mean.len() {
            return Err(PredictError::DimensionMismatch {
                expected: self.mean.len(),
                actual: raw.len(),
            });
        }
        Ok(raw
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect())
    }
}

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

pub mod artifact_store;
pub mod forest;
pub mod scaler;

/// Number of indicators every fitted artifact in this system was trained on.
pub const FEATURE_COUNT: usize = 6;

/// Canonical feature order shared by the vector builder, the scaler dimension
/// check, and importance pairing. Index `i` of any importance vector always
/// refers to `FEATURE_NAMES[i]`; the artifacts were fitted against this exact
/// order, so it must never be rearranged.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "attendance",
    "study_time",
    "failures",
    "health",
    "social_activity",
    "marks_trend",
];

/// Scaled feature values produced by a [`FeatureScaler`].
pub type ScaledVector = Vec<f64>;

/// Request payload for a single prediction. Each indicator is optional so a
/// partially filled form deserializes cleanly and is rejected with a precise
/// error by [`IndicatorForm::build`] instead of a generic JSON failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorForm {
    /// Attendance percentage, 40.0–100.0.
    pub attendance: Option<f64>,
    /// Ordinal weekly study effort, 1–4.
    pub study_time: Option<u8>,
    /// Count of past course failures, 0–4.
    pub failures: Option<u8>,
    /// Ordinal health status, 1–5.
    pub health: Option<u8>,
    /// Ordinal social/outing frequency, 1–5.
    pub social_activity: Option<u8>,
    /// Signed change in grade over time, −10.0–10.0.
    pub marks_trend: Option<f64>,
}

impl IndicatorForm {
    /// Check that all six indicators are present and produce the typed record.
    ///
    /// Domain enforcement (value ranges) belongs to the input-collection
    /// surface upstream; this only validates shape. The first missing field in
    /// canonical order is reported.
    pub fn build(&self) -> Result<Indicators, PredictError> {
        Ok(Indicators {
            attendance: self
                .attendance
                .ok_or(PredictError::MissingIndicator(FEATURE_NAMES[0]))?,
            study_time: self
                .study_time
                .ok_or(PredictError::MissingIndicator(FEATURE_NAMES[1]))?,
            failures: self
                .failures
                .ok_or(PredictError::MissingIndicator(FEATURE_NAMES[2]))?,
            health: self
                .health
                .ok_or(PredictError::MissingIndicator(FEATURE_NAMES[3]))?,
            social_activity: self
                .social_activity
                .ok_or(PredictError::MissingIndicator(FEATURE_NAMES[4]))?,
            marks_trend: self
                .marks_trend
                .ok_or(PredictError::MissingIndicator(FEATURE_NAMES[5]))?,
        })
    }
}

/// Fully populated indicator record for one student.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub attendance: f64,
    pub study_time: u8,
    pub failures: u8,
    pub health: u8,
    pub social_activity: u8,
    pub marks_trend: f64,
}

impl Indicators {
    /// Encode the indicators as the fixed-order feature vector the artifacts
    /// were fitted against. This is the only place the order is spelled out.
    pub fn feature_vector(&self) -> FeatureVector {
        FeatureVector([
            self.attendance,
            f64::from(self.study_time),
            f64::from(self.failures),
            f64::from(self.health),
            f64::from(self.social_activity),
            self.marks_trend,
        ])
    }
}

/// Raw feature values in canonical order, length fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Closed set of burnout risk classes the fitted classifier emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

/// Severity tier attached to each risk class for downstream display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Green,
    Yellow,
    Red,
}

impl RiskClass {
    /// Interpret a raw class id from the classifier. Any id outside {0, 1, 2}
    /// is a model/interpreter version mismatch and is surfaced as an error,
    /// never coerced to a default class.
    pub fn from_id(id: u32) -> Result<Self, PredictError> {
        match id {
            0 => Ok(Self::Low),
            1 => Ok(Self::Medium),
            2 => Ok(Self::High),
            other => Err(PredictError::UnknownRiskClass(other)),
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Medium => "Medium Risk",
            Self::High => "High Risk",
        }
    }

    pub fn tier(self) -> SeverityTier {
        match self {
            Self::Low => SeverityTier::Green,
            Self::Medium => SeverityTier::Yellow,
            Self::High => SeverityTier::Red,
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            Self::Low => "Student shows healthy academic and behavioral patterns.",
            Self::Medium => "Some warning signs detected. Monitoring is advised.",
            Self::High => {
                "Strong burnout indicators detected. Immediate support recommended."
            }
        }
    }
}

/// One named feature paired with its importance score, index-aligned with
/// [`FEATURE_NAMES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub score: f64,
}

/// End-to-end result of one prediction: the interpreted class plus the
/// explanation payload handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_class_id: u8,
    pub risk_class: RiskClass,
    pub label: String,
    pub tier: SeverityTier,
    pub explanation: String,
    /// `None` when the model type exposes no importances; never an empty or
    /// zero-filled list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importances: Option<Vec<FeatureImportance>>,
}

impl RiskAssessment {
    /// Assemble the output record for an interpreted class.
    pub fn new(class: RiskClass, importances: Option<Vec<FeatureImportance>>) -> Self {
        Self {
            risk_class_id: class.id(),
            risk_class: class,
            label: class.label().to_string(),
            tier: class.tier(),
            explanation: class.explanation().to_string(),
            importances,
        }
    }
}

/// Request-level and misconfiguration errors raised by the inference pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PredictError {
    /// Request-level: the form is incomplete. Reject this request only.
    #[error("indicator `{0}` is missing from the request")]
    MissingIndicator(&'static str),
    /// Request-level: the vector does not match the scaler's fitted width.
    #[error("feature vector has {actual} values but the scaler was fitted on {expected} features")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Fatal misconfiguration: the model/scaler pairing is wrong.
    #[error("model expects a {expected}-feature input but received {actual} values")]
    UnsupportedModel { expected: usize, actual: usize },
    /// Fatal version skew between the fitted model and this interpreter.
    #[error("model produced risk class {0}, expected one of 0, 1, 2")]
    UnknownRiskClass(u32),
    /// Fatal misconfiguration: the importance vector cannot be paired with
    /// the feature schema.
    #[error("model exposes {actual} importance scores but the schema has {expected} features")]
    MisalignedImportances { expected: usize, actual: usize },
}

/// Opaque fitted transform normalizing raw indicators to the training-time
/// distribution. Read-only after loading; safe to share across requests.
pub trait FeatureScaler: Send + Sync {
    /// Number of features the scaler was fitted on.
    fn n_features(&self) -> usize;

    /// Apply the fitted transform. Deterministic: identical input and scaler
    /// always yield bit-identical output.
    fn transform(&self, raw: &[f64]) -> Result<ScaledVector, PredictError>;
}

/// Opaque fitted classifier mapping a scaled feature vector to a raw risk
/// class id. Read-only after loading; safe to share across requests.
pub trait RiskModel: Send + Sync {
    /// Number of features the model was fitted on.
    fn n_features(&self) -> usize;

    /// Score one scaled vector, returning the raw class id.
    fn predict(&self, scaled: &[f64]) -> Result<u32, PredictError>;

    /// Per-feature importance weights in canonical order, if this model type
    /// supports them. Absence is a capability gap, not an error.
    fn feature_importances(&self) -> Option<&[f64]>;
}

/// Synchronous inference pipeline: build → scale → classify → interpret.
///
/// Holds the fitted artifacts behind capability traits so the pipeline never
/// depends on a concrete model representation. Both artifacts are immutable
/// and shared read-only; the predictor itself is cheap to clone.
#[derive(Clone)]
pub struct BurnoutPredictor {
    scaler: Arc<dyn FeatureScaler>,
    model: Arc<dyn RiskModel>,
}

impl BurnoutPredictor {
    pub fn new(scaler: Arc<dyn FeatureScaler>, model: Arc<dyn RiskModel>) -> Self {
        Self { scaler, model }
    }

    /// Run the full pipeline for one request.
    ///
    /// Per-request failures (missing indicator, dimension mismatch) reject
    /// only this request; `UnsupportedModel` and `UnknownRiskClass` indicate a
    /// broken deployment and should abort serving.
    #[instrument(name = "predict_risk", skip(self, form))]
    pub fn predict(&self, form: &IndicatorForm) -> Result<RiskAssessment, PredictError> {
        let indicators = form.build()?;
        let features = indicators.feature_vector();
        let scaled = self.scaler.transform(features.as_slice())?;
        let class_id = self.model.predict(&scaled)?;
        let class = RiskClass::from_id(class_id)?;
        let importances = match self.model.feature_importances() {
            Some(scores) => {
                let scores: &[f64; FEATURE_COUNT] =
                    scores
                        .try_into()
                        .map_err(|_| PredictError::MisalignedImportances {
                            expected: FEATURE_COUNT,
                            actual: scores.len(),
                        })?;
                Some(pair_importances(scores))
            }
            None => None,
        };
        debug!(class_id, label = class.label(), "prediction completed");
        Ok(RiskAssessment::new(class, importances))
    }
}

/// Pair importance scores with the canonical feature names, preserving index
/// correspondence. The fixed-length input makes a name/score misalignment
/// unrepresentable here; slices of unknown width must be checked first.
pub fn pair_importances(scores: &[f64; FEATURE_COUNT]) -> Vec<FeatureImportance> {
    FEATURE_NAMES
        .iter()
        .zip(scores)
        .map(|(name, score)| FeatureImportance {
            feature: (*name).to_string(),
            score: *score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> IndicatorForm {
        IndicatorForm {
            attendance: Some(75.0),
            study_time: Some(2),
            failures: Some(0),
            health: Some(3),
            social_activity: Some(3),
            marks_trend: Some(0.0),
        }
    }

    #[test]
    fn feature_vector_follows_canonical_order() {
        let indicators = Indicators {
            attendance: 88.5,
            study_time: 4,
            failures: 1,
            health: 5,
            social_activity: 2,
            marks_trend: -3.5,
        };
        let vector = indicators.feature_vector();
        assert_eq!(vector.as_slice(), &[88.5, 4.0, 1.0, 5.0, 2.0, -3.5]);
        assert_eq!(vector.as_slice().len(), FEATURE_NAMES.len());
    }

    #[test]
    fn build_rejects_missing_indicator() {
        let mut form = complete_form();
        form.health = None;
        let err = form.build().expect_err("missing health should fail");
        assert_eq!(err, PredictError::MissingIndicator("health"));
    }

    #[test]
    fn build_reports_first_missing_in_canonical_order() {
        let mut form = complete_form();
        form.failures = None;
        form.marks_trend = None;
        let err = form.build().expect_err("incomplete form should fail");
        assert_eq!(err, PredictError::MissingIndicator("failures"));
    }

    #[test]
    fn from_id_covers_the_closed_set() {
        assert_eq!(RiskClass::from_id(0).unwrap(), RiskClass::Low);
        assert_eq!(RiskClass::from_id(1).unwrap(), RiskClass::Medium);
        assert_eq!(RiskClass::from_id(2).unwrap(), RiskClass::High);
        assert_eq!(
            RiskClass::from_id(3).unwrap_err(),
            PredictError::UnknownRiskClass(3)
        );
    }

    #[test]
    fn interpretation_table_matches_contract() {
        assert_eq!(RiskClass::Low.label(), "Low Risk");
        assert_eq!(RiskClass::Low.tier(), SeverityTier::Green);
        assert_eq!(
            RiskClass::Low.explanation(),
            "Student shows healthy academic and behavioral patterns."
        );
        assert_eq!(RiskClass::Medium.label(), "Medium Risk");
        assert_eq!(RiskClass::Medium.tier(), SeverityTier::Yellow);
        assert_eq!(
            RiskClass::Medium.explanation(),
            "Some warning signs detected. Monitoring is advised."
        );
        assert_eq!(RiskClass::High.label(), "High Risk");
        assert_eq!(RiskClass::High.tier(), SeverityTier::Red);
        assert_eq!(
            RiskClass::High.explanation(),
            "Strong burnout indicators detected. Immediate support recommended."
        );
    }

    #[test]
    fn pair_importances_preserves_index_correspondence() {
        let scores = [0.28, 0.08, 0.24, 0.10, 0.07, 0.23];
        let pairs = pair_importances(&scores);
        assert_eq!(pairs.len(), FEATURE_COUNT);
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.feature, FEATURE_NAMES[i]);
            assert!((pair.score - scores[i]).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn misaligned_importance_vector_is_an_error_not_a_short_zip() {
        struct SkewedModel {
            importances: Vec<f64>,
        }

        impl RiskModel for SkewedModel {
            fn n_features(&self) -> usize {
                FEATURE_COUNT
            }

            fn predict(&self, _scaled: &[f64]) -> Result<u32, PredictError> {
                Ok(0)
            }

            fn feature_importances(&self) -> Option<&[f64]> {
                Some(&self.importances)
            }
        }

        let scaler = crate::predictor::scaler::StandardScaler::new(
            vec![0.0; FEATURE_COUNT],
            vec![1.0; FEATURE_COUNT],
        )
        .unwrap();
        let model = SkewedModel {
            importances: vec![0.25; 4],
        };
        let predictor = BurnoutPredictor::new(Arc::new(scaler), Arc::new(model));

        let err = predictor.predict(&complete_form()).unwrap_err();
        assert_eq!(
            err,
            PredictError::MisalignedImportances {
                expected: FEATURE_COUNT,
                actual: 4
            }
        );
    }

    #[test]
    fn assessment_without_importances_serializes_without_field() {
        let assessment = RiskAssessment::new(RiskClass::High, None);
        let json = serde_json::to_value(&assessment).unwrap();
        assert_eq!(json["risk_class_id"], 2);
        assert_eq!(json["label"], "High Risk");
        assert_eq!(json["tier"], "red");
        assert!(json.get("importances").is_none());
    }

    #[test]
    fn incomplete_form_deserializes_and_fails_on_build() {
        let form: IndicatorForm =
            serde_json::from_str(r#"{"attendance": 60.0, "study_time": 1}"#).unwrap();
        let err = form.build().expect_err("four fields are absent");
        assert_eq!(err, PredictError::MissingIndicator("failures"));
    }
}

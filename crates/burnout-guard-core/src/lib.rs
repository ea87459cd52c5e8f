pub mod predictor;
pub mod report;

pub use predictor::{
    artifact_store::{ArtifactError, Artifacts, FileArtifactStore},
    forest::{DecisionForestModel, DecisionTree, ModelValidationError, TreeNode},
    scaler::{ScalerValidationError, StandardScaler},
    BurnoutPredictor, FeatureImportance, FeatureScaler, FeatureVector, IndicatorForm, Indicators,
    PredictError, RiskAssessment, RiskClass, RiskModel, ScaledVector, SeverityTier, FEATURE_COUNT,
    FEATURE_NAMES,
};
pub use report::{render_assessment, OutputFormat};

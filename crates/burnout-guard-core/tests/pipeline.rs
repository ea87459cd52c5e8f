use std::{path::PathBuf, sync::Arc};

use burnout_guard_core::{
    BurnoutPredictor, DecisionForestModel, DecisionTree, FeatureScaler, FileArtifactStore,
    IndicatorForm, PredictError, RiskClass, SeverityTier, TreeNode, FEATURE_NAMES,
};
use proptest::prelude::*;

fn artifacts_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../artifacts")
}

fn shipped_predictor() -> BurnoutPredictor {
    FileArtifactStore::new(artifacts_dir())
        .predictor()
        .expect("shipped artifact pack should load")
}

fn form(
    attendance: f64,
    study_time: u8,
    failures: u8,
    health: u8,
    social_activity: u8,
    marks_trend: f64,
) -> IndicatorForm {
    IndicatorForm {
        attendance: Some(attendance),
        study_time: Some(study_time),
        failures: Some(failures),
        health: Some(health),
        social_activity: Some(social_activity),
        marks_trend: Some(marks_trend),
    }
}

#[test]
fn baseline_student_is_low_risk() {
    let predictor = shipped_predictor();
    let assessment = predictor.predict(&form(75.0, 2, 0, 3, 3, 0.0)).unwrap();

    assert_eq!(assessment.risk_class, RiskClass::Low);
    assert_eq!(assessment.risk_class_id, 0);
    assert_eq!(assessment.label, "Low Risk");
    assert_eq!(
        assessment.explanation,
        "Student shows healthy academic and behavioral patterns."
    );
}

#[test]
fn struggling_student_is_high_risk() {
    let predictor = shipped_predictor();
    let assessment = predictor.predict(&form(45.0, 1, 3, 1, 5, -8.0)).unwrap();

    assert_eq!(assessment.risk_class, RiskClass::High);
    assert_eq!(assessment.tier, SeverityTier::Red);
    assert_eq!(
        assessment.explanation,
        "Strong burnout indicators detected. Immediate support recommended."
    );
}

#[test]
fn declining_marks_raise_a_medium_flag() {
    let predictor = shipped_predictor();
    let assessment = predictor.predict(&form(60.0, 2, 1, 3, 3, -4.0)).unwrap();

    assert_eq!(assessment.risk_class, RiskClass::Medium);
    assert_eq!(assessment.tier, SeverityTier::Yellow);
}

#[test]
fn missing_indicator_rejects_before_any_stage_runs() {
    let predictor = shipped_predictor();
    let mut incomplete = form(75.0, 2, 0, 3, 3, 0.0);
    incomplete.health = None;

    let err = predictor.predict(&incomplete).unwrap_err();
    assert_eq!(err, PredictError::MissingIndicator("health"));
}

#[test]
fn short_vector_is_rejected_by_the_scaler() {
    let artifacts = FileArtifactStore::new(artifacts_dir()).load().unwrap();
    let err = artifacts
        .scaler
        .transform(&[75.0, 2.0, 0.0, 3.0, 3.0])
        .unwrap_err();
    assert_eq!(
        err,
        PredictError::DimensionMismatch {
            expected: 6,
            actual: 5
        }
    );
}

#[test]
fn shipped_model_pairs_importances_with_feature_names() {
    let predictor = shipped_predictor();
    let assessment = predictor.predict(&form(75.0, 2, 0, 3, 3, 0.0)).unwrap();

    let importances = assessment
        .importances
        .expect("shipped forest exposes importances");
    assert_eq!(importances.len(), FEATURE_NAMES.len());
    for (pair, name) in importances.iter().zip(FEATURE_NAMES) {
        assert_eq!(pair.feature, name);
        assert!(pair.score >= 0.0);
    }
}

#[test]
fn model_without_importances_reports_none() {
    let artifacts = FileArtifactStore::new(artifacts_dir()).load().unwrap();
    let plain_model = DecisionForestModel::new(
        6,
        vec![DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { class: 1 },
                TreeNode::Leaf { class: 0 },
            ],
        }],
        None,
    )
    .unwrap();

    let predictor = BurnoutPredictor::new(artifacts.scaler, Arc::new(plain_model));
    let assessment = predictor.predict(&form(75.0, 2, 0, 3, 3, 0.0)).unwrap();
    assert!(assessment.importances.is_none());
}

proptest! {
    #[test]
    fn any_valid_indicator_set_yields_a_closed_set_class(
        attendance in 40.0f64..=100.0,
        study_time in 1u8..=4,
        failures in 0u8..=4,
        health in 1u8..=5,
        social_activity in 1u8..=5,
        marks_trend in -10.0f64..=10.0,
    ) {
        let predictor = shipped_predictor();
        let assessment = predictor
            .predict(&form(attendance, study_time, failures, health, social_activity, marks_trend))
            .expect("valid indicators must classify");

        prop_assert!(assessment.risk_class_id <= 2);
        prop_assert!(!assessment.label.is_empty());
        prop_assert!(!assessment.explanation.is_empty());
    }

    #[test]
    fn scaling_is_deterministic(
        attendance in 40.0f64..=100.0,
        marks_trend in -10.0f64..=10.0,
    ) {
        let artifacts = FileArtifactStore::new(artifacts_dir()).load().unwrap();
        let input = [attendance, 2.0, 1.0, 3.0, 3.0, marks_trend];
        let first = artifacts.scaler.transform(&input).unwrap();
        let second = artifacts.scaler.transform(&input).unwrap();
        let first_bits: Vec<u64> = first.iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u64> = second.iter().map(|v| v.to_bits()).collect();
        prop_assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn repeated_predictions_are_identical(
        attendance in 40.0f64..=100.0,
        failures in 0u8..=4,
    ) {
        let predictor = shipped_predictor();
        let request = form(attendance, 2, failures, 3, 3, 0.0);
        let first = predictor.predict(&request).unwrap();
        let second = predictor.predict(&request).unwrap();
        prop_assert_eq!(first, second);
    }
}

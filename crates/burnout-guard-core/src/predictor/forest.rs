use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{PredictError, RiskModel};

/// Fitted decision-tree ensemble classifier.
///
/// The artifact is a plain numeric-parameter blob: every tree is an arena of
/// nodes with the root at index 0, and classification is a majority vote over
/// the leaf classes reached by each tree. The training process that produced
/// the trees (and the optional importance weights) is out of scope here; the
/// model is read-only once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionForestModel {
    n_features: usize,
    trees: Vec<DecisionTree>,
    /// Fitted per-feature importance weights in canonical feature order.
    /// Absent for model types that do not expose them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_importances: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Route to `left` when `x[feature] <= threshold`, otherwise `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { class: u32 },
}

impl DecisionForestModel {
    /// Construct a model, validating invariants before returning.
    pub fn new(
        n_features: usize,
        trees: Vec<DecisionTree>,
        feature_importances: Option<Vec<f64>>,
    ) -> Result<Self, ModelValidationError> {
        let model = Self {
            n_features,
            trees,
            feature_importances,
        };
        model.validate()?;
        Ok(model)
    }

    /// Validate invariants for a deserialized model artifact.
    ///
    /// Child indices must point strictly forward so every walk terminates;
    /// a violated index would otherwise loop or panic at inference time.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.n_features == 0 {
            return Err(ModelValidationError::NoFeatures);
        }
        if self.trees.is_empty() {
            return Err(ModelValidationError::NoTrees);
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelValidationError::EmptyTree { tree: tree_idx });
            }
            for (node_idx, node) in tree.nodes.iter().enumerate() {
                if let TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } = node
                {
                    if *feature >= self.n_features {
                        return Err(ModelValidationError::FeatureOutOfRange {
                            tree: tree_idx,
                            node: node_idx,
                            feature: *feature,
                            n_features: self.n_features,
                        });
                    }
                    if !threshold.is_finite() {
                        return Err(ModelValidationError::NonFiniteThreshold {
                            tree: tree_idx,
                            node: node_idx,
                        });
                    }
                    for child in [*left, *right] {
                        if child <= node_idx || child >= tree.nodes.len() {
                            return Err(ModelValidationError::InvalidChild {
                                tree: tree_idx,
                                node: node_idx,
                                child,
                            });
                        }
                    }
                }
            }
        }
        if let Some(importances) = &self.feature_importances {
            if importances.len() != self.n_features {
                return Err(ModelValidationError::ImportanceLength {
                    len: importances.len(),
                    n_features: self.n_features,
                });
            }
            for (idx, value) in importances.iter().enumerate() {
                if !value.is_finite() || *value < 0.0 {
                    return Err(ModelValidationError::InvalidImportance { idx, value: *value });
                }
            }
        }
        Ok(())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl DecisionTree {
    /// Walk from the root to a leaf. Indices were validated at load, so the
    /// walk always terminates.
    fn decide(&self, scaled: &[f64]) -> u32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { class } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if scaled[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Errors emitted while validating model artifacts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelValidationError {
    #[error("model declares zero features")]
    NoFeatures,
    #[error("model contains no trees")]
    NoTrees,
    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },
    #[error("tree {tree} node {node} splits on feature {feature}, model has {n_features}")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: usize,
        n_features: usize,
    },
    #[error("tree {tree} node {node} has a non-finite threshold")]
    NonFiniteThreshold { tree: usize, node: usize },
    #[error("tree {tree} node {node} references invalid child {child}")]
    InvalidChild {
        tree: usize,
        node: usize,
        child: usize,
    },
    #[error("importance vector has {len} entries, model has {n_features} features")]
    ImportanceLength { len: usize, n_features: usize },
    #[error("importance[{idx}] must be finite and >= 0 (got {value})")]
    InvalidImportance { idx: usize, value: f64 },
}

impl RiskModel for DecisionForestModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, scaled: &[f64]) -> Result<u32, PredictError> {
        if scaled.len() != self.n_features {
            return Err(PredictError::UnsupportedModel {
                expected: self.n_features,
                actual: scaled.len(),
            });
        }
        let mut votes: BTreeMap<u32, usize> = BTreeMap::new();
        for tree in &self.trees {
            *votes.entry(tree.decide(scaled)).or_insert(0) += 1;
        }
        // Ties resolve toward the lower class id (ascending iteration order).
        let mut winner = 0;
        let mut best = 0;
        for (class, count) in votes {
            if count > best {
                winner = class;
                best = count;
            }
        }
        Ok(winner)
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }
}

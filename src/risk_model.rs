use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::features::{FEATURE_COUNT, FEATURE_NAMES, FeatureRow};
use crate::scaling::ScalingParams;

pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Trees are averaged.
    RandomForest,
    /// Trees are summed and shrunk by the learning rate.
    GradientBoosting,
}

impl ModelType {
    pub fn label(self) -> &'static str {
        match self {
            ModelType::RandomForest => "random_forest",
            ModelType::GradientBoosting => "gradient_boosting",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: Option<usize>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: Option<usize>,
    #[serde(default)]
    pub right: Option<usize>,
    #[serde(default)]
    pub value: f64,
    /// Training samples (or hessian weight) that reached the node.
    #[serde(default)]
    pub cover: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub nodes: Vec<TreeNode>,
}

/// Exported regression ensemble. Split semantics follow the usual
/// `x[feature] <= threshold` goes left convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskModelArtifact {
    pub version: u32,
    pub model_type: ModelType,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default)]
    pub scaling: Option<ScalingParams>,
    pub trees: Vec<TreeArtifact>,
    #[serde(default)]
    pub source: Option<String>,
}

fn default_learning_rate() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Node {
    Leaf {
        value: f64,
        cover: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
}

impl Node {
    pub(crate) fn cover(&self) -> f64 {
        match self {
            Node::Leaf { cover, .. } | Node::Split { cover, .. } => *cover,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    pub(crate) nodes: Vec<Node>,
}

impl RegressionTree {
    fn from_artifact(tree_idx: usize, artifact: &TreeArtifact) -> Result<Self> {
        if artifact.nodes.is_empty() {
            bail!("tree {tree_idx} has no nodes");
        }
        let n = artifact.nodes.len();
        let mut nodes = Vec::with_capacity(n);
        for (idx, node) in artifact.nodes.iter().enumerate() {
            let parsed = match (node.feature, node.left, node.right) {
                (None, None, None) => Node::Leaf {
                    value: node.value,
                    cover: node.cover,
                },
                (Some(feature), Some(left), Some(right)) => {
                    if feature >= FEATURE_COUNT {
                        bail!("tree {tree_idx} node {idx} splits on unknown feature {feature}");
                    }
                    if left <= idx || right <= idx || left >= n || right >= n {
                        bail!("tree {tree_idx} node {idx} has invalid children {left}/{right}");
                    }
                    if !(node.cover > 0.0) {
                        bail!("tree {tree_idx} node {idx} split has non-positive cover");
                    }
                    Node::Split {
                        feature,
                        threshold: node.threshold,
                        left,
                        right,
                        cover: node.cover,
                    }
                }
                _ => bail!("tree {tree_idx} node {idx} is a half-specified split"),
            };
            nodes.push(parsed);
        }
        Ok(Self { nodes })
    }

    pub fn predict(&self, x: &FeatureRow) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value, .. } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => idx = if goes_left(x[feature], threshold) { left } else { right },
            }
        }
    }

    /// Cover-weighted mean leaf value.
    pub fn expected_value(&self) -> f64 {
        self.expected_from(0)
    }

    fn expected_from(&self, idx: usize) -> f64 {
        match self.nodes[idx] {
            Node::Leaf { value, .. } => value,
            Node::Split {
                left, right, cover, ..
            } => {
                let l = self.nodes[left].cover();
                let r = self.nodes[right].cover();
                let total = if l + r > 0.0 { l + r } else { cover };
                (l * self.expected_from(left) + r * self.expected_from(right)) / total
            }
        }
    }
}

pub(crate) fn goes_left(value: f64, threshold: f64) -> bool {
    value <= threshold
}

#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    model_type: ModelType,
    base_score: f64,
    tree_weight: f64,
    trees: Vec<RegressionTree>,
    scaling: Option<ScalingParams>,
    source: Option<String>,
}

impl TreeEnsemble {
    pub fn from_artifact(artifact: RiskModelArtifact) -> Result<Self> {
        if artifact.version != ARTIFACT_VERSION {
            bail!(
                "unsupported model artifact version {} (expected {ARTIFACT_VERSION})",
                artifact.version
            );
        }
        let expected: Vec<&str> = FEATURE_NAMES.to_vec();
        let got: Vec<&str> = artifact.feature_names.iter().map(String::as_str).collect();
        if got != expected {
            bail!("model feature names {got:?} do not match expected {expected:?}");
        }
        if artifact.trees.is_empty() {
            bail!("model artifact has no trees");
        }
        if !artifact.base_score.is_finite() {
            bail!("model base score is not finite");
        }
        let tree_weight = match artifact.model_type {
            ModelType::RandomForest => 1.0 / artifact.trees.len() as f64,
            ModelType::GradientBoosting => {
                if !artifact.learning_rate.is_finite() {
                    bail!("model learning rate is not finite");
                }
                artifact.learning_rate
            }
        };
        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(idx, t)| RegressionTree::from_artifact(idx, t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            model_type: artifact.model_type,
            base_score: artifact.base_score,
            tree_weight,
            trees,
            scaling: artifact.scaling,
            source: artifact.source,
        })
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn tree_weight(&self) -> f64 {
        self.tree_weight
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn scaling(&self) -> Option<&ScalingParams> {
        self.scaling.as_ref()
    }

    /// Free-form provenance note written by the exporter.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn predict(&self, x: &FeatureRow) -> f64 {
        self.base_score + self.tree_weight * self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }
}

pub fn load_model(path: &Path) -> Result<TreeEnsemble> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read risk model {}", path.display()))?;
    let artifact = serde_json::from_str::<RiskModelArtifact>(&raw)
        .with_context(|| format!("parse risk model {}", path.display()))?;
    TreeEnsemble::from_artifact(artifact)
        .map_err(|err| anyhow!("invalid risk model {}: {err}", path.display()))
}

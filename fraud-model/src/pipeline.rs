//! JSON-serialized classification pipeline: a column preprocessor followed by
//! a logistic regression or random forest estimator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    claim::{ClaimField, ClaimRecord, REQUIRED_COLUMNS},
    classifier::{Classifier, ModelInfo, PipelineStep},
    error::{ArtifactError, ModelError},
};

/// On-disk form of a trained pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    #[serde(default = "default_name")]
    pub name: String,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub preprocessor: Preprocessor,
    pub classifier: Estimator,
}

fn default_name() -> String {
    "fraud_detection_model".to_string()
}

/// Column transformers. Columns claimed by neither are dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preprocessor {
    #[serde(default)]
    pub numeric: Option<NumericTransformer>,
    #[serde(default)]
    pub categorical: Option<CategoricalTransformer>,
}

/// Standard scaling: `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericTransformer {
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// One-hot encoding; unknown categories encode as all zeros.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalTransformer {
    pub columns: Vec<String>,
    pub categories: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression {
        classes: Vec<i64>,
        coefficients: Vec<f64>,
        intercept: f64,
    },
    RandomForest {
        classes: Vec<i64>,
        trees: Vec<DecisionTree>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

/// A split sends `value <= threshold` to `left`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        probabilities: Vec<f64>,
    },
}

impl Estimator {
    pub fn classes(&self) -> &[i64] {
        match self {
            Estimator::LogisticRegression { classes, .. } => classes,
            Estimator::RandomForest { classes, .. } => classes,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Estimator::LogisticRegression { .. } => "LogisticRegression",
            Estimator::RandomForest { .. } => "RandomForestClassifier",
        }
    }

    fn validate(&self, width: usize) -> Result<(), ArtifactError> {
        let classes = self.classes();
        if classes.is_empty() {
            return Err(invalid("classifier has no classes"));
        }
        // Probability columns follow class order; fraud must land in column 1.
        if let Some(pair) = classes.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(invalid(format!(
                "class labels must be strictly ascending, found {} before {}",
                pair[0], pair[1]
            )));
        }

        match self {
            Estimator::LogisticRegression {
                coefficients,
                intercept,
                ..
            } => {
                if classes.len() > 2 {
                    return Err(invalid("logistic regression supports at most two classes"));
                }
                if !intercept.is_finite() || coefficients.iter().any(|w| !w.is_finite()) {
                    return Err(invalid("logistic regression has non-finite coefficients"));
                }
                if coefficients.len() != width {
                    return Err(invalid(format!(
                        "expected {} coefficients, found {}",
                        width,
                        coefficients.len()
                    )));
                }
            }
            Estimator::RandomForest { trees, .. } => {
                if trees.is_empty() {
                    return Err(invalid("random forest has no trees"));
                }
                for (t, tree) in trees.iter().enumerate() {
                    tree.validate(width, classes.len())
                        .map_err(|e| invalid(format!("tree {}: {}", t, e)))?;
                }
            }
        }
        Ok(())
    }

    fn probabilities(&self, features: &[f64]) -> Vec<f64> {
        match self {
            Estimator::LogisticRegression {
                classes,
                coefficients,
                intercept,
            } => {
                if classes.len() < 2 {
                    return vec![1.0];
                }
                let z = coefficients
                    .iter()
                    .zip(features)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + intercept;
                let positive = sigmoid(z);
                vec![1.0 - positive, positive]
            }
            Estimator::RandomForest { classes, trees } => {
                let mut totals = vec![0.0; classes.len()];
                for tree in trees {
                    for (total, p) in totals.iter_mut().zip(tree.leaf(features)) {
                        *total += p;
                    }
                }
                let n = trees.len() as f64;
                totals.iter().map(|t| t / n).collect()
            }
        }
    }
}

impl DecisionTree {
    /// Children must come after their parent, which rules out cycles.
    fn validate(&self, width: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= width {
                        return Err(format!("node {} splits on unknown feature {}", i, feature));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", i, child));
                        }
                    }
                }
                TreeNode::Leaf { probabilities } => {
                    if probabilities.len() != n_classes {
                        return Err(format!(
                            "leaf {} has {} probabilities for {} classes",
                            i,
                            probabilities.len(),
                            n_classes
                        ));
                    }
                    if probabilities.iter().any(|p| !(0.0..=1.0).contains(p)) {
                        return Err(format!("leaf {} has probabilities outside [0, 1]", i));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { probabilities } => return probabilities,
            }
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn invalid(message: impl Into<String>) -> ArtifactError {
    ArtifactError::Invalid(message.into())
}

fn resolve_columns(columns: &[String]) -> Result<Vec<ClaimField>, ArtifactError> {
    columns
        .iter()
        .map(|c| {
            ClaimField::from_column_name(c)
                .ok_or_else(|| invalid(format!("transformer references unknown column '{}'", c)))
        })
        .collect()
}

/// A validated pipeline ready to score claims.
#[derive(Debug, Clone)]
pub struct PipelineModel {
    artifact: PipelineArtifact,
    numeric_fields: Vec<ClaimField>,
    categorical_fields: Vec<ClaimField>,
    width: usize,
}

impl PipelineModel {
    pub fn from_artifact(artifact: PipelineArtifact) -> Result<Self, ArtifactError> {
        if artifact.feature_names != REQUIRED_COLUMNS {
            return Err(invalid(format!(
                "feature names {:?} do not match the claim schema",
                artifact.feature_names
            )));
        }

        let mut numeric_fields = Vec::new();
        if let Some(numeric) = &artifact.preprocessor.numeric {
            if numeric.mean.len() != numeric.columns.len()
                || numeric.scale.len() != numeric.columns.len()
            {
                return Err(invalid("numeric transformer mean/scale length mismatch"));
            }
            numeric_fields = resolve_columns(&numeric.columns)?;
        }

        let mut categorical_fields = Vec::new();
        let mut one_hot_width = 0;
        if let Some(categorical) = &artifact.preprocessor.categorical {
            if categorical.categories.len() != categorical.columns.len() {
                return Err(invalid("categorical transformer categories length mismatch"));
            }
            categorical_fields = resolve_columns(&categorical.columns)?;
            one_hot_width = categorical.categories.iter().map(Vec::len).sum();
        }

        if let Some(field) = numeric_fields
            .iter()
            .find(|f| categorical_fields.contains(*f))
        {
            return Err(invalid(format!(
                "column '{}' is claimed by two transformers",
                field.column_name()
            )));
        }

        let width = numeric_fields.len() + one_hot_width;
        artifact.classifier.validate(width)?;

        Ok(Self {
            artifact,
            numeric_fields,
            categorical_fields,
            width,
        })
    }

    pub fn from_json(json: &[u8]) -> Result<Self, ArtifactError> {
        let artifact: PipelineArtifact = serde_json::from_slice(json)?;
        Self::from_artifact(artifact)
    }

    pub fn artifact(&self) -> &PipelineArtifact {
        &self.artifact
    }

    /// Width of the encoded feature vector seen by the estimator.
    pub fn width(&self) -> usize {
        self.width
    }

    fn encode(&self, claim: &ClaimRecord) -> Result<Vec<f64>, ModelError> {
        let mut features = Vec::with_capacity(self.width);

        if let Some(numeric) = &self.artifact.preprocessor.numeric {
            for (i, field) in self.numeric_fields.iter().enumerate() {
                let value = claim.value(*field);
                let x = value
                    .as_number()
                    .ok_or_else(|| ModelError::NonNumericFeature {
                        column: field.column_name().to_string(),
                        value: value.to_string(),
                    })?;
                let scale = if numeric.scale[i] == 0.0 {
                    1.0
                } else {
                    numeric.scale[i]
                };
                features.push((x - numeric.mean[i]) / scale);
            }
        }

        if let Some(categorical) = &self.artifact.preprocessor.categorical {
            for (field, categories) in self.categorical_fields.iter().zip(&categorical.categories) {
                let label = claim.value(*field).as_category();
                features.extend(
                    categories
                        .iter()
                        .map(|c| if *c == label { 1.0 } else { 0.0 }),
                );
            }
        }

        Ok(features)
    }
}

impl Classifier for PipelineModel {
    fn predict(&self, claims: &[ClaimRecord]) -> Result<Vec<i64>, ModelError> {
        let classes = self.artifact.classifier.classes();
        self.predict_proba(claims)?
            .iter()
            .map(|row| {
                let mut best = 0;
                for (i, p) in row.iter().enumerate() {
                    if *p > row[best] {
                        best = i;
                    }
                }
                Ok(classes[best])
            })
            .collect()
    }

    fn predict_proba(&self, claims: &[ClaimRecord]) -> Result<Vec<Vec<f64>>, ModelError> {
        claims
            .iter()
            .map(|claim| {
                let features = self.encode(claim)?;
                Ok(self.artifact.classifier.probabilities(&features))
            })
            .collect()
    }

    fn describe(&self) -> ModelInfo {
        let preprocessor = &self.artifact.preprocessor;
        let mut steps = Vec::new();
        let mut categories = BTreeMap::new();

        if let Some(numeric) = &preprocessor.numeric {
            steps.push(PipelineStep {
                name: "num".to_string(),
                kind: "StandardScaler".to_string(),
                columns: numeric.columns.clone(),
            });
        }
        if let Some(categorical) = &preprocessor.categorical {
            steps.push(PipelineStep {
                name: "cat".to_string(),
                kind: "OneHotEncoder".to_string(),
                columns: categorical.columns.clone(),
            });
            for (column, cats) in categorical.columns.iter().zip(&categorical.categories) {
                categories.insert(column.clone(), cats.clone());
            }
        }
        steps.push(PipelineStep {
            name: "classifier".to_string(),
            kind: self.artifact.classifier.kind().to_string(),
            columns: Vec::new(),
        });

        ModelInfo {
            name: self.artifact.name.clone(),
            model_type: "Pipeline".to_string(),
            feature_names: self.artifact.feature_names.clone(),
            n_features: self.artifact.feature_names.len(),
            classes: self.artifact.classifier.classes().to_vec(),
            steps,
            categories,
        }
    }
}

use crate::error::ParseError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

static STAGE_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)$").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage {
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub description: String,
    pub metadata: IndexMap<String, MetadataValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepEdge {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    pub label: String,
    pub description: String,
}

impl StepEdge {
    /// Text shown on the edge: the relation tag when present, the label otherwise.
    pub fn display_label(&self) -> &str {
        self.relation
            .as_deref()
            .filter(|relation| !relation.is_empty())
            .unwrap_or(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepKind {
    Experimental,
    Computational,
    Other(String),
}

impl StepKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Experimental => "Experimental",
            Self::Computational => "Computational",
            Self::Other(name) => name,
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            Self::Experimental => "EXP",
            Self::Computational => "COMP",
            Self::Other(_) => "STEP",
        }
    }
}

impl Default for StepKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for StepKind {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("experimental") {
            Self::Experimental
        } else if trimmed.eq_ignore_ascii_case("computational") {
            Self::Computational
        } else {
            Self::Other(value)
        }
    }
}

impl From<StepKind> for String {
    fn from(kind: StepKind) -> Self {
        match kind {
            StepKind::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

/// Display-only metadata attached to a step. Shape is whatever the extractor produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Scalar(Scalar),
    List(Vec<MetadataValue>),
    Map(IndexMap<String, MetadataValue>),
}

impl MetadataValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Text(value.into()))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => scalar.fmt(f),
            Self::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                Ok(())
            }
            Self::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// Human-readable metadata key: underscores become spaces and inner capitals are split.
pub fn format_metadata_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch == '_' {
            out.push(' ');
        } else if ch.is_ascii_uppercase() {
            out.push(' ');
            out.push(ch);
        } else {
            out.push(ch);
        }
    }
    out.trim().to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowDescription {
    pub stages: IndexMap<String, Stage>,
    pub stage_edges: Vec<StageEdge>,
    pub steps: IndexMap<String, Step>,
    pub step_edges: Vec<StepEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    DanglingStageEdge { index: usize, endpoint: String },
    DanglingStepEdge { index: usize, endpoint: String },
    OrphanStep { step_id: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingStageEdge { index, endpoint } => {
                write!(f, "stage edge #{index} references unknown stage `{endpoint}`")
            }
            Self::DanglingStepEdge { index, endpoint } => {
                write!(f, "step edge #{index} references unknown step `{endpoint}`")
            }
            Self::OrphanStep { step_id } => {
                write!(f, "step `{step_id}` does not belong to any stage")
            }
        }
    }
}

impl WorkflowDescription {
    /// Stage ids ordered by their numeric suffix ("S2" before "S10").
    pub fn sorted_stage_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.stages.keys().map(String::as_str).collect();
        ids.sort_by(|a, b| compare_stage_ids(a, b));
        ids
    }

    /// Steps whose id is prefixed by `<stage_id>.`, in declaration order.
    pub fn steps_in_stage<'a>(&'a self, stage_id: &str) -> Vec<(&'a str, &'a Step)> {
        let prefix = stage_prefix(stage_id);
        self.steps
            .iter()
            .filter(|(id, _)| id.starts_with(&prefix))
            .map(|(id, step)| (id.as_str(), step))
            .collect()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut found = Vec::new();
        for (index, edge) in self.stage_edges.iter().enumerate() {
            for endpoint in [&edge.from, &edge.to] {
                if !self.stages.contains_key(endpoint) {
                    found.push(Diagnostic::DanglingStageEdge {
                        index,
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }
        for (index, edge) in self.step_edges.iter().enumerate() {
            for endpoint in [&edge.from, &edge.to] {
                if !self.steps.contains_key(endpoint) {
                    found.push(Diagnostic::DanglingStepEdge {
                        index,
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }
        let prefixes: HashSet<String> = self.stages.keys().map(|id| stage_prefix(id)).collect();
        for step_id in self.steps.keys() {
            if !prefixes.iter().any(|prefix| step_id.starts_with(prefix.as_str())) {
                found.push(Diagnostic::OrphanStep {
                    step_id: step_id.clone(),
                });
            }
        }
        found
    }
}

pub fn stage_prefix(stage_id: &str) -> String {
    format!("{stage_id}.")
}

/// Numeric suffix of a stage id: "S3" -> 3, "stage_12" -> 12.
pub fn stage_suffix(id: &str) -> Option<u64> {
    STAGE_SUFFIX_RE
        .captures(id)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Numbered ids first by number; ids without a suffix after them. Ties fall back to the id.
pub fn compare_stage_ids(a: &str, b: &str) -> Ordering {
    match (stage_suffix(a), stage_suffix(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Strict JSON first; JSON5 (trailing commas, comments) as a fallback for hand-edited or
/// model-generated input. The strict error is reported when both fail.
pub fn parse_workflow(input: &str) -> Result<WorkflowDescription, ParseError> {
    match serde_json::from_str(input) {
        Ok(workflow) => Ok(workflow),
        Err(strict) => match json5::from_str::<WorkflowDescription>(input) {
            Ok(workflow) => {
                tracing::debug!("workflow parsed with JSON5 fallback");
                Ok(workflow)
            }
            Err(_) => Err(ParseError::Json(strict)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "stages": {
            "S10": {"label": "Ten", "description": ""},
            "S2": {"label": "Two", "description": ""},
            "S1": {"label": "One", "description": ""}
        },
        "stageEdges": [{"from": "S1", "to": "S2", "label": "go", "description": "d"}],
        "steps": {
            "S1.1": {
                "label": "Prep",
                "type": "Experimental",
                "description": "",
                "metadata": {"dose": "5 ng", "replicates": 3, "tags": ["a", "b"], "nested": {"k": true}}
            },
            "S2.1": {"label": "Model", "type": "Computational", "description": "", "metadata": {}},
            "S2.2": {"label": "Misc", "type": "Survey", "description": ""}
        },
        "stepEdges": [{"from": "S2.1", "to": "S2.2", "label": "Sequential", "description": ""}]
    }"#;

    #[test]
    fn parses_camel_case_workflow() {
        let workflow = parse_workflow(SMALL).unwrap();
        assert_eq!(workflow.stages.len(), 3);
        assert_eq!(workflow.stage_edges.len(), 1);
        assert_eq!(workflow.steps["S1.1"].kind, StepKind::Experimental);
        assert_eq!(workflow.steps["S2.1"].kind, StepKind::Computational);
        assert_eq!(
            workflow.steps["S2.2"].kind,
            StepKind::Other("Survey".to_string())
        );
        assert!(workflow.steps["S2.2"].metadata.is_empty());
        assert_eq!(workflow.step_edges[0].relation, None);
    }

    #[test]
    fn sorts_stages_by_numeric_suffix() {
        let workflow = parse_workflow(SMALL).unwrap();
        assert_eq!(workflow.sorted_stage_ids(), vec!["S1", "S2", "S10"]);
    }

    #[test]
    fn ids_without_suffix_sort_last() {
        let mut ids = vec!["intro", "S2", "appendix", "S1"];
        ids.sort_by(|a, b| compare_stage_ids(a, b));
        assert_eq!(ids, vec!["S1", "S2", "appendix", "intro"]);
    }

    #[test]
    fn steps_in_stage_uses_dot_prefix() {
        let mut workflow = parse_workflow(SMALL).unwrap();
        workflow.steps.insert("S10.1".to_string(), Step::default());
        let ids: Vec<&str> = workflow
            .steps_in_stage("S1")
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["S1.1"]);
    }

    #[test]
    fn metadata_values_format_generically() {
        let workflow = parse_workflow(SMALL).unwrap();
        let metadata = &workflow.steps["S1.1"].metadata;
        assert_eq!(metadata["dose"].to_string(), "5 ng");
        assert_eq!(metadata["replicates"].to_string(), "3");
        assert_eq!(metadata["tags"].to_string(), "a, b");
        assert_eq!(metadata["nested"].to_string(), r#"{"k":true}"#);
    }

    #[test]
    fn metadata_keys_are_humanized() {
        assert_eq!(format_metadata_key("animal_model"), "animal model");
        assert_eq!(format_metadata_key("hCG_dose"), "h C G dose");
        assert_eq!(format_metadata_key("Temperature"), "Temperature");
    }

    #[test]
    fn json5_fallback_accepts_trailing_commas() {
        let input = r#"{
            // extracted by a model
            "stages": {"S1": {"label": "One", "description": "",},},
            "stageEdges": [],
            "steps": {},
            "stepEdges": [],
        }"#;
        let workflow = parse_workflow(input).unwrap();
        assert_eq!(workflow.stages["S1"].label, "One");
    }

    #[test]
    fn reports_strict_error_when_both_parsers_fail() {
        let err = parse_workflow("{ stages: ").unwrap_err();
        assert!(err.to_string().starts_with("invalid workflow JSON"));
    }

    #[test]
    fn diagnostics_flag_dangling_references() {
        let mut workflow = parse_workflow(SMALL).unwrap();
        workflow.stage_edges.push(StageEdge {
            from: "S2".to_string(),
            to: "S99".to_string(),
            ..Default::default()
        });
        workflow.steps.insert("X.1".to_string(), Step::default());
        let found = workflow.diagnostics();
        assert!(found.contains(&Diagnostic::DanglingStageEdge {
            index: 1,
            endpoint: "S99".to_string()
        }));
        assert!(found.contains(&Diagnostic::OrphanStep {
            step_id: "X.1".to_string()
        }));
    }

    #[test]
    fn display_label_prefers_relation() {
        let mut edge = StepEdge {
            label: "Sequential".to_string(),
            ..Default::default()
        };
        assert_eq!(edge.display_label(), "Sequential");
        edge.relation = Some("generates".to_string());
        assert_eq!(edge.display_label(), "generates");
    }
}

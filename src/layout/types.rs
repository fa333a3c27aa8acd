use indexmap::IndexMap;
use serde::Serialize;

use crate::ir::{MetadataValue, StepKind};
use crate::view::ViewState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Stage,
    Step,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Stage {
        stage_id: String,
        label: String,
        description: String,
    },
    Step {
        label: String,
        description: String,
        kind: StepKind,
        metadata: IndexMap<String, MetadataValue>,
        /// 1-based position in the level-ordered detail view; a badge, not an identity.
        step_number: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedNode {
    pub id: String,
    pub kind: NodeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub payload: NodePayload,
}

impl PositionedNode {
    pub fn label(&self) -> &str {
        match &self.payload {
            NodePayload::Stage { label, .. } | NodePayload::Step { label, .. } => label,
        }
    }

    pub fn description(&self) -> &str {
        match &self.payload {
            NodePayload::Stage { description, .. } | NodePayload::Step { description, .. } => {
                description
            }
        }
    }

    pub fn step_number(&self) -> Option<usize> {
        match &self.payload {
            NodePayload::Step { step_number, .. } => Some(*step_number),
            NodePayload::Stage { .. } => None,
        }
    }

    pub fn top_center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y)
    }

    pub fn bottom_center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeStyleHint {
    /// Stage-to-stage hand-off in the overview.
    Flow,
    /// Ordinary step dependency.
    Sequence,
    /// Step whose output feeds the target ("generates").
    Generates,
}

impl EdgeStyleHint {
    pub fn from_relation(relation: Option<&str>) -> Self {
        match relation {
            Some(relation) if relation.eq_ignore_ascii_case("generates") => Self::Generates,
            _ => Self::Sequence,
        }
    }

    pub fn is_animated(self) -> bool {
        matches!(self, Self::Flow | Self::Generates)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLayout {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub description: String,
    pub style: EdgeStyleHint,
    /// Empty when either endpoint is not part of the view.
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub view: ViewState,
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<EdgeLayout>,
    /// Top-left corner of the canvas in node coordinates. Negative only when a row is
    /// wider than the viewport.
    pub origin: Point,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn empty(view: ViewState, viewport_width: f32) -> Self {
        Self {
            view,
            nodes: Vec::new(),
            edges: Vec::new(),
            origin: Point::default(),
            width: viewport_width,
            height: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

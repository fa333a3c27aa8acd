use crate::ir::StepKind;
use crate::layout::EdgeStyleHint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub primary_color: String,
    pub primary_text_color: String,
    pub primary_border_color: String,
    pub secondary_text_color: String,
    pub line_color: String,
    pub accent_color: String,
    pub edge_label_background: String,
    pub step_fill: String,
    pub experimental_color: String,
    pub computational_color: String,
    pub other_step_color: String,
    pub background: String,
}

impl Theme {
    /// Palette of the browser visualizer.
    pub fn modern() -> Self {
        Self {
            font_family: "Inter, -apple-system, BlinkMacSystemFont, sans-serif".to_string(),
            font_size: 14.0,
            primary_color: "#FFFFFF".to_string(),
            primary_text_color: "#2D3748".to_string(),
            primary_border_color: "#667EEA".to_string(),
            secondary_text_color: "#4A5568".to_string(),
            line_color: "#4A5568".to_string(),
            accent_color: "#38A169".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            step_fill: "#FFFFFF".to_string(),
            experimental_color: "#38A169".to_string(),
            computational_color: "#4299E1".to_string(),
            other_step_color: "#ED8936".to_string(),
            background: "#F7FAFC".to_string(),
        }
    }

    /// Grayscale variant for print.
    pub fn plain() -> Self {
        Self {
            font_family: "Helvetica, Arial, sans-serif".to_string(),
            font_size: 13.0,
            primary_color: "#F2F2F2".to_string(),
            primary_text_color: "#111111".to_string(),
            primary_border_color: "#555555".to_string(),
            secondary_text_color: "#444444".to_string(),
            line_color: "#333333".to_string(),
            accent_color: "#000000".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            step_fill: "#FFFFFF".to_string(),
            experimental_color: "#333333".to_string(),
            computational_color: "#777777".to_string(),
            other_step_color: "#AAAAAA".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "modern" | "default" => Some(Self::modern()),
            "plain" | "print" => Some(Self::plain()),
            _ => None,
        }
    }

    pub fn step_color(&self, kind: &StepKind) -> &str {
        match kind {
            StepKind::Experimental => &self.experimental_color,
            StepKind::Computational => &self.computational_color,
            StepKind::Other(_) => &self.other_step_color,
        }
    }

    pub fn edge_color(&self, style: EdgeStyleHint) -> &str {
        match style {
            EdgeStyleHint::Generates => &self.accent_color,
            EdgeStyleHint::Flow | EdgeStyleHint::Sequence => &self.line_color,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}

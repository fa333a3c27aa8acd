use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::LayoutConfig;
use crate::error::ViewError;
use crate::ir::WorkflowDescription;
use crate::layout::Layout;
use crate::project::project;

pub const OVERVIEW_TITLE: &str = "High-Level Stages";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ViewState {
    #[default]
    Overview,
    Detail {
        #[serde(rename = "stageId")]
        stage_id: String,
    },
}

impl ViewState {
    pub fn detail(stage_id: impl Into<String>) -> Self {
        Self::Detail {
            stage_id: stage_id.into(),
        }
    }

    pub fn selected_stage(&self) -> Option<&str> {
        match self {
            Self::Overview => None,
            Self::Detail { stage_id } => Some(stage_id.as_str()),
        }
    }

    /// Checked transition. Only `Overview -> Detail` and `Detail -> Overview` exist.
    pub fn apply(&self, event: &ViewEvent) -> Result<ViewState, ViewError> {
        match (self, event) {
            (Self::Overview, ViewEvent::DrillDown { stage_id }) => {
                Ok(Self::detail(stage_id.clone()))
            }
            (Self::Detail { .. }, ViewEvent::Back) => Ok(Self::Overview),
            (state, event) => Err(ViewError::InvalidTransition {
                state: state.to_string(),
                event: event.to_string(),
            }),
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overview => f.write_str("overview"),
            Self::Detail { stage_id } => write!(f, "detail({stage_id})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    DrillDown { stage_id: String },
    Back,
}

impl fmt::Display for ViewEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DrillDown { stage_id } => write!(f, "drill-down({stage_id})"),
            Self::Back => f.write_str("back"),
        }
    }
}

/// Pure reducer: non-transitions leave the state untouched.
pub fn reduce(state: &ViewState, event: &ViewEvent) -> ViewState {
    match state.apply(event) {
        Ok(next) => {
            tracing::debug!(from = %state, to = %next, "view transition");
            next
        }
        Err(_) => {
            tracing::debug!(state = %state, event = %event, "ignored view event");
            state.clone()
        }
    }
}

/// Owns the workflow, the current view and the layout settings; every navigation
/// re-projects synchronously.
#[derive(Debug, Clone)]
pub struct Navigator {
    workflow: WorkflowDescription,
    state: ViewState,
    config: LayoutConfig,
}

impl Navigator {
    pub fn new(workflow: WorkflowDescription, config: LayoutConfig) -> Self {
        Self {
            workflow,
            state: ViewState::Overview,
            config,
        }
    }

    pub fn with_viewport_width(mut self, width: f32) -> Self {
        self.config.viewport_width = width;
        self
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn workflow(&self) -> &WorkflowDescription {
        &self.workflow
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn set_viewport_width(&mut self, width: f32) {
        self.config.viewport_width = width;
    }

    /// Replaces the workflow and returns to the overview.
    pub fn load(&mut self, workflow: WorkflowDescription) {
        self.workflow = workflow;
        self.state = ViewState::Overview;
    }

    pub fn layout(&self) -> Result<Layout, ViewError> {
        Ok(project(&self.workflow, &self.state, &self.config)?)
    }

    pub fn drill_down(&mut self, stage_id: &str) -> Result<Layout, ViewError> {
        if !self.workflow.stages.contains_key(stage_id) {
            return Err(ViewError::UnknownStage(stage_id.to_string()));
        }
        self.dispatch(ViewEvent::DrillDown {
            stage_id: stage_id.to_string(),
        })
    }

    pub fn back(&mut self) -> Result<Layout, ViewError> {
        self.dispatch(ViewEvent::Back)
    }

    /// Applies `event` and re-projects. The state only changes when both succeed.
    pub fn dispatch(&mut self, event: ViewEvent) -> Result<Layout, ViewError> {
        let next = self.state.apply(&event)?;
        let layout = project(&self.workflow, &next, &self.config)?;
        tracing::debug!(from = %self.state, to = %next, "navigated");
        self.state = next;
        Ok(layout)
    }

    pub fn breadcrumb(&self) -> Vec<String> {
        let mut trail = vec![OVERVIEW_TITLE.to_string()];
        if let Some(stage_id) = self.state.selected_stage() {
            trail.push(self.stage_label(stage_id).to_string());
        }
        trail
    }

    pub fn hint(&self) -> String {
        match self.state.selected_stage() {
            None => "Click on a stage to explore detailed steps".to_string(),
            Some(stage_id) => format!("Viewing detailed steps for {}", self.stage_label(stage_id)),
        }
    }

    fn stage_label<'a>(&'a self, stage_id: &'a str) -> &'a str {
        self.workflow
            .stages
            .get(stage_id)
            .map(|stage| stage.label.as_str())
            .unwrap_or(stage_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Stage, Step};

    fn workflow() -> WorkflowDescription {
        let mut workflow = WorkflowDescription::default();
        for (id, label) in [("S1", "Design"), ("S2", "Analysis")] {
            workflow.stages.insert(
                id.to_string(),
                Stage {
                    label: label.to_string(),
                    description: String::new(),
                },
            );
        }
        workflow.steps.insert("S1.1".to_string(), Step::default());
        workflow
    }

    #[test]
    fn drill_down_then_back() {
        let state = reduce(&ViewState::Overview, &ViewEvent::DrillDown {
            stage_id: "S1".to_string(),
        });
        assert_eq!(state, ViewState::detail("S1"));
        assert_eq!(reduce(&state, &ViewEvent::Back), ViewState::Overview);
    }

    #[test]
    fn non_transitions_leave_state_unchanged() {
        assert_eq!(reduce(&ViewState::Overview, &ViewEvent::Back), ViewState::Overview);
        let detail = ViewState::detail("S1");
        let next = reduce(&detail, &ViewEvent::DrillDown {
            stage_id: "S2".to_string(),
        });
        assert_eq!(next, detail);
    }

    #[test]
    fn apply_reports_invalid_transition() {
        let err = ViewState::Overview.apply(&ViewEvent::Back).unwrap_err();
        assert_eq!(err.to_string(), "no transition for back while in overview");
    }

    #[test]
    fn view_state_serializes_with_mode_tag() {
        let json = serde_json::to_string(&ViewState::detail("S2")).unwrap();
        assert_eq!(json, r#"{"mode":"detail","stageId":"S2"}"#);
        let back: ViewState = serde_json::from_str(r#"{"mode":"overview"}"#).unwrap();
        assert_eq!(back, ViewState::Overview);
    }

    #[test]
    fn navigator_rejects_unknown_stage_without_moving() {
        let mut nav = Navigator::new(workflow(), LayoutConfig::default());
        let err = nav.drill_down("S9").unwrap_err();
        assert_eq!(err, ViewError::UnknownStage("S9".to_string()));
        assert_eq!(nav.state(), &ViewState::Overview);
    }

    #[test]
    fn navigator_breadcrumb_and_hint_follow_state() {
        let mut nav = Navigator::new(workflow(), LayoutConfig::default());
        assert_eq!(nav.breadcrumb(), vec!["High-Level Stages"]);
        assert_eq!(nav.hint(), "Click on a stage to explore detailed steps");

        let layout = nav.drill_down("S1").unwrap();
        assert_eq!(layout.view, ViewState::detail("S1"));
        assert_eq!(nav.breadcrumb(), vec!["High-Level Stages", "Design"]);
        assert_eq!(nav.hint(), "Viewing detailed steps for Design");

        assert!(nav.drill_down("S2").is_err());
        assert_eq!(nav.state(), &ViewState::detail("S1"));

        nav.back().unwrap();
        assert_eq!(nav.state(), &ViewState::Overview);
    }

    #[test]
    fn loading_a_workflow_resets_to_overview() {
        let mut nav = Navigator::new(workflow(), LayoutConfig::default());
        nav.drill_down("S2").unwrap();
        nav.load(WorkflowDescription::default());
        assert_eq!(nav.state(), &ViewState::Overview);
        assert!(nav.layout().unwrap().is_empty());
    }
}

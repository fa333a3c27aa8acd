use serde::Deserialize;
use wasm_bindgen::prelude::*;
use workflow_viz::layout_dump::layout_to_json;
use workflow_viz::{RenderOptions, Theme, ViewState, layout_with_options, render_with_options};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowRenderOptions {
    stage: Option<String>,
    theme: Option<String>,
    viewport_width: Option<f32>,
    font_family: Option<String>,
}

fn parse_options(options_json: Option<String>) -> Result<WorkflowRenderOptions, JsValue> {
    match options_json {
        Some(raw) => {
            serde_json::from_str(&raw).map_err(|error| JsValue::from_str(&error.to_string()))
        }
        None => Ok(WorkflowRenderOptions::default()),
    }
}

fn build_render_options(options: &WorkflowRenderOptions) -> RenderOptions {
    let mut render_options = RenderOptions::modern();
    if let Some(theme) = options.theme.as_deref().and_then(Theme::by_name) {
        render_options.theme = theme;
    }
    if let Some(width) = options.viewport_width {
        render_options = render_options.with_viewport_width(width);
    }
    if let Some(font_family) = &options.font_family {
        render_options.theme.font_family = font_family.clone();
    }
    render_options
}

fn view_for(options: &WorkflowRenderOptions) -> ViewState {
    options
        .stage
        .as_deref()
        .map(ViewState::detail)
        .unwrap_or_default()
}

#[wasm_bindgen]
pub fn render_workflow_svg(
    workflow_json: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = parse_options(options_json)?;
    render_with_options(workflow_json, &view_for(&options), &build_render_options(&options))
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

/// Node and edge records for an interactive canvas.
#[wasm_bindgen]
pub fn layout_workflow_json(
    workflow_json: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let options = parse_options(options_json)?;
    let layout = layout_with_options(
        workflow_json,
        &view_for(&options),
        &build_render_options(&options),
    )
    .map_err(|error| JsValue::from_str(&error.to_string()))?;
    layout_to_json(&layout).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use workflow_viz::{ViewState, render_with_options};

    use crate::{WorkflowRenderOptions, build_render_options, view_for};

    const WORKFLOW: &str = r#"{
        "stages": {"S1": {"label": "Prep", "description": ""}, "S2": {"label": "Assay", "description": ""}},
        "stageEdges": [{"from": "S1", "to": "S2", "label": "samples", "description": ""}],
        "steps": {"S2.1": {"label": "Stain", "type": "Experimental", "description": ""}},
        "stepEdges": []
    }"#;

    #[test]
    fn stage_option_selects_detail_view() {
        let options: WorkflowRenderOptions =
            serde_json::from_str(r#"{"stage": "S2", "viewportWidth": 900}"#).unwrap();
        assert_eq!(view_for(&options), ViewState::detail("S2"));
        let render_options = build_render_options(&options);
        assert_eq!(render_options.layout.viewport_width, 900.0);

        let svg = render_with_options(WORKFLOW, &view_for(&options), &render_options)
            .expect("detail view should render");
        assert!(svg.contains("Stain"));
    }

    #[test]
    fn default_options_render_the_overview() {
        let options = WorkflowRenderOptions::default();
        let render_options = build_render_options(&options);
        let svg = render_with_options(WORKFLOW, &view_for(&options), &render_options)
            .expect("overview should render");
        assert!(svg.contains("samples"));
        assert!(svg.contains("Assay"));
    }
}

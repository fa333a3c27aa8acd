use std::collections::HashSet;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::ir::WorkflowDescription;
use crate::layout::{
    EdgeLayout, EdgeStyleHint, Layout, NodeKind, NodePayload, PositionedNode, assign_levels,
    canvas_bounds, group_by_level, position_levels, position_stages, route_edges,
};
use crate::view::ViewState;

/// Positioned nodes and edges for `view`. Only a rejected cycle is an error; unknown
/// stages and dangling references produce fewer nodes or edges without geometry.
pub fn project(
    workflow: &WorkflowDescription,
    view: &ViewState,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let layout = match view {
        ViewState::Overview => project_overview(workflow, config),
        ViewState::Detail { stage_id } => project_detail(workflow, stage_id, config)?,
    };
    tracing::debug!(
        view = %view,
        nodes = layout.nodes.len(),
        edges = layout.edges.len(),
        "projected view"
    );
    Ok(layout)
}

fn project_overview(workflow: &WorkflowDescription, config: &LayoutConfig) -> Layout {
    let placed = position_stages(workflow.stages.keys().map(String::as_str), config);
    let nodes: Vec<PositionedNode> = placed
        .into_iter()
        .filter_map(|(id, point)| {
            let stage = workflow.stages.get(&id)?;
            Some(PositionedNode {
                kind: NodeKind::Stage,
                x: point.x,
                y: point.y,
                width: config.stage_width,
                height: config.stage_height,
                payload: NodePayload::Stage {
                    stage_id: id.clone(),
                    label: stage.label.clone(),
                    description: stage.description.clone(),
                },
                id,
            })
        })
        .collect();

    let mut edges: Vec<EdgeLayout> = workflow
        .stage_edges
        .iter()
        .enumerate()
        .map(|(index, edge)| EdgeLayout {
            id: format!("stage-edge-{index}"),
            source: edge.from.clone(),
            target: edge.to.clone(),
            label: edge.label.clone(),
            description: edge.description.clone(),
            style: EdgeStyleHint::Flow,
            points: Vec::new(),
        })
        .collect();
    route_edges(&nodes, &mut edges);

    finish(ViewState::Overview, nodes, edges, config)
}

fn project_detail(
    workflow: &WorkflowDescription,
    stage_id: &str,
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let view = ViewState::detail(stage_id);
    if !workflow.stages.contains_key(stage_id) {
        return Ok(Layout::empty(view, config.viewport_width));
    }
    let steps = workflow.steps_in_stage(stage_id);
    if steps.is_empty() {
        return Ok(Layout::empty(view, config.viewport_width));
    }

    let ids: Vec<&str> = steps.iter().map(|(id, _)| *id).collect();
    let members: HashSet<&str> = ids.iter().copied().collect();
    let local_edges: Vec<_> = workflow
        .step_edges
        .iter()
        .filter(|edge| members.contains(edge.from.as_str()) && members.contains(edge.to.as_str()))
        .collect();
    let pairs: Vec<(&str, &str)> = local_edges
        .iter()
        .map(|edge| (edge.from.as_str(), edge.to.as_str()))
        .collect();

    let levels = assign_levels(&ids, &pairs, config.cycle_policy)?;
    let groups = group_by_level(&ids, &levels);
    let positions = position_levels(&groups, config.viewport_width, config);

    let mut nodes = Vec::with_capacity(ids.len());
    for id in groups.values().flatten() {
        let (Some(step), Some(point)) = (workflow.steps.get(id), positions.get(id)) else {
            continue;
        };
        nodes.push(PositionedNode {
            id: id.clone(),
            kind: NodeKind::Step,
            x: point.x,
            y: point.y,
            width: config.step_width,
            height: config.step_height,
            payload: NodePayload::Step {
                label: step.label.clone(),
                description: step.description.clone(),
                kind: step.kind.clone(),
                metadata: step.metadata.clone(),
                step_number: nodes.len() + 1,
            },
        });
    }

    let mut edges: Vec<EdgeLayout> = local_edges
        .iter()
        .enumerate()
        .map(|(index, edge)| EdgeLayout {
            id: format!("step-edge-{index}"),
            source: edge.from.clone(),
            target: edge.to.clone(),
            label: edge.display_label().to_string(),
            description: edge.description.clone(),
            style: EdgeStyleHint::from_relation(edge.relation.as_deref()),
            points: Vec::new(),
        })
        .collect();
    route_edges(&nodes, &mut edges);

    Ok(finish(view, nodes, edges, config))
}

fn finish(
    view: ViewState,
    nodes: Vec<PositionedNode>,
    edges: Vec<EdgeLayout>,
    config: &LayoutConfig,
) -> Layout {
    let (origin, width, height) = canvas_bounds(&nodes, config.viewport_width, config);
    Layout {
        view,
        nodes,
        edges,
        origin,
        width,
        height,
    }
}

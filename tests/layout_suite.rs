use std::path::Path;

use workflow_viz::layout::NodeKind;
use workflow_viz::{
    LayoutConfig, Navigator, RenderOptions, Theme, ViewState, WorkflowDescription, parse_workflow,
    project, render::render_svg, render_with_options,
};

fn fixture() -> WorkflowDescription {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("knockout_mice.json");
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    parse_workflow(&input).expect("fixture parse failed")
}

fn assert_valid_svg(svg: &str, view: &str) {
    assert!(svg.contains("<svg"), "{view}: missing <svg tag");
    assert!(svg.contains("</svg>"), "{view}: missing </svg tag");
}

#[test]
fn fixture_has_no_diagnostics() {
    assert!(fixture().diagnostics().is_empty());
}

#[test]
fn overview_lists_every_stage_in_numeric_order() {
    let workflow = fixture();
    let layout = project(&workflow, &ViewState::Overview, &LayoutConfig::default()).unwrap();

    assert_eq!(layout.nodes.len(), workflow.stages.len());
    assert_eq!(layout.edges.len(), workflow.stage_edges.len());
    let ids: Vec<&str> = layout.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["S1", "S2", "S3", "S4", "S5"]);
    assert!(layout.nodes.iter().all(|n| n.kind == NodeKind::Stage));
    for pair in layout.nodes.windows(2) {
        assert_eq!(pair[1].y - pair[0].y, 280.0);
        assert_eq!(pair[0].x, 400.0);
    }
}

#[test]
fn stage_two_detail_is_a_five_step_chain() {
    let workflow = fixture();
    let layout = project(&workflow, &ViewState::detail("S2"), &LayoutConfig::default()).unwrap();

    let ids: Vec<&str> = layout.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["S2.1", "S2.2", "S2.3", "S2.4", "S2.5"]);
    let edges: Vec<(&str, &str, &str)> = layout
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str(), e.label.as_str()))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("S2.1", "S2.2", "preceded_by"),
            ("S2.2", "S2.3", "preceded_by"),
            ("S2.3", "S2.4", "preceded_by"),
            ("S2.4", "S2.5", "preceded_by"),
        ]
    );
    for (level, node) in layout.nodes.iter().enumerate() {
        assert_eq!(node.y, 150.0 + level as f32 * 250.0);
        assert_eq!(node.x, 600.0);
        assert_eq!(node.step_number(), Some(level + 1));
    }
}

#[test]
fn cross_stage_edges_stay_out_of_detail_views() {
    let workflow = fixture();
    let layout = project(&workflow, &ViewState::detail("S1"), &LayoutConfig::default()).unwrap();
    assert_eq!(layout.nodes.len(), 4);
    assert!(
        layout
            .edges
            .iter()
            .all(|e| e.source.starts_with("S1.") && e.target.starts_with("S1."))
    );
}

#[test]
fn unknown_stage_projects_to_nothing() {
    let workflow = fixture();
    let layout = project(&workflow, &ViewState::detail("S99"), &LayoutConfig::default()).unwrap();
    assert!(layout.nodes.is_empty());
    assert!(layout.edges.is_empty());
}

#[test]
fn drill_down_and_back_restore_the_overview() {
    let mut nav = Navigator::new(fixture(), LayoutConfig::default());
    let before = nav.layout().unwrap();
    nav.drill_down("S1").unwrap();
    let after = nav.back().unwrap();
    assert_eq!(nav.state(), &ViewState::Overview);
    assert_eq!(before, after);
}

#[test]
fn viewport_width_recenters_levels() {
    let mut nav = Navigator::new(fixture(), LayoutConfig::default()).with_viewport_width(800.0);
    let layout = nav.drill_down("S4").unwrap();
    assert!(layout.nodes.iter().all(|n| n.x == 400.0));
    nav.set_viewport_width(1600.0);
    assert!(nav.layout().unwrap().nodes.iter().all(|n| n.x == 800.0));
}

#[test]
fn every_view_renders() {
    let workflow = fixture();
    let config = LayoutConfig::default();
    let theme = Theme::modern();
    let mut views = vec![ViewState::Overview];
    views.extend(workflow.sorted_stage_ids().into_iter().map(ViewState::detail));
    for view in views {
        let layout = project(&workflow, &view, &config).unwrap();
        let svg = render_svg(&layout, &theme, &config);
        assert_valid_svg(&svg, &view.to_string());
    }
}

#[test]
fn one_call_render_uses_options() {
    let input = std::fs::read_to_string(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/knockout_mice.json"),
    )
    .unwrap();
    let svg = render_with_options(&input, &ViewState::detail("S5"), &RenderOptions::plain())
        .expect("render failed");
    assert_valid_svg(&svg, "S5");
    assert!(svg.contains("Microarray expression profiling"));
    assert!(svg.contains(&Theme::plain().background));
}

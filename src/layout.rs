mod ranking;
pub(crate) mod text;
pub(crate) mod types;
pub use ranking::{CyclePolicy, LevelMap, assign_levels, group_by_level};
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::compare_stage_ids;
use std::collections::{BTreeMap, HashMap};

/// Places level groups on a grid: one row per level, each row centered in the viewport.
///
/// `y = base_offset + level * level_spacing` and, for the i-th of n nodes in a row,
/// `x = (viewport_width - (n - 1) * node_spacing) / 2 + i * node_spacing`.
pub fn position_levels(
    groups: &BTreeMap<usize, Vec<String>>,
    viewport_width: f32,
    config: &LayoutConfig,
) -> BTreeMap<String, Point> {
    let mut positions = BTreeMap::new();
    for (&level, ids) in groups {
        let y = config.base_offset + level as f32 * config.level_spacing;
        let row_width = ids.len().saturating_sub(1) as f32 * config.node_spacing;
        let start_x = (viewport_width - row_width) / 2.0;
        for (index, id) in ids.iter().enumerate() {
            let x = start_x + index as f32 * config.node_spacing;
            positions.insert(id.clone(), Point { x, y });
        }
    }
    positions
}

/// Single-column stage stack, ordered by numeric stage suffix.
pub fn position_stages<'a, I>(stage_ids: I, config: &LayoutConfig) -> Vec<(String, Point)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ids: Vec<&str> = stage_ids.into_iter().collect();
    ids.sort_by(|a, b| compare_stage_ids(a, b));
    ids.dedup();
    ids.into_iter()
        .enumerate()
        .map(|(index, id)| {
            let point = Point {
                x: config.stage_column_x,
                y: config.base_offset + index as f32 * config.stage_spacing,
            };
            (id.to_string(), point)
        })
        .collect()
}

/// Polyline from the bottom of `from` to the top of `to`, with an orthogonal jog when the
/// two nodes are not vertically aligned.
pub(crate) fn connect(from: &PositionedNode, to: &PositionedNode) -> Vec<(f32, f32)> {
    let (sx, sy) = from.bottom_center();
    let (tx, ty) = to.top_center();
    if (sx - tx).abs() < f32::EPSILON {
        return vec![(sx, sy), (tx, ty)];
    }
    let mid_y = (sy + ty) / 2.0;
    vec![(sx, sy), (sx, mid_y), (tx, mid_y), (tx, ty)]
}

pub(crate) fn route_edges(nodes: &[PositionedNode], edges: &mut [EdgeLayout]) {
    let index: HashMap<&str, &PositionedNode> =
        nodes.iter().map(|node| (node.id.as_str(), node)).collect();
    for edge in edges.iter_mut() {
        edge.points = match (index.get(edge.source.as_str()), index.get(edge.target.as_str())) {
            (Some(from), Some(to)) => connect(from, to),
            _ => Vec::new(),
        };
    }
}

/// Canvas origin and size: every node plus padding, never narrower than the viewport.
/// The origin leaves `(0, 0)` only for nodes placed left of or above the padding.
pub(crate) fn canvas_bounds(
    nodes: &[PositionedNode],
    viewport_width: f32,
    config: &LayoutConfig,
) -> (Point, f32, f32) {
    if nodes.is_empty() {
        return (Point::default(), viewport_width, 0.0);
    }
    let min_x = nodes.iter().map(|node| node.x).fold(f32::INFINITY, f32::min);
    let min_y = nodes.iter().map(|node| node.y).fold(f32::INFINITY, f32::min);
    let max_x = nodes
        .iter()
        .map(|node| node.x + node.width)
        .fold(f32::NEG_INFINITY, f32::max);
    let max_y = nodes
        .iter()
        .map(|node| node.y + node.height)
        .fold(f32::NEG_INFINITY, f32::max);

    let origin = Point {
        x: (min_x - config.padding).min(0.0),
        y: (min_y - config.padding).min(0.0),
    };
    let right = (max_x + config.padding).max(viewport_width);
    (origin, right - origin.x, max_y + config.padding - origin.y)
}

use crate::config::{LayoutConfig, RenderConfig};
use crate::ir::format_metadata_key;
use crate::layout::text::measure_label;
use crate::layout::{
    EdgeLayout, EdgeStyleHint, Layout, NodePayload, Point, PositionedNode, TextBlock,
};
use crate::theme::Theme;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

const LABEL_INSET: f32 = 16.0;
const EDGE_LABEL_MAX_WIDTH: f32 = 180.0;
const MAX_METADATA_ROWS: usize = 3;

pub fn render_svg(layout: &Layout, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    let width = layout.width.max(200.0);
    let height = layout.height.max(200.0);
    let Point { x: min_x, y: min_y } = layout.origin;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"{min_x} {min_y} {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect x=\"{min_x}\" y=\"{min_y}\" width=\"{width}\" height=\"{height}\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    for (id, color) in [
        ("arrow", theme.line_color.as_str()),
        ("arrow-accent", theme.accent_color.as_str()),
    ] {
        svg.push_str(&format!(
            "<marker id=\"{id}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{color}\"/></marker>",
        ));
    }
    svg.push_str("</defs>");

    let label_positions = compute_edge_label_positions(&layout.edges, theme, config);

    for (idx, edge) in layout.edges.iter().enumerate() {
        if edge.points.is_empty() {
            continue;
        }
        let d = points_to_path(&edge.points);
        let (stroke, marker) = match edge.style {
            EdgeStyleHint::Generates => (theme.accent_color.as_str(), "arrow-accent"),
            _ => (theme.edge_color(edge.style), "arrow"),
        };
        let dash = if edge.style == EdgeStyleHint::Flow {
            " stroke-dasharray=\"8 5\""
        } else {
            ""
        };
        svg.push_str(&format!(
            "<path id=\"{}\" d=\"{d}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"2\"{dash} marker-end=\"url(#{marker})\">",
            escape_xml(&edge.id),
        ));
        if !edge.description.is_empty() {
            svg.push_str(&format!("<title>{}</title>", escape_xml(&edge.description)));
        }
        svg.push_str("</path>");

        if let Some((x, y, label)) = label_positions.get(&idx) {
            let rect_x = x - label.width / 2.0 - 6.0;
            let rect_y = y - label.height / 2.0 - 4.0;
            let rect_w = label.width + 12.0;
            let rect_h = label.height + 8.0;
            svg.push_str(&format!(
                "<rect x=\"{rect_x:.2}\" y=\"{rect_y:.2}\" width=\"{rect_w:.2}\" height=\"{rect_h:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{stroke}\" stroke-width=\"0.8\"/>",
                theme.edge_label_background,
            ));
            let font_size = theme.font_size * 0.85;
            svg.push_str(&text_block_svg(
                *x,
                *y - label.height / 2.0,
                label,
                font_size,
                &theme.secondary_text_color,
                theme,
                config,
                false,
            ));
        }
    }

    for node in &layout.nodes {
        match &node.payload {
            NodePayload::Stage { .. } => svg.push_str(&stage_svg(node, theme, config)),
            NodePayload::Step { .. } => svg.push_str(&step_svg(node, theme, config)),
        }
    }

    svg.push_str("</svg>");
    svg
}

fn stage_svg(node: &PositionedNode, theme: &Theme, config: &LayoutConfig) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<g class=\"stage\" id=\"{}\"><title>{}</title>",
        escape_xml(&node.id),
        escape_xml(node.description())
    );
    let _ = write!(
        out,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"12\" ry=\"12\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\"/>",
        node.x, node.y, node.width, node.height, theme.primary_color, theme.primary_border_color
    );

    let inner_width = node.width - 2.0 * LABEL_INSET;
    let center_x = node.x + node.width / 2.0;
    let title = measure_label(
        node.label(),
        theme.font_size * 1.15,
        inner_width,
        2,
        config.label_line_height,
    );
    let mut cursor = node.y + LABEL_INSET;
    out.push_str(&text_block_svg(
        center_x,
        cursor,
        &title,
        theme.font_size * 1.15,
        &theme.primary_text_color,
        theme,
        config,
        true,
    ));
    cursor += title.height + 6.0;

    if !node.description().is_empty() {
        let body = measure_label(
            node.description(),
            theme.font_size * 0.9,
            inner_width,
            config.max_description_lines,
            config.label_line_height,
        );
        out.push_str(&text_block_svg(
            center_x,
            cursor,
            &body,
            theme.font_size * 0.9,
            &theme.secondary_text_color,
            theme,
            config,
            false,
        ));
    }
    out.push_str("</g>");
    out
}

fn step_svg(node: &PositionedNode, theme: &Theme, config: &LayoutConfig) -> String {
    let NodePayload::Step {
        kind,
        metadata,
        step_number,
        ..
    } = &node.payload
    else {
        return String::new();
    };
    let accent = theme.step_color(kind);
    let mut out = String::new();

    let mut tooltip = node.description().to_string();
    for (key, value) in metadata {
        let _ = write!(tooltip, "\n{}: {value}", format_metadata_key(key));
    }
    let _ = write!(
        out,
        "<g class=\"step\" id=\"{}\"><title>{}</title>",
        escape_xml(&node.id),
        escape_xml(tooltip.trim_start())
    );
    let _ = write!(
        out,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"12\" ry=\"12\" fill=\"{}\" stroke=\"{accent}\" stroke-width=\"2.5\"/>",
        node.x, node.y, node.width, node.height, theme.step_fill
    );

    // step-number badge straddling the top-left corner
    let badge_x = node.x + 4.0;
    let badge_y = node.y + 4.0;
    let _ = write!(
        out,
        "<circle cx=\"{badge_x:.2}\" cy=\"{badge_y:.2}\" r=\"14\" fill=\"{accent}\"/><text x=\"{badge_x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"#FFFFFF\">{step_number}</text>",
        badge_y + theme.font_size * 0.35,
        theme.font_family,
        theme.font_size * 0.85,
    );

    let kind_label = if kind.as_str().is_empty() {
        kind.badge().to_string()
    } else {
        format!("{} · {}", kind.badge(), kind.as_str())
    };
    let _ = write!(
        out,
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-family=\"{}\" font-size=\"{}\" fill=\"{accent}\">{}</text>",
        node.x + node.width - LABEL_INSET,
        node.y + LABEL_INSET + theme.font_size * 0.75,
        theme.font_family,
        theme.font_size * 0.75,
        escape_xml(&kind_label)
    );

    let inner_width = node.width - 2.0 * LABEL_INSET;
    let center_x = node.x + node.width / 2.0;
    let mut cursor = node.y + LABEL_INSET + theme.font_size * 1.4;
    let title = measure_label(
        node.label(),
        theme.font_size,
        inner_width,
        2,
        config.label_line_height,
    );
    out.push_str(&text_block_svg(
        center_x,
        cursor,
        &title,
        theme.font_size,
        &theme.primary_text_color,
        theme,
        config,
        true,
    ));
    cursor += title.height + 4.0;

    if !node.description().is_empty() {
        let body = measure_label(
            node.description(),
            theme.font_size * 0.8,
            inner_width,
            config.max_description_lines.min(3),
            config.label_line_height,
        );
        out.push_str(&text_block_svg(
            center_x,
            cursor,
            &body,
            theme.font_size * 0.8,
            &theme.secondary_text_color,
            theme,
            config,
            false,
        ));
        cursor += body.height + 4.0;
    }

    let rows_bottom = node.y + node.height - LABEL_INSET / 2.0;
    let row_height = theme.font_size * 0.75 * config.label_line_height;
    for (key, value) in metadata.iter().take(MAX_METADATA_ROWS) {
        if cursor + row_height > rows_bottom {
            break;
        }
        let row = format!("{}: {value}", format_metadata_key(key));
        let block = measure_label(
            &row,
            theme.font_size * 0.75,
            inner_width,
            1,
            config.label_line_height,
        );
        out.push_str(&text_block_svg(
            center_x,
            cursor,
            &block,
            theme.font_size * 0.75,
            &theme.secondary_text_color,
            theme,
            config,
            false,
        ));
        cursor += row_height;
    }
    out.push_str("</g>");
    out
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.0, first.1);
    for point in rest {
        let _ = write!(d, " L {:.2} {:.2}", point.0, point.1);
    }
    d
}

/// Lines of `label` centered on `x`, the first baseline one font size below `top`.
#[allow(clippy::too_many_arguments)]
fn text_block_svg(
    x: f32,
    top: f32,
    label: &TextBlock,
    font_size: f32,
    fill: &str,
    theme: &Theme,
    config: &LayoutConfig,
    bold: bool,
) -> String {
    let start_y = top + font_size;
    let weight = if bold { " font-weight=\"600\"" } else { "" };
    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{font_size}\"{weight} fill=\"{fill}\">",
        theme.font_family,
    );
    let dy = font_size * config.label_line_height;
    for (idx, line) in label.lines.iter().enumerate() {
        let line_dy = if idx == 0 { 0.0 } else { dy };
        let _ = write!(
            text,
            "<tspan x=\"{x:.2}\" dy=\"{line_dy:.2}\">{}</tspan>",
            escape_xml(line)
        );
    }
    text.push_str("</text>");
    text
}

fn compute_edge_label_positions(
    edges: &[EdgeLayout],
    theme: &Theme,
    config: &LayoutConfig,
) -> HashMap<usize, (f32, f32, TextBlock)> {
    let mut occupied: Vec<(f32, f32, f32, f32)> = Vec::new();
    let mut positions = HashMap::new();
    let font_size = theme.font_size * 0.85;

    for (idx, edge) in edges.iter().enumerate() {
        if edge.label.is_empty() || edge.points.is_empty() {
            continue;
        }
        let label = measure_label(
            &edge.label,
            font_size,
            EDGE_LABEL_MAX_WIDTH,
            2,
            config.label_line_height,
        );
        let (mid_x, mid_y) = edge_midpoint(edge);
        let mut offset = 0.0;
        let mut placed = None;

        for _ in 0..6 {
            let y = mid_y + offset;
            let rect = (
                mid_x - label.width / 2.0 - 6.0,
                y - label.height / 2.0 - 4.0,
                label.width + 12.0,
                label.height + 8.0,
            );
            if !collides(&rect, &occupied) {
                occupied.push(rect);
                placed = Some((mid_x, y));
                break;
            }
            offset += label.height + 6.0;
        }

        let (x, y) = placed.unwrap_or((mid_x, mid_y));
        positions.insert(idx, (x, y, label));
    }

    positions
}

fn edge_midpoint(edge: &EdgeLayout) -> (f32, f32) {
    match edge.points.as_slice() {
        [_, p1, p2, _] => ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0),
        [first, .., last] => ((first.0 + last.0) / 2.0, (first.1 + last.1) / 2.0),
        [only] => *only,
        [] => (0.0, 0.0),
    }
}

fn collides(rect: &(f32, f32, f32, f32), occupied: &[(f32, f32, f32, f32)]) -> bool {
    occupied.iter().any(|(x, y, w, h)| {
        rect.0 < x + w && rect.0 + rect.2 > *x && rect.1 < y + h && rect.1 + rect.3 > *y
    })
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, svg)?,
        None => print!("{svg}"),
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

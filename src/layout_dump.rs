use crate::ir::MetadataValue;
use crate::layout::{EdgeStyleHint, Layout, NodeKind, NodePayload};
use crate::view::ViewState;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Node and edge records for an interactive canvas. One dump per view, replaced wholesale.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub view: ViewState,
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub kind: NodeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub payload: PayloadDump,
}

#[derive(Debug, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum PayloadDump {
    Stage {
        stage_id: String,
        label: String,
        description: String,
    },
    Step {
        label: String,
        description: String,
        #[serde(rename = "type")]
        kind: String,
        metadata: IndexMap<String, MetadataValue>,
        step_number: usize,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub description: String,
    pub style: EdgeStyleHint,
    pub animated: bool,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                kind: node.kind,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                payload: match &node.payload {
                    NodePayload::Stage {
                        stage_id,
                        label,
                        description,
                    } => PayloadDump::Stage {
                        stage_id: stage_id.clone(),
                        label: label.clone(),
                        description: description.clone(),
                    },
                    NodePayload::Step {
                        label,
                        description,
                        kind,
                        metadata,
                        step_number,
                    } => PayloadDump::Step {
                        label: label.clone(),
                        description: description.clone(),
                        kind: kind.to_string(),
                        metadata: metadata.clone(),
                        step_number: *step_number,
                    },
                },
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                label: edge.label.clone(),
                description: edge.description.clone(),
                style: edge.style,
                animated: edge.style.is_animated(),
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            view: layout.view.clone(),
            origin_x: layout.origin.x,
            origin_y: layout.origin.y,
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
        }
    }
}

pub fn layout_to_json(layout: &Layout) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&LayoutDump::from_layout(layout))
}

/// Pretty JSON to `path`, or stdout when absent.
pub fn write_layout_dump(path: Option<&Path>, layout: &Layout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

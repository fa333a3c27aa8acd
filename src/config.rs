use crate::layout::CyclePolicy;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub viewport_width: f32,
    pub base_offset: f32,
    pub level_spacing: f32,
    pub node_spacing: f32,
    pub stage_column_x: f32,
    pub stage_spacing: f32,
    pub stage_width: f32,
    pub stage_height: f32,
    pub step_width: f32,
    pub step_height: f32,
    pub padding: f32,
    pub label_line_height: f32,
    pub max_description_lines: usize,
    pub cycle_policy: CyclePolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1200.0,
            base_offset: 150.0,
            level_spacing: 250.0,
            node_spacing: 350.0,
            stage_column_x: 400.0,
            stage_spacing: 280.0,
            stage_width: 300.0,
            stage_height: 140.0,
            step_width: 300.0,
            step_height: 200.0,
            padding: 40.0,
            label_line_height: 1.4,
            max_description_lines: 4,
            cycle_policy: CyclePolicy::Degrade,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Base URL of the extraction service; the client posts to `{endpoint}/api/upload`.
    pub endpoint: String,
    pub max_file_bytes: u64,
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub upload: UploadConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::modern();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
            upload: UploadConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    primary_color: Option<String>,
    primary_text_color: Option<String>,
    primary_border_color: Option<String>,
    secondary_text_color: Option<String>,
    line_color: Option<String>,
    accent_color: Option<String>,
    edge_label_background: Option<String>,
    step_fill: Option<String>,
    experimental_color: Option<String>,
    computational_color: Option<String>,
    other_step_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOverrides {
    viewport_width: Option<f32>,
    base_offset: Option<f32>,
    level_spacing: Option<f32>,
    node_spacing: Option<f32>,
    stage_column_x: Option<f32>,
    stage_spacing: Option<f32>,
    stage_width: Option<f32>,
    stage_height: Option<f32>,
    step_width: Option<f32>,
    step_height: Option<f32>,
    padding: Option<f32>,
    max_description_lines: Option<usize>,
    cycle_policy: Option<CyclePolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadOverrides {
    endpoint: Option<String>,
    max_file_bytes: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutOverrides>,
    upload: Option<UploadOverrides>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme `{theme_name}`"))?;
    }
    if let Some(vars) = parsed.theme_variables {
        apply_theme_variables(&mut config.theme, vars);
    }
    config.render.background = config.theme.background.clone();

    if let Some(overrides) = parsed.layout {
        apply_layout_overrides(&mut config.layout, overrides);
    }
    config.render.width = config.layout.viewport_width;

    if let Some(upload) = parsed.upload {
        if let Some(v) = upload.endpoint {
            config.upload.endpoint = v;
        }
        if let Some(v) = upload.max_file_bytes {
            config.upload.max_file_bytes = v;
        }
        if let Some(v) = upload.timeout_secs {
            config.upload.timeout_secs = v;
        }
    }

    Ok(config)
}

fn apply_theme_variables(theme: &mut Theme, vars: ThemeVariables) {
    let ThemeVariables {
        font_family,
        font_size,
        primary_color,
        primary_text_color,
        primary_border_color,
        secondary_text_color,
        line_color,
        accent_color,
        edge_label_background,
        step_fill,
        experimental_color,
        computational_color,
        other_step_color,
        background,
    } = vars;
    let strings = [
        (font_family, &mut theme.font_family),
        (primary_color, &mut theme.primary_color),
        (primary_text_color, &mut theme.primary_text_color),
        (primary_border_color, &mut theme.primary_border_color),
        (secondary_text_color, &mut theme.secondary_text_color),
        (line_color, &mut theme.line_color),
        (accent_color, &mut theme.accent_color),
        (edge_label_background, &mut theme.edge_label_background),
        (step_fill, &mut theme.step_fill),
        (experimental_color, &mut theme.experimental_color),
        (computational_color, &mut theme.computational_color),
        (other_step_color, &mut theme.other_step_color),
        (background, &mut theme.background),
    ];
    for (value, slot) in strings {
        if let Some(value) = value {
            *slot = value;
        }
    }
    if let Some(v) = font_size {
        theme.font_size = v;
    }
}

fn apply_layout_overrides(layout: &mut LayoutConfig, overrides: LayoutOverrides) {
    let floats = [
        (overrides.viewport_width, &mut layout.viewport_width),
        (overrides.base_offset, &mut layout.base_offset),
        (overrides.level_spacing, &mut layout.level_spacing),
        (overrides.node_spacing, &mut layout.node_spacing),
        (overrides.stage_column_x, &mut layout.stage_column_x),
        (overrides.stage_spacing, &mut layout.stage_spacing),
        (overrides.stage_width, &mut layout.stage_width),
        (overrides.stage_height, &mut layout.stage_height),
        (overrides.step_width, &mut layout.step_width),
        (overrides.step_height, &mut layout.step_height),
        (overrides.padding, &mut layout.padding),
    ];
    for (value, slot) in floats {
        if let Some(value) = value {
            *slot = value;
        }
    }
    if let Some(v) = overrides.max_description_lines {
        layout.max_description_lines = v;
    }
    if let Some(v) = overrides.cycle_policy {
        layout.cycle_policy = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.layout.level_spacing, 250.0);
        assert_eq!(config.upload.max_file_bytes, 52_428_800);
    }

    #[test]
    fn overrides_apply_on_top_of_named_theme() {
        let config = parse_config(
            r##"{
                "theme": "plain",
                "themeVariables": {"accentColor": "#FF0000", "fontSize": 18},
                "layout": {"nodeSpacing": 400, "cyclePolicy": "reject"},
                "upload": {"endpoint": "https://extract.example.org", "maxFileBytes": 1024}
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.accent_color, "#FF0000");
        assert_eq!(config.theme.font_size, 18.0);
        assert_eq!(config.theme.line_color, Theme::plain().line_color);
        assert_eq!(config.layout.node_spacing, 400.0);
        assert_eq!(config.layout.level_spacing, 250.0);
        assert_eq!(config.layout.cycle_policy, CyclePolicy::Reject);
        assert_eq!(config.upload.endpoint, "https://extract.example.org");
        assert_eq!(config.upload.max_file_bytes, 1024);
    }

    #[test]
    fn unknown_theme_is_an_error() {
        assert!(parse_config(r#"{"theme": "neon"}"#).is_err());
    }
}

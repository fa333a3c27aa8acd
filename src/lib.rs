#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod project;
pub mod render;
pub mod theme;
pub mod upload;
pub mod view;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, load_config};
pub use error::{LayoutError, ParseError, UploadError, ViewError};
pub use ir::{WorkflowDescription, parse_workflow};
pub use layout::{CyclePolicy, Layout, PositionedNode};
pub use project::project;
pub use theme::Theme;
pub use view::{Navigator, ViewEvent, ViewState, reduce};

/// Theme plus layout settings for the one-call entry points.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub theme: Theme,
    pub layout: LayoutConfig,
}

impl RenderOptions {
    pub fn modern() -> Self {
        Self::default()
    }

    pub fn plain() -> Self {
        Self {
            theme: Theme::plain(),
            layout: LayoutConfig::default(),
        }
    }

    pub fn with_viewport_width(mut self, width: f32) -> Self {
        self.layout.viewport_width = width;
        self
    }

    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.layout.cycle_policy = policy;
        self
    }
}

/// Parses `input` and lays out `view`. An unknown stage yields an empty layout.
pub fn layout_with_options(
    input: &str,
    view: &ViewState,
    options: &RenderOptions,
) -> anyhow::Result<Layout> {
    let workflow = parse_workflow(input)?;
    Ok(project(&workflow, view, &options.layout)?)
}

pub fn render_with_options(
    input: &str,
    view: &ViewState,
    options: &RenderOptions,
) -> anyhow::Result<String> {
    let layout = layout_with_options(input, view, options)?;
    Ok(render::render_svg(&layout, &options.theme, &options.layout))
}

/// Overview SVG with the default theme.
pub fn render(input: &str) -> anyhow::Result<String> {
    render_with_options(input, &ViewState::Overview, &RenderOptions::modern())
}

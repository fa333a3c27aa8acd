use crate::config::{Config, load_config};
use crate::ir::{WorkflowDescription, parse_workflow};
use crate::layout::{CyclePolicy, Layout};
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::view::Navigator;
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "wfviz",
    version,
    about = "Render paper-extracted scientific workflows as drillable diagrams"
)]
pub struct Args {
    /// Workflow JSON file or '-' for stdin
    #[arg(short = 'i', long = "input", conflicts_with = "upload")]
    pub input: Option<PathBuf>,

    /// PDF to send to the extraction service instead of reading workflow JSON
    #[arg(long = "upload", value_name = "PDF")]
    pub upload: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, layout, upload)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Viewport width used to center each level
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height of the PNG canvas
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Render the step graph of this stage instead of the overview
    #[arg(long = "stage", value_name = "ID", conflicts_with = "all_stages")]
    pub stage: Option<String>,

    /// Render the overview and every stage into separate files
    #[arg(long = "all-stages")]
    pub all_stages: bool,

    /// Fail on cyclic step dependencies instead of degrading
    #[arg(long = "strict-cycles")]
    pub strict_cycles: bool,

    /// Base URL of the extraction service
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoint: Option<String>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Json => "json",
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let config = resolve_config(&args)?;
    let workflow = match args.upload.as_deref() {
        Some(pdf) => fetch_workflow(pdf, &config)?,
        None => parse_workflow(&read_input(args.input.as_deref())?)?,
    };
    for diagnostic in workflow.diagnostics() {
        tracing::warn!(%diagnostic, "malformed workflow data");
    }

    let mut navigator = Navigator::new(workflow, config.layout.clone());

    if args.all_stages {
        let stage_ids: Vec<String> = navigator
            .workflow()
            .sorted_stage_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut names = vec!["overview".to_string()];
        names.extend(stage_ids.iter().cloned());
        let outputs = resolve_multi_outputs(args.output.as_deref(), args.output_format, &names)?;

        emit(&navigator.layout()?, &config, args.output_format, Some(&outputs[0]))?;
        for (stage_id, output) in stage_ids.iter().zip(&outputs[1..]) {
            let layout = navigator.drill_down(stage_id)?;
            emit(&layout, &config, args.output_format, Some(output))?;
            navigator.back()?;
        }
        return Ok(());
    }

    let layout = match args.stage.as_deref() {
        Some(stage_id) => navigator.drill_down(stage_id)?,
        None => navigator.layout()?,
    };
    tracing::info!(hint = %navigator.hint(), "rendering {}", navigator.breadcrumb().join(" / "));
    emit(&layout, &config, args.output_format, args.output.as_deref())
}

fn init_tracing(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    Ok(())
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.layout.viewport_width = width;
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if args.strict_cycles {
        config.layout.cycle_policy = CyclePolicy::Reject;
    }
    if let Some(endpoint) = &args.endpoint {
        config.upload.endpoint = endpoint.clone();
    }
    Ok(config)
}

#[cfg(feature = "upload")]
fn fetch_workflow(pdf: &Path, config: &Config) -> Result<WorkflowDescription> {
    use crate::upload::{HttpTransport, UploadSession};

    let transport = HttpTransport::new(&config.upload)?;
    let mut session = UploadSession::new(transport, config.upload.clone());
    Ok(session.submit_path(pdf)?)
}

#[cfg(not(feature = "upload"))]
fn fetch_workflow(_pdf: &Path, _config: &Config) -> Result<WorkflowDescription> {
    anyhow::bail!("--upload requires wfviz to be built with the `upload` feature")
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn emit(
    layout: &Layout,
    config: &Config,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    match format {
        OutputFormat::Svg => {
            let svg = render_svg(layout, &config.theme, &config.layout);
            write_output_svg(&svg, output)
        }
        OutputFormat::Png => {
            let output =
                output.ok_or_else(|| anyhow::anyhow!("Output path required for png output"))?;
            let svg = render_svg(layout, &config.theme, &config.layout);
            write_output_png(&svg, output, &config.render)
        }
        OutputFormat::Json => write_layout_dump(output, layout),
    }
}

/// One path per view name: `<stem>-<name>.<ext>` next to `output`, or `<name>.<ext>` inside
/// it when `output` is a directory.
fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    names: &[String],
) -> Result<Vec<PathBuf>> {
    let ext = format.extension();
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required for --all-stages"))?;
    if base.is_dir() {
        return Ok(names
            .iter()
            .map(|name| base.join(format!("{}.{ext}", file_safe(name))))
            .collect());
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("workflow");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    Ok(names
        .iter()
        .map(|name| parent.join(format!("{stem}-{}.{ext}", file_safe(name))))
        .collect())
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn multi_outputs_next_to_file() {
        let outputs = resolve_multi_outputs(
            Some(Path::new("out/diagram.svg")),
            OutputFormat::Svg,
            &names(&["overview", "S1", "S2"]),
        )
        .unwrap();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("out/diagram-overview.svg"),
                PathBuf::from("out/diagram-S1.svg"),
                PathBuf::from("out/diagram-S2.svg"),
            ]
        );
    }

    #[test]
    fn multi_outputs_inside_directory() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = resolve_multi_outputs(
            Some(dir.path()),
            OutputFormat::Json,
            &names(&["overview", "S 3"]),
        )
        .unwrap();
        assert_eq!(outputs[0], dir.path().join("overview.json"));
        assert_eq!(outputs[1], dir.path().join("S_3.json"));
    }

    #[test]
    fn multi_outputs_need_a_path() {
        assert!(resolve_multi_outputs(None, OutputFormat::Svg, &names(&["overview"])).is_err());
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "wfviz",
            "--width",
            "900",
            "--strict-cycles",
            "--endpoint",
            "http://extract:9000",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.layout.viewport_width, 900.0);
        assert_eq!(config.layout.cycle_policy, CyclePolicy::Reject);
        assert_eq!(config.upload.endpoint, "http://extract:9000");
    }

    #[test]
    fn stage_and_all_stages_conflict() {
        assert!(Args::try_parse_from(["wfviz", "--stage", "S1", "--all-stages"]).is_err());
    }
}

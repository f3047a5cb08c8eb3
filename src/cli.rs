//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::file_asset_adapter::FileBrandAsset;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::png_renderer::PngRenderer;
use crate::domain::chart::ChartService;
use crate::domain::error::ChartError;
use crate::domain::normalizer::normalize;
use crate::domain::settings::RenderSettings;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "candlechart", about = "Render candlestick charts from OHLCV payloads")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a payload to a PNG file
    Render {
        /// JSON payload file, or "-" for stdin
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Overrides [chart] watermark_path
        #[arg(long)]
        watermark: Option<PathBuf>,
        /// Fail instead of degrading when indicator parameters do not fit the data
        #[arg(long)]
        strict: bool,
    },
    /// Check that a payload normalizes, without rendering
    Validate {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("candlechart=info,warn"));
    // A second install (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Render {
            input,
            output,
            config,
            watermark,
            strict,
        } => run_render(&input, &output, config.as_deref(), watermark, strict),
        Command::Validate { input } => run_validate(&input),
        Command::Serve { config } => run_serve(config.as_deref()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, ChartError> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

/// Settings from the config file, with command-line overrides applied.
pub fn load_settings(
    config: &dyn ConfigPort,
    watermark: Option<PathBuf>,
    strict: bool,
) -> Result<RenderSettings, ChartError> {
    let mut settings = RenderSettings::from_config(config)?;
    if watermark.is_some() {
        settings.watermark_path = watermark;
    }
    settings.strict |= strict;
    Ok(settings)
}

pub fn read_payload(input: &Path) -> Result<Value, ChartError> {
    let text = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)?
    };
    parse_payload(&text)
}

pub fn parse_payload(text: &str) -> Result<Value, ChartError> {
    serde_json::from_str(text)
        .map_err(|e| ChartError::payload_shape(format!("payload is not valid JSON: {e}")))
}

/// Renders `payload` and writes the PNG to `output`, returning the byte count.
pub fn render_to_file(
    payload: &Value,
    settings: &RenderSettings,
    output: &Path,
) -> Result<usize, ChartError> {
    let assets = FileBrandAsset::new(settings.watermark_path.clone());
    let renderer = PngRenderer::from_settings(settings);
    let service = ChartService {
        settings,
        assets: &assets,
        renderer: &renderer,
    };
    let image = service.render(payload)?;
    std::fs::write(output, &image.bytes)?;
    Ok(image.bytes.len())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayloadSummary {
    pub records: usize,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub symbol: Option<String>,
}

pub fn summarize(payload: &Value) -> Result<PayloadSummary, ChartError> {
    let table = normalize(payload)?;
    Ok(PayloadSummary {
        records: table.len(),
        first: table.first_timestamp(),
        last: table.last_timestamp(),
        symbol: table.metadata().symbol.clone(),
    })
}

fn run_render(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    watermark: Option<PathBuf>,
    strict: bool,
) -> Result<(), ChartError> {
    let config = load_config(config)?;
    let settings = load_settings(&config, watermark, strict)?;
    let payload = read_payload(input)?;
    let bytes = render_to_file(&payload, &settings, output)?;
    tracing::info!(output = %output.display(), bytes, "wrote chart");
    Ok(())
}

fn run_validate(input: &Path) -> Result<(), ChartError> {
    let payload = read_payload(input)?;
    let summary = summarize(&payload)?;
    println!(
        "{} records from {} to {}{}",
        summary.records,
        summary.first.to_rfc3339(),
        summary.last.to_rfc3339(),
        summary
            .symbol
            .map(|s| format!(" ({s})"))
            .unwrap_or_default()
    );
    Ok(())
}

fn run_serve(config_path: Option<&Path>) -> Result<(), ChartError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState};
        use crate::domain::settings::listen_address;
        use std::sync::Arc;

        let config = load_config(config_path)?;
        let settings = RenderSettings::from_config(&config)?;
        let addr = listen_address(&config);

        let state = AppState {
            assets: Arc::new(FileBrandAsset::new(settings.watermark_path.clone())),
            renderer: Arc::new(PngRenderer::from_settings(&settings)),
            settings,
        };
        let router = build_router(state);

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "listening");
            axum::serve(listener, router).await
        })?;
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(ChartError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "candlechart was built without the web feature".into(),
        })
    }
}

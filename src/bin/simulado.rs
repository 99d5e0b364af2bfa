//! CLI binary for simulado-docx.
//!
//! `serve` runs the HTTP API; `render` generates one document offline from a
//! JSON file. Both are thin shims over the library crate.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use simulado_docx::{
    generate, generate_to_file, serve, write_atomic, AppState, ChartRenderer, GeneratorConfig,
    ServerConfig,
};
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

#[derive(Parser, Debug)]
#[command(
    name = "simulado",
    version,
    about = "Generate exam documents (.docx) with an annotated answer key from JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SIMULADO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SIMULADO_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Generate a single document from a JSON file.
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind.
    #[arg(long, env = "SIMULADO_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// TCP port.
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Largest accepted request body, in MiB.
    #[arg(long, env = "SIMULADO_BODY_LIMIT_MB", default_value_t = 25)]
    body_limit_mb: usize,

    #[command(flatten)]
    render: RenderOptions,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Exam JSON file.
    input: PathBuf,

    /// Output path. Defaults to Exam_{subject}.docx in the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    render: RenderOptions,
}

#[derive(Args, Debug)]
struct RenderOptions {
    /// Chart raster DPI (72–400).
    #[arg(long, env = "SIMULADO_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,
}

impl RenderOptions {
    fn config(&self) -> Result<GeneratorConfig> {
        GeneratorConfig::builder()
            .dpi(self.dpi)
            .build()
            .context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Render(args) => run_render(args, cli.quiet).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = args.render.config()?;
    let server = ServerConfig {
        host: args.host,
        port: args.port,
        body_limit_bytes: args.body_limit_mb.saturating_mul(1024 * 1024),
    };

    let state = Arc::new(AppState::new(config));
    serve(state, server.clone())
        .await
        .with_context(|| format!("Server on {} stopped", server.socket_addr()))
}

async fn run_render(args: RenderArgs, quiet: bool) -> Result<()> {
    let config = args.render.config()?;
    let raw = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let value: serde_json::Value = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not valid JSON", args.input.display()))?;

    let start = Instant::now();
    let output = args.output;
    let (doc, path) = tokio::task::spawn_blocking(move || -> Result<_> {
        let charts = ChartRenderer::new(&config);
        match output {
            Some(path) => {
                let doc = generate_to_file(&value, &path, &charts, &config)?;
                Ok((doc, path))
            }
            None => {
                let doc = generate(&value, &charts, &config)?;
                let path = Path::new(&doc.filename).to_path_buf();
                write_atomic(&path, &doc.bytes)?;
                Ok((doc, path))
            }
        }
    })
    .await
    .context("Generation worker failed")?
    .context("Failed to generate document")?;

    if !quiet {
        eprintln!(
            "{}  {}  {}",
            green("✓"),
            path.display(),
            dim(&format!(
                "{} questions, {} bytes, {}ms",
                doc.items,
                doc.bytes.len(),
                start.elapsed().as_millis()
            ))
        );
    }
    Ok(())
}

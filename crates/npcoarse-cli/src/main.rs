#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use npcoarse_core::error::{CoarsenError, ConfigError, ErrorCode, InputError};
use output::OutputMode;
use std::env;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Multilevel coarsening of n-partite networks",
    long_about = None
)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of human text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Coarsen an edge list into a multilevel hierarchy",
        long_about = "Load an ncol edge list, split its vertices into layers by \
                      --vertices, and coarsen it level by level until every layer \
                      reaches its maximum level or no further merge is possible.\n\n\
                      Comma-separated per-layer flags take one value per layer or a \
                      single value applied to every layer. Flags override values \
                      from --config.",
        after_help = "EXAMPLES:\n    \
                      # Coarsen a 4+3 bipartite graph with the defaults\n    \
                      npcoarse run --input graph.ncol --vertices 4,3\n\n    \
                      # Different strategies per layer, keep at least 10 vertices in each\n    \
                      npcoarse run --input graph.ncol --vertices 500,300 \\\n        \
                      --matching hem,mlpb --gmv 10 --output-dir out/\n\n    \
                      # Read the options from a file, override the worker count\n    \
                      npcoarse run --input graph.ncol --vertices 4,3 --config opts.toml --workers 4"
    )]
    Run(cmd::run::RunArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("NPCOARSE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "npcoarse=debug,info"
        } else {
            "npcoarse=info,warn"
        })
    });

    let format = env::var("NPCOARSE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Machine-readable code for errors raised by the library crates.
fn error_code(err: &anyhow::Error) -> Option<ErrorCode> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<CoarsenError>()
            .map(CoarsenError::code)
            .or_else(|| cause.downcast_ref::<ConfigError>().map(ConfigError::code))
            .or_else(|| cause.downcast_ref::<InputError>().map(InputError::code))
    })
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }
    let mode = cli.output_mode();

    let result = match cli.command {
        Commands::Run(ref args) => cmd::run::run(args, mode),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = error_code(&err);
            if let Err(render_err) = output::render_error(mode, &err, code) {
                eprintln!("error: {err:#}");
                eprintln!("(failed to render error: {render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

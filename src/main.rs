use clap::{Parser, Subcommand};
use reportforge::cli::{GenerateOptions, GenerateOutcome};
use reportforge::config::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status for a report written with omitted sections
const EXIT_INCOMPLETE: u8 = 2;

#[derive(Parser)]
#[command(name = "reportforge")]
#[command(
    version,
    about = "AI-driven research report generator with per-section web research"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan, research and write a report
    Generate {
        #[arg(long, short, help = "Report topic")]
        topic: String,
        #[arg(
            long,
            conflicts_with = "outline_file",
            required_unless_present = "outline_file",
            help = "Report outline text"
        )]
        outline: Option<String>,
        #[arg(long, help = "Read the outline from a file")]
        outline_file: Option<PathBuf>,
        #[arg(long, short, help = "Output directory for rendered reports")]
        output: Option<PathBuf>,
        #[arg(long, help = "LLM provider (openai, azure-openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(
            long = "format",
            short = 'f',
            help = "Output format: markdown, html (repeatable)"
        )]
        formats: Vec<OutputFormat>,
        #[arg(long = "dry-run", help = "Plan sections only, don't research")]
        dry_run: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json, yaml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mreportforge encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<ExitCode> {
    // Credentials may live in .env; a missing file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            topic,
            outline,
            outline_file,
            output,
            provider,
            model,
            formats,
            dry_run,
        } => {
            let outcome = reportforge::cli::commands::generate::run(GenerateOptions {
                topic,
                outline,
                outline_file,
                output,
                provider,
                model,
                formats,
                dry_run,
            })?;
            if outcome == GenerateOutcome::Incomplete {
                return Ok(ExitCode::from(EXIT_INCOMPLETE));
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                reportforge::cli::commands::config::show(&format)?;
            }
            ConfigAction::Path => {
                reportforge::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                reportforge::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

#![allow(unused_assignments)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use fieldref::{Engine, FieldRefError, FieldRefResult, HighlightPolicy, LineIndex, Settings};

/// Field reference tooling for GET('field') expressions
///
/// Checks field references against a registry and serves hover and
/// completion, from the command line or as a language server.
#[derive(Parser)]
#[command(name = "fieldref")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (.yaml, .yml or .json); defaults to fieldref.yaml in the
    /// working directory, then to the built-in sample registry
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the highlight policy: valid-subset or any-descriptor
    #[arg(long, global = true)]
    highlight: Option<HighlightPolicy>,

    /// Log filter (e.g. "debug", "fieldref=trace"); falls back to RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List field references and their classification
    Scan {
        /// File to scan
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Report references that are unknown or not enabled
    Check {
        /// File to check
        file: PathBuf,

        /// Treat warnings (known but not enabled fields) as errors
        #[arg(long)]
        strict: bool,
    },

    /// Show hover documentation at a position
    Hover {
        /// Source file
        file: PathBuf,

        /// Line number (1-based)
        #[arg(long)]
        line: usize,

        /// Column in characters (1-based)
        #[arg(long)]
        column: usize,
    },

    /// Show completion candidates at a position
    Complete {
        /// Source file
        file: PathBuf,

        /// Line number (1-based)
        #[arg(long)]
        line: usize,

        /// Column in characters (1-based)
        #[arg(long)]
        column: usize,
    },

    /// Validate and print the field registry
    Registry {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Start the language server on stdio
    Lsp,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Lsp => "info",
        _ => "warn",
    };
    init_logging(cli.log_level.as_deref(), default_level);

    let result = load_engine(cli.config.as_deref(), cli.highlight).and_then(|engine| {
        match cli.command {
            Commands::Scan { file, format } => cmd_scan(&engine, &file, format),
            Commands::Check { file, strict } => cmd_check(&engine, &file, strict),
            Commands::Hover { file, line, column } => cmd_hover(&engine, &file, line, column),
            Commands::Complete { file, line, column } => {
                cmd_complete(&engine, &file, line, column)
            }
            Commands::Registry { format } => cmd_registry(&engine, format),
            Commands::Lsp => cmd_lsp(engine),
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            let exit_code = match &e {
                FieldRefError::IoError { .. } => ExitCode::from(3),
                _ => ExitCode::from(1),
            };
            eprintln!("{:?}", miette::Report::new(e));
            exit_code
        }
    }
}

/// Log to stderr; stdout belongs to command output and the LSP transport
fn init_logging(level: Option<&str>, default_level: &str) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
    };

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn load_engine(config: Option<&Path>, highlight: Option<HighlightPolicy>) -> FieldRefResult<Engine> {
    let cwd = std::env::current_dir()
        .map_err(|e| FieldRefError::io_error(format!("failed to read working directory: {}", e)))?;
    let mut settings = fieldref::config::resolve(config, &cwd)?;
    if let Some(policy) = highlight {
        settings.highlight = policy;
    }
    Engine::from_settings(&settings)
}

fn read_source(file: &Path) -> FieldRefResult<String> {
    std::fs::read_to_string(file).map_err(|e| FieldRefError::read_failed(file, e))
}

/// Byte column for a 1-based character column; one past the end is allowed
fn char_column_to_byte(line: &str, column: usize) -> Option<usize> {
    let index = column.checked_sub(1)?;
    line.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(line.len()))
        .nth(index)
}

/// Line text and byte column for a 1-based position
fn locate(source: &str, line: usize, column: usize) -> Option<(&str, usize)> {
    let index = LineIndex::new(source);
    let text = index.line_text(source, line.checked_sub(1)?)?;
    let text = text.strip_suffix('\r').unwrap_or(text);
    Some((text, char_column_to_byte(text, column)?))
}

fn cmd_scan(engine: &Engine, file: &Path, format: OutputFormat) -> FieldRefResult<ExitCode> {
    let source = read_source(file)?;
    let annotations = engine.annotate(&source);

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&annotations)
                .map_err(|e| FieldRefError::io_error(format!("failed to encode JSON: {}", e)))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            let index = LineIndex::new(&source);
            for annotation in &annotations {
                let (line, col) = index.line_col(annotation.range.start);
                println!(
                    "{:>4}:{:<4} {:<9} {:<20} {}",
                    line + 1,
                    col + 1,
                    annotation.visual_class.as_str(),
                    format!("{:?}", annotation.classification),
                    annotation.name
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_check(engine: &Engine, file: &Path, strict: bool) -> FieldRefResult<ExitCode> {
    let source = read_source(file)?;
    let findings = engine.diagnose(&source);

    let mut failed = false;
    for finding in findings {
        failed |= strict || !finding.is_warning();
        eprintln!("{:?}", miette::Report::new(finding));
    }

    if failed {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn cmd_hover(engine: &Engine, file: &Path, line: usize, column: usize) -> FieldRefResult<ExitCode> {
    let source = read_source(file)?;
    if let Some((text, col)) = locate(&source, line, column) {
        if let Some(info) = engine.hover(text, col) {
            for line in info.markdown_lines() {
                println!("{}", line);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_complete(
    engine: &Engine,
    file: &Path,
    line: usize,
    column: usize,
) -> FieldRefResult<ExitCode> {
    let source = read_source(file)?;
    if let Some((text, col)) = locate(&source, line, column) {
        for item in engine.complete(&text[..col]) {
            println!("{}\t{}", item.label, item.detail);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_registry(engine: &Engine, format: OutputFormat) -> FieldRefResult<ExitCode> {
    let registry = engine.registry();

    match format {
        OutputFormat::Json => {
            let settings = Settings {
                registry: registry.to_config(),
                highlight: engine.policy(),
            };
            let json = serde_json::to_string_pretty(&settings)
                .map_err(|e| FieldRefError::io_error(format!("failed to encode JSON: {}", e)))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{} fields ({} valid)", registry.len(), registry.valid_names().count());
            println!("{:-<60}", "");
            for descriptor in registry.descriptors() {
                let marker = if registry.is_valid(&descriptor.name) { "*" } else { " " };
                println!(
                    "{} {:<36} {:<8} {}",
                    marker,
                    descriptor.name,
                    descriptor.type_tag.to_string(),
                    descriptor.label
                );
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_lsp(engine: Engine) -> FieldRefResult<ExitCode> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| FieldRefError::io_error(format!("failed to create runtime: {}", e)))?;

    rt.block_on(fieldref::lsp::run_server(engine));
    Ok(ExitCode::SUCCESS)
}

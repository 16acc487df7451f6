use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use find_ref::config::{find_config_file, load_config, Config};
use find_ref::search::{SearchError, SearchOrchestrator, SearchOutcome};
use find_ref::sources::SourceRegistry;
use find_ref::utils::{format_citation, format_csv, CitationStyle, Markup, StructuredCitation};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// find-ref - Find formatted references for an author/year citation
#[derive(Parser, Debug)]
#[command(name = "find-ref")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find APA references matching an in-text citation and a topic keyword", long_about = None)]
struct Cli {
    /// In-text citation, e.g. "Chomsky (1965)"
    #[arg(long)]
    citation: String,

    /// Topic keyword used to narrow the search
    #[arg(long)]
    keyword: String,

    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Apa)]
    format: OutputFormat,

    /// Emphasize titles with Markdown asterisks instead of plain text
    #[arg(long)]
    markdown: bool,

    /// Append ISBNs to book references
    #[arg(long)]
    isbn: bool,

    /// Maximum results per source
    #[arg(long, short)]
    limit: Option<usize>,

    /// Seconds to wait for each source before giving up on it
    #[arg(long)]
    timeout: Option<u64>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// One APA reference per line
    Apa,
    /// BibTeX entries
    Bibtex,
    /// JSON array with the formatted reference and the record
    Json,
    /// CSV with one row per record
    Csv,
}

const EXIT_SETUP: u8 = 1;
const EXIT_PARSE: u8 = 2;
const EXIT_UNAVAILABLE: u8 = 3;
const EXIT_NO_RESULTS: u8 = 4;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("find_ref={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_SETUP)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli)?;

    let registry =
        SourceRegistry::from_config(&config).context("Failed to set up bibliographic sources")?;
    tracing::debug!("Enabled sources: {:?}", registry.ids().collect::<Vec<_>>());

    let markup = if cli.markdown {
        Markup::Markdown
    } else {
        Markup::Plain
    };
    let orchestrator = SearchOrchestrator::from_config(registry, &config)
        .with_markup(markup)
        .with_isbn(cli.isbn);

    let result = tokio::select! {
        result = orchestrator.run(&cli.citation, &cli.keyword) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    };

    match result {
        Ok(outcome) => {
            print_outcome(&outcome, cli.format)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::from(exit_code(&e)))
        }
    }
}

/// Process exit status for a failed search
fn exit_code(error: &SearchError) -> u8 {
    match error {
        SearchError::Parse(_) => EXIT_PARSE,
        SearchError::AllSourcesFailed(_) => EXIT_UNAVAILABLE,
        SearchError::NoResults => EXIT_NO_RESULTS,
    }
}

/// Load configuration from file if specified or found in default locations
fn resolve_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => find_config_file(),
    };
    if let Some(path) = &path {
        tracing::info!("Using config file: {}", path.display());
    }

    let mut config = load_config(path.as_deref()).context("Failed to load configuration")?;

    if let Some(limit) = cli.limit {
        config.search.limit = limit;
    }
    if let Some(timeout) = cli.timeout {
        config.search.source_timeout_secs = timeout;
    }

    Ok(config)
}

fn print_outcome(outcome: &SearchOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Apa => {
            for reference in &outcome.references {
                println!("{}", reference.formatted);
            }
        }
        OutputFormat::Bibtex => {
            let entries: Vec<String> = outcome
                .references
                .iter()
                .map(|r| format_citation(&r.record, CitationStyle::Bibtex))
                .collect();
            println!("{}", entries.join("\n\n"));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&structured(outcome))?);
        }
        OutputFormat::Csv => {
            print!("{}", format_csv(&structured(outcome))?);
        }
    }

    Ok(())
}

fn structured(outcome: &SearchOutcome) -> Vec<StructuredCitation<'_>> {
    outcome
        .references
        .iter()
        .map(|r| StructuredCitation {
            source: r.source(),
            formatted: r.formatted.clone(),
            record: &r.record,
        })
        .collect()
}

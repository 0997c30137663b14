use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use spotlight_batch::annotator::SpotlightAnnotator;
use spotlight_batch::config::load_config_or_default;
use spotlight_batch::line_parser::LineParser;
use spotlight_batch::model::BatchReport;
use spotlight_batch::pipeline::{
    BatchOptions, evaluate_manual, parse_corpus, save_extracted_entities,
};
use spotlight_batch::report::{verify_restart_input, write_report};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "spotlight-batch",
    about = "Annotate a text corpus line by line against a DBpedia Spotlight service"
)]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides service.endpoint from the config file.
    #[arg(long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Annotate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum)]
        parser: Option<LineParser>,
        #[arg(long)]
        restart_from: Option<usize>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    Evaluate {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 0)]
        restart_from: usize,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    Parse {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum)]
        parser: Option<LineParser>,
    },
    Validate,
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let mut config = load_config_or_default(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.service.endpoint = endpoint;
    }

    match cli.command {
        Commands::Annotate {
            input,
            output,
            parser,
            restart_from,
            report,
        } => {
            let restart_from = restart_from.unwrap_or(config.batch.restart_from);
            guard_restart(restart_from, report.as_deref(), &input)?;
            let annotator = SpotlightAnnotator::new(&config)?;
            let batch = save_extracted_entities(
                &annotator,
                &BatchOptions {
                    input,
                    output,
                    parser: parser.unwrap_or(config.batch.parser),
                    restart_from,
                },
            )?;
            finish(&batch, report.as_deref())?;
        }
        Commands::Evaluate {
            input,
            output,
            restart_from,
            report,
        } => {
            guard_restart(restart_from, report.as_deref(), &input)?;
            let annotator = SpotlightAnnotator::new(&config)?;
            let batch = evaluate_manual(&annotator, &input, &output, restart_from)?;
            finish(&batch, report.as_deref())?;
        }
        Commands::Parse { input, parser } => {
            let parser = parser.unwrap_or(config.batch.parser);
            let mut failures = 0usize;
            for item in parse_corpus(&input, parser)? {
                match item.result {
                    Ok(snippet) => println!("{}\t{snippet}", item.line_number),
                    Err(err) => {
                        failures += 1;
                        eprintln!("{}\tERROR: {err}", item.line_number);
                    }
                }
            }
            if failures > 0 {
                bail!("{failures} line(s) failed to parse with the {} parser", parser.key());
            }
        }
        Commands::Validate => {
            config.validate()?;
            println!(
                "OK: {} {} (confidence {}, support {})",
                config.service.method.to_ascii_uppercase(),
                config.service.endpoint,
                config.service.confidence,
                config.service.support
            );
        }
    }

    Ok(())
}

/// A restarted run reuses the report path of the run it resumes; refuse to
/// continue against a different corpus.
fn guard_restart(restart_from: usize, report_path: Option<&Path>, input: &Path) -> Result<()> {
    if restart_from > 1
        && let Some(path) = report_path
    {
        verify_restart_input(path, input)?;
    }
    Ok(())
}

fn finish(batch: &BatchReport, report_path: Option<&Path>) -> Result<()> {
    info!(
        processed = batch.processed,
        succeeded = batch.succeeded,
        failed = batch.failed,
        skipped = batch.skipped,
        "batch summary"
    );

    match report_path {
        Some(path) => {
            write_report(path, batch)?;
            info!(report = %path.display(), "report written");
        }
        None => println!("{}", serde_json::to_string_pretty(batch)?),
    }
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

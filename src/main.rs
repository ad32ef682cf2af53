use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use vulnreview::config::Config;
use vulnreview::dataset::create_source;
use vulnreview::masking::mask_findings;
use vulnreview::normalize::normalize;
use vulnreview::pipeline::ReviewPipeline;
use vulnreview::report::write_report;
use vulnreview::review::ReviewGenerator;
use vulnreview::scanner::{BanditScanner, Finding};

#[derive(Parser, Debug)]
#[command(
    name = "vulnreview",
    version,
    about = "Scan vulnerable code samples with Bandit and have a code model review them"
)]
struct Cli {
    /// Config file (defaults to ~/.vulnreview/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline and write the Markdown report
    Run {
        /// Maximum number of samples (0 = all)
        #[arg(long)]
        limit: Option<usize>,
        /// Report path
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Record failed samples and keep going
        #[arg(long)]
        isolate_failures: bool,
        /// Read samples from a JSON-lines file instead of datasets-server
        #[arg(long, value_name = "PATH")]
        dataset_file: Option<PathBuf>,
    },
    /// Print the normalized form of a code file
    Normalize { file: PathBuf },
    /// Scan a file with the configured scanner and print the outcome as JSON
    Scan { file: PathBuf },
    /// Replace lines flagged in a findings JSON file with FIM holes
    Mask {
        file: PathBuf,
        /// JSON array of findings, as printed by `scan`
        #[arg(long, value_name = "PATH")]
        findings: PathBuf,
    },
    /// Print shell completions
    Completions { shell: Shell },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print(text: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Run {
            limit,
            output,
            isolate_failures,
            dataset_file,
        } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if let Some(limit) = limit {
                config.dataset.limit = limit;
            }
            if let Some(output) = output {
                config.report.output_path = output;
            }
            if isolate_failures {
                config.pipeline.isolate_failures = true;
            }
            if let Some(path) = dataset_file {
                config.dataset.kind = "jsonl".into();
                config.dataset.path = Some(path);
            }
            run(&config).await
        }
        Command::Normalize { file } => print(&normalize(&read_source(&file)?)?),
        Command::Scan { file } => {
            let config = Config::load(cli.config.as_deref())?;
            let outcome = BanditScanner::from_config(&config.scanner)?
                .scan_file(&file)
                .await?;
            print(&serde_json::to_string_pretty(&outcome)?)
        }
        Command::Mask { file, findings } => {
            let findings: Vec<Finding> = serde_json::from_str(&read_source(&findings)?)
                .with_context(|| format!("Invalid findings file {}", findings.display()))?;
            print(&mask_findings(&read_source(&file)?, &findings))
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn run(config: &Config) -> Result<()> {
    let source = create_source(&config.dataset)?;
    let records = source
        .load(&config.dataset.language, config.dataset.limit)
        .await?;
    if records.is_empty() {
        tracing::warn!(
            source = source.name(),
            language = %config.dataset.language,
            "No matching samples; report will be empty"
        );
    }

    let generator = ReviewGenerator::from_config(&config.generator)?;
    tracing::info!(
        backend = generator.backend_id(),
        model = generator.model_name(),
        samples = records.len(),
        "Starting review"
    );

    let pipeline = ReviewPipeline::new(
        BanditScanner::from_config(&config.scanner)?,
        generator,
        config.pipeline.isolate_failures,
    );
    let results = pipeline.run(&records).await?;

    let output = vulnreview::config::expand_path(&config.report.output_path)?;
    write_report(&results, &output)
}

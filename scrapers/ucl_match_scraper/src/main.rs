use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::{path::PathBuf, process::ExitCode};
use tracing::error;

use ucl_match_scraper::{
    config::ScraperConfig,
    error::ResolveError,
    inputs::{resolve_inputs, InputSources},
    orchestrator::BatchOrchestrator,
    writer::write_csv,
};

/// Scrape teams, venue and kickoff from UEFA Champions League match pages
/// into a semicolon-delimited CSV.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Match ids or match page URLs
    inputs: Vec<String>,

    /// JSON file holding an array of match ids or URLs
    #[arg(long, value_name = "PATH")]
    from_json: Option<PathBuf>,

    /// CSV file with a `url` column, or one id/URL per line
    #[arg(long, value_name = "PATH")]
    from_csv: Option<PathBuf>,

    /// Output file (default: matches.csv)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Pause after each navigation, in milliseconds
    #[arg(long, value_name = "MS")]
    settle_ms: Option<u64>,

    /// Read saved pages from <DIR>/<match_id>.html instead of launching a browser
    #[arg(long, value_name = "DIR")]
    html_dir: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut ScraperConfig) {
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(ms) = self.settle_ms {
            config.extraction.settle_delay_ms = ms;
        }
        if let Some(dir) = &self.html_dir {
            config.browser.snapshot_dir = Some(dir.clone());
        }
    }

    fn sources(&self) -> InputSources {
        InputSources {
            tokens: self.inputs.clone(),
            from_json: self.from_json.clone(),
            from_csv: self.from_csv.clone(),
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ScraperConfig::from_env();
    cli.apply(&mut config);

    let references = resolve_inputs(&cli.sources())?;

    let orchestrator = BatchOrchestrator::new(config);
    let records = orchestrator
        .run_all(&references)
        .await
        .with_context(|| format!("Scraping {} matches failed", references.len()))?;

    let path = &orchestrator.config().output.path;
    write_csv(path, &records).with_context(|| format!("Could not save results to {}", path.display()))?;
    println!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if matches!(e.downcast_ref::<ResolveError>(), Some(ResolveError::NoReferences)) => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

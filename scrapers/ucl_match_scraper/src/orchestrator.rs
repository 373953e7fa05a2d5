use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::{
    chrome::ChromeSession,
    config::ScraperConfig,
    error::ScrapeError,
    extract::PageExtractor,
    metrics::MetricsCollector,
    normalize::normalize_record,
    page::{BrowserSession, PageHandle},
    snapshot::SnapshotBrowser,
    types::{CanonicalReference, ExtractionRecord},
};

/// Drives one browser session through the whole batch, one page at a time.
pub struct BatchOrchestrator {
    config: ScraperConfig,
    extractor: PageExtractor,
    metrics: MetricsCollector,
}

impl BatchOrchestrator {
    pub fn new(config: ScraperConfig) -> Self {
        let extractor = PageExtractor::new(&config.extraction);
        Self {
            config,
            extractor,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Opens the session the config asks for (saved snapshots or Chrome)
    /// and runs the batch through it.
    pub async fn run_all(
        &self,
        references: &[CanonicalReference],
    ) -> Result<Vec<ExtractionRecord>, ScrapeError> {
        match &self.config.browser.snapshot_dir {
            Some(dir) => {
                info!("Reading saved pages from {:?}", dir);
                let mut session = SnapshotBrowser::from_dir(dir);
                self.run(&mut session, references).await
            }
            None => {
                let mut session = ChromeSession::launch(&self.config.browser).await?;
                self.run(&mut session, references).await
            }
        }
    }

    /// Extracts every reference in order. A failed page becomes an error
    /// record; only session-level failures end the run. The session is
    /// closed before returning either way.
    pub async fn run<B: BrowserSession>(
        &self,
        session: &mut B,
        references: &[CanonicalReference],
    ) -> Result<Vec<ExtractionRecord>, ScrapeError> {
        let result = self.process_all(&*session, references).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        if let Err(e) = &result {
            error!("Batch aborted: {}", e);
        }
        result
    }

    async fn process_all<B: BrowserSession>(
        &self,
        session: &B,
        references: &[CanonicalReference],
    ) -> Result<Vec<ExtractionRecord>, ScrapeError> {
        let pb = ProgressBar::new(references.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} matches ({eta})")
        {
            pb.set_style(style);
        }

        let mut records = Vec::with_capacity(references.len());
        for reference in references {
            let page = session.new_page().await?;

            let tracker = self.metrics.record_page_start();
            let record = normalize_record(self.extractor.extract(&page, &reference.url).await);
            tracker.finish(record.error.as_deref());

            if let Err(e) = page.close().await {
                warn!("Failed to close page for {}: {}", reference.url, e);
            }

            pb.inc(1);
            records.push(record);
        }
        pb.finish_and_clear();

        let metrics = self.metrics.get_metrics();
        info!(
            "Scraped {} matches ({} ok, {} failed, avg {:.0} ms/page)",
            metrics.total_pages, metrics.successful_pages, metrics.failed_pages, metrics.avg_page_time_ms
        );
        Ok(records)
    }
}

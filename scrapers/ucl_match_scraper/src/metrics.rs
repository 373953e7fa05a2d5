use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScraperMetrics {
    pub total_pages: u64,
    pub successful_pages: u64,
    pub failed_pages: u64,
    pub avg_page_time_ms: f64,
    pub total_time_ms: f64,
    pub last_error: Option<String>,
    pub last_error_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<ScraperMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page_start(&self) -> PageTracker {
        PageTracker {
            start_time: Instant::now(),
            collector: self.clone(),
        }
    }

    pub fn get_metrics(&self) -> ScraperMetrics {
        self.metrics.lock().unwrap().clone()
    }

    fn record(&self, duration: Duration, error: Option<&str>) {
        let mut metrics = self.metrics.lock().unwrap();

        metrics.total_pages += 1;
        match error {
            None => metrics.successful_pages += 1,
            Some(error) => {
                metrics.failed_pages += 1;
                metrics.last_error = Some(error.to_string());
                metrics.last_error_time = Some(Utc::now());
            }
        }

        let elapsed_ms = duration.as_secs_f64() * 1000.0;
        metrics.total_time_ms += elapsed_ms;
        metrics.avg_page_time_ms = metrics.total_time_ms / metrics.total_pages as f64;
    }
}

pub struct PageTracker {
    start_time: Instant,
    collector: MetricsCollector,
}

impl PageTracker {
    /// `error` is the record's error, if the page failed.
    pub fn finish(self, error: Option<&str>) {
        self.collector.record(self.start_time.elapsed(), error);
    }
}

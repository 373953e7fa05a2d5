use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, time::Duration};
use tracing::warn;

pub const DEFAULT_OUTPUT: &str = "matches.csv";

const DEFAULT_CONSENT_LABELS: &[&str] = &["Alle akzeptieren", "Akzeptieren", "Zustimmen", "Accept all"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrowserSettings {
    pub headless: bool,
    pub locale: String,
    pub no_sandbox: bool,
    /// Serve pages from `<dir>/<match_id>.html` instead of launching Chrome.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            locale: "de-DE".to_string(),
            no_sandbox: true,
            snapshot_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionSettings {
    pub settle_delay_ms: u64,
    /// Tried in order against button labels, case-insensitively.
    pub consent_labels: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 800,
            consent_labels: DEFAULT_CONSENT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExtractionSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Compiled consent patterns; labels that are not valid regexes are
    /// matched literally.
    pub fn consent_patterns(&self) -> Vec<Regex> {
        self.consent_labels
            .iter()
            .filter_map(|label| {
                RegexBuilder::new(label)
                    .case_insensitive(true)
                    .build()
                    .or_else(|_| {
                        RegexBuilder::new(&regex::escape(label))
                            .case_insensitive(true)
                            .build()
                    })
                    .ok()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputSettings {
    pub path: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScraperConfig {
    pub browser: BrowserSettings,
    pub extraction: ExtractionSettings,
    pub output: OutputSettings,
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(headless) = env::var("HEADLESS") {
            config.browser.headless = headless != "0";
        }
        if let Ok(locale) = env::var("BROWSER_LOCALE") {
            config.browser.locale = locale;
        }
        if let Ok(no_sandbox) = env::var("BROWSER_NO_SANDBOX") {
            config.browser.no_sandbox = no_sandbox != "0";
        }
        if let Ok(dir) = env::var("SCRAPER_HTML_DIR") {
            config.browser.snapshot_dir = Some(PathBuf::from(dir));
        }
        match env::var("SCRAPER_SETTLE_MS").map(|ms| ms.parse::<u64>()) {
            Ok(Ok(ms)) => config.extraction.settle_delay_ms = ms,
            Ok(Err(e)) => warn!("Ignoring invalid SCRAPER_SETTLE_MS: {}", e),
            Err(_) => {}
        }
        if let Ok(labels) = env::var("SCRAPER_CONSENT_LABELS") {
            let labels: Vec<String> = labels
                .split('|')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            if !labels.is_empty() {
                config.extraction.consent_labels = labels;
            }
        }
        if let Ok(path) = env::var("SCRAPER_OUTPUT") {
            config.output.path = PathBuf::from(path);
        }

        config
    }
}

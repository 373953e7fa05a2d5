//! Field extraction for one match detail page.
//!
//! Every field is read through a ranked list of strategies. The first one
//! that yields non-empty text wins and the rest are never consulted. A
//! strategy that finds nothing or errors just hands over to the next one;
//! only a failed navigation turns the whole page into an error record.

use regex::{Regex, RegexBuilder};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    config::ExtractionSettings,
    error::BrowserError,
    normalize::collapse_whitespace,
    page::{Locator, PageHandle},
    types::ExtractionRecord,
};

const CONSENT_CONTROLS: &str = "button, [role='button']";
const HEADING: &str = "h1";
const HOME_NAME: &str = "[data-testid='team-home-name']";
const AWAY_NAME: &str = "[data-testid='team-away-name']";
const TEAM_SEPARATOR: &str = "vs";
const SECTIONS: &str = "section, div";

const VENUE_KEYWORDS: &str = "(Stadion|Arena|Ort|Venue|Location)";
const DATE_KEYWORDS: &str = "(Datum|Date|Anstoß|Anstoss|Kick-off)";
const DATE_LABELS: &[&str] = &["datum", "date", "anstoss", "anstoß", "kick-off"];

fn keyword_pattern(pattern: &str) -> Regex {
    RegexBuilder::new(pattern).case_insensitive(true).build().unwrap()
}

/// How a single strategy finds its text.
#[derive(Debug, Clone)]
pub enum Probe {
    /// Text of the first element the locator matches.
    First(Locator),
    /// First container the locator matches, then the value next to the
    /// first `<dt>` label containing one of `labels`.
    LabelValue {
        container: Locator,
        labels: &'static [&'static str],
    },
}

#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: &'static str,
    pub probe: Probe,
}

impl Strategy {
    pub fn first(name: &'static str, locator: Locator) -> Self {
        Self {
            name,
            probe: Probe::First(locator),
        }
    }

    async fn run<P: PageHandle>(&self, page: &P) -> Result<String, BrowserError> {
        match &self.probe {
            Probe::First(locator) => first_text(page, locator).await,
            Probe::LabelValue { container, labels } => {
                let Some(container) = page.locate_first(container).await? else {
                    return Ok(String::new());
                };
                let pairs = label_value_pairs(page, &container).await?;
                Ok(value_by_label(&pairs, labels).unwrap_or_default().to_string())
            }
        }
    }
}

/// A ranked list of strategies for one field.
#[derive(Debug, Clone)]
pub struct FieldChain {
    pub field: &'static str,
    pub strategies: Vec<Strategy>,
}

impl FieldChain {
    pub fn stadium() -> Self {
        Self {
            field: "stadium_info",
            strategies: vec![
                Strategy::first("stadium-info class", Locator::css(".stadium-info")),
                Strategy::first("stadium test id", Locator::css("[data-testid*='stadium']")),
                Strategy::first(
                    "venue keyword section",
                    Locator::css(SECTIONS).with_text(keyword_pattern(VENUE_KEYWORDS)),
                ),
            ],
        }
    }

    pub fn match_date() -> Self {
        Self {
            field: "match_date",
            strategies: vec![
                Strategy::first(
                    "match-info date class",
                    Locator::css(".match-info__date, [class*='match-info__date']"),
                ),
                Strategy {
                    name: "date label scan",
                    probe: Probe::LabelValue {
                        container: Locator::css(SECTIONS).with_text(keyword_pattern(DATE_KEYWORDS)),
                        labels: DATE_LABELS,
                    },
                },
            ],
        }
    }

    /// Returns the first non-empty value, or an empty string once every
    /// strategy has come up empty.
    pub async fn resolve<P: PageHandle>(&self, page: &P) -> String {
        for strategy in &self.strategies {
            match strategy.run(page).await {
                Ok(text) if !text.is_empty() => {
                    debug!("{}: matched by {}", self.field, strategy.name);
                    return text;
                }
                Ok(_) => debug!("{}: {} found nothing", self.field, strategy.name),
                Err(e) => debug!("{}: {} failed: {}", self.field, strategy.name, e),
            }
        }
        debug!("{}: no strategy matched", self.field);
        String::new()
    }
}

/// Trimmed text of the first match; empty when nothing matches.
async fn first_text<P: PageHandle>(page: &P, locator: &Locator) -> Result<String, BrowserError> {
    match page.locate_first(locator).await? {
        Some(element) => Ok(page.text(&element).await?.trim().to_string()),
        None => Ok(String::new()),
    }
}

/// `(label, value)` pairs for every `<dt>` under `container`. The value is
/// the first `<dd>` among the label's later siblings, so grouped labels share
/// one value and a label never borrows a `<dd>` from another list.
async fn label_value_pairs<P: PageHandle>(
    page: &P,
    container: &P::Element,
) -> Result<Vec<(String, String)>, BrowserError> {
    let labels = page.locate_within(container, &Locator::css("dt")).await?;

    let mut pairs = Vec::with_capacity(labels.len());
    for label in &labels {
        let text = page.text(label).await?;
        let value = page.sibling_text(label, "dd").await?.unwrap_or_default();
        pairs.push((text, value.trim().to_string()));
    }
    Ok(pairs)
}

/// Value of the first pair whose label (lowercased, whitespace collapsed)
/// contains any of `labels`.
pub fn value_by_label<'a>(pairs: &'a [(String, String)], labels: &[&str]) -> Option<&'a str> {
    let wanted: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    pairs
        .iter()
        .find(|(label, _)| {
            let label = collapse_whitespace(&label.to_lowercase());
            wanted.iter().any(|w| label.contains(w.as_str()))
        })
        .map(|(_, value)| value.as_str())
}

/// Splits `"Home vs Away"` into its two sides. Anything other than exactly
/// two parts yields `None`.
pub fn split_heading(heading: &str) -> Option<(String, String)> {
    if !heading.contains(TEAM_SEPARATOR) {
        return None;
    }
    let parts: Vec<&str> = heading.split(TEAM_SEPARATOR).map(str::trim).collect();
    match parts.as_slice() {
        [home, away] => Some((home.to_string(), away.to_string())),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentOutcome {
    Dismissed { label: String },
    NotFound,
    ClickFailed { reason: String },
}

pub struct PageExtractor {
    settle_delay: Duration,
    consent_patterns: Vec<Regex>,
    stadium: FieldChain,
    match_date: FieldChain,
}

impl PageExtractor {
    pub fn new(settings: &ExtractionSettings) -> Self {
        Self {
            settle_delay: settings.settle_delay(),
            consent_patterns: settings.consent_patterns(),
            stadium: FieldChain::stadium(),
            match_date: FieldChain::match_date(),
        }
    }

    /// Runs the full protocol for one page. Never fails: an error that
    /// escapes the protocol becomes the record's `error`.
    pub async fn extract<P: PageHandle>(&self, page: &P, url: &str) -> ExtractionRecord {
        match self.try_extract(page, url).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Extraction failed for {}: {}", url, e);
                ExtractionRecord::failed(url, e.to_string())
            }
        }
    }

    async fn try_extract<P: PageHandle>(
        &self,
        page: &P,
        url: &str,
    ) -> Result<ExtractionRecord, BrowserError> {
        info!("Scraping {}", url);
        page.navigate(url).await?;

        let consent = self.dismiss_consent(page).await;
        debug!("Consent prompt: {:?}", consent);

        page.wait(self.settle_delay).await;

        let (home, away) = self.extract_teams(page).await;
        let stadium_info = self.stadium.resolve(page).await;
        let match_date = self.match_date.resolve(page).await;

        Ok(ExtractionRecord {
            home,
            away,
            stadium_info,
            match_date,
            url: url.to_string(),
            error: None,
        })
    }

    /// Clicks the first control matching the first consent label that
    /// matches anything. Nothing here can fail the page.
    pub async fn dismiss_consent<P: PageHandle>(&self, page: &P) -> ConsentOutcome {
        for pattern in &self.consent_patterns {
            let locator = Locator::css(CONSENT_CONTROLS).with_text(pattern.clone());
            let control = match page.locate_first(&locator).await {
                Ok(Some(control)) => control,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Consent lookup for {:?} failed: {}", pattern.as_str(), e);
                    continue;
                }
            };
            return match page.click(&control).await {
                Ok(()) => ConsentOutcome::Dismissed {
                    label: pattern.as_str().to_string(),
                },
                Err(e) => ConsentOutcome::ClickFailed {
                    reason: e.to_string(),
                },
            };
        }
        ConsentOutcome::NotFound
    }

    async fn extract_teams<P: PageHandle>(&self, page: &P) -> (String, String) {
        let (mut home, mut away) = (String::new(), String::new());

        match first_text(page, &Locator::css(HEADING)).await {
            Ok(heading) => {
                if let Some((h, a)) = split_heading(&heading) {
                    debug!("teams: matched by heading");
                    home = h;
                    away = a;
                }
            }
            Err(e) => debug!("teams: heading failed: {}", e),
        }

        if home.is_empty() {
            home = self.team_by_test_id(page, HOME_NAME).await;
        }
        if away.is_empty() {
            away = self.team_by_test_id(page, AWAY_NAME).await;
        }
        (home, away)
    }

    async fn team_by_test_id<P: PageHandle>(&self, page: &P, selector: &str) -> String {
        first_text(page, &Locator::css(selector))
            .await
            .unwrap_or_else(|e| {
                debug!("teams: {} failed: {}", selector, e);
                String::new()
            })
    }
}

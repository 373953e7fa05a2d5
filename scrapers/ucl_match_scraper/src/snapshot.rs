//! Page capability backed by saved HTML instead of a live browser.
//!
//! Used by `--html-dir` to re-run extraction over snapshots on disk, and by
//! the tests to drive the extractor without Chrome. Nothing here executes
//! scripts, so clicks are recorded and waits return immediately.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tracing::debug;

use crate::{
    canonical::extract_match_id,
    error::BrowserError,
    page::{BrowserSession, Locator, PageHandle},
};

#[derive(Debug)]
enum Source {
    /// `<dir>/<match_id>.html`
    Dir(PathBuf),
    /// Keyed by the exact URL navigated to.
    Memory(HashMap<String, String>),
    /// The same document for every URL.
    Fixed(String),
}

impl Source {
    async fn load(&self, url: &str) -> Result<String, BrowserError> {
        match self {
            Source::Dir(dir) => {
                let match_id = extract_match_id(url).ok_or_else(|| BrowserError::Navigation {
                    url: url.to_string(),
                    reason: "no match id in URL".to_string(),
                })?;
                let path = dir.join(format!("{}.html", match_id));
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| BrowserError::Navigation {
                        url: url.to_string(),
                        reason: format!("{}: {}", path.display(), e),
                    })
            }
            Source::Memory(pages) => pages.get(url).cloned().ok_or_else(|| BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
            Source::Fixed(html) => Ok(html.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

pub struct SnapshotBrowser {
    source: Arc<Source>,
    counters: Arc<Counters>,
    closed: bool,
}

impl SnapshotBrowser {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Source::Dir(dir.into()))
    }

    /// Pages keyed by URL; any other URL fails to navigate.
    pub fn from_pages<I, K, V>(pages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pages = pages.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::new(Source::Memory(pages))
    }

    fn new(source: Source) -> Self {
        Self {
            source: Arc::new(source),
            counters: Arc::new(Counters::default()),
            closed: false,
        }
    }

    pub fn pages_opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl BrowserSession for SnapshotBrowser {
    type Page = SnapshotPage;

    async fn new_page(&self) -> Result<SnapshotPage, BrowserError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(SnapshotPage {
            source: Arc::clone(&self.source),
            counters: Arc::clone(&self.counters),
            html: Mutex::new(None),
            clicks: Mutex::new(Vec::new()),
        })
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.closed = true;
        Ok(())
    }
}

/// Elements are addressed by their position in document order, which is
/// stable because the same HTML always parses to the same tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotElement(usize);

pub struct SnapshotPage {
    source: Arc<Source>,
    counters: Arc<Counters>,
    html: Mutex<Option<String>>,
    clicks: Mutex<Vec<String>>,
}

impl SnapshotPage {
    /// A page that serves `html` for any URL, already loaded.
    pub fn from_html(html: impl Into<String>) -> Self {
        let html = html.into();
        Self {
            source: Arc::new(Source::Fixed(html.clone())),
            counters: Arc::new(Counters::default()),
            html: Mutex::new(Some(html)),
            clicks: Mutex::new(Vec::new()),
        }
    }

    /// Text of every element clicked so far.
    pub fn clicked(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    fn with_document<T>(
        &self,
        f: impl FnOnce(&Html) -> Result<T, BrowserError>,
    ) -> Result<T, BrowserError> {
        let guard = self.html.lock().unwrap();
        let html = guard.as_deref().ok_or_else(|| BrowserError::Navigation {
            url: "about:blank".to_string(),
            reason: "page has not been navigated".to_string(),
        })?;
        let document = Html::parse_document(html);
        f(&document)
    }
}

fn elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document.root_element().descendants().filter_map(ElementRef::wrap)
}

fn element_at(document: &Html, element: SnapshotElement) -> Result<ElementRef<'_>, BrowserError> {
    elements(document).nth(element.0).ok_or(BrowserError::StaleElement)
}

fn parse_selector(locator: &Locator) -> Result<Selector, BrowserError> {
    Selector::parse(&locator.selector).map_err(|e| BrowserError::Selector {
        selector: locator.selector.clone(),
        reason: e.to_string(),
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn matching<'a>(
    document: &'a Html,
    candidates: impl Iterator<Item = ElementRef<'a>>,
    locator: &Locator,
) -> Vec<SnapshotElement> {
    let positions: HashMap<_, usize> = elements(document)
        .enumerate()
        .map(|(i, el)| (el.id(), i))
        .collect();

    candidates
        .filter(|el| locator.accepts_text(&text_of(*el)))
        .filter_map(|el| positions.get(&el.id()).copied())
        .map(SnapshotElement)
        .collect()
}

#[async_trait]
impl PageHandle for SnapshotPage {
    type Element = SnapshotElement;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let html = self.source.load(url).await?;
        debug!("Loaded snapshot for {} ({} bytes)", url, html.len());
        *self.html.lock().unwrap() = Some(html);
        Ok(())
    }

    async fn locate_all(&self, locator: &Locator) -> Result<Vec<SnapshotElement>, BrowserError> {
        let selector = parse_selector(locator)?;
        self.with_document(|document| Ok(matching(document, document.select(&selector), locator)))
    }

    async fn locate_within(
        &self,
        scope: &SnapshotElement,
        locator: &Locator,
    ) -> Result<Vec<SnapshotElement>, BrowserError> {
        let selector = parse_selector(locator)?;
        self.with_document(|document| {
            let scope = element_at(document, *scope)?;
            Ok(matching(document, scope.select(&selector), locator))
        })
    }

    async fn text(&self, element: &SnapshotElement) -> Result<String, BrowserError> {
        self.with_document(|document| Ok(text_of(element_at(document, *element)?)))
    }

    async fn sibling_text(
        &self,
        element: &SnapshotElement,
        tag: &str,
    ) -> Result<Option<String>, BrowserError> {
        self.with_document(|document| {
            Ok(element_at(document, *element)?
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name().eq_ignore_ascii_case(tag))
                .map(text_of))
        })
    }

    async fn click(&self, element: &SnapshotElement) -> Result<(), BrowserError> {
        let text = self.text(element).await?;
        self.clicks.lock().unwrap().push(text.trim().to_string());
        Ok(())
    }

    async fn wait(&self, duration: Duration) {
        debug!("Skipping {:?} settle wait on static snapshot", duration);
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"<html><body>
        <section id="info"><dl><dt>Datum</dt><dd>1. Okt</dd></dl></section>
        <h1>A vs B</h1>
    </body></html>"#;

    #[tokio::test]
    async fn test_locate_and_read() {
        let page = SnapshotPage::from_html(HTML);
        let h1 = page.locate_first(&Locator::css("h1")).await.unwrap().unwrap();
        assert_eq!(page.text(&h1).await.unwrap(), "A vs B");
    }

    #[tokio::test]
    async fn test_locate_within_scope() {
        let page = SnapshotPage::from_html(HTML);
        let section = page.locate_first(&Locator::css("section")).await.unwrap().unwrap();
        let cells = page.locate_within(&section, &Locator::css("dt, dd")).await.unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(page.text(&cells[0]).await.unwrap(), "Datum");
        assert_eq!(page.text(&cells[1]).await.unwrap(), "1. Okt");
    }

    #[tokio::test]
    async fn test_sibling_text_skips_other_tags() {
        let page = SnapshotPage::from_html(
            r#"<dl><dt>Datum</dt><dt>Anstoß</dt><dd>21:00</dd></dl><dl><dd>other</dd></dl>"#,
        );
        let labels = page.locate_all(&Locator::css("dt")).await.unwrap();
        assert_eq!(page.sibling_text(&labels[0], "dd").await.unwrap().as_deref(), Some("21:00"));
        assert_eq!(page.sibling_text(&labels[1], "dd").await.unwrap().as_deref(), Some("21:00"));
        let dd = page.locate_first(&Locator::css("dd")).await.unwrap().unwrap();
        assert_eq!(page.sibling_text(&dd, "dd").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_text_is_raw_text_content() {
        let page = SnapshotPage::from_html(
            r#"<h1 style="text-transform:uppercase">Bayern vs <span hidden>FC </span>Chelsea</h1>"#,
        );
        let h1 = page.locate_first(&Locator::css("h1")).await.unwrap().unwrap();
        assert_eq!(page.text(&h1).await.unwrap(), "Bayern vs FC Chelsea");
    }

    #[tokio::test]
    async fn test_has_text_filter() {
        let page = SnapshotPage::from_html(HTML);
        let hits = page
            .locate_all(&Locator::css("section, h1").with_text(regex::Regex::new("vs").unwrap()))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_bad_selector_is_an_error() {
        let page = SnapshotPage::from_html(HTML);
        let result = page.locate_all(&Locator::css("[[[")).await;
        assert!(matches!(result, Err(BrowserError::Selector { .. })));
    }

    #[tokio::test]
    async fn test_unknown_url_fails_navigation() {
        let browser = SnapshotBrowser::from_pages([("https://a/", "<p>a</p>")]);
        let page = browser.new_page().await.unwrap();
        assert!(page.navigate("https://a/").await.is_ok());
        assert!(matches!(
            page.navigate("https://b/").await,
            Err(BrowserError::Navigation { .. })
        ));
    }

    #[tokio::test]
    async fn test_dir_source_reads_by_match_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2045913.html"), "<h1>X vs Y</h1>").unwrap();
        let browser = SnapshotBrowser::from_dir(dir.path());
        let page = browser.new_page().await.unwrap();
        page.navigate("https://de.uefa.com/uefachampionsleague/match/2045913/")
            .await
            .unwrap();
        let h1 = page.locate_first(&Locator::css("h1")).await.unwrap().unwrap();
        assert_eq!(page.text(&h1).await.unwrap(), "X vs Y");
        assert!(page
            .navigate("https://de.uefa.com/uefachampionsleague/match/2045914/")
            .await
            .is_err());
    }
}

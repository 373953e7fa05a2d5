//! Page capability backed by a local Chrome/Chromium via the DevTools protocol.

use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    element::Element,
    page::Page,
};
use futures::StreamExt;
use std::{future::Future, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    config::BrowserSettings,
    error::BrowserError,
    page::{BrowserSession, Locator, PageHandle},
};

pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder().arg(format!("--lang={}", settings.locale));
        if !settings.headless {
            builder = builder.with_head();
        }
        if settings.no_sandbox {
            builder = builder.arg("--no-sandbox");
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler must be polled for the connection to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        info!(
            "Launched browser (headless: {}, locale: {})",
            settings.headless, settings.locale
        );
        Ok(Self { browser, handler })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Page = ChromePage;

    async fn new_page(&self) -> Result<ChromePage, BrowserError> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(ChromePage { page })
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        let closed = self.browser.close().await.map(|_| ());
        if let Err(e) = self.browser.wait().await {
            debug!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        info!("Browser closed");
        Ok(closed?)
    }
}

pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    async fn filter_by_text(
        &self,
        elements: Vec<Element>,
        locator: &Locator,
        limit: Option<usize>,
    ) -> Vec<Element> {
        let keep = matching_indices(elements.len(), locator, limit, |i| element_text(&elements[i])).await;
        elements
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep.contains(i))
            .map(|(_, element)| element)
            .collect()
    }
}

/// Indices of the candidates whose text passes the locator's filter, in
/// order, stopping once `limit` have matched. Text is only read while more
/// matches are needed; candidates whose text can't be read are skipped.
async fn matching_indices<F, Fut>(
    count: usize,
    locator: &Locator,
    limit: Option<usize>,
    read_text: F,
) -> Vec<usize>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<String, BrowserError>>,
{
    let limit = limit.unwrap_or(count);
    if locator.has_text.is_none() {
        return (0..count.min(limit)).collect();
    }
    let mut matched = Vec::new();
    for i in 0..count {
        if matched.len() >= limit {
            break;
        }
        match read_text(i).await {
            Ok(text) if locator.accepts_text(&text) => matched.push(i),
            Ok(_) => {}
            Err(e) => debug!("Skipping unreadable {} element: {}", locator.selector, e),
        }
    }
    matched
}

/// Runs `function_declaration` with `this` bound to `element` and returns
/// its result when that is a string.
async fn eval_string(
    element: &Element,
    function_declaration: &str,
) -> Result<Option<String>, BrowserError> {
    let returns = element.call_js_fn(function_declaration, false).await?;
    Ok(returns
        .result
        .value
        .and_then(|v| v.as_str().map(str::to_string)))
}

// textContent, not innerText: unaffected by CSS
async fn element_text(element: &Element) -> Result<String, BrowserError> {
    let text = eval_string(element, "function() { return this.textContent; }").await?;
    Ok(text.unwrap_or_default())
}

#[async_trait]
impl PageHandle for ChromePage {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn locate_all(&self, locator: &Locator) -> Result<Vec<Element>, BrowserError> {
        let elements = self.page.find_elements(locator.selector.as_str()).await?;
        Ok(self.filter_by_text(elements, locator, None).await)
    }

    async fn locate_first(&self, locator: &Locator) -> Result<Option<Element>, BrowserError> {
        let elements = self.page.find_elements(locator.selector.as_str()).await?;
        Ok(self.filter_by_text(elements, locator, Some(1)).await.into_iter().next())
    }

    async fn locate_within(
        &self,
        scope: &Element,
        locator: &Locator,
    ) -> Result<Vec<Element>, BrowserError> {
        let elements = scope.find_elements(locator.selector.as_str()).await?;
        Ok(self.filter_by_text(elements, locator, None).await)
    }

    async fn text(&self, element: &Element) -> Result<String, BrowserError> {
        element_text(element).await
    }

    async fn sibling_text(&self, element: &Element, tag: &str) -> Result<Option<String>, BrowserError> {
        let tag = serde_json::to_string(&tag.to_ascii_lowercase())
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        let function = format!(
            "function() {{ \
                let n = this.nextElementSibling; \
                while (n && n.tagName.toLowerCase() !== {tag}) n = n.nextElementSibling; \
                return n ? n.textContent : null; \
            }}"
        );
        eval_string(element, &function).await
    }

    async fn click(&self, element: &Element) -> Result<(), BrowserError> {
        element.click().await?;
        Ok(())
    }

    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.page.clone().close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BUTTONS: [&str; 4] = ["Einstellungen", "Alle akzeptieren", "Akzeptieren", "Ablehnen"];

    #[tokio::test]
    async fn test_first_match_stops_reading_text() {
        let reads = AtomicUsize::new(0);
        let locator = Locator::css("button").with_text(Regex::new("akzeptieren").unwrap());
        let hits = matching_indices(BUTTONS.len(), &locator, Some(1), |i| {
            reads.fetch_add(1, Ordering::SeqCst);
            let text = BUTTONS[i].to_string();
            async move { Ok(text) }
        })
        .await;

        assert_eq!(hits, vec![1]);
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreadable_candidates_are_skipped() {
        let locator = Locator::css("section, div").with_text(Regex::new("Stadion").unwrap());
        let hits = matching_indices(3, &locator, None, |i| async move {
            match i {
                0 => Err(BrowserError::StaleElement),
                _ => Ok(format!("Stadion {}", i)),
            }
        })
        .await;
        assert_eq!(hits, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_no_text_filter_reads_nothing() {
        let hits = matching_indices(3, &Locator::css("h1"), Some(1), |_| async {
            Err::<String, _>(BrowserError::StaleElement)
        })
        .await;
        assert_eq!(hits, vec![0]);
    }
}

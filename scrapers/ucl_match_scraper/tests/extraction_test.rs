use pretty_assertions::assert_eq;

use ucl_match_scraper::{
    canonical::canonicalize,
    config::{ExtractionSettings, ScraperConfig},
    extract::PageExtractor,
    normalize::normalize_record,
    orchestrator::BatchOrchestrator,
    page::PageHandle,
    snapshot::{SnapshotBrowser, SnapshotPage},
    types::{CanonicalReference, ExtractionRecord},
    writer::write_records,
};

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/match_pages");

fn reference(id: &str) -> CanonicalReference {
    canonicalize(id).unwrap()
}

fn config() -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.browser.snapshot_dir = Some(FIXTURES.into());
    config
}

async fn extract_alone(id: &str) -> ExtractionRecord {
    let mut browser = SnapshotBrowser::from_dir(FIXTURES);
    let records = BatchOrchestrator::new(config())
        .run(&mut browser, &[reference(id)])
        .await
        .unwrap();
    records.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_full_page_with_consent_banner() {
    let html = std::fs::read_to_string(format!("{}/2045913.html", FIXTURES)).unwrap();
    let page = SnapshotPage::from_html(html);
    let extractor = PageExtractor::new(&ExtractionSettings::default());
    let url = reference("2045913").url;

    let record = normalize_record(extractor.extract(&page, &url).await);

    assert_eq!(
        record,
        ExtractionRecord {
            home: "Paris Saint-Germain".into(),
            away: "Inter".into(),
            stadium_info: "Parc des Princes Paris".into(),
            match_date: "Mittwoch, 1. Oktober 2025 , 21:00".into(),
            url,
            error: None,
        }
    );
    assert_eq!(page.clicked(), vec!["Alle akzeptieren"]);
    page.close().await.unwrap();
}

#[tokio::test]
async fn test_fallback_sources() {
    let record = extract_alone("2045914").await;
    assert_eq!(
        record,
        ExtractionRecord {
            home: "FC Bayern München".into(),
            away: "Chelsea FC".into(),
            stadium_info: "Stadion: Allianz Arena, München".into(),
            match_date: "Dienstag, 30. September 2025, 21:00".into(),
            url: "https://de.uefa.com/uefachampionsleague/match/2045914/".into(),
            error: None,
        }
    );
}

#[tokio::test]
async fn test_primary_sources_shadow_later_ones() {
    let record = extract_alone("2045915").await;
    assert_eq!(record.home, "Real Madrid");
    assert_eq!(record.away, "Liverpool");
    assert_eq!(record.stadium_info, "Estadio Santiago Bernabéu");
    assert_eq!(record.match_date, "4. November 2025");
}

#[tokio::test]
async fn test_failed_page_does_not_stop_the_batch() {
    let references = vec![reference("2045913"), reference("2045999"), reference("2045914")];
    let mut browser = SnapshotBrowser::from_dir(FIXTURES);
    let orchestrator = BatchOrchestrator::new(config());

    let records = orchestrator.run(&mut browser, &references).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0], extract_alone("2045913").await);
    assert_eq!(records[2], extract_alone("2045914").await);

    let failed = &records[1];
    assert_eq!(failed.url, "https://de.uefa.com/uefachampionsleague/match/2045999/");
    assert!(failed.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert_eq!(
        (&failed.home[..], &failed.away[..], &failed.stadium_info[..], &failed.match_date[..]),
        ("", "", "", "")
    );

    assert!(browser.is_closed());
    assert_eq!(browser.pages_opened(), 3);
    assert_eq!(browser.pages_closed(), 3);

    let metrics = orchestrator.metrics().get_metrics();
    assert_eq!(metrics.successful_pages, 2);
    assert_eq!(metrics.failed_pages, 1);
}

#[tokio::test]
async fn test_empty_batch_writes_header_only() {
    let mut browser = SnapshotBrowser::from_dir(FIXTURES);
    let records = BatchOrchestrator::new(config())
        .run(&mut browser, &[])
        .await
        .unwrap();

    let mut out = Vec::new();
    write_records(&mut out, &records).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "home;away;stadium_info;match_date;url");
}

#[tokio::test]
async fn test_run_all_uses_snapshot_dir() {
    let records = BatchOrchestrator::new(config())
        .run_all(&[reference("https://www.uefa.com/uefachampionsleague/match/2045915-real-madrid-vs-liverpool/")])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].home, "Real Madrid");
}

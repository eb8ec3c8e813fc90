//! End-to-end passes over scripted in-memory listings

use review_harvest::application::{ReviewScraper, UrlStatus};
use review_harvest::domain::LocatorTemplate;
use review_harvest::infrastructure::config::{AppConfig, ExportFormat};
use review_harvest::infrastructure::memory_session::{InMemoryLauncher, InMemorySession, MemoryNode};
use review_harvest::infrastructure::source_profiles::SourceProfile;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PLAY_URL: &str = "https://play.google.com/store/apps/details?id=com.pix4d.capturepro&hl=de_DE";
const APPLE_URL: &str = "https://apps.apple.com/de/app/snapchat-chatte-mit-freunden/id447188370?see-all=reviews";

fn test_config(output: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.output.directory = output.to_path_buf();
    config.output.formats = vec![ExportFormat::Csv, ExportFormat::Tsv];
    config.extraction.field_timeout_ms = 1;
    config.discovery.probe_timeout_ms = 1;
    config.discovery.settle_delay_ms = 0;
    config.session.inter_url_delay_ms = 0;
    config
}

fn locator(profile: &SourceProfile, index: usize) -> LocatorTemplate {
    profile.fields[index].locator.clone()
}

/// A Google Play page with `count` review cards rendered in lazy batches of 20
fn google_play_page(count: u32) -> InMemorySession {
    let profile = SourceProfile::google_play();
    let button = profile.open_reviews.as_ref().map(|a| a.locator.pattern.clone()).unwrap_or_default();

    InMemorySession::new()
        .with_node(button, MemoryNode::text("Alle Rezensionen ansehen"))
        .with_node(locator(&profile, 0).pattern, MemoryNode::text("Pix4Dcapture"))
        .with_node(locator(&profile, 1).pattern, MemoryNode::text("Smartphone"))
        .with_lazy_family(profile.item_locator.clone(), move |p| (p <= count).then(MemoryNode::default))
        .with_lazy_family(locator(&profile, 2), move |p| {
            (p <= count).then(|| MemoryNode::text(format!("Nutzer {p}")))
        })
        .with_lazy_family(locator(&profile, 4), move |p| {
            (p <= count).then(|| MemoryNode::with_attribute("aria-label", format!("Mit {} von 5 Sternen bewertet", p % 5 + 1)))
        })
        .with_lazy_family(locator(&profile, 6), move |p| {
            // Helpful counts only on even cards
            (p <= count && p % 2 == 0).then(|| MemoryNode::text(format!("{p} Personen fanden diese Rezension hilfreich")))
        })
        .with_lazy_window(20, 20)
}

#[tokio::test]
async fn test_google_play_pass_discovers_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let session = google_play_page(57);
    let scraper = ReviewScraper::new(InMemoryLauncher::new(vec![session.clone()]), test_config(dir.path()));

    let reports = scraper.run(&[PLAY_URL.to_string()], &CancellationToken::new()).await;

    assert_eq!(reports.len(), 1);
    let UrlStatus::Completed { records, skipped, files, interrupted } = &reports[0].status else {
        panic!("expected a completed pass");
    };
    // Positions 4..=57
    assert_eq!(*records, 54);
    assert_eq!(*skipped, 0);
    assert!(!interrupted);
    assert_eq!(
        files,
        &vec![
            dir.path().join("reviews_com.pix4d.capturepro.csv"),
            dir.path().join("reviews_com.pix4d.capturepro.tsv"),
        ]
    );
    assert_eq!(session.clicked().len(), 1);
    assert!(session.is_closed());

    let csv = std::fs::read_to_string(&files[0]).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("appName,platform,reviewerName,rating,date,title,body,helpfulCount")
    );
    // Position 4: rating 4 % 5 + 1 = 5, helpful count present
    assert_eq!(lines.next(), Some("Pix4Dcapture,Smartphone,Nutzer 4,5,,,,4"));
    // Position 5: odd card, helpful count empty
    assert_eq!(lines.next(), Some("Pix4Dcapture,Smartphone,Nutzer 5,1,,,,"));
    assert_eq!(csv.lines().count(), 55);
}

#[tokio::test]
async fn test_session_fault_is_isolated_per_url() {
    let dir = tempfile::tempdir().unwrap();
    let broken = google_play_page(30).with_fault_after(5);
    let apple_profile = SourceProfile::app_store();
    let healthy = InMemorySession::new()
        .with_node(locator(&apple_profile, 0).pattern, MemoryNode::text("Snapchat"))
        .with_family(locator(&apple_profile, 2), |p| Some(MemoryNode::text(format!("Reviewer {p}"))));
    let launcher = InMemoryLauncher::new(vec![broken.clone(), healthy]);
    let scraper = ReviewScraper::new(launcher, test_config(dir.path()));

    let urls = [PLAY_URL.to_string(), APPLE_URL.to_string()];
    let reports = scraper.run(&urls, &CancellationToken::new()).await;

    assert_eq!(reports[0].url, PLAY_URL);
    assert!(matches!(&reports[0].status, UrlStatus::Failed { kind, .. } if kind == "session_fault"));
    assert!(broken.is_closed());

    assert_eq!(reports[1].url, APPLE_URL);
    assert!(matches!(&reports[1].status, UrlStatus::Completed { records: 10, .. }));
    let csv = std::fs::read_to_string(dir.path().join("app_store_reviews_snapchat-chatte-mit-freunden.csv")).unwrap();
    assert!(csv.lines().nth(1).unwrap().starts_with("Snapchat,iOS,Reviewer 1,"));
}

#[tokio::test]
async fn test_empty_listing_exports_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let session = google_play_page(0);
    let scraper = ReviewScraper::new(InMemoryLauncher::new(vec![session.clone()]), test_config(dir.path()));

    let reports = scraper.run(&[PLAY_URL.to_string()], &CancellationToken::new()).await;

    assert!(matches!(&reports[0].status, UrlStatus::Completed { records: 0, skipped: 0, .. }));
    let csv = std::fs::read_to_string(dir.path().join("reviews_com.pix4d.capturepro.csv")).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[tokio::test]
async fn test_launch_failure_and_unsupported_hosts_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = ReviewScraper::new(InMemoryLauncher::new(vec![]), test_config(dir.path()));

    let urls = [PLAY_URL.to_string(), "https://example.org/app/reviews".to_string()];
    let reports = scraper.run(&urls, &CancellationToken::new()).await;

    assert!(matches!(&reports[0].status, UrlStatus::Failed { kind, .. } if kind == "session_fault"));
    assert!(matches!(&reports[1].status, UrlStatus::Failed { kind, .. } if kind == "unsupported_source"));
}

#[tokio::test]
async fn test_concurrent_passes_keep_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.session.max_concurrent_sessions = 3;
    let urls: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|id| format!("https://play.google.com/store/apps/details?id=app.{id}"))
        .collect();
    let sessions = vec![google_play_page(10), google_play_page(25), google_play_page(5)];
    let scraper = ReviewScraper::new(InMemoryLauncher::new(sessions), config);

    let reports = scraper.run(&urls, &CancellationToken::new()).await;

    let counts: Vec<_> = reports
        .iter()
        .map(|r| match &r.status {
            UrlStatus::Completed { records, .. } => *records,
            UrlStatus::Failed { .. } => usize::MAX,
        })
        .collect();
    assert_eq!(counts, vec![7, 22, 2]);
    assert_eq!(reports.iter().map(|r| r.url.clone()).collect::<Vec<_>>(), urls);
}

#[tokio::test]
async fn test_cancelled_run_launches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = InMemoryLauncher::new(vec![google_play_page(10)]);
    let scraper = ReviewScraper::new(launcher.clone(), test_config(dir.path()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let reports = scraper.run(&[PLAY_URL.to_string()], &cancel).await;

    assert!(matches!(&reports[0].status, UrlStatus::Failed { kind, .. } if kind == "cancelled"));
    assert_eq!(launcher.launched(), 0);
}

#[tokio::test]
async fn test_navigation_failure_is_isolated_per_url() {
    let dir = tempfile::tempdir().unwrap();
    let unreachable = google_play_page(10).with_failing_navigation();
    let launcher = InMemoryLauncher::new(vec![unreachable.clone(), google_play_page(10)]);
    let scraper = ReviewScraper::new(launcher, test_config(dir.path()));

    let urls = [
        PLAY_URL.to_string(),
        "https://play.google.com/store/apps/details?id=com.example.other".to_string(),
    ];
    let reports = scraper.run(&urls, &CancellationToken::new()).await;

    assert!(matches!(&reports[0].status, UrlStatus::Failed { kind, message } if kind == "session_fault" && message.contains("navigation")));
    assert_eq!(unreachable.counters().queries(), 0);
    assert!(unreachable.is_closed());
    assert!(!dir.path().join("reviews_com.pix4d.capturepro.csv").exists());

    assert!(matches!(&reports[1].status, UrlStatus::Completed { records: 7, .. }));
    assert!(dir.path().join("reviews_com.example.other.csv").exists());
}

#[tokio::test]
async fn test_cancel_during_discovery_keeps_previous_export() {
    let dir = tempfile::tempdir().unwrap();
    let previous = dir.path().join("reviews_com.pix4d.capturepro.csv");
    std::fs::write(&previous, "appName,platform\nPix4Dcapture,Smartphone\n").unwrap();

    let mut config = test_config(dir.path());
    config.discovery.settle_delay_ms = 200;
    let session = google_play_page(40);
    let scraper = ReviewScraper::new(InMemoryLauncher::new(vec![session.clone()]), config);

    // Cancel while the pass settles after opening the review list
    let cancel = CancellationToken::new();
    let watcher = {
        let session = session.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while session.clicked().is_empty() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            cancel.cancel();
        })
    };

    let reports = scraper.run(&[PLAY_URL.to_string()], &cancel).await;
    watcher.await.unwrap();

    let UrlStatus::Completed { records, files, interrupted, .. } = &reports[0].status else {
        panic!("expected an interrupted pass");
    };
    assert_eq!(*records, 0);
    assert!(interrupted);
    assert!(files.is_empty());
    assert!(session.is_closed());
    assert_eq!(
        std::fs::read_to_string(&previous).unwrap(),
        "appName,platform\nPix4Dcapture,Smartphone\n"
    );
}

//! Collection runs over mocked sources and services.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use harvest::error::FetchResult;
use harvest::testing::{
    MockAsyncDetector, MockFetcher, MockIndexSync, MockObjectStore, MockResponse, MockSource,
    MockSyncDetector,
};
use harvest::{
    ContentKind, DocumentId, ExtractionConfig, ExtractionCoordinator, FetchedDocument, Fetcher,
    Pipeline, PipelineConfig, RecordHeader, RunSummary, SourceItem, SourceKind,
};
use tokio_util::sync::CancellationToken;

const TXT_URL: &str = "https://www.congress.gov/1/bills/hr1/BILLS-1hr1ih.txt";
const HTM_URL: &str = "https://www.congress.gov/1/bills/hr2/BILLS-1hr2ih.htm";
const PDF_URL: &str = "https://www.congress.gov/1/bills/hr2/BILLS-1hr2ih.pdf";
const PAGE_URL: &str = "https://tile.loc.gov/image-services/iiif/service:ndnp:pa/full/0/default.pdf";

fn bill(number: &str) -> SourceItem {
    SourceItem::new(
        DocumentId::bill(1, "hr", number),
        RecordHeader::Bill {
            congress: 1,
            bill_type: "hr".into(),
            number: number.into(),
            title: format!("Bill {}", number),
            introduced: Some("1789-04-01".into()),
            latest_action: None,
            latest_action_date: None,
        },
    )
}

fn newspaper() -> SourceItem {
    SourceItem::new(
        DocumentId::newspaper_page("sn83/1790-01-06/ed-1"),
        RecordHeader::newspaper("sn83/1790-01-06/ed-1", "Pennsylvania Gazette", "1790-01-06"),
    )
    .with_candidate(PAGE_URL, ContentKind::Pdf)
}

fn plain_body() -> String {
    let body = "SECTION 1. Be it enacted by the Senate and House of Representatives.\n".repeat(3);
    format!("\u{feff}  {}", body)
}

fn pdf_body() -> Vec<u8> {
    let mut bytes = b"%PDF-1.3\n".to_vec();
    bytes.resize(8192, b' ');
    bytes
}

struct Setup {
    store: Arc<MockObjectStore>,
    fetcher: Arc<MockFetcher>,
}

fn config() -> PipelineConfig {
    PipelineConfig::new("harvest-data").with_request_interval(Duration::ZERO)
}

fn pipeline(fetcher: MockFetcher, sync: MockSyncDetector) -> (Pipeline, Setup) {
    pipeline_with(fetcher, sync, config())
}

fn pipeline_with(
    fetcher: MockFetcher,
    sync: MockSyncDetector,
    config: PipelineConfig,
) -> (Pipeline, Setup) {
    let fetcher = Arc::new(fetcher);
    let store = Arc::new(MockObjectStore::new());
    let coordinator = ExtractionCoordinator::new(
        fetcher.clone(),
        Arc::new(sync),
        Arc::new(MockAsyncDetector::never_finishes()),
        store.clone(),
        ExtractionConfig::new("harvest-temp"),
    );
    let pipeline = Pipeline::new(Arc::new(coordinator), store.clone(), config);
    (pipeline, Setup { store, fetcher })
}

fn stored_text(store: &MockObjectStore, key: &str) -> String {
    let object = store.object("harvest-data", key).expect("stored record");
    assert_eq!(object.content_type, "text/plain");
    String::from_utf8(object.bytes).unwrap()
}

#[tokio::test]
async fn first_successful_candidate_wins() {
    let fetcher = MockFetcher::new()
        .with_body(TXT_URL, plain_body(), "text/plain")
        .with_response(HTM_URL, MockResponse::Status(503))
        .with_body(PDF_URL, pdf_body(), "application/pdf");
    let (pipeline, setup) = pipeline(fetcher, MockSyncDetector::with_lines(&["SECTION 2."]));
    let items = vec![
        bill("1").with_candidate(TXT_URL, ContentKind::PlainText),
        bill("2")
            .with_candidate(PDF_URL, ContentKind::Pdf)
            .with_candidate(HTM_URL, ContentKind::Markup),
    ];
    let pipeline = pipeline.with_source(Arc::new(MockSource::new(SourceKind::CongressBills, items)));

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.stats(SourceKind::CongressBills).succeeded, 2);
    assert_eq!(
        setup.fetcher.calls(),
        vec![TXT_URL.to_string(), HTM_URL.to_string(), PDF_URL.to_string()]
    );

    let first = stored_text(&setup.store, "extracted/congress_1/hr_1.txt");
    assert!(first.starts_with("# Congress 1 - HR 1\n# Title: Bill 1\n"));
    assert!(first.contains("---\n\nSECTION 1. Be it enacted"));

    let second = stored_text(&setup.store, "extracted/congress_1/hr_2.txt");
    assert!(second.ends_with("---\n\nSECTION 2."));
}

#[tokio::test]
async fn failures_are_counted_and_summary_written() {
    let fetcher = MockFetcher::new().with_body(PAGE_URL, pdf_body(), "application/pdf");
    let (pipeline, setup) = pipeline(fetcher, MockSyncDetector::with_lines(&["GAZETTE"]));
    let index_sync = Arc::new(MockIndexSync::new());
    let pipeline = pipeline
        .with_source(Arc::new(MockSource::new(
            SourceKind::CongressBills,
            vec![bill("3"), bill("4").with_candidate(TXT_URL, ContentKind::PlainText)],
        )))
        .with_source(Arc::new(MockSource::new(SourceKind::Newspapers, vec![newspaper()])))
        .with_index_sync(index_sync.clone());

    let summary = pipeline.run().await.unwrap();

    let bills = summary.stats(SourceKind::CongressBills);
    assert_eq!((bills.total, bills.succeeded, bills.failed), (2, 0, 2));
    assert_eq!(summary.stats(SourceKind::Newspapers).succeeded, 1);
    assert_eq!(summary.errors.len(), 2);
    assert!(summary.errors[0].contains("no text available"));
    assert!(summary.errors[1].contains("fetch_error"));
    assert_eq!(index_sync.call_count(), 1);
    assert_eq!(summary.index_sync.as_ref().unwrap().job_id, "ingestion-1");

    let record = stored_text(
        &setup.store,
        "extracted/newspapers_1790/sn83_1790-01-06_ed-1.txt",
    );
    assert!(record.starts_with("# Chronicling America Newspaper\n# Page ID: sn83/1790-01-06/ed-1\n"));

    let written = setup
        .store
        .object("harvest-data", "collection_summary.json")
        .unwrap();
    assert_eq!(written.content_type, "application/json");
    let parsed: RunSummary = serde_json::from_slice(&written.bytes).unwrap();
    assert_eq!(parsed.total_items, 3);
    assert_eq!(parsed.total_failed, 2);
}

#[tokio::test]
async fn oversized_record_rejected() {
    let fetcher = MockFetcher::new().with_body(TXT_URL, plain_body(), "text/plain");
    let (pipeline, setup) = pipeline_with(
        fetcher,
        MockSyncDetector::with_lines(&[]),
        config().with_max_record_bytes(64),
    );
    let item = bill("5").with_candidate(TXT_URL, ContentKind::PlainText);
    let pipeline = pipeline.with_source(Arc::new(MockSource::new(
        SourceKind::CongressBills,
        vec![item],
    )));

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.total_failed, 1);
    assert!(summary.errors[0].contains("record too large"));
    assert!(setup
        .store
        .object("harvest-data", "extracted/congress_1/hr_5.txt")
        .is_none());
    assert_eq!(setup.fetcher.calls(), vec![TXT_URL.to_string()]);
}

#[tokio::test]
async fn failing_source_does_not_stop_the_run() {
    let (pipeline, _setup) = pipeline(MockFetcher::new(), MockSyncDetector::with_lines(&[]));
    let pipeline = pipeline
        .with_source(Arc::new(MockSource::failing(SourceKind::CongressBills)))
        .with_source(Arc::new(MockSource::new(SourceKind::Newspapers, Vec::new())))
        .with_index_sync(Arc::new(MockIndexSync::failing()));

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.total_items, 0);
    assert_eq!(summary.error_count, 1);
    assert!(summary.index_sync.is_none());
    assert!(!summary.is_clean());
}

#[tokio::test]
async fn listing_errors_and_unavailable_items_reported() {
    let (pipeline, setup) = pipeline(MockFetcher::new(), MockSyncDetector::with_lines(&[]));
    let source = MockSource::new(
        SourceKind::CongressBills,
        vec![bill("6").with_unavailable("text versions unavailable: API error 500")],
    )
    .with_listing_error("Congress 1 s: API error 429");
    let pipeline = pipeline.with_source(Arc::new(source));

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.error_count, 2);
    assert_eq!(summary.errors[0], "mock: Congress 1 s: API error 429");
    assert_eq!(
        summary.errors[1],
        "congress_1_hr_6: text versions unavailable: API error 500"
    );
    assert_eq!(summary.stats(SourceKind::CongressBills).failed, 1);
    assert!(setup.fetcher.calls().is_empty());
}

/// Cancels the run as soon as the first download completes.
struct CancelOnFetch {
    inner: MockFetcher,
    token: CancellationToken,
}

#[async_trait]
impl Fetcher for CancelOnFetch {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedDocument> {
        let result = self.inner.fetch(url).await;
        self.token.cancel();
        result
    }
}

#[tokio::test]
async fn cancellation_stops_the_run_and_still_writes_summary() {
    const OTHER_TXT: &str = "https://www.congress.gov/1/bills/hr8/BILLS-1hr8ih.txt";
    let token = CancellationToken::new();
    let fetcher = Arc::new(CancelOnFetch {
        inner: MockFetcher::new()
            .with_body(TXT_URL, plain_body(), "text/plain")
            .with_body(OTHER_TXT, plain_body(), "text/plain"),
        token: token.clone(),
    });
    let store = Arc::new(MockObjectStore::new());
    let coordinator = ExtractionCoordinator::new(
        fetcher.clone(),
        Arc::new(MockSyncDetector::with_lines(&[])),
        Arc::new(MockAsyncDetector::never_finishes()),
        store.clone(),
        ExtractionConfig::new("harvest-temp"),
    )
    .with_cancellation(token.clone());
    let index_sync = Arc::new(MockIndexSync::new());
    let pipeline = Pipeline::new(Arc::new(coordinator), store.clone(), config())
        .with_cancellation(token)
        .with_source(Arc::new(MockSource::new(
            SourceKind::CongressBills,
            vec![
                bill("7").with_candidate(TXT_URL, ContentKind::PlainText),
                bill("8").with_candidate(OTHER_TXT, ContentKind::PlainText),
            ],
        )))
        .with_source(Arc::new(MockSource::new(SourceKind::Newspapers, vec![newspaper()])))
        .with_index_sync(index_sync.clone());

    let summary = pipeline.run().await.unwrap();

    assert!(summary.cancelled);
    assert!(!summary.is_clean());
    assert_eq!(summary.total_items, 1);
    assert_eq!(summary.total_succeeded, 1);
    assert_eq!(fetcher.inner.calls(), vec![TXT_URL.to_string()]);
    assert_eq!(index_sync.call_count(), 0);

    let written = store.object("harvest-data", "collection_summary.json").unwrap();
    let parsed: RunSummary = serde_json::from_slice(&written.bytes).unwrap();
    assert!(parsed.cancelled);
    assert_eq!(parsed.total_items, 1);
}

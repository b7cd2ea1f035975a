//! End-to-end extraction behavior against mocked services.

use std::sync::Arc;
use std::time::Duration;

use harvest::testing::{
    MockAsyncDetector, MockFetcher, MockObjectStore, MockStoreCall, MockSyncDetector,
};
use harvest::{
    validate, ContentKind, DocumentId, ExtractionConfig, ExtractionCoordinator, ExtractionPath,
    FailureReason, FetchedDocument, JobStatus, PollConfig, SourceDocument, SyncErrorKind,
    ValidatedDocument, ValidationError,
};
use proptest::prelude::*;

const MIB: usize = 1024 * 1024;
const PDF_URL: &str = "https://www.congress.gov/1/bills/hr1/BILLS-1hr1enr.pdf";

fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(len, b' ');
    bytes
}

fn validated_pdf(len: usize) -> ValidatedDocument {
    validate(
        FetchedDocument::new(PDF_URL, pdf_bytes(len)).with_content_type("application/pdf"),
        ContentKind::Pdf,
        &Default::default(),
    )
    .unwrap()
}

fn config() -> ExtractionConfig {
    ExtractionConfig::new("harvest-temp").with_poll(PollConfig::new(
        Duration::from_secs(10),
        Duration::from_secs(300),
    ))
}

struct Harness {
    fetcher: Arc<MockFetcher>,
    sync: Arc<MockSyncDetector>,
    detector: Arc<MockAsyncDetector>,
    store: Arc<MockObjectStore>,
    coordinator: ExtractionCoordinator,
}

impl Harness {
    fn new(fetcher: MockFetcher, sync: MockSyncDetector, detector: MockAsyncDetector) -> Self {
        let fetcher = Arc::new(fetcher);
        let sync = Arc::new(sync);
        let detector = Arc::new(detector);
        let store = Arc::new(MockObjectStore::new());
        let coordinator = ExtractionCoordinator::new(
            fetcher.clone(),
            sync.clone(),
            detector.clone(),
            store.clone(),
            config(),
        );
        Self {
            fetcher,
            sync,
            detector,
            store,
            coordinator,
        }
    }

    fn ocr_only(sync: MockSyncDetector, detector: MockAsyncDetector) -> Self {
        Self::new(MockFetcher::new(), sync, detector)
    }

    fn staged_key(&self) -> String {
        self.store
            .put_keys()
            .into_iter()
            .next()
            .expect("a staged upload")
    }

    fn uploads(&self) -> usize {
        self.store
            .calls()
            .iter()
            .filter(|c| matches!(c, MockStoreCall::Put { .. }))
            .count()
    }
}

fn pdf_document() -> SourceDocument {
    SourceDocument::new(DocumentId::bill(1, "hr", "1"), PDF_URL, ContentKind::Pdf)
}

proptest! {
    #[test]
    fn undersized_payloads_never_reach_storage_or_ocr(payload in proptest::collection::vec(any::<u8>(), 0..100)) {
        let harness = Harness::new(
            MockFetcher::new().with_body(PDF_URL, payload, "application/pdf"),
            MockSyncDetector::with_lines(&["never"]),
            MockAsyncDetector::succeeding(vec![vec!["never"]]),
        );

        let result = tokio_test::block_on(harness.coordinator.process(&pdf_document()));

        prop_assert_eq!(result.failure_reason(), Some(FailureReason::Validation));
        prop_assert!(harness.store.calls().is_empty());
        prop_assert_eq!(harness.sync.call_count(), 0);
        prop_assert!(harness.detector.calls().is_empty());
    }

    #[test]
    fn html_content_type_fails_before_ocr(
        len in 100usize..4096,
        content_type in prop::sample::select(vec![
            "text/html",
            "text/html; charset=utf-8",
            "TEXT/HTML",
            "application/xhtml+xml",
        ]),
    ) {
        // Valid PDF magic does not rescue a mislabeled response.
        let doc = FetchedDocument::new(PDF_URL, pdf_bytes(len)).with_content_type(content_type);
        let err = validate(doc, ContentKind::Pdf, &Default::default()).unwrap_err();
        let is_content_type_error = matches!(err, ValidationError::UnexpectedContentType { .. });
        prop_assert!(is_content_type_error);
    }
}

#[tokio::test]
async fn html_response_fails_through_coordinator() {
    let harness = Harness::new(
        MockFetcher::new().with_body(
            PDF_URL,
            "<!DOCTYPE html><html><body>Page not found</body></html>".repeat(4),
            "text/html; charset=utf-8",
        ),
        MockSyncDetector::with_lines(&["never"]),
        MockAsyncDetector::succeeding(vec![vec!["never"]]),
    );

    let result = harness.coordinator.process(&pdf_document()).await;

    assert_eq!(result.failure_reason(), Some(FailureReason::Validation));
    assert_eq!(harness.fetcher.calls(), vec![PDF_URL.to_string()]);
    assert_eq!(harness.sync.call_count(), 0);
    assert_eq!(harness.uploads(), 0);
}

#[tokio::test]
async fn accepted_sync_documents_never_go_async() {
    let threshold = config().limits.sync_threshold;
    for len in [100, MIB, threshold] {
        let harness = Harness::ocr_only(
            MockSyncDetector::with_lines(&["AN ACT"]),
            MockAsyncDetector::succeeding(vec![vec!["unused"]]),
        );

        let (result, trace) = harness
            .coordinator
            .extract_traced(&DocumentId::new("doc"), &validated_pdf(len))
            .await;

        assert!(result.is_success(), "len {}", len);
        assert!(trace.sync_attempted);
        assert!(!trace.async_attempted);
        assert!(harness.detector.calls().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn documents_above_threshold_skip_sync() {
    let harness = Harness::ocr_only(
        MockSyncDetector::with_lines(&["unused"]),
        MockAsyncDetector::succeeding(vec![vec!["big"]]),
    );
    let len = config().limits.sync_threshold + 1;

    let (result, trace) = harness
        .coordinator
        .extract_traced(&DocumentId::new("doc"), &validated_pdf(len))
        .await;

    assert!(result.is_success());
    assert!(!trace.sync_attempted);
    assert_eq!(harness.sync.call_count(), 0);
    assert_eq!(harness.detector.start_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn staged_key_deleted_once_on_every_terminal_outcome() {
    let detectors = [
        ("success", MockAsyncDetector::succeeding(vec![vec!["ok"]])),
        ("failure", MockAsyncDetector::failing("InvalidS3ObjectException")),
        ("timeout", MockAsyncDetector::never_finishes()),
    ];

    for (label, detector) in detectors {
        let harness = Harness::ocr_only(
            MockSyncDetector::failing(SyncErrorKind::UnsupportedDocument),
            detector,
        );

        harness
            .coordinator
            .extract(&DocumentId::new(label), &validated_pdf(4096))
            .await;

        let staged = harness.staged_key();
        assert_eq!(harness.store.delete_count(&staged), 1, "{}", label);
        assert!(harness.store.keys("harvest-temp").is_empty(), "{}", label);
    }
}

#[tokio::test]
async fn repeated_extraction_is_idempotent() {
    let harness = Harness::ocr_only(
        MockSyncDetector::with_lines(&["CONGRESS OF THE UNITED STATES", "Begun and held"]),
        MockAsyncDetector::never_finishes(),
    );
    let doc = validated_pdf(2048);
    let id = DocumentId::new("doc");

    let first = harness.coordinator.extract(&id, &doc).await;
    let second = harness.coordinator.extract(&id, &doc).await;

    let first = first.text().unwrap();
    let second = second.text().unwrap();
    assert_eq!(first.text(), second.text());
    assert_eq!(first.content_hash(), second.content_hash());
}

#[tokio::test(start_paused = true)]
async fn three_result_pages_assembled_in_order() {
    let harness = Harness::ocr_only(
        MockSyncDetector::with_lines(&["unused"]),
        MockAsyncDetector::succeeding(vec![
            vec!["page one a", "page one b"],
            vec!["page two"],
            vec!["page three"],
        ]),
    );
    let len = config().limits.sync_threshold * 2;

    let result = harness
        .coordinator
        .extract(&DocumentId::new("doc"), &validated_pdf(len))
        .await;

    let text = result.text().unwrap();
    assert_eq!(text.text(), "page one a\npage one b\npage two\npage three");
    assert_eq!(text.pages(), 3);
    assert_eq!(harness.detector.status_polls(), 1);
    assert_eq!(harness.detector.calls().len(), 1 + 1 + 2);
}

#[tokio::test]
async fn scenario_small_pdf_uses_sync_without_upload() {
    let harness = Harness::new(
        MockFetcher::new().with_body(PDF_URL, pdf_bytes(2 * MIB), "application/pdf"),
        MockSyncDetector::with_lines(&["AN ACT", "To establish the Treasury Department."]),
        MockAsyncDetector::succeeding(vec![vec!["unused"]]),
    );

    let (result, trace) = harness.coordinator.process_traced(&pdf_document()).await;

    let text = result.text().unwrap();
    assert_eq!(text.text(), "AN ACT\nTo establish the Treasury Department.");
    assert_eq!(text.path(), ExtractionPath::SyncOcr);
    assert_eq!(text.lines(), 2);
    assert!(!trace.async_attempted);
    assert_eq!(harness.uploads(), 0);
    assert_eq!(harness.sync.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_large_pdf_goes_async_and_polls_three_times() {
    let pages: Vec<String> = (1..=10).map(|n| format!("Page {} text", n)).collect();
    let harness = Harness::new(
        MockFetcher::new().with_body(PDF_URL, pdf_bytes(20 * MIB), "application/pdf"),
        MockSyncDetector::with_lines(&["unused"]),
        MockAsyncDetector::succeeding(pages.iter().map(|p| vec![p.as_str()]).collect())
            .in_progress_for(2),
    );
    let started = tokio::time::Instant::now();

    let (result, trace) = harness.coordinator.process_traced(&pdf_document()).await;

    let text = result.text().unwrap();
    assert_eq!(text.text(), pages.join("\n"));
    assert_eq!(text.pages(), 10);
    assert_eq!(text.path(), ExtractionPath::AsyncOcr);
    assert_eq!(harness.sync.call_count(), 0);
    assert_eq!(harness.detector.status_polls(), 3);
    assert_eq!(trace.polls, 3);
    assert_eq!(trace.async_job_id.as_deref(), Some("job-1"));
    assert_eq!(started.elapsed(), Duration::from_secs(30));

    let staged = harness.staged_key();
    assert!(staged.starts_with("temp-ocr/congress_1_hr_1-"));
    assert!(staged.ends_with(".pdf"));
    assert_eq!(harness.store.delete_count(&staged), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_unsupported_sync_falls_back_to_async() {
    let harness = Harness::new(
        MockFetcher::new().with_body(PDF_URL, pdf_bytes(MIB), "application/pdf"),
        MockSyncDetector::failing(SyncErrorKind::UnsupportedDocument),
        MockAsyncDetector::succeeding(vec![vec!["multi"], vec!["page"]]),
    );

    let (result, trace) = harness.coordinator.process_traced(&pdf_document()).await;

    assert_eq!(result.text().unwrap().text(), "multi\npage");
    assert_eq!(harness.sync.call_count(), 1);
    assert_eq!(trace.fallback, Some(SyncErrorKind::UnsupportedDocument));
    assert_eq!(harness.detector.start_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_unfinished_job_times_out_and_cleans_up() {
    let harness = Harness::new(
        MockFetcher::new().with_body(PDF_URL, pdf_bytes(20 * MIB), "application/pdf"),
        MockSyncDetector::with_lines(&["unused"]),
        MockAsyncDetector::never_finishes(),
    );
    let started = tokio::time::Instant::now();

    let (result, trace) = harness.coordinator.process_traced(&pdf_document()).await;

    assert_eq!(result.failure_reason(), Some(FailureReason::AsyncTimeout));
    assert_eq!(trace.polls, 30);
    assert!(started.elapsed() >= Duration::from_secs(300));
    let staged = harness.staged_key();
    assert_eq!(harness.store.delete_count(&staged), 1);
}

#[tokio::test(start_paused = true)]
async fn throttled_sync_still_falls_back_once() {
    let harness = Harness::ocr_only(
        MockSyncDetector::failing(SyncErrorKind::Throttled),
        MockAsyncDetector::succeeding(vec![vec!["recovered"]]),
    );

    let (result, trace) = harness
        .coordinator
        .extract_traced(&DocumentId::new("doc"), &validated_pdf(4096))
        .await;

    assert!(result.is_success());
    assert_eq!(harness.sync.call_count(), 1);
    assert_eq!(trace.fallback, Some(SyncErrorKind::Throttled));
}

#[tokio::test(start_paused = true)]
async fn partial_success_counts_as_success() {
    let harness = Harness::ocr_only(
        MockSyncDetector::failing(SyncErrorKind::DocumentTooLarge),
        MockAsyncDetector::succeeding(vec![vec!["most of it"]])
            .with_final_status(JobStatus::PartialSuccess),
    );

    let result = harness
        .coordinator
        .extract(&DocumentId::new("doc"), &validated_pdf(4096))
        .await;

    assert_eq!(result.text().unwrap().text(), "most of it");
}

#[tokio::test(start_paused = true)]
async fn async_failure_is_terminal() {
    let harness = Harness::ocr_only(
        MockSyncDetector::failing(SyncErrorKind::InvalidParameter),
        MockAsyncDetector::failing("unable to read document"),
    );

    let result = harness
        .coordinator
        .extract(&DocumentId::new("doc"), &validated_pdf(4096))
        .await;

    let failure = result.failure().unwrap();
    assert_eq!(failure.reason, FailureReason::AsyncFailed);
    assert!(failure.message.contains("unable to read document"));
    assert_eq!(harness.detector.start_count(), 1);
}

#[tokio::test]
async fn empty_sync_text_is_terminal() {
    let harness = Harness::ocr_only(
        MockSyncDetector::with_lines(&[]),
        MockAsyncDetector::succeeding(vec![vec!["unused"]]),
    );

    let result = harness
        .coordinator
        .extract(&DocumentId::new("doc"), &validated_pdf(4096))
        .await;

    assert_eq!(result.failure_reason(), Some(FailureReason::EmptyText));
    assert!(harness.detector.calls().is_empty());
}

//! Testing utilities including mock implementations.
//!
//! Every service boundary has a call-recording mock here, so pipeline and
//! coordinator behavior can be exercised without network access.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::error::{
    AsyncOcrError, FetchError, FetchResult, GenerationError, GraphError, GraphResult,
    IndexSyncError, SourceError, StorageError, StorageResult, SyncDetectError,
};
use crate::locks::{read, write};
use crate::stores::memory::{MemoryObjectStore, StoredObject};
use crate::traits::{
    fetcher::{FetchedDocument, Fetcher},
    generator::{GroundedAnswer, KnowledgeBase, TextGenerator},
    graph::{GraphClient, GraphConnector},
    index::{IndexSync, SyncJob},
    ocr::{
        AsyncTextDetector, JobPage, JobStatus, StorageLocation, SyncErrorKind, SyncTextDetector,
        TextBlock,
    },
    source::{DocumentSource, SourceCollection},
    storage::ObjectStore,
};
use crate::types::{document::SourceItem, record::SourceKind};

/// Canned response for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Body {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
    Status(u16),
    Timeout,
}

/// A mock fetcher serving canned responses by URL.
///
/// Unknown URLs answer HTTP 404.
#[derive(Default)]
pub struct MockFetcher {
    responses: RwLock<HashMap<String, MockResponse>>,
    calls: RwLock<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: impl Into<String>, bytes: impl Into<Vec<u8>>, content_type: &str) -> Self {
        write(&self.responses).insert(
            url.into(),
            MockResponse::Body {
                bytes: bytes.into(),
                content_type: Some(content_type.to_string()),
            },
        );
        self
    }

    pub fn with_response(self, url: impl Into<String>, response: MockResponse) -> Self {
        write(&self.responses).insert(url.into(), response);
        self
    }

    /// URLs fetched, in call order.
    pub fn calls(&self) -> Vec<String> {
        read(&self.calls).clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedDocument> {
        write(&self.calls).push(url.to_string());
        let response = read(&self.responses).get(url).cloned();
        match response {
            Some(MockResponse::Body {
                bytes,
                content_type,
            }) => {
                let doc = FetchedDocument::new(url, bytes);
                Ok(match content_type {
                    Some(ct) => doc.with_content_type(ct),
                    None => doc,
                })
            }
            Some(MockResponse::Status(status)) => Err(FetchError::HttpStatus {
                url: url.to_string(),
                status,
            }),
            Some(MockResponse::Timeout) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
            None => Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Record of a call made to the mock object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStoreCall {
    Put {
        bucket: String,
        key: String,
        len: usize,
        content_type: String,
    },
    Get {
        bucket: String,
        key: String,
    },
    Delete {
        bucket: String,
        key: String,
    },
    List {
        bucket: String,
        prefix: String,
    },
}

/// In-memory object store that records calls and can inject failures.
#[derive(Default)]
pub struct MockObjectStore {
    inner: MemoryObjectStore,
    calls: RwLock<Vec<MockStoreCall>>,
    fail_puts: bool,
    fail_deletes: bool,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `put` fails with a backend error.
    pub fn failing_puts(mut self) -> Self {
        self.fail_puts = true;
        self
    }

    /// Every `delete` fails with a backend error.
    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn calls(&self) -> Vec<MockStoreCall> {
        read(&self.calls).clone()
    }

    /// Keys passed to `put`, in call order.
    pub fn put_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockStoreCall::Put { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    /// How many times `delete` was called for `key`.
    pub fn delete_count(&self, key: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockStoreCall::Delete { key: k, .. } if k == key))
            .count()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.inner.object(bucket, key)
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.inner.keys(bucket)
    }

    fn backend_error(op: &str) -> StorageError {
        StorageError::Backend(format!("injected {} failure", op).into())
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        write(&self.calls).push(MockStoreCall::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            len: bytes.len(),
            content_type: content_type.to_string(),
        });
        if self.fail_puts {
            return Err(Self::backend_error("put"));
        }
        self.inner.put(bucket, key, bytes, content_type).await
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        write(&self.calls).push(MockStoreCall::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.inner.get(bucket, key).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        write(&self.calls).push(MockStoreCall::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        if self.fail_deletes {
            return Err(Self::backend_error("delete"));
        }
        self.inner.delete(bucket, key).await
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        write(&self.calls).push(MockStoreCall::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        });
        self.inner.list(bucket, prefix).await
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock sync detector returning the same answer on every call.
pub struct MockSyncDetector {
    response: Result<Vec<TextBlock>, SyncDetectError>,
    calls: RwLock<usize>,
}

impl MockSyncDetector {
    /// Succeeds with one `LINE` block per entry.
    pub fn with_lines(lines: &[&str]) -> Self {
        let mut blocks = vec![TextBlock::page().on_page(1)];
        blocks.extend(lines.iter().map(|l| TextBlock::line(*l).on_page(1)));
        Self {
            response: Ok(blocks),
            calls: RwLock::new(0),
        }
    }

    pub fn failing(kind: SyncErrorKind) -> Self {
        Self {
            response: Err(SyncDetectError::new(kind, format!("mock {} error", kind))),
            calls: RwLock::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *read(&self.calls)
    }
}

#[async_trait]
impl SyncTextDetector for MockSyncDetector {
    async fn detect_text(&self, _bytes: &[u8]) -> Result<Vec<TextBlock>, SyncDetectError> {
        *write(&self.calls) += 1;
        self.response.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Record of a call made to the mock async detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAsyncCall {
    StartJob {
        source: StorageLocation,
        output: StorageLocation,
    },
    GetJob {
        job_id: String,
        next_token: Option<String>,
    },
}

/// Scripted async detector.
///
/// Status polls (calls without a continuation token) consume the scripted
/// statuses in order; once the script is exhausted every poll reports the
/// final status. On success, results are served as pages linked by
/// `page-N` continuation tokens.
pub struct MockAsyncDetector {
    statuses: RwLock<VecDeque<JobStatus>>,
    final_status: JobStatus,
    failure_message: String,
    result_pages: Vec<Vec<TextBlock>>,
    loop_results: bool,
    fail_start: bool,
    output_store: Option<Arc<dyn ObjectStore>>,
    calls: RwLock<Vec<MockAsyncCall>>,
}

impl MockAsyncDetector {
    /// Succeeds on the first poll with one result page per entry.
    pub fn succeeding(pages: Vec<Vec<&str>>) -> Self {
        let result_pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, lines)| {
                let page = i as u32 + 1;
                let mut blocks = vec![TextBlock::page().on_page(page)];
                blocks.extend(lines.into_iter().map(|l| TextBlock::line(l).on_page(page)));
                blocks
            })
            .collect();
        Self {
            statuses: RwLock::new(VecDeque::new()),
            final_status: JobStatus::Succeeded,
            failure_message: String::new(),
            result_pages,
            loop_results: false,
            fail_start: false,
            output_store: None,
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Reports `IN_PROGRESS` forever.
    pub fn never_finishes() -> Self {
        Self {
            final_status: JobStatus::InProgress,
            ..Self::succeeding(Vec::new())
        }
    }

    /// Reports `FAILED` with `message` once the script is exhausted.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            final_status: JobStatus::Failed,
            failure_message: message.into(),
            ..Self::succeeding(Vec::new())
        }
    }

    /// `start_job` fails with a service error.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Write a result object under the output prefix when a job starts,
    /// as the real service does.
    pub fn writing_output_to(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.output_store = Some(store);
        self
    }

    /// Report `IN_PROGRESS` for the first `polls` status checks.
    pub fn in_progress_for(self, polls: usize) -> Self {
        write(&self.statuses).extend(std::iter::repeat(JobStatus::InProgress).take(polls));
        self
    }

    /// The last result page links back to page 2, so tokens cycle.
    pub fn with_looping_results(mut self) -> Self {
        self.loop_results = true;
        self
    }

    pub fn with_final_status(mut self, status: JobStatus) -> Self {
        self.final_status = status;
        self
    }

    pub fn calls(&self) -> Vec<MockAsyncCall> {
        read(&self.calls).clone()
    }

    pub fn start_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockAsyncCall::StartJob { .. }))
            .count()
    }

    /// Status checks made, i.e. `get_job` calls without a token.
    pub fn status_polls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockAsyncCall::GetJob { next_token: None, .. }))
            .count()
    }

    fn result_page(&self, index: usize, status: JobStatus) -> JobPage {
        let blocks = self.result_pages.get(index).cloned().unwrap_or_default();
        let next_token = if index + 1 < self.result_pages.len() {
            Some(format!("page-{}", index + 2))
        } else if self.loop_results && index > 0 {
            Some("page-2".to_string())
        } else {
            None
        };
        JobPage {
            status,
            blocks,
            next_token,
            status_message: None,
        }
    }
}

#[async_trait]
impl AsyncTextDetector for MockAsyncDetector {
    async fn start_job(
        &self,
        source: &StorageLocation,
        output: &StorageLocation,
    ) -> Result<String, AsyncOcrError> {
        let count = {
            let mut calls = write(&self.calls);
            calls.push(MockAsyncCall::StartJob {
                source: source.clone(),
                output: output.clone(),
            });
            calls
                .iter()
                .filter(|c| matches!(c, MockAsyncCall::StartJob { .. }))
                .count()
        };
        if self.fail_start {
            return Err(AsyncOcrError::Service("mock start failure".to_string()));
        }
        let job_id = format!("job-{}", count);
        if let Some(store) = &self.output_store {
            store
                .put(
                    &output.bucket,
                    &format!("{}{}/1", output.key, job_id),
                    b"{}".to_vec(),
                    "application/json",
                )
                .await?;
        }
        Ok(job_id)
    }

    async fn get_job(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<JobPage, AsyncOcrError> {
        write(&self.calls).push(MockAsyncCall::GetJob {
            job_id: job_id.to_string(),
            next_token: next_token.map(str::to_string),
        });

        if let Some(token) = next_token {
            let index = token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| AsyncOcrError::Service(format!("bad token {}", token)))?;
            return Ok(self.result_page(index, self.final_status));
        }

        let status = write(&self.statuses)
            .pop_front()
            .unwrap_or(self.final_status);
        Ok(match status {
            JobStatus::InProgress => JobPage::in_progress(),
            JobStatus::Failed => JobPage::failed(self.failure_message.clone()),
            JobStatus::Succeeded | JobStatus::PartialSuccess => self.result_page(0, status),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock text generator.
///
/// Queued responses are returned first, then the default response.
pub struct MockGenerator {
    queued: RwLock<VecDeque<Result<String, GenerationError>>>,
    default_response: String,
    prompts: RwLock<Vec<String>>,
}

impl MockGenerator {
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            queued: RwLock::new(VecDeque::new()),
            default_response: default_response.into(),
            prompts: RwLock::new(Vec::new()),
        }
    }

    pub fn then(self, response: Result<String, GenerationError>) -> Self {
        write(&self.queued).push_back(response);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        read(&self.prompts).clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, GenerationError> {
        write(&self.prompts).push(prompt.to_string());
        write(&self.queued)
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_response.clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock knowledge base.
///
/// Queued responses are returned first, then the default answer.
pub struct MockKnowledgeBase {
    queued: RwLock<VecDeque<Result<GroundedAnswer, GenerationError>>>,
    default_answer: GroundedAnswer,
    questions: RwLock<Vec<String>>,
}

impl MockKnowledgeBase {
    pub fn new(default_answer: GroundedAnswer) -> Self {
        Self {
            queued: RwLock::new(VecDeque::new()),
            default_answer,
            questions: RwLock::new(Vec::new()),
        }
    }

    pub fn then(self, response: Result<GroundedAnswer, GenerationError>) -> Self {
        write(&self.queued).push_back(response);
        self
    }

    pub fn call_count(&self) -> usize {
        read(&self.questions).len()
    }
}

#[async_trait]
impl KnowledgeBase for MockKnowledgeBase {
    async fn retrieve_and_generate(
        &self,
        question: &str,
    ) -> Result<GroundedAnswer, GenerationError> {
        write(&self.questions).push(question.to_string());
        write(&self.queued)
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_answer.clone()))
    }
}

#[derive(Default)]
struct MockGraphState {
    queries: Vec<String>,
    connects: usize,
    closes: usize,
    /// (substring, error to raise); first match wins
    failures: Vec<(String, FailureMode)>,
    /// (substring, result to return); first match wins
    results: Vec<(String, Value)>,
}

#[derive(Clone, Copy)]
enum FailureMode {
    Query,
    AlreadyExists,
}

/// A mock graph database recording every submitted query.
#[derive(Clone, Default)]
pub struct MockGraphConnector {
    state: Arc<RwLock<MockGraphState>>,
    fail_connect: bool,
}

impl MockGraphConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Queries containing `pattern` fail.
    pub fn fail_when(self, pattern: impl Into<String>) -> Self {
        write(&self.state)
            .failures
            .push((pattern.into(), FailureMode::Query));
        self
    }

    /// Queries containing `pattern` report an id collision.
    pub fn already_exists_when(self, pattern: impl Into<String>) -> Self {
        write(&self.state)
            .failures
            .push((pattern.into(), FailureMode::AlreadyExists));
        self
    }

    /// Queries containing `pattern` return `result` instead of `[]`.
    pub fn respond_when(self, pattern: impl Into<String>, result: Value) -> Self {
        write(&self.state).results.push((pattern.into(), result));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        read(&self.state).queries.clone()
    }

    pub fn connects(&self) -> usize {
        read(&self.state).connects
    }

    pub fn closes(&self) -> usize {
        read(&self.state).closes
    }
}

struct MockGraphClient {
    state: Arc<RwLock<MockGraphState>>,
}

#[async_trait]
impl GraphConnector for MockGraphConnector {
    async fn connect(&self) -> GraphResult<Box<dyn GraphClient>> {
        if self.fail_connect {
            return Err(GraphError::Connect("mock connect failure".to_string()));
        }
        write(&self.state).connects += 1;
        Ok(Box::new(MockGraphClient {
            state: Arc::clone(&self.state),
        }))
    }
}

#[async_trait]
impl GraphClient for MockGraphClient {
    async fn submit(&mut self, query: &str) -> GraphResult<Value> {
        let mut state = write(&self.state);
        state.queries.push(query.to_string());
        let failure = state
            .failures
            .iter()
            .find(|(pattern, _)| query.contains(pattern.as_str()))
            .map(|(_, mode)| *mode);
        match failure {
            Some(FailureMode::Query) => Err(GraphError::Query(format!("mock failure: {}", query))),
            Some(FailureMode::AlreadyExists) => {
                Err(GraphError::AlreadyExists(format!("mock collision: {}", query)))
            }
            None => Ok(state
                .results
                .iter()
                .find(|(pattern, _)| query.contains(pattern.as_str()))
                .map(|(_, result)| result.clone())
                .unwrap_or_else(|| Value::Array(Vec::new()))),
        }
    }

    async fn close(&mut self) -> GraphResult<()> {
        write(&self.state).closes += 1;
        Ok(())
    }
}

/// A mock index sync trigger.
#[derive(Default)]
pub struct MockIndexSync {
    fail: bool,
    calls: RwLock<usize>,
}

impl MockIndexSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: RwLock::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *read(&self.calls)
    }
}

#[async_trait]
impl IndexSync for MockIndexSync {
    async fn start_sync(&self) -> Result<SyncJob, IndexSyncError> {
        let n = {
            let mut calls = write(&self.calls);
            *calls += 1;
            *calls
        };
        if self.fail {
            return Err(IndexSyncError("mock sync failure".to_string()));
        }
        Ok(SyncJob {
            job_id: format!("ingestion-{}", n),
            status: "STARTING".to_string(),
        })
    }
}

/// A source serving a fixed list of items.
pub struct MockSource {
    kind: SourceKind,
    items: Vec<SourceItem>,
    errors: Vec<String>,
    fail: bool,
}

impl MockSource {
    pub fn new(kind: SourceKind, items: Vec<SourceItem>) -> Self {
        Self {
            kind,
            items,
            errors: Vec::new(),
            fail: false,
        }
    }

    pub fn failing(kind: SourceKind) -> Self {
        Self {
            fail: true,
            ..Self::new(kind, Vec::new())
        }
    }

    /// Report a partial listing failure alongside the items.
    pub fn with_listing_error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }
}

#[async_trait]
impl DocumentSource for MockSource {
    async fn collect(&self) -> Result<SourceCollection, SourceError> {
        if self.fail {
            return Err(SourceError::NoText("mock source failure".to_string()));
        }
        Ok(SourceCollection {
            items: self.items.clone(),
            errors: self.errors.clone(),
        })
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn name(&self) -> &str {
        "mock"
    }
}

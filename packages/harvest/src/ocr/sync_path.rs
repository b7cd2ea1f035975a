//! Single-call OCR for small documents.

use tracing::{debug, info, warn};

use crate::error::SyncDetectError;
use crate::fetchers::ValidatedDocument;
use crate::traits::ocr::{BlockType, SyncTextDetector, TextBlock};
use crate::types::document::DocumentId;

/// Result of the sync attempt, as the coordinator sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Line text and page count. The text may be empty.
    Detected { text: String, pages: usize },
    /// The call failed; the document goes to the async path
    Fallback(SyncDetectError),
}

/// Join `LINE` block text with newlines, in block order, and count pages.
///
/// Page count is the larger of the number of `PAGE` blocks and the highest
/// page number any block reports.
pub fn assemble_lines(blocks: &[TextBlock]) -> (String, usize) {
    let mut lines = Vec::new();
    let mut page_blocks = 0usize;
    let mut max_page = 0usize;

    for block in blocks {
        if let Some(page) = block.page {
            max_page = max_page.max(page as usize);
        }
        match block.block_type {
            BlockType::Page => page_blocks += 1,
            BlockType::Line => {
                if let Some(text) = block.text.as_deref() {
                    lines.push(text);
                }
            }
            BlockType::Word | BlockType::Other => {}
        }
    }

    (lines.join("\n"), page_blocks.max(max_page))
}

pub(crate) async fn run_sync(
    detector: &dyn SyncTextDetector,
    document_id: &DocumentId,
    doc: &ValidatedDocument,
) -> SyncOutcome {
    debug!(
        document_id = %document_id,
        bytes = doc.len(),
        detector = detector.name(),
        "Attempting sync OCR"
    );

    match detector.detect_text(doc.bytes()).await {
        Ok(blocks) => {
            let (text, pages) = assemble_lines(&blocks);
            debug!(
                document_id = %document_id,
                blocks = blocks.len(),
                pages,
                "Sync OCR complete"
            );
            SyncOutcome::Detected { text, pages }
        }
        Err(e) => {
            if e.kind.is_expected_fallback() {
                info!(
                    document_id = %document_id,
                    kind = %e.kind,
                    "Sync OCR declined document, falling back to async"
                );
            } else {
                warn!(
                    document_id = %document_id,
                    kind = %e.kind,
                    error = %e.message,
                    "Sync OCR failed, falling back to async"
                );
            }
            SyncOutcome::Fallback(e)
        }
    }
}

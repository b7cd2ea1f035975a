//! Service boundaries of the harvest pipeline.
//!
//! Each external collaborator (HTTP, object storage, OCR, generative models,
//! retrieval, graph database, upstream source APIs) sits behind one of these
//! traits so the coordinator and pipeline can run against mocks.

pub mod fetcher;
pub mod generator;
pub mod graph;
pub mod index;
pub mod ocr;
pub mod source;
pub mod storage;

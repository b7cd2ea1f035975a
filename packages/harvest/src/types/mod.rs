//! Data types shared across the harvest pipeline.

pub mod config;
pub mod document;
pub mod record;
pub mod result;

pub mod backlog;
pub mod config;
pub mod converter;
pub mod document;
pub mod enrichment;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod ledger;
pub mod llm;
pub mod logging;
pub mod pipeline;

// Library interface for ainews modules
// This allows tests and the binary to import modules

pub mod collectors;
pub mod dedup;
pub mod digest;
pub mod enrichment;
pub mod ingestion;
pub mod item;
pub mod llm;
pub mod pipeline;
pub mod ranking;
pub mod relevance;
pub mod retry;

pub use item::NewsItem;

//! Survey analysis: ingestion, flattening and derived views.

pub mod aggregator;
pub mod ingest;

pub use aggregator::*;
pub use ingest::*;

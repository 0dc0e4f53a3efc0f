//! Destination domain: the shared data types, the per-provider HTTP
//! clients, and the parallel aggregator that joins them.

pub mod api_types;
pub mod clients;
pub mod fetcher;
pub mod types;

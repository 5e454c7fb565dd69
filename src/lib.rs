//! Two-tier odds cache: merges streamed odds updates and bet stops into
//! per-fixture market snapshots and serves read projections over them.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod recovery;
pub mod store;
pub mod types;

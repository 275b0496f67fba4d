//! services/api/src/lib.rs
//!
//! Library half of the `api` service: the PostgreSQL adapter, configuration,
//! error mapping and the axum web layer. The binaries in `src/bin` wire these
//! together.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;

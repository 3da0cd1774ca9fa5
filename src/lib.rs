//! PDF job tracker
//!
//! Tracks PDF accessibility processing jobs from upload to completion. The
//! library holds the job store, metrics store, job status proxy and upload
//! ingress HTTP surfaces, plus the clients and queue plumbing that connect
//! them. Each binary under `src/bin` (and `src/main.rs`) serves one of them.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
pub mod telemetry;

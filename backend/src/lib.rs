//! Template upload, client preview materialization and deployment service.
//!
//! `pipeline` holds the file-level work (extract, classify, customize,
//! materialize); `services` exposes it over HTTP with records kept in `store`.

pub mod config;
pub mod deploy;
pub mod error;
pub mod job_controller;
pub mod pipeline;
pub mod services;
pub mod store;

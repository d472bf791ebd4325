//! services/api/src/lib.rs
//!
//! The QuickScan backend: receipt extraction and scan history over HTTP.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;

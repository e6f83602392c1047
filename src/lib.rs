//! PAPERWATCH: Autonomous paper-trading watchlist monitor
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod data;
pub mod llm;
pub mod notify;
pub mod strategy;
pub mod engine;

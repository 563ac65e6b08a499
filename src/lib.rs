//! TRADENET: confidence-boosted, plan-gated signal execution
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod booster;
pub mod broker;
pub mod config;
pub mod engine;
pub mod memory;
pub mod notify;
pub mod signals;
pub mod storage;
pub mod types;

//! Context Integration Tests
//!
//! End-to-end behavior through the public facade: CRUD and bulk contracts,
//! relationships, both query forms, aggregation, configuration files and
//! concurrent access.

#[path = "../common/mod.rs"]
mod common;

mod aggregation;
mod concurrency;
mod config;
mod crud;
mod properties;
mod queries;
mod relationships;
mod serialization;

// ABOUTME: Library root for runway - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod provider;
pub mod reconcile;
pub mod state;
pub mod steps;
pub mod types;

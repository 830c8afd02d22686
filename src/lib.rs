// ABOUTME: Library root for bondi - exposes public types for testing.
// ABOUTME: The CLI is in main.rs, the host agent in bin/bondi-agent.rs.

pub mod agent;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod provision;
pub mod runtime;
pub mod ssh;
pub mod types;

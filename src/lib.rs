// ABOUTME: Library root for sectionctl - exposes the deploy pipeline for testing.
// ABOUTME: The main binary is in main.rs.

pub mod cancel;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod http;
pub mod output;
pub mod package;
pub mod platform;
pub mod repo;
pub mod types;
pub mod upload;

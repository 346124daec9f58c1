//! Core library for the `vidstress` CLI.
//!
//! This crate provides the building blocks used by the binary: CLI argument
//! types, configuration loading, the API workflow client, test-user
//! provisioning, the per-iteration workflow, the virtual-user scheduler, and
//! metric thresholds. The primary user-facing interface is the `vidstress`
//! command-line application; library APIs may evolve as the CLI grows.
mod app;
pub mod args;
pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod fixtures;
pub mod logger;
pub mod metrics;
pub mod scheduler;
pub mod shutdown;
pub mod shutdown_handlers;
pub mod workflow;

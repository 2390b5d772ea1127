//! Omniforge - Declarative multi-component build orchestrator
//!
//! This library provides the core functionality for assembling a
//! versioned installation tree from declarative component recipes:
//! resolving versions and overrides, fetching sources, applying
//! patches, and running ordered build steps in dependency order.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Business logic, driven through runner and fetcher seams
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration constants and defaults
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;

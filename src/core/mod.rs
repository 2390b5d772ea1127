//! Core business logic module
//!
//! This module contains all business logic for omniforge. I/O happens
//! behind the seams in [`crate::infra`]; everything here is drivable in
//! tests with stub runners and fetchers.
//!
//! # Submodules
//!
//! - [`platform`] - Build platform detection and guards
//! - [`component`] - Component descriptor parsing and validation
//! - [`project`] - Project descriptor (omniforge.toml) loading
//! - [`overrides`] - Ordered override table with last-write-wins
//! - [`graph`] - Dependency graph and topological build order
//! - [`context`] - Variable context, interpolation, and secrets
//! - [`version`] - Build version derivation modes
//! - [`fetch`] - Source resolution and the fetch seam
//! - [`executor`] - Per-component fetch-and-step pipeline
//! - [`assembler`] - Whole-run driver and report aggregation
//! - [`report`] - Build results, report, and version manifest

pub mod assembler;
pub mod component;
pub mod context;
pub mod executor;
pub mod fetch;
pub mod graph;
pub mod overrides;
pub mod platform;
pub mod project;
pub mod report;
pub mod version;

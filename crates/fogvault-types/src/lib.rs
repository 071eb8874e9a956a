//! # fogvault-types
//!
//! Core type definitions for the fogvault plugin manager.
//!
//! This crate is the foundation of the dependency graph -- the services
//! and CLI crates depend on it. It contains:
//!
//! - **[`error`]** -- [`FogvaultError`] for configuration and parse failures
//! - **[`config`]** -- Configuration schema, discovery and loading
//! - **[`plugin`]** -- Plugin types, archive formats and content kinds
//! - **[`snapshot`]** -- Snapshot file naming and listing entries

pub mod config;
pub mod error;
pub mod plugin;
pub mod snapshot;

pub use error::{FogvaultError, Result};

//! Segment Enrich Core - Shared types library.
//!
//! This crate provides the domain types shared by the enrichment components:
//! - `segment-enrich` - Segment fetch, per-profile enrichment and exporters
//! - `segment-enrich-cli` - Command-line entry points
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. The
//! serialized forms defined here are the on-disk formats of the profile
//! snapshot and the enriched log, so changes must stay backward compatible
//! with logs written by earlier runs.
//!
//! # Modules
//!
//! - [`types`] - Normalized emails, string IDs, profiles, orders and records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

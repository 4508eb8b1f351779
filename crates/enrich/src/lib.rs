//! Segment enrichment library.
//!
//! Joins the members of a Klaviyo segment with each member's most recent
//! Shopify order, then exports the result as CSV and a pie chart.
//!
//! # Security
//!
//! This crate holds two read-scoped API credentials:
//! - Klaviyo private API key (segment and profile reads)
//! - Shopify Admin API access token (customer and order reads)
//!
//! Both are kept in [`secrecy::SecretString`] and never logged.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod retry;
pub mod services;
pub mod shopify;

pub use config::EnrichConfig;
pub use error::PipelineError;

//! Core types for segment enrichment.
//!
//! This module provides type-safe wrappers for the domain concepts that flow
//! through the pipeline.

pub mod email;
pub mod id;
pub mod order;
pub mod profile;
pub mod record;

pub use email::{Email, EmailError};
pub use id::*;
pub use order::{NOT_AVAILABLE, OrderSummary};
pub use profile::Profile;
pub use record::EnrichedRecord;

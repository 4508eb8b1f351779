//! Pipeline stage commands.

pub mod enrich;
pub mod export;
pub mod fetch;

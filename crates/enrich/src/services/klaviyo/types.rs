//! Klaviyo API types.
//!
//! These types follow Klaviyo's JSON:API format with `data`, `attributes`, etc.
//! Only the fields the enrichment pipeline reads are modeled.

use serde::Deserialize;

/// Wrapper for JSON:API response with a single resource.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Wrapper for JSON:API response with multiple resources.
///
/// `data` is required: a page without it is treated as malformed.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub links: Option<PaginationLinks>,
}

/// Pagination links in JSON:API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationLinks {
    #[serde(default)]
    pub next: Option<String>,
}

/// Segment resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    pub attributes: SegmentAttributes,
}

/// Segment attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentAttributes {
    pub name: String,
}

/// Profile resource as returned by the segment profiles endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResource {
    pub id: String,
    #[serde(default)]
    pub attributes: ProfileAttributes,
}

/// Profile attributes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileAttributes {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

//! Segment member profile.

use serde::{Deserialize, Serialize};

use super::{Email, ProfileId};

/// A marketing profile fetched from a segment.
///
/// Profiles are created once during the segment fetch and never mutated.
/// The email is already normalized, which makes it the unique key across
/// pages and across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Normalized email address (unique key).
    pub email: Email,
    /// Marketing platform profile ID.
    pub profile_id: ProfileId,
    /// First name as known to the marketing platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name as known to the marketing platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl Profile {
    /// Create a profile with only the required fields.
    #[must_use]
    pub const fn new(email: Email, profile_id: ProfileId) -> Self {
        Self {
            email,
            profile_id,
            first_name: None,
            last_name: None,
        }
    }
}

//! Segment operations for Klaviyo API.

use segment_enrich_core::{Email, Profile, ProfileId};
use tracing::{debug, instrument};

use super::{ApiListResponse, ApiResponse, KlaviyoClient, KlaviyoError, ProfileResource, Segment};

/// Query parameter carrying the opaque pagination cursor.
const CURSOR_PARAM: &str = "page[cursor]";

/// Largest page size accepted by the segment profiles endpoint.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page of segment members.
#[derive(Debug, Clone, Default)]
pub struct ProfilePage {
    /// Profiles with a usable email, in API order (may contain duplicates).
    pub profiles: Vec<Profile>,
    /// Number of resources in the raw page, including ones without an email.
    pub raw_count: usize,
    /// Cursor for the next page; `None` when this is the last page.
    pub next_cursor: Option<String>,
}

impl KlaviyoClient {
    /// Get a segment's metadata.
    ///
    /// # Errors
    ///
    /// Returns error if the segment is not found or API request fails.
    #[instrument(skip(self))]
    pub async fn get_segment(&self, segment_id: &str) -> Result<Segment, KlaviyoError> {
        let url = self.endpoint(&format!("/segments/{segment_id}/"))?;
        let response: ApiResponse<Segment> = self.get(url).await?;
        Ok(response.data)
    }

    /// Fetch one page of profiles belonging to a segment.
    ///
    /// Profiles without an email (or with an unusable one) are dropped here,
    /// since the email is the join key for the commerce lookup.
    ///
    /// # Arguments
    ///
    /// * `segment_id` - Segment to list
    /// * `cursor` - Cursor returned by the previous page, `None` for the first
    /// * `page_size` - Profiles per page (clamped to 1..=100)
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the payload is malformed.
    #[instrument(skip(self, cursor), fields(has_cursor = cursor.is_some()))]
    pub async fn segment_profiles_page(
        &self,
        segment_id: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<ProfilePage, KlaviyoError> {
        let mut url = self.endpoint(&format!("/segments/{segment_id}/profiles/"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("fields[profile]", "email,first_name,last_name");
            query.append_pair("page[size]", &page_size.clamp(1, MAX_PAGE_SIZE).to_string());
            if let Some(cursor) = cursor {
                query.append_pair(CURSOR_PARAM, cursor);
            }
        }

        let response: ApiListResponse<ProfileResource> = self.get(url).await?;
        let raw_count = response.data.len();

        let profiles = response
            .data
            .into_iter()
            .filter_map(profile_from_resource)
            .collect();

        let next_cursor = response
            .links
            .and_then(|links| links.next)
            .and_then(|next| cursor_from_next_link(&next));

        Ok(ProfilePage {
            profiles,
            raw_count,
            next_cursor,
        })
    }
}

/// Convert a profile resource into a domain profile, if it has a valid email.
fn profile_from_resource(resource: ProfileResource) -> Option<Profile> {
    let raw_email = resource.attributes.email?;
    match Email::parse(&raw_email) {
        Ok(email) => Some(Profile {
            email,
            profile_id: ProfileId::new(resource.id),
            first_name: resource.attributes.first_name,
            last_name: resource.attributes.last_name,
        }),
        Err(e) => {
            debug!(profile_id = %resource.id, error = %e, "Skipping profile with invalid email");
            None
        }
    }
}

/// Extract the `page[cursor]` value from a `links.next` URL.
pub fn cursor_from_next_link(next: &str) -> Option<String> {
    let url = url::Url::parse(next).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == CURSOR_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

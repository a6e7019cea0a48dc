//! Named MakerPass endpoints, each bound to one method and path.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::{ApiClient, Connections, GroupAccess, UpstreamError};

// Everything but unreserved characters, '.' included so ids never form dot segments.
const SEGMENT_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'~');

impl ApiClient {
    /// `GET /me`
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn me(&self, token: &str) -> Result<Value, UpstreamError> {
        self.get("/me", token).await
    }

    /// `GET /me/groups`
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn me_groups(&self, token: &str) -> Result<Value, UpstreamError> {
        self.get("/me/groups", token).await
    }

    /// `GET /me/schools`
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn me_schools(&self, token: &str) -> Result<Value, UpstreamError> {
        self.get("/me/schools", token).await
    }

    /// `GET /me/admin-status`
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn me_admin_status(&self, token: &str) -> Result<Value, UpstreamError> {
        self.get("/me/admin-status", token).await
    }

    /// `GET /me/groups/{id}/access`
    /// # Errors
    /// See [`ApiClient::request`]; a body that is not a group access record is a decode error.
    pub async fn me_group_access(
        &self,
        group_id: &str,
        token: &str,
    ) -> Result<GroupAccess, UpstreamError> {
        let path = format!("/me/groups/{}/access", path_segment(group_id)?);
        self.get_typed(&path, token).await
    }

    /// `GET /users/{id}`
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn user(&self, user_id: &str, token: &str) -> Result<Value, UpstreamError> {
        self.get(&format!("/users/{}", path_segment(user_id)?), token)
            .await
    }

    /// `GET /users/{id}/groups`
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn user_groups(&self, user_id: &str, token: &str) -> Result<Value, UpstreamError> {
        self.get(&format!("/users/{}/groups", path_segment(user_id)?), token)
            .await
    }

    /// `GET /users/{id}/connections`
    /// # Errors
    /// See [`ApiClient::request`]; a body that is not a connections record is a decode error.
    pub async fn user_connections(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<Connections, UpstreamError> {
        let path = format!("/users/{}/connections", path_segment(user_id)?);
        self.get_typed(&path, token).await
    }

    /// `GET /groups/{id}`
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn group(&self, group_id: &str, token: &str) -> Result<Value, UpstreamError> {
        self.get(&format!("/groups/{}", path_segment(group_id)?), token)
            .await
    }

    /// `GET /groups/{id}/memberships`
    /// # Errors
    /// See [`ApiClient::request`].
    pub async fn group_memberships(
        &self,
        group_id: &str,
        token: &str,
    ) -> Result<Value, UpstreamError> {
        let path = format!("/groups/{}/memberships", path_segment(group_id)?);
        self.get(&path, token).await
    }

    /// # Errors
    /// See [`ApiClient::request`].
    #[deprecated(note = "use `ApiClient::group_memberships`")]
    pub async fn memberships(&self, group_id: &str, token: &str) -> Result<Value, UpstreamError> {
        warn!("`memberships` is deprecated, use `group_memberships` instead");
        self.group_memberships(group_id, token).await
    }

    async fn get_typed<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T, UpstreamError> {
        let body = self.get(path, token).await?;

        serde_json::from_value(body).map_err(|source| UpstreamError::Decode {
            url: self.endpoint_url(path),
            source,
        })
    }
}

/// Percent-encode an identifier so it always lands in a single path segment.
///
/// Empty ids and dot segments are rejected: the URL parser would otherwise
/// resolve `.`/`..` (encoded or not) against the path before the request is sent.
pub(crate) fn path_segment(id: &str) -> Result<String, UpstreamError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(UpstreamError::InvalidId { id: id.to_string() });
    }
    Ok(utf8_percent_encode(id, SEGMENT_SET).to_string())
}

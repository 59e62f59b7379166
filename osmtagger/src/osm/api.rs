//! Typed client for the OSM API 0.6 calls the editor needs.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use super::change::{changeset_create_body, OsmChange};
use super::error::{OsmError, AREA_TOO_LARGE_STATUSES};
use super::http::{HttpRequest, HttpResponse, OsmTransport};
use super::model::RawFeature;
use super::xml::parse_osm_xml;
use crate::coord::BoundingBox;

/// Production API server.
pub const PRODUCTION_API_URL: &str = "https://api.openstreetmap.org";
/// Production OAuth server.
pub const PRODUCTION_AUTH_URL: &str = "https://www.openstreetmap.org";
/// Development server, used for both API and OAuth.
pub const DEVELOPMENT_URL: &str = "https://master.apis.dev.openstreetmap.org";

/// Server endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub api_url: String,
    pub auth_url: String,
}

impl ServerConfig {
    pub fn production() -> Self {
        Self {
            api_url: PRODUCTION_API_URL.to_string(),
            auth_url: PRODUCTION_AUTH_URL.to_string(),
        }
    }

    pub fn development() -> Self {
        Self {
            api_url: DEVELOPMENT_URL.to_string(),
            auth_url: DEVELOPMENT_URL.to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::production()
    }
}

/// The logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserDetails {
    pub id: u64,
    pub display_name: String,
}

#[derive(Deserialize)]
struct UserDetailsEnvelope {
    user: UserDetails,
}

/// OSM API client over a transport.
pub struct OsmApi<T> {
    transport: Arc<T>,
    api_url: String,
}

impl<T> Clone for OsmApi<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            api_url: self.api_url.clone(),
        }
    }
}

impl<T: OsmTransport> OsmApi<T> {
    pub fn new(transport: Arc<T>, api_url: impl Into<String>) -> Self {
        Self {
            transport,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/0.6/{}", self.api_url, path)
    }

    /// Downloads every feature in `bbox`.
    ///
    /// HTTP 400 and 509 mean the box holds too much data and map to
    /// [`OsmError::AreaTooLarge`].
    pub async fn download_area(&self, bbox: &BoundingBox) -> Result<Vec<RawFeature>, OsmError> {
        let url = self.endpoint(&format!("map?bbox={}", bbox.to_query()));
        debug!(url = %url, "Downloading area");
        let response = self.transport.send(HttpRequest::get(url)).await?;

        if AREA_TOO_LARGE_STATUSES.contains(&response.status) {
            return Err(OsmError::AreaTooLarge {
                status: response.status,
                message: response.body,
            });
        }
        let body = expect_success(response)?;
        let features = parse_osm_xml(&body)?;
        debug!(count = features.len(), "Area downloaded");
        Ok(features)
    }

    /// Opens a changeset and returns its id.
    pub async fn open_changeset(
        &self,
        token: &str,
        comment: &str,
        created_by: &str,
    ) -> Result<u64, OsmError> {
        let body = changeset_create_body(comment, created_by)?;
        let request = HttpRequest::put(self.endpoint("changeset/create"))
            .bearer(token)
            .xml(body);
        let response = expect_success(self.transport.send(request).await?)?;

        let id = response.trim().parse::<u64>().map_err(|_| {
            OsmError::Decode(format!("changeset id is not a number: '{}'", response.trim()))
        })?;
        info!(changeset = id, "Opened changeset");
        Ok(id)
    }

    /// Uploads a stamped change document; returns the server's diff result.
    pub async fn upload(
        &self,
        token: &str,
        changeset_id: u64,
        change: &OsmChange,
    ) -> Result<String, OsmError> {
        let request = HttpRequest::post(self.endpoint(&format!("changeset/{}/upload", changeset_id)))
            .bearer(token)
            .xml(change.to_xml()?);
        let diff = expect_success(self.transport.send(request).await?)?;
        info!(changeset = changeset_id, "Uploaded changes");
        Ok(diff)
    }

    /// Closes a changeset.
    pub async fn close_changeset(&self, token: &str, changeset_id: u64) -> Result<(), OsmError> {
        let request =
            HttpRequest::put(self.endpoint(&format!("changeset/{}/close", changeset_id))).bearer(token);
        expect_success(self.transport.send(request).await?)?;
        debug!(changeset = changeset_id, "Closed changeset");
        Ok(())
    }

    /// Fetches the account the token belongs to.
    pub async fn user_details(&self, token: &str) -> Result<UserDetails, OsmError> {
        let request = HttpRequest::get(self.endpoint("user/details.json")).bearer(token);
        let body = expect_success(self.transport.send(request).await?)?;
        let envelope: UserDetailsEnvelope = serde_json::from_str(&body)
            .map_err(|e| OsmError::Decode(format!("invalid user details: {}", e)))?;
        Ok(envelope.user)
    }
}

fn expect_success(response: HttpResponse) -> Result<String, OsmError> {
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(OsmError::from_status(response.status, response.body))
    }
}

//! OpenStreetMap API access.
//!
//! This module covers the wire side of the editor:
//!
//! - features as the API returns them ([`RawFeature`])
//! - XML decoding of `/map` responses ([`parse_osm_xml`])
//! - `osmChange` documents built from staged edits ([`OsmChange`])
//! - an HTTP transport trait with a reqwest implementation ([`OsmTransport`])
//! - the typed API client ([`OsmApi`]) and OAuth2 login ([`Authenticator`])

mod api;
mod auth;
mod change;
mod error;
mod http;
mod model;
mod xml;

pub use api::{
    OsmApi, ServerConfig, UserDetails, DEVELOPMENT_URL, PRODUCTION_API_URL, PRODUCTION_AUTH_URL,
};
pub use auth::{
    extract_code, AuthError, Authenticator, FileTokenStore, LoginPrompt, MemoryTokenStore,
    OAuthConfig, TokenResponse, TokenStore, DEFAULT_REDIRECT_URI, SCOPES, TOKEN_FILE,
};
pub use change::{changeset_create_body, ChangeBucket, OsmChange, SkipReason, SkippedEntry, GENERATOR};
pub use error::{OsmError, AREA_TOO_LARGE_STATUSES};
pub use http::{
    HttpRequest, HttpResponse, Method, OsmTransport, ReqwestTransport, RequestBody,
    DEFAULT_TIMEOUT_SECS,
};
pub use model::{Member, ObjectType, RawFeature, RawNode, RawRelation, RawWay};
pub use xml::parse_osm_xml;

#[cfg(test)]
pub(crate) use http::tests::MockTransport;

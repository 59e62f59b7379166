//! HTTP transport abstraction for testability

use std::future::Future;
use std::time::Duration;

use super::error::OsmError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// An XML document, sent as `text/xml`.
    Xml(String),
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
}

/// A request to the OSM API or the OAuth server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            bearer: None,
            body: RequestBody::Empty,
        }
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self {
            method: Method::Put,
            ..Self::get(url)
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn xml(mut self, document: impl Into<String>) -> Self {
        self.body = RequestBody::Xml(document.into());
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }
}

/// Status and body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP transport operations.
///
/// Any HTTP response, including error statuses, is `Ok`; only failures to
/// get a response at all are errors.
pub trait OsmTransport: Send + Sync {
    /// Sends a request and reads the whole response body.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, OsmError>> + Send;
}

/// Real HTTP transport using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with the default timeout.
    pub fn new() -> Result<Self, OsmError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a transport with a custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, OsmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("osmtagger/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OsmError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl OsmTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, OsmError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Xml(document) => builder
                .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
                .body(document),
            RequestBody::Form(fields) => builder.form(&fields),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| OsmError::Transport(format!("Request to {} failed: {}", request.url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| OsmError::Transport(format!("Failed to read response: {}", e)))?;

        Ok(HttpResponse { status, body })
    }
}

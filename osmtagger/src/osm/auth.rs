//! OAuth2 authorization-code login and token storage.
//!
//! The login flow:
//!
//! 1. Build the authorize URL and hand it to a [`LoginPrompt`], which sends
//!    the user to the browser and returns the redirect URL they land on.
//! 2. Pull the `code` parameter out of the redirect URL.
//! 3. Exchange the code for an access token at `/oauth2/token`.
//! 4. Keep the token in a [`TokenStore`], keyed by API server.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::error::OsmError;
use super::http::{HttpRequest, OsmTransport};
use crate::storage::{read_json, write_json_atomic};

/// Scopes requested at login.
pub const SCOPES: &str = "read_prefs write_api";

/// Default redirect URI registered for the application.
pub const DEFAULT_REDIRECT_URI: &str = "osmtagger:/";

/// File name of the token store.
pub const TOKEN_FILE: &str = "token.json";

/// Errors during login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The user backed out of the login.
    #[error("Login cancelled")]
    Cancelled,

    /// Nobody can answer an interactive login here.
    #[error("Login required but no interactive prompt is available")]
    NoPrompt,

    /// The OAuth client id is not configured.
    #[error("OAuth client id is not configured")]
    MissingClientId,

    /// A URL could not be built or parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The redirect URL carries no `code` parameter.
    #[error("No authorization code in '{0}'")]
    MissingCode(String),

    /// The token endpoint refused or returned garbage.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// The prompt failed for another reason.
    #[error("Login prompt failed: {0}")]
    Prompt(String),

    /// No HTTP response from the auth server.
    #[error(transparent)]
    Transport(#[from] OsmError),
}

/// OAuth client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub auth_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthConfig {
    pub fn new(auth_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            client_secret: String::new(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = secret.into();
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// The URL the user opens to grant access.
    pub fn authorize_url(&self) -> Result<String, AuthError> {
        if self.client_id.is_empty() {
            return Err(AuthError::MissingClientId);
        }
        let base = format!("{}/oauth2/authorize", self.auth_url);
        let url = Url::parse_with_params(
            &base,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
            ],
        )
        .map_err(|e| AuthError::InvalidUrl {
            url: base.clone(),
            reason: e.to_string(),
        })?;
        Ok(url.into())
    }
}

/// Extracts the `code` query parameter from a redirect URL.
pub fn extract_code(redirect_url: &str) -> Result<String, AuthError> {
    let url = Url::parse(redirect_url.trim()).map_err(|e| AuthError::InvalidUrl {
        url: redirect_url.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs()
        .find(|(name, _)| name == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AuthError::MissingCode(redirect_url.to_string()))
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub created_at: i64,
}

/// Interactive part of the login.
///
/// Implementations show `authorize_url` to the user and return the redirect
/// URL the browser ends up on. May block.
pub trait LoginPrompt: Send + Sync {
    fn authorize(&self, authorize_url: &str) -> Result<String, AuthError>;
}

/// Storage for access tokens, keyed by API server.
pub trait TokenStore: Send + Sync {
    fn load(&self, server: &str) -> Option<String>;
    fn save(&self, server: &str, token: &str) -> io::Result<()>;
    fn clear(&self, server: &str) -> io::Result<()>;
}

/// Keeps tokens in `token.json` in the data directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> HashMap<String, String> {
        match read_json(&self.path) {
            Ok(tokens) => tokens.unwrap_or_default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Token file unreadable");
                HashMap::new()
            }
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, server: &str) -> Option<String> {
        self.read().remove(server)
    }

    fn save(&self, server: &str, token: &str) -> io::Result<()> {
        let mut tokens = self.read();
        tokens.insert(server.to_string(), token.to_string());
        write_json_atomic(&self.path, &tokens)
    }

    fn clear(&self, server: &str) -> io::Result<()> {
        let mut tokens = self.read();
        if tokens.remove(server).is_some() {
            write_json_atomic(&self.path, &tokens)?;
        }
        Ok(())
    }
}

/// Tokens that live only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `token` for `server`.
    pub fn with_token(server: &str, token: &str) -> Self {
        let store = Self::new();
        store
            .tokens
            .lock()
            .insert(server.to_string(), token.to_string());
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, server: &str) -> Option<String> {
        self.tokens.lock().get(server).cloned()
    }

    fn save(&self, server: &str, token: &str) -> io::Result<()> {
        self.tokens
            .lock()
            .insert(server.to_string(), token.to_string());
        Ok(())
    }

    fn clear(&self, server: &str) -> io::Result<()> {
        self.tokens.lock().remove(server);
        Ok(())
    }
}

/// Hands out access tokens, logging in when there is none.
pub struct Authenticator<T> {
    transport: Arc<T>,
    oauth: OAuthConfig,
    server: String,
    tokens: Arc<dyn TokenStore>,
    prompt: Option<Arc<dyn LoginPrompt>>,
}

impl<T: OsmTransport> Authenticator<T> {
    /// `server` is the API URL the tokens belong to.
    pub fn new(
        transport: Arc<T>,
        oauth: OAuthConfig,
        server: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            transport,
            oauth,
            server: server.into(),
            tokens,
            prompt: None,
        }
    }

    /// Sets the prompt used for interactive login.
    pub fn with_prompt(mut self, prompt: Arc<dyn LoginPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// The stored token, if any.
    pub fn token(&self) -> Option<String> {
        self.tokens.load(&self.server)
    }

    /// The stored token, logging in first if there is none.
    pub async fn ensure_token(&self) -> Result<String, AuthError> {
        match self.token() {
            Some(token) => Ok(token),
            None => self.login().await,
        }
    }

    /// Runs the interactive login and stores the new token.
    pub async fn login(&self) -> Result<String, AuthError> {
        let prompt = self.prompt.clone().ok_or(AuthError::NoPrompt)?;
        let authorize_url = self.oauth.authorize_url()?;

        info!("Starting OAuth login");
        let redirect = tokio::task::spawn_blocking(move || prompt.authorize(&authorize_url))
            .await
            .map_err(|e| AuthError::Prompt(e.to_string()))??;

        let code = extract_code(&redirect)?;
        let token = self.exchange_code(&code).await?;

        if let Err(e) = self.tokens.save(&self.server, &token.access_token) {
            warn!(error = %e, "Failed to store access token, it will last for this session only");
        }
        info!(scope = %token.scope, "Logged in");
        Ok(token.access_token)
    }

    /// Trades an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AuthError> {
        let fields = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.oauth.redirect_uri.as_str()),
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let request = HttpRequest::post(format!("{}/oauth2/token", self.oauth.auth_url)).form(fields);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(AuthError::TokenExchange(format!(
                "HTTP {}: {}",
                response.status, response.body
            )));
        }
        serde_json::from_str(&response.body)
            .map_err(|e| AuthError::TokenExchange(format!("invalid token response: {}", e)))
    }

    /// Forgets the stored token.
    pub fn logout(&self) -> io::Result<()> {
        info!("Logging out");
        self.tokens.clear(&self.server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::http::tests::MockTransport;
    use crate::osm::http::RequestBody;

    struct FixedPrompt(Result<String, ()>);

    impl LoginPrompt for FixedPrompt {
        fn authorize(&self, authorize_url: &str) -> Result<String, AuthError> {
            assert!(authorize_url.contains("response_type=code"));
            self.0.clone().map_err(|_| AuthError::Cancelled)
        }
    }

    fn oauth() -> OAuthConfig {
        OAuthConfig::new("https://auth.test/", "client").with_secret("secret")
    }

    #[test]
    fn test_authorize_url() {
        let url = oauth().authorize_url().unwrap();
        assert!(url.starts_with("https://auth.test/oauth2/authorize?"));
        assert!(url.contains("client_id=client"));
        assert!(url.contains("redirect_uri=osmtagger%3A%2F"));
        assert!(url.contains("scope=read_prefs+write_api"));
    }

    #[test]
    fn test_authorize_url_requires_client_id() {
        let config = OAuthConfig::new("https://auth.test", "");
        assert!(matches!(config.authorize_url(), Err(AuthError::MissingClientId)));
    }

    #[test]
    fn test_extract_code() {
        assert_eq!(extract_code("osmtagger:/?code=abc123").unwrap(), "abc123");
        assert!(matches!(
            extract_code("osmtagger:/?error=access_denied"),
            Err(AuthError::MissingCode(_))
        ));
        assert!(matches!(extract_code("not a url"), Err(AuthError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_login_exchanges_and_stores_token() {
        let transport = Arc::new(MockTransport::new().respond(
            200,
            r#"{"access_token":"tok","token_type":"Bearer","scope":"read_prefs write_api","created_at":1}"#,
        ));
        let tokens = Arc::new(MemoryTokenStore::new());
        let auth = Authenticator::new(transport.clone(), oauth(), "https://api.test", tokens.clone())
            .with_prompt(Arc::new(FixedPrompt(Ok("osmtagger:/?code=xyz".into()))));

        assert_eq!(auth.ensure_token().await.unwrap(), "tok");
        assert_eq!(tokens.load("https://api.test").as_deref(), Some("tok"));

        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://auth.test/oauth2/token");
        let RequestBody::Form(fields) = &request.body else {
            panic!("expected form body");
        };
        assert!(fields.contains(&("code".to_string(), "xyz".to_string())));
        assert!(fields.contains(&("grant_type".to_string(), "authorization_code".to_string())));
    }

    #[tokio::test]
    async fn test_stored_token_skips_login() {
        let transport = Arc::new(MockTransport::new());
        let tokens = Arc::new(MemoryTokenStore::with_token("https://api.test", "saved"));
        let auth = Authenticator::new(transport.clone(), oauth(), "https://api.test", tokens);

        assert_eq!(auth.ensure_token().await.unwrap(), "saved");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_login() {
        let auth = Authenticator::new(
            Arc::new(MockTransport::new()),
            oauth(),
            "https://api.test",
            Arc::new(MemoryTokenStore::new()),
        )
        .with_prompt(Arc::new(FixedPrompt(Err(()))));
        assert!(matches!(auth.ensure_token().await, Err(AuthError::Cancelled)));
    }

    #[tokio::test]
    async fn test_no_prompt() {
        let auth = Authenticator::new(
            Arc::new(MockTransport::new()),
            oauth(),
            "https://api.test",
            Arc::new(MemoryTokenStore::new()),
        );
        assert!(matches!(auth.login().await, Err(AuthError::NoPrompt)));
    }

    #[tokio::test]
    async fn test_rejected_exchange() {
        let auth = Authenticator::new(
            Arc::new(MockTransport::new().respond(400, "invalid_grant")),
            oauth(),
            "https://api.test",
            Arc::new(MemoryTokenStore::new()),
        );
        let err = auth.exchange_code("bad").await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn test_file_token_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join(TOKEN_FILE));
        assert!(store.load("a").is_none());
        store.save("a", "one").unwrap();
        store.save("b", "two").unwrap();
        store.clear("a").unwrap();
        assert!(store.load("a").is_none());
        assert_eq!(store.load("b").as_deref(), Some("two"));
    }
}

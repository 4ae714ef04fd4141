//! OAuth plumbing for the Google Calendar connection.
//!
//! Covers the three token-side operations: building the consent URL,
//! exchanging an authorization code, and refreshing an expired access
//! token. `valid_credentials` is the single entry point callers use to get
//! a credential record whose access token is usable.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::credentials::CredentialRecord;
use crate::error::{JobdeckError, JobdeckResult};
use crate::store::Store;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar.events"];

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8423/callback";

/// Google OAuth client credentials (user-provided).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthApp {
    fn path() -> JobdeckResult<std::path::PathBuf> {
        Ok(crate::config::config_dir()?.join("app_config.toml"))
    }

    pub fn load() -> JobdeckResult<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Err(JobdeckError::Config(format!(
                "Google credentials not found.\n\n\
                Create {} with:\n\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"\n\n\
                See https://console.cloud.google.com/apis/credentials for setup.",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(&path)?;
        let app: OAuthApp = toml::from_str(&contents).map_err(|e| {
            JobdeckError::Config(format!(
                "Failed to parse credentials from {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(app)
    }
}

/// Tokens returned by the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

impl From<TokenResponse> for TokenSet {
    fn from(resp: TokenResponse) -> Self {
        TokenSet {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            expires_at: Utc::now() + Duration::seconds(resp.expires_in),
        }
    }
}

/// Anything that can trade a refresh token for a new access token.
///
/// The production implementation is `TokenClient`; tests substitute a mock
/// to observe refresh behavior without a network.
#[allow(async_fn_in_trait)]
pub trait TokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> JobdeckResult<TokenSet>;
}

/// HTTP client for Google's OAuth token endpoint.
pub struct TokenClient {
    app: OAuthApp,
    http: reqwest::Client,
    token_url: String,
}

impl TokenClient {
    pub fn new(app: OAuthApp) -> Self {
        TokenClient {
            app,
            http: reqwest::Client::new(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Consent-screen URL for the authorization-code flow.
    ///
    /// `access_type=offline` + `prompt=consent` make Google return a
    /// refresh token on every connect, not only the first.
    pub fn auth_url(&self, redirect_uri: &str, state: &str) -> JobdeckResult<String> {
        let mut url = Url::parse(GOOGLE_AUTH_URL)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.app.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        Ok(url.to_string())
    }

    /// Exchange an authorization code for an access/refresh token pair.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> JobdeckResult<TokenSet> {
        let params = [
            ("client_id", self.app.client_id.as_str()),
            ("client_secret", self.app.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.http.post(&self.token_url).form(&params).send().await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobdeckError::Provider(format!(
                "Token exchange failed: {body}"
            )));
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.into())
    }
}

impl TokenRefresher for TokenClient {
    async fn refresh(&self, refresh_token: &str) -> JobdeckResult<TokenSet> {
        let params = [
            ("client_id", self.app.client_id.as_str()),
            ("client_secret", self.app.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.http.post(&self.token_url).form(&params).send().await?;

        // A rejected refresh token (revoked access) is terminal for this
        // connection; callers surface it as "reconnect required".
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobdeckError::RefreshFailed(body));
        }

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.into())
    }
}

/// Load the user's credential record, refreshing the access token first if
/// it has expired. The refreshed token is persisted before returning.
///
/// Fails with `NotConnected` when the user has no credential record and
/// `RefreshFailed` when the provider rejects the stored refresh token.
pub async fn valid_credentials<R: TokenRefresher>(
    store: &Store,
    refresher: &R,
    user_id: &str,
) -> JobdeckResult<CredentialRecord> {
    let mut record = store
        .credentials(user_id)?
        .ok_or_else(|| JobdeckError::NotConnected(user_id.to_string()))?;

    if record.is_expired() {
        let tokens = refresher.refresh(&record.refresh_token).await?;
        record.access_token = tokens.access_token;
        record.token_expiry = tokens.expires_at;
        // Google typically doesn't return a new refresh token on refresh
        if let Some(refresh_token) = tokens.refresh_token {
            record.refresh_token = refresh_token;
        }
        store.upsert_credentials(&record)?;
    }

    Ok(record)
}

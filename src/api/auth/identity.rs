//! Raw identity platform v2.0 calls shared by both credential strategies
//!
//! Holds the only token cache in the crate: process-local, in memory, keyed
//! by the requested scope set. Nothing is persisted and no refresh grant is
//! attempted; an expired entry simply forces a new interactive sign-in.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use super::device_code::DeviceCodeInfo;
use crate::api::constants::{self, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TOKEN_LIFETIME_SECS, DEVICE_CODE_GRANT};
use crate::api::error::{AuthErrorKind, GraphError, Result};
use crate::api::models::AccessToken;

/// Outcome of one device-code poll
#[derive(Debug)]
pub enum DevicePoll {
    Pending,
    SlowDown,
    Token(AccessToken),
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    interval: Option<u64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: String,
    error_description: Option<String>,
}

enum TokenOutcome {
    Token(AccessToken),
    Error(ProviderError),
}

pub struct IdentityClient {
    http_client: reqwest::Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl IdentityClient {
    pub fn new(authority_host: &str, tenant_id: &str, client_id: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .connect_timeout(StdDuration::from_secs(10))
            .user_agent(concat!("graph-search-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GraphError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            authority_host: authority_host.to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn endpoint(&self, name: &str) -> String {
        constants::identity_endpoint(&self.authority_host, &self.tenant_id, name)
    }

    /// A cached token for these scopes that is not about to expire
    pub fn cached_token(&self, scopes: &[String]) -> Option<AccessToken> {
        let cache = self.cache.lock().ok()?;
        cache
            .get(&scope_key(scopes))
            .filter(|token| !token.will_expire_soon())
            .cloned()
    }

    pub fn store_token(&self, scopes: &[String], token: &AccessToken) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(scope_key(scopes), token.clone());
        }
    }

    /// Start a device authorization (RFC 8628 section 3.1)
    pub async fn request_device_code(&self, scopes: &[String]) -> Result<DeviceCodeInfo> {
        let url = self.endpoint("devicecode");
        let scope = scopes.join(" ");
        debug!("Requesting device code from {}", url);

        let response = self
            .http_client
            .post(&url)
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!("Device code request status: {}", status);
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let err = parse_provider_error(&text);
            return Err(provider_failure(err));
        }

        let body: DeviceCodeResponse = serde_json::from_str(&text).map_err(|e| {
            GraphError::auth(
                AuthErrorKind::Provider,
                format!("Invalid device code response: {}", e),
            )
        })?;

        let message = body.message.unwrap_or_else(|| {
            format!(
                "To sign in, use a web browser to open the page {} and enter the code {} to authenticate.",
                body.verification_uri, body.user_code
            )
        });

        Ok(DeviceCodeInfo {
            user_code: body.user_code,
            device_code: body.device_code,
            verification_uri: body.verification_uri,
            message,
            expires_on: expires_after(i64::try_from(body.expires_in).unwrap_or(i64::MAX)),
            interval: StdDuration::from_secs(body.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS)),
        })
    }

    /// Poll the token endpoint once for a pending device code
    pub async fn poll_device_code(&self, device_code: &str) -> Result<DevicePoll> {
        let outcome = self
            .post_token(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.client_id.as_str()),
                ("device_code", device_code),
            ])
            .await?;

        match outcome {
            TokenOutcome::Token(token) => Ok(DevicePoll::Token(token)),
            TokenOutcome::Error(err) => pending_poll(err),
        }
    }

    /// Build the authorization URL for the browser flow
    pub fn authorize_url(
        &self,
        redirect_uri: &str,
        scopes: &[String],
        state: &str,
        code_challenge: &str,
    ) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint("authorize")).map_err(|e| {
            GraphError::Configuration(format!("Invalid authority host '{}': {}", self.authority_host, e))
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_mode", "query")
            .append_pair("scope", &scopes.join(" "))
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");

        Ok(url)
    }

    /// Redeem an authorization code (RFC 6749 section 4.1.3, with PKCE)
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
        scopes: &[String],
    ) -> Result<AccessToken> {
        let scope = scopes.join(" ");
        let outcome = self
            .post_token(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("code_verifier", code_verifier),
                ("scope", scope.as_str()),
            ])
            .await?;

        match outcome {
            TokenOutcome::Token(token) => Ok(token),
            TokenOutcome::Error(err) => Err(provider_failure(err)),
        }
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenOutcome> {
        let url = self.endpoint("token");

        let response = self
            .http_client
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!("Token request status: {}", status);
        let text = response.text().await.map_err(transport_error)?;

        if status.is_success() {
            let token_data: Value = serde_json::from_str(&text).map_err(|e| {
                GraphError::auth(AuthErrorKind::MissingToken, format!("Invalid access response: {}", e))
            })?;
            return parse_token(&token_data).map(TokenOutcome::Token);
        }

        Ok(TokenOutcome::Error(parse_provider_error(&text)))
    }
}

/// Device-code errors that mean "keep polling"; everything else ends the attempt
fn pending_poll(err: ProviderError) -> Result<DevicePoll> {
    match err.error.as_str() {
        "authorization_pending" => Ok(DevicePoll::Pending),
        "slow_down" => Ok(DevicePoll::SlowDown),
        _ => Err(provider_failure(err)),
    }
}

/// `now + seconds`, saturating instead of overflowing on absurd provider values
fn expires_after(seconds: i64) -> DateTime<Utc> {
    Duration::try_seconds(seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .unwrap_or(if seconds < 0 { Utc::now() } else { DateTime::<Utc>::MAX_UTC })
}

fn parse_token(token_data: &Value) -> Result<AccessToken> {
    let access_token = token_data
        .get("access_token")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GraphError::auth(AuthErrorKind::MissingToken, "Invalid access response"))?;

    // Default to 1 hour if not provided
    let expires_in = token_data
        .get("expires_in")
        .and_then(|e| e.as_i64().or_else(|| e.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

    Ok(AccessToken::new(access_token, expires_after(expires_in)))
}

fn parse_provider_error(text: &str) -> ProviderError {
    serde_json::from_str(text).unwrap_or_else(|_| {
        warn!("Unparseable identity platform error body");
        ProviderError {
            error: "unknown_error".to_string(),
            error_description: Some(text.to_string()),
        }
    })
}

fn provider_failure(err: ProviderError) -> GraphError {
    let kind = match err.error.as_str() {
        "authorization_declined" | "access_denied" => AuthErrorKind::Cancelled,
        "expired_token" => AuthErrorKind::TimedOut,
        "invalid_grant" | "consent_required" | "interaction_required" => AuthErrorKind::Denied,
        _ => AuthErrorKind::Provider,
    };
    let message = match err.error_description {
        Some(description) => format!("{}: {}", err.error, description),
        None => err.error,
    };
    GraphError::auth(kind, message)
}

fn transport_error(err: reqwest::Error) -> GraphError {
    GraphError::auth(
        AuthErrorKind::Transport,
        format!("Identity platform unreachable: {}", err),
    )
}

/// Cache key for a scope set; `user.read` and `https://graph.microsoft.com/user.read` are one scope
fn scope_key(scopes: &[String]) -> String {
    let resource_prefix = format!("{}/", constants::GRAPH_RESOURCE.to_lowercase());
    let mut normalized: Vec<String> = scopes
        .iter()
        .map(|s| s.trim().to_lowercase())
        .map(|s| match s.strip_prefix(&resource_prefix) {
            Some(bare) => bare.to_string(),
            None => s,
        })
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized.join(" ")
}

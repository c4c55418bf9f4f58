use log::{debug, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::auth::TokenCredential;
use super::constants::{self, headers, GRAPH_HOST};
use super::error::{GraphError, Result};
use super::models::{AccessToken, UserProfile};
use super::search::response::{beta, v1};
use super::search::{self, ApiVersion, QueryPostRequestBody, SearchHit, SearchResponse};

#[derive(Debug, Deserialize)]
struct ODataErrorBody {
    error: ODataError,
}

#[derive(Debug, Deserialize)]
struct ODataError {
    code: Option<String>,
    message: Option<String>,
}

/// Microsoft Graph client acting on behalf of the signed-in user
pub struct GraphClient {
    base_url: String,
    version: ApiVersion,
    http_client: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    scopes: Vec<String>,
}

impl GraphClient {
    pub fn new(credential: Arc<dyn TokenCredential>, scopes: Vec<String>, version: ApiVersion) -> Result<Self> {
        Self::with_base_url(credential, scopes, version, GRAPH_HOST)
    }

    /// Point at another Graph host (national clouds, mock servers)
    pub fn with_base_url(
        credential: Arc<dyn TokenCredential>,
        scopes: Vec<String>,
        version: ApiVersion,
        host: &str,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("graph-search-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GraphError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: format!("{}/{}", host.trim_end_matches('/'), version.path_segment()),
            version,
            http_client,
            credential,
            scopes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    async fn bearer(&self) -> Result<AccessToken> {
        self.credential.get_token(&self.scopes).await
    }

    /// The signed-in user, or `None` if no session could be established
    pub async fn current_user(&self) -> Result<Option<UserProfile>> {
        let token = match self.bearer().await {
            Ok(token) => token,
            Err(e) if e.is_authentication() => {
                warn!("Profile lookup skipped, not authenticated: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let url = format!("{}/me", self.base_url);
        let select = constants::USER_PROFILE_FIELDS.join(",");
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!("GET {} (client-request-id {})", url, request_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token.token)
            .header("Accept", headers::CONTENT_TYPE_JSON)
            .header(headers::CLIENT_REQUEST_ID, &request_id)
            .query(&[("$select", select.as_str())])
            .send()
            .await
            .map_err(|e| GraphError::Request {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("Graph rejected the session token for /me");
            return Ok(None);
        }

        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(GraphError::Request {
                status: Some(status.as_u16()),
                message: provider_message(&text),
            });
        }

        let profile: UserProfile = serde_json::from_str(&text).map_err(|e| GraphError::Request {
            status: Some(status.as_u16()),
            message: format!("Invalid profile response: {}", e),
        })?;
        Ok(Some(profile))
    }

    /// Search OneDrive and SharePoint with this client's API version, first page only
    pub async fn search(&self, query_term: &str) -> Result<Vec<SearchHit>> {
        let body = search::build_request(query_term, self.version);
        let response = self.search_with(&body).await?;
        let hits = search::flatten(&response);
        debug!("Search for '{}' returned {} hits", query_term, hits.len());
        Ok(hits)
    }

    /// Post an explicit request body and adapt the answer to the canonical shape
    pub async fn search_with(&self, body: &QueryPostRequestBody) -> Result<SearchResponse> {
        let token = self.bearer().await?;

        let url = format!("{}/search/query", self.base_url);
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!("POST {} (client-request-id {})", url, request_id);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token.token)
            .header("Accept", headers::CONTENT_TYPE_JSON)
            .header(headers::CLIENT_REQUEST_ID, &request_id)
            .json(body)
            .send()
            .await
            .map_err(|e| GraphError::Search(e.to_string()))?;

        let status = response.status();
        debug!("Search request status: {}", status);
        let text = response
            .text()
            .await
            .map_err(|e| GraphError::Search(e.to_string()))?;

        if !status.is_success() {
            return Err(GraphError::Search(provider_message(&text)));
        }

        let parsed = match self.version {
            ApiVersion::V1 => serde_json::from_str::<v1::QueryPostResponse>(&text).map(SearchResponse::from),
            ApiVersion::Beta => serde_json::from_str::<beta::QueryPostResponse>(&text).map(SearchResponse::from),
        };
        parsed.map_err(|e| GraphError::Search(format!("Invalid search response: {}", e)))
    }
}

/// `error.message` from an OData error body, else the raw text
fn provider_message(text: &str) -> String {
    match serde_json::from_str::<ODataErrorBody>(text) {
        Ok(body) => match (body.error.message, body.error.code) {
            (Some(message), _) => message,
            (None, Some(code)) => code,
            (None, None) => "Unknown error".to_string(),
        },
        Err(_) if text.trim().is_empty() => "Unknown error".to_string(),
        Err(_) => text.to_string(),
    }
}

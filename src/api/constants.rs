//! Endpoints and fixed values for the identity platform and Microsoft Graph

/// Public-cloud identity platform host
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Microsoft Graph host (without version segment)
pub const GRAPH_HOST: &str = "https://graph.microsoft.com";

/// Resource prefix for fully qualified Graph scopes
pub const GRAPH_RESOURCE: &str = "https://graph.microsoft.com";

/// Path segment for the stable API
pub const V1_SEGMENT: &str = "v1.0";

/// Path segment for the preview API
pub const BETA_SEGMENT: &str = "beta";

/// Provider-imposed maximum page size for `/search/query`
pub const SEARCH_MAX_PAGE_SIZE: u32 = 500;

/// Redirect target registered for the browser flow; the bound port is appended
pub const LOOPBACK_REDIRECT: &str = "http://localhost";

/// Address the loopback listener binds to
pub const LOOPBACK_BIND_ADDR: &str = "127.0.0.1";

/// Device-code grant type (RFC 8628)
pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Polling interval used when the provider does not send one
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Extra delay added after a `slow_down` answer
pub const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

/// Lifetime assumed when a token response has no `expires_in`
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Cached tokens closer than this to expiry are not served
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 300;

/// Fields requested from `/me`
pub const USER_PROFILE_FIELDS: &[&str] = &["displayName", "mail", "userPrincipalName"];

pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";
    pub const CLIENT_REQUEST_ID: &str = "client-request-id";
}

/// `{authority}/{tenant}/oauth2/v2.0/{endpoint}`
pub fn identity_endpoint(authority_host: &str, tenant_id: &str, endpoint: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/{}",
        authority_host.trim_end_matches('/'),
        tenant_id,
        endpoint
    )
}

/// Qualify a bare scope (`user.read`) with the Graph resource
pub fn graph_scope(scope: &str) -> String {
    if scope.contains("://") {
        scope.to_string()
    } else {
        format!("{}/{}", GRAPH_RESOURCE, scope)
    }
}

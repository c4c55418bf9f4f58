use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::constants::TOKEN_EXPIRY_SKEW_SECS;

/// Bearer token returned by a credential
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_on <= Utc::now()
    }

    /// Expires within the cache skew window
    pub fn will_expire_soon(&self) -> bool {
        self.expires_on <= Utc::now() + Duration::seconds(TOKEN_EXPIRY_SKEW_SECS)
    }
}

// Never print the token itself
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Signed-in user, as returned by `/me` with a reduced `$select`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// Work/school accounts carry the address in `mail`, personal ones in the UPN
    pub fn email(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
    }
}

//! Microsoft Graph access on behalf of a signed-in user
//!
//! `auth` brokers delegated tokens through one of two interactive flows,
//! `client` calls Graph with them and `search` shapes search requests and
//! results.

pub mod auth;
pub mod client;
pub mod constants;
pub mod error;
pub mod models;
pub mod search;

pub use auth::{Credential, CredentialState, DeviceCodeInfo, DeviceCodePrompt, StrategyKind, TokenCredential};
pub use client::GraphClient;
pub use error::{AuthErrorKind, GraphError, Result};
pub use models::{AccessToken, UserProfile};
pub use search::{ApiVersion, SearchHit, SearchRequestSpec, SearchResponse};

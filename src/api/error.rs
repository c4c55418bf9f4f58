//! Error taxonomy for the Graph API layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

/// Why a token could not be acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// The provider answered but the response carried no usable token
    MissingToken,
    /// The user cancelled or declined the sign-in
    Cancelled,
    /// The device code expired or the browser redirect never arrived
    TimedOut,
    /// The provider rejected the request (bad state, error redirect, consent)
    Denied,
    /// Any other error code returned by the identity platform
    Provider,
    /// The identity platform could not be reached
    Transport,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed ({kind:?}): {message}")]
    Authentication {
        kind: AuthErrorKind,
        message: String,
    },

    #[error("search failed: {0}")]
    Search(String),

    #[error("Graph request failed{}: {message}", status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Request {
        status: Option<u16>,
        message: String,
    },
}

impl GraphError {
    pub fn auth(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self::Authentication {
            kind,
            message: message.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    pub fn is_search(&self) -> bool {
        matches!(self, Self::Search(_))
    }

    /// The authentication failure kind, if this is an authentication error
    pub fn auth_kind(&self) -> Option<AuthErrorKind> {
        match self {
            Self::Authentication { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

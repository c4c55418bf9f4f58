//! Delegated credential broker
//!
//! A [`Credential`] is bound to exactly one interactive strategy, chosen once
//! from [`AuthConfig::run_device_code_flow`]. Callers only ever see the uniform
//! [`TokenCredential::get_token`] contract.

pub mod browser;
pub mod device_code;
pub mod identity;

use async_trait::async_trait;
use log::{debug, info};
use std::sync::Mutex;

use crate::api::error::{GraphError, Result};
use crate::api::models::AccessToken;
use crate::config::AuthConfig;

pub use browser::{BrowserLauncher, BrowserSession, PkceChallenge, system_browser};
pub use device_code::{DeviceCodeInfo, DeviceCodePrompt, DeviceCodeSession};
pub use identity::IdentityClient;

/// Anything that can hand out bearer tokens for a scope list
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scopes: &[String]) -> Result<AccessToken>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    DeviceCode,
    InteractiveBrowser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    StrategySelected,
    Authenticating,
    Authenticated,
}

pub enum CredentialStrategy {
    DeviceCode(DeviceCodeSession),
    Browser(BrowserSession),
}

pub struct Credential {
    strategy: CredentialStrategy,
    state: Mutex<CredentialState>,
}

impl Credential {
    /// Select and build the strategy; the prompt is only used by the device-code flow
    pub fn initialize(config: &AuthConfig, device_code_prompt: DeviceCodePrompt) -> Result<Self> {
        Self::initialize_with_launcher(config, device_code_prompt, system_browser())
    }

    /// Like [`Credential::initialize`] with a custom browser launcher
    pub fn initialize_with_launcher(
        config: &AuthConfig,
        device_code_prompt: DeviceCodePrompt,
        launcher: BrowserLauncher,
    ) -> Result<Self> {
        let client_id = required(&config.client_id, "client_id")?;
        let tenant_id = required(&config.tenant_id, "tenant_id")?;
        let identity = IdentityClient::new(&config.authority_host, tenant_id, client_id)?;

        let strategy = if config.run_device_code_flow {
            info!("Using device code flow for tenant {}", tenant_id);
            CredentialStrategy::DeviceCode(DeviceCodeSession::new(identity, device_code_prompt))
        } else {
            info!("Using interactive browser flow for tenant {}", tenant_id);
            CredentialStrategy::Browser(BrowserSession::new(
                identity,
                config.redirect_port,
                config.browser_timeout(),
                launcher,
            ))
        };

        Ok(Self {
            strategy,
            state: Mutex::new(CredentialState::StrategySelected),
        })
    }

    pub fn kind(&self) -> StrategyKind {
        match &self.strategy {
            CredentialStrategy::DeviceCode(_) => StrategyKind::DeviceCode,
            CredentialStrategy::Browser(_) => StrategyKind::InteractiveBrowser,
        }
    }

    pub fn strategy(&self) -> &CredentialStrategy {
        &self.strategy
    }

    pub fn state(&self) -> CredentialState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(CredentialState::StrategySelected)
    }

    fn set_state(&self, next: CredentialState) {
        if let Ok(mut state) = self.state.lock() {
            debug!("Credential state {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    /// Acquire a token, suspending until the interactive flow completes
    pub async fn get_token(&self, scopes: &[String]) -> Result<AccessToken> {
        let previous = self.state();
        self.set_state(CredentialState::Authenticating);

        let result = match &self.strategy {
            CredentialStrategy::DeviceCode(session) => session.get_token(scopes).await,
            CredentialStrategy::Browser(session) => session.get_token(scopes).await,
        };

        match &result {
            Ok(_) => self.set_state(CredentialState::Authenticated),
            Err(_) => self.set_state(previous),
        }
        result
    }
}

#[async_trait]
impl TokenCredential for Credential {
    async fn get_token(&self, scopes: &[String]) -> Result<AccessToken> {
        Credential::get_token(self, scopes).await
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GraphError::Configuration(format!("{} is required in [app_settings]", name)))
}

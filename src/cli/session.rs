//! Everything a command needs, built once at startup

use anyhow::{Context, Result};
use colored::*;
use log::info;
use std::sync::Arc;

use crate::api::{ApiVersion, Credential, DeviceCodePrompt, GraphClient, constants};
use crate::config::Config;

pub struct Session {
    pub config: Config,
    pub credential: Arc<Credential>,
    pub graph: GraphClient,
}

impl Session {
    pub fn start(config: Config, beta: bool) -> Result<Self> {
        let credential = Arc::new(
            Credential::initialize(&config.app_settings, console_device_code_prompt())
                .context("Failed to initialize Microsoft Graph credential")?,
        );

        let version = ApiVersion::from_beta_flag(beta || config.graph.use_beta_endpoint);
        let host = config
            .graph
            .base_url
            .clone()
            .unwrap_or_else(|| constants::GRAPH_HOST.to_string());
        let graph = GraphClient::with_base_url(
            credential.clone(),
            config.app_settings.graph_user_scopes.clone(),
            version,
            &host,
        )?;

        info!("Session ready ({:?} strategy, {:?} API)", credential.kind(), version);
        Ok(Self {
            config,
            credential,
            graph,
        })
    }

    /// Scopes for the "display access token" request
    ///
    /// Falls back to the Graph client scopes when no token scopes are configured.
    pub fn token_scopes(&self) -> Vec<String> {
        let scopes = self.config.app_settings.token_request_scopes();
        if scopes.is_empty() {
            self.config.app_settings.graph_user_scopes.clone()
        } else {
            scopes
        }
    }
}

/// Show the provider's sign-in instruction on the console
fn console_device_code_prompt() -> DeviceCodePrompt {
    Arc::new(|info, _cancel| {
        println!();
        println!("{}", info.message.bright_yellow());
        println!();
    })
}

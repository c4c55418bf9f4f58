use chrono::{DateTime, Utc};
use log::{debug, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::identity::{DevicePoll, IdentityClient};
use crate::api::constants::SLOW_DOWN_INCREMENT_SECS;
use crate::api::error::{AuthErrorKind, GraphError, Result};
use crate::api::models::AccessToken;

/// What the user needs to complete a device-code sign-in
#[derive(Debug, Clone)]
pub struct DeviceCodeInfo {
    pub user_code: String,
    pub device_code: String,
    pub verification_uri: String,
    /// Ready-to-display instruction from the provider
    pub message: String,
    pub expires_on: DateTime<Utc>,
    pub interval: Duration,
}

/// Invoked once per sign-in attempt; cancelling the token aborts the wait
pub type DeviceCodePrompt = Arc<dyn Fn(&DeviceCodeInfo, &CancellationToken) + Send + Sync>;

pub struct DeviceCodeSession {
    identity: IdentityClient,
    prompt: DeviceCodePrompt,
}

impl DeviceCodeSession {
    pub fn new(identity: IdentityClient, prompt: DeviceCodePrompt) -> Self {
        Self { identity, prompt }
    }

    pub fn identity(&self) -> &IdentityClient {
        &self.identity
    }

    pub async fn get_token(&self, scopes: &[String]) -> Result<AccessToken> {
        if let Some(token) = self.identity.cached_token(scopes) {
            debug!("Serving cached token for device code session");
            return Ok(token);
        }

        let info = self.identity.request_device_code(scopes).await?;
        let cancel = CancellationToken::new();
        (self.prompt)(&info, &cancel);

        let token = self.wait_for_user(&info, &cancel).await?;
        self.identity.store_token(scopes, &token);
        info!("Device code sign-in completed");
        Ok(token)
    }

    async fn wait_for_user(&self, info: &DeviceCodeInfo, cancel: &CancellationToken) -> Result<AccessToken> {
        let identity = &self.identity;
        let device_code = info.device_code.as_str();
        poll_until_complete(info, cancel, move || identity.poll_device_code(device_code)).await
    }
}

/// Drive `poll` at the provider's pace until it yields a token, fails, is cancelled or expires
async fn poll_until_complete<F, Fut>(info: &DeviceCodeInfo, cancel: &CancellationToken, mut poll: F) -> Result<AccessToken>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<DevicePoll>>,
{
    let mut interval = info.interval;

    loop {
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        if Utc::now() >= info.expires_on {
            return Err(GraphError::auth(
                AuthErrorKind::TimedOut,
                "Device code expired before sign-in completed",
            ));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = tokio::time::sleep(interval) => {}
        }

        match poll().await? {
            DevicePoll::Token(token) => return Ok(token),
            DevicePoll::Pending => debug!("Device code authorization pending"),
            DevicePoll::SlowDown => {
                interval += Duration::from_secs(SLOW_DOWN_INCREMENT_SECS);
                debug!("Provider asked to slow down, polling every {:?}", interval);
            }
        }
    }
}

fn cancelled() -> GraphError {
    GraphError::auth(AuthErrorKind::Cancelled, "Device code sign-in was cancelled")
}

//! Interactive browser sign-in over a loopback redirect (RFC 8252) with PKCE

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use log::{debug, info, warn};
use rand::Rng;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use super::identity::IdentityClient;
use crate::api::constants::{LOOPBACK_BIND_ADDR, LOOPBACK_REDIRECT};
use crate::api::error::{AuthErrorKind, GraphError, Result};
use crate::api::models::AccessToken;

const CODE_VERIFIER_LENGTH: usize = 64;

/// How long a loopback connection may take to send its request line
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

const SUCCESS_PAGE: &str = "<html><body><h3>Authentication complete.</h3>\
<p>You can close this window and return to the console.</p></body></html>";
const FAILURE_PAGE: &str = "<html><body><h3>Authentication failed.</h3>\
<p>Return to the console for details.</p></body></html>";

/// Opens the authorization URL for the user
pub type BrowserLauncher = Arc<dyn Fn(&Url) -> std::io::Result<()> + Send + Sync>;

/// Launch the platform's default browser
pub fn system_browser() -> BrowserLauncher {
    Arc::new(|url: &Url| {
        let url = url.as_str();
        let result = if cfg!(target_os = "windows") {
            // `cmd /c start` would split the URL on '&'
            Command::new("rundll32")
                .args(["url.dll,FileProtocolHandler", url])
                .spawn()
        } else if cfg!(target_os = "macos") {
            Command::new("open").arg(url).spawn()
        } else {
            Command::new("xdg-open").arg(url).spawn()
        };
        result.map(|_| ())
    })
}

/// PKCE verifier and its S256 challenge
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
        let mut rng = rand::thread_rng();
        let verifier: String = (0..CODE_VERIFIER_LENGTH)
            .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
            .collect();
        let challenge = Self::challenge_for(&verifier);
        Self { verifier, challenge }
    }

    pub fn challenge_for(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

/// What a single loopback request carried
#[derive(Debug)]
enum RedirectOutcome {
    Code(String),
    Failed(GraphError),
    /// Not an authorization response (favicon and the like)
    Ignored,
}

pub struct BrowserSession {
    identity: IdentityClient,
    redirect_port: u16,
    timeout: Duration,
    launcher: BrowserLauncher,
}

impl BrowserSession {
    pub fn new(identity: IdentityClient, redirect_port: u16, timeout: Duration, launcher: BrowserLauncher) -> Self {
        Self {
            identity,
            redirect_port,
            timeout,
            launcher,
        }
    }

    pub fn identity(&self) -> &IdentityClient {
        &self.identity
    }

    pub async fn get_token(&self, scopes: &[String]) -> Result<AccessToken> {
        if let Some(token) = self.identity.cached_token(scopes) {
            debug!("Serving cached token for browser session");
            return Ok(token);
        }

        let listener = TcpListener::bind((LOOPBACK_BIND_ADDR, self.redirect_port))
            .await
            .map_err(|e| {
                GraphError::auth(
                    AuthErrorKind::Transport,
                    format!("Could not listen on loopback port {}: {}", self.redirect_port, e),
                )
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| GraphError::auth(AuthErrorKind::Transport, e.to_string()))?
            .port();
        let redirect_uri = format!("{}:{}", LOOPBACK_REDIRECT, port);

        let pkce = PkceChallenge::generate();
        let state = uuid::Uuid::new_v4().simple().to_string();
        let authorize_url = self
            .identity
            .authorize_url(&redirect_uri, scopes, &state, &pkce.challenge)?;

        debug!("Waiting for browser redirect on {}", redirect_uri);
        (self.launcher)(&authorize_url).map_err(|e| {
            GraphError::auth(
                AuthErrorKind::Transport,
                format!("Could not open a browser ({}); sign in at {}", e, authorize_url),
            )
        })?;

        let code = tokio::time::timeout(self.timeout, wait_for_redirect(&listener, &state))
            .await
            .map_err(|_| {
                GraphError::auth(
                    AuthErrorKind::TimedOut,
                    format!("No browser redirect received within {:?}", self.timeout),
                )
            })??;

        let token = self
            .identity
            .exchange_authorization_code(&code, &redirect_uri, &pkce.verifier, scopes)
            .await?;
        self.identity.store_token(scopes, &token);
        info!("Browser sign-in completed");
        Ok(token)
    }
}

/// Accept loopback connections until one of them carries the authorization response
///
/// Each connection is read on its own task, so an idle socket (browsers
/// preconnect to localhost) cannot hold up the redirect behind it.
async fn wait_for_redirect(listener: &TcpListener, expected_state: &str) -> Result<String> {
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<Result<String>>(1);

    loop {
        tokio::select! {
            Some(outcome) = outcome_rx.recv() => return outcome,
            accepted = listener.accept() => {
                let (stream, peer) = accepted
                    .map_err(|e| GraphError::auth(AuthErrorKind::Transport, e.to_string()))?;
                debug!("Loopback connection from {}", peer);
                tokio::spawn(handle_connection(
                    stream,
                    expected_state.to_string(),
                    outcome_tx.clone(),
                ));
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, expected_state: String, outcome_tx: mpsc::Sender<Result<String>>) {
    let target = match tokio::time::timeout(REQUEST_READ_TIMEOUT, read_request_target(&mut stream)).await {
        Ok(Ok(target)) => target,
        Ok(Err(e)) => {
            debug!("Dropping unreadable loopback request: {}", e);
            return;
        }
        Err(_) => {
            debug!("Dropping idle loopback connection");
            return;
        }
    };

    let outcome = match parse_redirect(&target, &expected_state) {
        RedirectOutcome::Ignored => {
            respond(&mut stream, "404 Not Found", "").await;
            return;
        }
        RedirectOutcome::Code(code) => {
            respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
            Ok(code)
        }
        RedirectOutcome::Failed(err) => {
            respond(&mut stream, "400 Bad Request", FAILURE_PAGE).await;
            Err(err)
        }
    };

    // The receiver is gone once another connection settled the attempt
    let _ = outcome_tx.send(outcome).await;
}

/// Read the request line and drain the headers; returns the request target
async fn read_request_target(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    loop {
        let mut header = String::new();
        let read = reader.read_line(&mut header).await?;
        if read == 0 || header == "\r\n" || header == "\n" {
            break;
        }
    }

    request_line
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed request line"))
}

fn parse_redirect(target: &str, expected_state: &str) -> RedirectOutcome {
    let Ok(url) = Url::parse(&format!("{}{}", LOOPBACK_REDIRECT, target)) else {
        return RedirectOutcome::Ignored;
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if code.is_none() && error.is_none() {
        return RedirectOutcome::Ignored;
    }

    // Error responses carry the state too; a mismatch means it is not ours
    if state.as_deref() != Some(expected_state) {
        warn!("Browser redirect carried an unexpected state value");
        return RedirectOutcome::Failed(GraphError::auth(
            AuthErrorKind::Denied,
            "Redirect state did not match the sign-in request",
        ));
    }

    if let Some(error) = error {
        let kind = if error == "access_denied" {
            AuthErrorKind::Cancelled
        } else {
            AuthErrorKind::Denied
        };
        let message = match description {
            Some(description) => format!("{}: {}", error, description),
            None => error,
        };
        return RedirectOutcome::Failed(GraphError::auth(kind, message));
    }

    match code {
        Some(code) => RedirectOutcome::Code(code),
        None => RedirectOutcome::Ignored,
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!("Failed to answer loopback request: {}", e);
    }
    let _ = stream.shutdown().await;
}

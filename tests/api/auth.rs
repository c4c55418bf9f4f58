//! Credential broker against a mocked identity platform

use graph_search_cli::api::auth::{BrowserLauncher, Credential, CredentialState, DeviceCodePrompt, StrategyKind};
use graph_search_cli::api::AuthErrorKind;
use graph_search_cli::config::AuthConfig;
use reqwest::Url;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT: &str = "contoso-tenant";

fn auth_config(server: &MockServer, device_code: bool) -> AuthConfig {
    AuthConfig {
        client_id: Some("client-123".to_string()),
        tenant_id: Some(TENANT.to_string()),
        graph_user_scopes: vec!["user.read".to_string(), "files.read".to_string()],
        run_device_code_flow: device_code,
        token_request_context_scopes: Some("user.read".to_string()),
        authority_host: server.uri(),
        redirect_port: 0,
        browser_timeout_secs: 5,
    }
}

fn scopes() -> Vec<String> {
    vec!["user.read".to_string(), "files.read".to_string()]
}

fn counting_prompt(calls: Arc<AtomicUsize>, seen_message: Arc<Mutex<Option<String>>>) -> DeviceCodePrompt {
    Arc::new(move |info, _cancel| {
        calls.fetch_add(1, Ordering::SeqCst);
        *seen_message.lock().unwrap() = Some(info.message.clone());
    })
}

async fn mount_device_code(server: &MockServer, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/{}/oauth2/v2.0/devicecode", TENANT)))
        .and(body_string_contains("client_id=client-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-code-xyz",
            "user_code": "ABCD-1234",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": expires_in,
            "interval": 0,
            "message": "To sign in, use a web browser to open the page https://microsoft.com/devicelogin and enter the code ABCD-1234 to authenticate."
        })))
        .mount(server)
        .await;
}

fn token_path() -> String {
    format!("/{}/oauth2/v2.0/token", TENANT)
}

#[tokio::test]
async fn test_device_code_flow_completes_after_pending() {
    let server = MockServer::start().await;
    mount_device_code(&server, 900).await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .and(body_string_contains("device_code=device-code-xyz"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "authorization_pending",
            "error_description": "AADSTS70016: OAuth 2.0 device flow error. Authorization is pending."
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "device-token",
            "expires_in": 3599
        })))
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let message = Arc::new(Mutex::new(None));
    let credential = Credential::initialize(
        &auth_config(&server, true),
        counting_prompt(calls.clone(), message.clone()),
    )
    .unwrap();
    assert_eq!(credential.kind(), StrategyKind::DeviceCode);

    let token = credential.get_token(&scopes()).await.unwrap();

    assert_eq!(token.token, "device-token");
    assert!(!token.is_expired());
    assert_eq!(credential.state(), CredentialState::Authenticated);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(message.lock().unwrap().as_deref().unwrap().contains("ABCD-1234"));

    // Second request: same strategy, served without a new prompt
    let again = credential.get_token(&scopes()).await.unwrap();
    assert_eq!(again.token, "device-token");
    assert_eq!(credential.kind(), StrategyKind::DeviceCode);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_device_code_slow_down_keeps_polling() {
    let server = MockServer::start().await;
    mount_device_code(&server, 900).await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "slow_down",
            "error_description": "AADSTS70016: polling too fast"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "patient-token",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = Credential::initialize(&auth_config(&server, true), Arc::new(|_, _| {})).unwrap();

    let started = Instant::now();
    let token = credential.get_token(&scopes()).await.unwrap();

    assert_eq!(token.token, "patient-token");
    // Interval 0 from the provider, plus the 5 s slow_down penalty
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test]
async fn test_device_code_cancelled_by_prompt() {
    let server = MockServer::start().await;
    mount_device_code(&server, 900).await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let prompt: DeviceCodePrompt = Arc::new(|_info, cancel| cancel.cancel());
    let credential = Credential::initialize(&auth_config(&server, true), prompt).unwrap();

    let err = credential.get_token(&scopes()).await.unwrap_err();

    assert!(err.is_authentication());
    assert_eq!(err.auth_kind(), Some(AuthErrorKind::Cancelled));
    assert_eq!(credential.state(), CredentialState::StrategySelected);
}

#[tokio::test]
async fn test_device_code_declined_by_user() {
    let server = MockServer::start().await;
    mount_device_code(&server, 900).await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "authorization_declined",
            "error_description": "AADSTS70000: the user declined"
        })))
        .mount(&server)
        .await;

    let credential = Credential::initialize(&auth_config(&server, true), Arc::new(|_, _| {})).unwrap();

    let err = credential.get_token(&scopes()).await.unwrap_err();
    assert_eq!(err.auth_kind(), Some(AuthErrorKind::Cancelled));
}

#[tokio::test]
async fn test_device_code_expired() {
    let server = MockServer::start().await;
    mount_device_code(&server, 0).await;

    let credential = Credential::initialize(&auth_config(&server, true), Arc::new(|_, _| {})).unwrap();

    let err = credential.get_token(&scopes()).await.unwrap_err();
    assert_eq!(err.auth_kind(), Some(AuthErrorKind::TimedOut));
}

#[tokio::test]
async fn test_token_response_without_value() {
    let server = MockServer::start().await;
    mount_device_code(&server, 900).await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .mount(&server)
        .await;

    let credential = Credential::initialize(&auth_config(&server, true), Arc::new(|_, _| {})).unwrap();

    let err = credential.get_token(&scopes()).await.unwrap_err();
    assert_eq!(err.auth_kind(), Some(AuthErrorKind::MissingToken));
}

/// Plays the browser: follows the authorization URL straight to the loopback redirect
fn redirecting_launcher(code: &'static str, tamper_state: bool) -> BrowserLauncher {
    Arc::new(move |url: &Url| {
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let redirect = pairs["redirect_uri"].replace("localhost", "127.0.0.1");
        let state = if tamper_state {
            "forged".to_string()
        } else {
            pairs["state"].clone()
        };
        tokio::spawn(async move {
            let _ = reqwest::get(format!("{}/favicon.ico", redirect)).await;
            let _ = reqwest::get(format!("{}/?code={}&state={}", redirect, code, state)).await;
        });
        Ok(())
    })
}

#[tokio::test]
async fn test_browser_flow_exchanges_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-42"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "browser-token",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = Credential::initialize_with_launcher(
        &auth_config(&server, false),
        Arc::new(|_, _| panic!("device code prompt must not run in browser mode")),
        redirecting_launcher("auth-code-42", false),
    )
    .unwrap();
    assert_eq!(credential.kind(), StrategyKind::InteractiveBrowser);

    let token = credential.get_token(&scopes()).await.unwrap();
    assert_eq!(token.token, "browser-token");
    assert_eq!(credential.state(), CredentialState::Authenticated);

    // Cached by the identity client, no second exchange
    let again = credential.get_token(&scopes()).await.unwrap();
    assert_eq!(again.token, "browser-token");
    assert_eq!(credential.kind(), StrategyKind::InteractiveBrowser);
}

#[tokio::test]
async fn test_browser_flow_survives_idle_preconnect() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .and(body_string_contains("code=auth-code-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "preconnect-token",
            "expires_in": 3599
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Open a socket that never sends a request, then follow the redirect on a second one
    let launcher: BrowserLauncher = Arc::new(|url: &Url| {
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let redirect = pairs["redirect_uri"].replace("localhost", "127.0.0.1");
        let state = pairs["state"].clone();
        let addr = redirect.trim_start_matches("http://").to_string();
        tokio::spawn(async move {
            let idle = tokio::net::TcpStream::connect(&addr).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = reqwest::get(format!("{}/?code=auth-code-7&state={}", redirect, state)).await;
            drop(idle);
        });
        Ok(())
    });

    let mut config = auth_config(&server, false);
    config.browser_timeout_secs = 5;
    let credential = Credential::initialize_with_launcher(&config, Arc::new(|_, _| {}), launcher).unwrap();

    let started = Instant::now();
    let token = credential.get_token(&scopes()).await.unwrap();

    assert_eq!(token.token, "preconnect-token");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_browser_flow_rejects_forged_state() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let credential = Credential::initialize_with_launcher(
        &auth_config(&server, false),
        Arc::new(|_, _| {}),
        redirecting_launcher("auth-code-42", true),
    )
    .unwrap();

    let err = credential.get_token(&scopes()).await.unwrap_err();
    assert_eq!(err.auth_kind(), Some(AuthErrorKind::Denied));
}

#[tokio::test]
async fn test_browser_flow_times_out() {
    let server = MockServer::start().await;
    let mut config = auth_config(&server, false);
    config.browser_timeout_secs = 1;

    let credential =
        Credential::initialize_with_launcher(&config, Arc::new(|_, _| {}), Arc::new(|_: &Url| Ok(()))).unwrap();

    let err = credential.get_token(&scopes()).await.unwrap_err();
    assert_eq!(err.auth_kind(), Some(AuthErrorKind::TimedOut));
    assert_eq!(credential.state(), CredentialState::StrategySelected);
}

#[tokio::test]
async fn test_browser_launch_failure_is_reported() {
    let server = MockServer::start().await;

    let credential = Credential::initialize_with_launcher(
        &auth_config(&server, false),
        Arc::new(|_, _| {}),
        Arc::new(|_: &Url| Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser"))),
    )
    .unwrap();

    let err = credential.get_token(&scopes()).await.unwrap_err();
    assert!(err.is_authentication());
    assert!(err.to_string().contains("no browser"));
}

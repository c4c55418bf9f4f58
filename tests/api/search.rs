//! Graph client search and profile calls against a mocked Graph host

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use graph_search_cli::api::search::UNKNOWN_SOURCE;
use graph_search_cli::api::{AccessToken, ApiVersion, AuthErrorKind, GraphClient, GraphError, TokenCredential};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticCredential;

#[async_trait]
impl TokenCredential for StaticCredential {
    async fn get_token(&self, _scopes: &[String]) -> graph_search_cli::api::Result<AccessToken> {
        Ok(AccessToken::new("test-token", Utc::now() + Duration::hours(1)))
    }
}

struct FailingCredential;

#[async_trait]
impl TokenCredential for FailingCredential {
    async fn get_token(&self, _scopes: &[String]) -> graph_search_cli::api::Result<AccessToken> {
        Err(GraphError::auth(AuthErrorKind::Cancelled, "user closed the prompt"))
    }
}

fn client(server: &MockServer, version: ApiVersion) -> GraphClient {
    GraphClient::with_base_url(
        Arc::new(StaticCredential),
        vec!["https://graph.microsoft.com/user.read".to_string()],
        version,
        &server.uri(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_v1_search_flattens_hits() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1.0/search/query"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header_exists("client-request-id"))
        .and(body_partial_json(json!({
            "requests": [{
                "entityTypes": ["driveItem", "list", "listItem"],
                "query": {"queryString": "budget"},
                "from": 0,
                "size": 500
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"searchTerms": ["budget"]},
                {
                    "searchTerms": ["budget"],
                    "hitsContainers": [{
                        "total": 2,
                        "moreResultsAvailable": false,
                        "hits": [
                            {
                                "hitId": "01ABC",
                                "rank": 1,
                                "summary": "<c0>Budget</c0> for Q3",
                                "resource": {
                                    "@odata.type": "#microsoft.graph.driveItem",
                                    "name": "Budget.xlsx",
                                    "webUrl": "https://contoso.sharepoint.com/Budget.xlsx",
                                    "createdBy": {"user": {"displayName": "Adele Vance", "email": "adele@contoso.com"}},
                                    "lastModifiedBy": {"user": {"displayName": "Megan Bowen"}}
                                }
                            },
                            {
                                "hitId": "02DEF",
                                "rank": 2,
                                "summary": "Budget list entry",
                                "resource": {"@odata.type": "#microsoft.graph.listItem", "id": "7"}
                            }
                        ]
                    }]
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hits = client(&server, ApiVersion::V1).search("budget").await?;

    assert_eq!(hits.len(), 2);

    assert_eq!(hits[0].index, 0);
    assert_eq!(hits[0].rank, Some(1));
    assert_eq!(hits[0].title.as_deref(), Some("Budget.xlsx"));
    assert_eq!(hits[0].created_by.as_deref(), Some("adele@contoso.com"));
    assert_eq!(hits[0].last_modified_by.as_deref(), Some("Megan Bowen"));
    assert_eq!(
        hits[0].location.as_deref(),
        Some("https://contoso.sharepoint.com/Budget.xlsx")
    );
    assert_eq!(hits[0].data_source, "#microsoft.graph.driveItem");

    assert_eq!(hits[1].index, 1);
    assert_eq!(hits[1].summary.as_deref(), Some("Budget list entry"));
    assert_eq!(hits[1].title, None);
    assert_eq!(hits[1].data_source, UNKNOWN_SOURCE);

    Ok(())
}

#[tokio::test]
async fn test_search_without_results() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1.0/search/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;

    let hits = client(&server, ApiVersion::V1).search("nothing here").await?;
    assert!(hits.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_search_provider_error_surfaces_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1.0/search/query"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": "Forbidden",
                "message": "Access to ListItem in Graph API requires the following permissions: Sites.Read.All"
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server, ApiVersion::V1).search("budget").await.unwrap_err();

    assert!(err.is_search());
    assert!(err.to_string().contains("Sites.Read.All"));
}

#[tokio::test]
async fn test_beta_search_accepts_legacy_fields() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/beta/search/query"))
        .and(body_partial_json(json!({
            "requests": [{"query": {"queryString": "roadmap"}, "size": 500}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "searchTerms": ["roadmap"],
                "hitsContainers": [{
                    "total": 1,
                    "moreResultsAvailable": true,
                    "hits": [{
                        "_id": "legacy-1",
                        "_score": 4,
                        "_summary": "<c0>Roadmap</c0> draft",
                        "_source": {
                            "@odata.type": "#microsoft.graph.driveItem",
                            "name": "Roadmap.docx",
                            "webUrl": "https://contoso.sharepoint.com/Roadmap.docx",
                            "createdBy": {"user": {"displayName": "Lee Gu"}}
                        }
                    }]
                }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let graph = client(&server, ApiVersion::Beta);
    assert!(graph.base_url().ends_with("/beta"));

    let hits = graph.search("roadmap").await?;

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].index, 0);
    assert_eq!(hits[0].rank, Some(4));
    assert_eq!(hits[0].title.as_deref(), Some("Roadmap.docx"));
    assert_eq!(hits[0].created_by.as_deref(), Some("Lee Gu"));
    assert_eq!(hits[0].summary.as_deref(), Some("<c0>Roadmap</c0> draft"));

    Ok(())
}

#[tokio::test]
async fn test_current_user_profile() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .and(query_param("$select", "displayName,mail,userPrincipalName"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "displayName": "Adele Vance",
            "mail": null,
            "userPrincipalName": "AdeleV@contoso.onmicrosoft.com"
        })))
        .mount(&server)
        .await;

    let profile = client(&server, ApiVersion::V1)
        .current_user()
        .await?
        .expect("profile should be returned");

    assert_eq!(profile.display_name.as_deref(), Some("Adele Vance"));
    assert_eq!(profile.email(), Some("AdeleV@contoso.onmicrosoft.com"));

    Ok(())
}

#[tokio::test]
async fn test_current_user_rejected_token() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "InvalidAuthenticationToken", "message": "Access token has expired"}
        })))
        .mount(&server)
        .await;

    let profile = client(&server, ApiVersion::V1).current_user().await?;
    assert!(profile.is_none());

    Ok(())
}

#[tokio::test]
async fn test_current_user_without_session() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let graph = GraphClient::with_base_url(
        Arc::new(FailingCredential),
        vec!["https://graph.microsoft.com/user.read".to_string()],
        ApiVersion::V1,
        &server.uri(),
    )?;

    assert!(graph.current_user().await?.is_none());

    // Search propagates the same failure instead of hiding it
    let err = graph.search("budget").await.unwrap_err();
    assert_eq!(err.auth_kind(), Some(AuthErrorKind::Cancelled));

    Ok(())
}

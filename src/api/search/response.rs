//! Search responses
//!
//! The stable and preview APIs return slightly different hit shapes. Each has
//! its own wire types and an adapter into [`SearchResponse`], the only shape
//! the flattener understands.

use log::warn;
use serde::Deserialize;
use serde_json::Value;

/// Canonical response: one entry per request in the body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub entries: Vec<ResponseEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseEntry {
    pub search_terms: Vec<String>,
    pub hits_containers: Vec<HitsContainer>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitsContainer {
    pub hits: Vec<RawHit>,
    pub total: Option<u64>,
    pub more_results_available: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub hit_id: Option<String>,
    pub rank: Option<i64>,
    pub summary: Option<String>,
    pub resource: HitResource,
}

/// The polymorphic `resource` of a hit; only drive items are interpreted
#[derive(Debug, Clone, PartialEq)]
pub enum HitResource {
    DriveItem(DriveItem),
    Other { odata_type: Option<String> },
}

impl HitResource {
    /// Resolve from the raw JSON by `@odata.type`
    pub fn from_value(value: Option<Value>) -> Self {
        let Some(value) = value else {
            return Self::Other { odata_type: None };
        };

        let odata_type = value
            .get("@odata.type")
            .and_then(|t| t.as_str())
            .map(str::to_string);

        let is_drive_item = odata_type
            .as_deref()
            .is_some_and(|t| t.to_ascii_lowercase().ends_with("driveitem"));

        if is_drive_item {
            match serde_json::from_value::<DriveItem>(value) {
                Ok(item) => return Self::DriveItem(item),
                Err(e) => warn!("Could not read driveItem resource: {}", e),
            }
        }

        Self::Other { odata_type }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    #[serde(rename = "@odata.type")]
    pub odata_type: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub web_url: Option<String>,
    pub created_by: Option<IdentitySet>,
    pub last_modified_by: Option<IdentitySet>,
    pub created_by_user: Option<DirectoryUser>,
    pub last_modified_by_user: Option<DirectoryUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySet {
    pub user: Option<Identity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
}

impl DriveItem {
    pub fn created_by_identity(&self) -> Option<String> {
        resolve_identity(self.created_by_user.as_ref(), self.created_by.as_ref())
    }

    pub fn last_modified_by_identity(&self) -> Option<String> {
        resolve_identity(self.last_modified_by_user.as_ref(), self.last_modified_by.as_ref())
    }
}

/// Principal name, then display name, then the identity set's email or name
fn resolve_identity(user: Option<&DirectoryUser>, identity_set: Option<&IdentitySet>) -> Option<String> {
    user.and_then(|u| u.user_principal_name.clone().or_else(|| u.display_name.clone()))
        .or_else(|| {
            identity_set
                .and_then(|set| set.user.as_ref())
                .and_then(|i| i.email.clone().or_else(|| i.display_name.clone()))
        })
}

/// Stable API wire shapes
pub mod v1 {
    use super::*;

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct QueryPostResponse {
        pub value: Option<Vec<SearchResponse>>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchResponse {
        pub search_terms: Option<Vec<String>>,
        pub hits_containers: Option<Vec<SearchHitsContainer>>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchHitsContainer {
        pub hits: Option<Vec<SearchHit>>,
        pub total: Option<u64>,
        pub more_results_available: Option<bool>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchHit {
        pub hit_id: Option<String>,
        pub rank: Option<i64>,
        pub summary: Option<String>,
        pub content_source: Option<String>,
        pub resource: Option<Value>,
    }

    impl From<QueryPostResponse> for super::SearchResponse {
        fn from(response: QueryPostResponse) -> Self {
            let entries = response
                .value
                .unwrap_or_default()
                .into_iter()
                .map(|entry| super::ResponseEntry {
                    search_terms: entry.search_terms.unwrap_or_default(),
                    hits_containers: entry
                        .hits_containers
                        .unwrap_or_default()
                        .into_iter()
                        .map(|container| super::HitsContainer {
                            hits: container
                                .hits
                                .unwrap_or_default()
                                .into_iter()
                                .map(|hit| super::RawHit {
                                    hit_id: hit.hit_id,
                                    rank: hit.rank,
                                    summary: hit.summary,
                                    resource: HitResource::from_value(hit.resource),
                                })
                                .collect(),
                            total: container.total,
                            more_results_available: container.more_results_available.unwrap_or(false),
                        })
                        .collect(),
                })
                .collect();

            Self { entries }
        }
    }
}

/// Preview API wire shapes
///
/// Older beta payloads use `_id`, `_score`, `_summary` and `_source` instead
/// of the v1 names; both spellings are accepted.
pub mod beta {
    use super::*;

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct QueryPostResponse {
        pub value: Option<Vec<SearchResponse>>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchResponse {
        pub search_terms: Option<Vec<String>>,
        pub hits_containers: Option<Vec<SearchHitsContainer>>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchHitsContainer {
        pub hits: Option<Vec<SearchHit>>,
        pub total: Option<u64>,
        pub more_results_available: Option<bool>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchHit {
        pub hit_id: Option<String>,
        pub rank: Option<i64>,
        pub summary: Option<String>,
        pub content_source: Option<String>,
        pub result_template_id: Option<String>,
        pub is_collapsed: Option<bool>,
        pub resource: Option<Value>,
        #[serde(rename = "_id")]
        pub legacy_id: Option<String>,
        #[serde(rename = "_score")]
        pub legacy_score: Option<i64>,
        #[serde(rename = "_summary")]
        pub legacy_summary: Option<String>,
        #[serde(rename = "_source")]
        pub legacy_source: Option<Value>,
    }

    impl From<SearchHit> for super::RawHit {
        fn from(hit: SearchHit) -> Self {
            Self {
                hit_id: hit.hit_id.or(hit.legacy_id),
                rank: hit.rank.or(hit.legacy_score),
                summary: hit.summary.or(hit.legacy_summary),
                resource: HitResource::from_value(hit.resource.or(hit.legacy_source)),
            }
        }
    }

    impl From<QueryPostResponse> for super::SearchResponse {
        fn from(response: QueryPostResponse) -> Self {
            let entries = response
                .value
                .unwrap_or_default()
                .into_iter()
                .map(|entry| super::ResponseEntry {
                    search_terms: entry.search_terms.unwrap_or_default(),
                    hits_containers: entry
                        .hits_containers
                        .unwrap_or_default()
                        .into_iter()
                        .map(|container| super::HitsContainer {
                            hits: container
                                .hits
                                .unwrap_or_default()
                                .into_iter()
                                .map(super::RawHit::from)
                                .collect(),
                            total: container.total,
                            more_results_available: container.more_results_available.unwrap_or(false),
                        })
                        .collect(),
                })
                .collect();

            Self { entries }
        }
    }
}

//! Search request bodies for `POST /search/query`
//!
//! The stable and preview APIs accept the same body shape but cover different
//! entity types, so each gets its own builder. Only the first page is ever
//! requested.

use serde::{Deserialize, Serialize};

use crate::api::constants::SEARCH_MAX_PAGE_SIZE;

/// Which Graph API surface to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    V1,
    Beta,
}

impl ApiVersion {
    pub fn from_beta_flag(use_beta: bool) -> Self {
        if use_beta { Self::Beta } else { Self::V1 }
    }

    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::V1 => crate::api::constants::V1_SEGMENT,
            Self::Beta => crate::api::constants::BETA_SEGMENT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    DriveItem,
    List,
    ListItem,
    Site,
    Drive,
}

/// Entity types queried on v1.0
///
/// `site` needs Sites.Read.All, which a user-consented app usually lacks.
pub const V1_ENTITY_TYPES: &[EntityType] = &[EntityType::DriveItem, EntityType::List, EntityType::ListItem];

/// Entity types queried on beta
pub const BETA_ENTITY_TYPES: &[EntityType] = &[
    EntityType::List,
    EntityType::ListItem,
    EntityType::Site,
    EntityType::Drive,
    EntityType::DriveItem,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query_string: String,
}

/// One entry of the `requests` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequestSpec {
    pub entity_types: Vec<EntityType>,
    pub query: SearchQuery,
    pub from: u32,
    pub size: u32,
}

impl SearchRequestSpec {
    /// First page, provider-maximum page size
    pub fn new(query_term: impl Into<String>, entity_types: &[EntityType]) -> Self {
        Self {
            entity_types: entity_types.to_vec(),
            query: SearchQuery {
                query_string: query_term.into(),
            },
            from: 0,
            size: SEARCH_MAX_PAGE_SIZE,
        }
    }

    pub fn query_term(&self) -> &str {
        &self.query.query_string
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPostRequestBody {
    pub requests: Vec<SearchRequestSpec>,
}

impl QueryPostRequestBody {
    pub fn single(spec: SearchRequestSpec) -> Self {
        Self { requests: vec![spec] }
    }
}

/// OneDrive and SharePoint content the user can read, stable API
pub fn build_v1_request(query_term: &str) -> QueryPostRequestBody {
    QueryPostRequestBody::single(SearchRequestSpec::new(query_term, V1_ENTITY_TYPES))
}

/// Same search on the preview API, including sites and drives
pub fn build_beta_request(query_term: &str) -> QueryPostRequestBody {
    QueryPostRequestBody::single(SearchRequestSpec::new(query_term, BETA_ENTITY_TYPES))
}

pub fn build_request(query_term: &str, version: ApiVersion) -> QueryPostRequestBody {
    match version {
        ApiVersion::V1 => build_v1_request(query_term),
        ApiVersion::Beta => build_beta_request(query_term),
    }
}

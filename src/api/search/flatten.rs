use serde::Serialize;

use super::response::{HitResource, SearchResponse};

/// Data-source tag for hits whose resource is not a drive item
pub const UNKNOWN_SOURCE: &str = "UNKNOWN SOURCE";

/// One display-ready search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Zero-based position in the flattened output
    pub index: usize,
    pub rank: Option<i64>,
    pub title: Option<String>,
    pub created_by: Option<String>,
    pub last_modified_by: Option<String>,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub data_source: String,
}

/// Entries, then containers, then hits, in source order
///
/// Empty entries and containers contribute nothing. The index is assigned
/// here and ignores anything the provider numbered.
pub fn flatten(response: &SearchResponse) -> Vec<SearchHit> {
    response
        .entries
        .iter()
        .flat_map(|entry| entry.hits_containers.iter())
        .flat_map(|container| container.hits.iter())
        .enumerate()
        .map(|(index, hit)| {
            let mut flat = SearchHit {
                index,
                rank: hit.rank,
                title: None,
                created_by: None,
                last_modified_by: None,
                summary: hit.summary.clone(),
                location: None,
                data_source: UNKNOWN_SOURCE.to_string(),
            };

            if let HitResource::DriveItem(item) = &hit.resource {
                flat.title = item.name.clone();
                flat.created_by = item.created_by_identity();
                flat.last_modified_by = item.last_modified_by_identity();
                flat.location = item.web_url.clone();
                if let Some(odata_type) = &item.odata_type {
                    flat.data_source = odata_type.clone();
                }
            }

            flat
        })
        .collect()
}

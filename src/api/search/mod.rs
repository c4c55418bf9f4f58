//! Microsoft Search over OneDrive and SharePoint
//!
//! Request builders per API version, response adapters into one canonical
//! shape, and the flattener that turns that shape into display-ready hits.

pub mod flatten;
pub mod request;
pub mod response;

pub use flatten::{SearchHit, UNKNOWN_SOURCE, flatten};
pub use request::{
    ApiVersion, EntityType, QueryPostRequestBody, SearchRequestSpec, build_beta_request, build_request,
    build_v1_request,
};
pub use response::{HitResource, SearchResponse};

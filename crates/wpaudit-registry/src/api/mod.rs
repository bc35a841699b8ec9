//! WordPress.org plugin registry API response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body of `action=query_plugins`
///
/// Both sections are optional at the type level so that a body missing one of
/// them can be reported as malformed instead of failing deserialization.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryPluginsResponse {
    /// Paging metadata
    pub info: Option<PageInfo>,
    /// Plugin descriptors, kept raw so one bad entry does not poison the page
    pub plugins: Option<Vec<Value>>,
}

/// Paging metadata of a listing response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageInfo {
    /// Current page number
    pub page: Option<u32>,
    /// Total number of pages at the requested page size
    pub pages: u32,
    /// Total number of plugins in the registry
    pub results: Option<u64>,
}

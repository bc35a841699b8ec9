//! Sequential walk over the registry's paged plugin listing
//!
//! The pager learns the page count from a discovery request for page 1 and
//! then requests pages `1..=total_pages` one at a time. The first failure
//! (transport error, non-200 status, malformed body) ends the walk.

use serde_json::Value;
use tracing::{debug, error, warn};

use wpaudit_core::error::AuditError;
use wpaudit_core::types::PackageDescriptor;

use crate::api::QueryPluginsResponse;
use crate::client::RegistryClient;
use crate::RegistryResult;

/// One page of the listing
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number
    pub number: u32,
    /// Page count reported by the discovery request
    pub total_pages: u32,
    /// Descriptors in registry order
    pub plugins: Vec<PackageDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerState {
    NotStarted,
    Walking { next: u32, total: u32 },
    Done,
}

/// Cursor over the registry listing
pub struct PagePager<'a> {
    client: &'a RegistryClient,
    page_size: u32,
    browse: Option<String>,
    state: PagerState,
    total_pages: Option<u32>,
    pages_yielded: u32,
}

impl<'a> PagePager<'a> {
    /// Create a pager requesting `page_size` plugins per page
    pub fn new(client: &'a RegistryClient, page_size: u32) -> Self {
        Self {
            client,
            page_size,
            browse: None,
            state: PagerState::NotStarted,
            total_pages: None,
            pages_yielded: 0,
        }
    }

    /// Restrict the listing to a registry browse category (e.g. `popular`)
    pub fn with_browse(mut self, browse: Option<String>) -> Self {
        self.browse = browse;
        self
    }

    /// Page count learned from the discovery request, once known
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    /// Number of pages handed out so far
    pub fn pages_yielded(&self) -> u32 {
        self.pages_yielded
    }

    /// Fetch the next page, or `None` when the walk is over
    pub async fn next_page(&mut self) -> Option<Page> {
        if self.state == PagerState::NotStarted {
            self.state = self.discover().await;
        }

        let (number, total) = match self.state {
            PagerState::Walking { next, total } if next <= total => (next, total),
            _ => {
                self.state = PagerState::Done;
                return None;
            }
        };

        match self.fetch_page(number).await {
            Ok(response) => {
                let plugins = self.collect_descriptors(number, response.plugins.unwrap_or_default());
                self.state = PagerState::Walking { next: number + 1, total };
                self.pages_yielded += 1;
                debug!(page = number, total_pages = total, plugins = plugins.len(), "page fetched");
                Some(Page {
                    number,
                    total_pages: total,
                    plugins,
                })
            }
            Err(e) => {
                error!(page = number, error = %e, "Failed to retrieve page {}, stopping", number);
                self.state = PagerState::Done;
                None
            }
        }
    }

    /// Request page 1 only to learn the page count
    async fn discover(&mut self) -> PagerState {
        let response = match self.fetch_page(1).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Failed to retrieve the plugin information");
                return PagerState::Done;
            }
        };

        match response.info {
            Some(info) => {
                debug!(total_pages = info.pages, results = ?info.results, "listing discovered");
                self.total_pages = Some(info.pages);
                PagerState::Walking { next: 1, total: info.pages }
            }
            None => {
                error!("Failed to retrieve the plugin information: response has no 'info' section");
                PagerState::Done
            }
        }
    }

    async fn fetch_page(&self, page: u32) -> RegistryResult<QueryPluginsResponse> {
        let url = self.client.query_plugins_url(page, self.page_size, self.browse.as_deref());
        let fetched = self.client.fetch(&url).await?;

        if fetched.status != reqwest::StatusCode::OK {
            return Err(AuditError::HttpStatus {
                url,
                status: fetched.status.as_u16(),
            });
        }

        let parsed: QueryPluginsResponse = serde_json::from_slice(&fetched.body)
            .map_err(|e| AuditError::MalformedResponse {
                page,
                reason: e.to_string(),
            })?;

        if parsed.plugins.is_none() {
            return Err(AuditError::MalformedResponse {
                page,
                reason: "missing 'plugins' array".to_string(),
            });
        }

        Ok(parsed)
    }

    fn collect_descriptors(&self, page: u32, entries: Vec<Value>) -> Vec<PackageDescriptor> {
        let mut plugins = Vec::with_capacity(entries.len());

        for entry in entries {
            match serde_json::from_value::<PackageDescriptor>(entry) {
                Ok(descriptor) => plugins.push(descriptor),
                Err(e) => error!(page, error = %e, "Skipping unreadable plugin descriptor"),
            }
        }

        let limit = self.page_size as usize;
        if plugins.len() > limit {
            warn!(page, returned = plugins.len(), page_size = limit, "registry returned an oversized page, truncating");
            plugins.truncate(limit);
        }

        plugins
    }
}

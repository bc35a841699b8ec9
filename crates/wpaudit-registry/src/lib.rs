//! WordPress.org plugin registry client for wpaudit
//!
//! This crate provides HTTP client functionality for walking the paged plugin
//! listing and downloading plugin archives, with bounded retry on transient
//! network failures, plus the eligibility rules deciding which plugins are
//! worth downloading.

pub mod client;
pub mod api;
pub mod pager;
pub mod filter;

// Re-export main types
pub use client::{Fetched, RegistryClient, RetryConfig, DEFAULT_BASE_URL};
pub use api::{QueryPluginsResponse, PageInfo};
pub use pager::{Page, PagePager};
pub use filter::{Eligibility, EligibilityFilter, parse_last_updated};

use wpaudit_core::error::AuditError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, AuditError>;

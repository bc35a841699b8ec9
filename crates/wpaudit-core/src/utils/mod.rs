//! Utility functions and helpers.
//!
//! Common functionality used across multiple wpaudit crates.

pub mod path;

// Re-export commonly used utilities
pub use path::{is_hidden, is_safe_path, normalize_path, safe_join};

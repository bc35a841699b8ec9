//! Package descriptor types.
//!
//! Defines the registry's metadata record for one plugin.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Registry metadata for a single plugin.
///
/// Only the fields the pipeline acts on are typed; everything else the
/// registry sends is preserved in `extra` so the stored record is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    /// Unique plugin identifier, also the directory name of the unpacked archive
    pub slug: String,
    /// Human readable plugin name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Latest published version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Archive URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    /// Last update time, e.g. `2024-06-01 10:00am GMT`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Raw install count; usually an integer but not guaranteed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_installs: Option<Value>,
    /// Remaining registry fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageDescriptor {
    /// Create a descriptor with only the slug set
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: None,
            version: None,
            download_link: None,
            last_updated: None,
            active_installs: None,
            extra: Map::new(),
        }
    }

    /// Install count as a non-negative integer.
    ///
    /// Accepts JSON integers and decimal strings. Returns `None` when the
    /// field is absent, negative, fractional or otherwise unparsable.
    pub fn active_installs(&self) -> Option<u64> {
        match self.active_installs.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
    }

    /// Raw install value rendered for log messages
    pub fn active_installs_display(&self) -> String {
        match &self.active_installs {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "None".to_string(),
        }
    }

    /// The full record as JSON, for storage
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"slug\":{:?}}}", self.slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_registry_entry() {
        let value = json!({
            "name": "Foo Forms",
            "slug": "foo",
            "version": "2.1.0",
            "download_link": "https://downloads.wordpress.org/plugin/foo.2.1.0.zip",
            "last_updated": "2024-06-01 10:00am GMT",
            "active_installs": 5000,
            "rating": 92
        });

        let desc: PackageDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(desc.slug, "foo");
        assert_eq!(desc.name.as_deref(), Some("Foo Forms"));
        assert_eq!(desc.active_installs(), Some(5000));
        assert_eq!(desc.extra.get("rating"), Some(&json!(92)));
    }

    #[test]
    fn test_active_installs_variants() {
        let mut desc = PackageDescriptor::new("foo");
        assert_eq!(desc.active_installs(), None);

        desc.active_installs = Some(json!("1200"));
        assert_eq!(desc.active_installs(), Some(1200));

        desc.active_installs = Some(json!(-5));
        assert_eq!(desc.active_installs(), None);

        desc.active_installs = Some(json!(10.5));
        assert_eq!(desc.active_installs(), None);

        desc.active_installs = Some(json!("lots"));
        assert_eq!(desc.active_installs(), None);

        desc.active_installs = Some(Value::Null);
        assert_eq!(desc.active_installs(), None);
    }

    #[test]
    fn test_json_keeps_extra_fields() {
        let value = json!({ "slug": "bar", "tested": "6.5" });
        let desc: PackageDescriptor = serde_json::from_value(value).unwrap();
        let stored: Value = serde_json::from_str(&desc.to_json()).unwrap();
        assert_eq!(stored["tested"], "6.5");
        assert_eq!(stored["slug"], "bar");
    }
}

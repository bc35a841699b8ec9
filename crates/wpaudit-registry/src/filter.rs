//! Download eligibility rules
//!
//! A plugin is downloaded only when it is both recently maintained and
//! reasonably popular. Descriptors with unreadable dates or install counts are
//! rejected: bad data never defaults to "download".

use chrono::{Datelike, NaiveDateTime, Utc};
use tracing::error;

use wpaudit_core::types::PackageDescriptor;

/// Timestamp layout used by the registry, without the trailing zone name
const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %I:%M%p";

/// Outcome of the eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Both gates passed
    Eligible,
    /// Last update falls outside the maintenance window
    Stale { year: i32 },
    /// Too few active installs
    Unpopular { installs: u64 },
    /// `last_updated` missing or unparsable
    InvalidDate,
    /// `active_installs` missing or not a non-negative integer
    InvalidInstalls,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Recency and popularity gates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityFilter {
    /// Minimum `active_installs` to qualify
    pub min_active_installs: u64,
    /// Oldest accepted update year is `current_year - max_age_years`
    pub max_age_years: i32,
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self {
            min_active_installs: 1000,
            max_age_years: 2,
        }
    }
}

impl EligibilityFilter {
    /// Check a descriptor against the wall clock
    pub fn is_eligible(&self, descriptor: &PackageDescriptor) -> bool {
        self.check_now(descriptor).is_eligible()
    }

    /// [`check`](Self::check) with the year read from the clock at call time
    pub fn check_now(&self, descriptor: &PackageDescriptor) -> Eligibility {
        self.check(descriptor, Utc::now().year())
    }

    /// Check a descriptor as if the current year were `current_year`
    pub fn check(&self, descriptor: &PackageDescriptor, current_year: i32) -> Eligibility {
        let raw_date = descriptor.last_updated.as_deref().unwrap_or("");
        let updated = match parse_last_updated(raw_date) {
            Some(updated) => updated,
            None => {
                error!(slug = %descriptor.slug, "Invalid date format for plugin {}: {}", descriptor.slug, raw_date);
                return Eligibility::InvalidDate;
            }
        };

        if updated.year() < current_year - self.max_age_years {
            return Eligibility::Stale { year: updated.year() };
        }

        let installs = match descriptor.active_installs() {
            Some(installs) => installs,
            None => {
                error!(
                    slug = %descriptor.slug,
                    "Invalid active installs format for plugin {}: {}",
                    descriptor.slug,
                    descriptor.active_installs_display()
                );
                return Eligibility::InvalidInstalls;
            }
        };

        if installs < self.min_active_installs {
            return Eligibility::Unpopular { installs };
        }

        Eligibility::Eligible
    }
}

/// Parse the registry's `YYYY-MM-DD HH:MMam TZ` timestamps.
///
/// The zone abbreviation must be alphabetic but is otherwise ignored; the
/// registry always reports GMT.
pub fn parse_last_updated(value: &str) -> Option<NaiveDateTime> {
    let (stamp, zone) = value.trim().rsplit_once(' ')?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    NaiveDateTime::parse_from_str(stamp.trim_end(), LAST_UPDATED_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn descriptor(last_updated: &str, installs: serde_json::Value) -> PackageDescriptor {
        let mut desc = PackageDescriptor::new("foo");
        desc.download_link = Some("http://x/foo.zip".to_string());
        desc.last_updated = Some(last_updated.to_string());
        desc.active_installs = Some(installs);
        desc
    }

    #[test]
    fn test_parse_last_updated() {
        let parsed = parse_last_updated("2024-06-01 10:00am UTC").unwrap();
        assert_eq!(parsed.to_string(), "2024-06-01 10:00:00");

        let parsed = parse_last_updated("2023-11-30 4:05pm GMT").unwrap();
        assert_eq!(parsed.to_string(), "2023-11-30 16:05:00");

        assert!(parse_last_updated("2023-11-30 04:05PM GMT").is_some());
        assert!(parse_last_updated("2023-11-30 04:05pm").is_none());
        assert!(parse_last_updated("2023-11-30 16:05 GMT").is_none());
        assert!(parse_last_updated("2023-11-30 04:05pm +0000").is_none());
        assert!(parse_last_updated("30/11/2023 04:05pm GMT").is_none());
        assert!(parse_last_updated("").is_none());
    }

    #[test]
    fn test_recent_and_popular_is_eligible() {
        let filter = EligibilityFilter::default();
        let desc = descriptor("2024-06-01 10:00am UTC", json!(5000));
        assert_eq!(filter.check(&desc, 2025), Eligibility::Eligible);
    }

    #[test]
    fn test_unpopular_is_rejected() {
        let filter = EligibilityFilter::default();
        let desc = descriptor("2024-06-01 10:00am UTC", json!(50));
        assert_eq!(filter.check(&desc, 2025), Eligibility::Unpopular { installs: 50 });
    }

    #[test]
    fn test_stale_is_rejected_regardless_of_installs() {
        let filter = EligibilityFilter::default();
        let desc = descriptor("2019-01-01 09:00am UTC", json!(5_000_000));
        assert_eq!(filter.check(&desc, 2025), Eligibility::Stale { year: 2019 });
    }

    #[test]
    fn test_window_boundary() {
        let filter = EligibilityFilter::default();
        assert!(filter.check(&descriptor("2023-01-01 12:00am GMT", json!(1000)), 2025).is_eligible());
        assert!(!filter.check(&descriptor("2022-12-31 11:59pm GMT", json!(1000)), 2025).is_eligible());
        assert_eq!(
            filter.check(&descriptor("2024-01-01 12:00am GMT", json!(999)), 2025),
            Eligibility::Unpopular { installs: 999 }
        );
    }

    #[test]
    fn test_invalid_fields_fail_closed() {
        let filter = EligibilityFilter::default();

        assert_eq!(filter.check(&descriptor("last week", json!(5000)), 2025), Eligibility::InvalidDate);
        assert_eq!(
            filter.check(&descriptor("2024-06-01 10:00am UTC", json!("many")), 2025),
            Eligibility::InvalidInstalls
        );

        let mut missing = descriptor("2024-06-01 10:00am UTC", json!(5000));
        missing.active_installs = None;
        assert_eq!(filter.check(&missing, 2025), Eligibility::InvalidInstalls);

        let mut no_date = descriptor("", json!(5000));
        no_date.last_updated = None;
        assert_eq!(filter.check(&no_date, 2025), Eligibility::InvalidDate);
    }

    #[test]
    fn test_check_now_follows_the_clock() {
        let filter = EligibilityFilter::default();
        let oldest = Utc::now().year() - filter.max_age_years;

        let inside = descriptor(&format!("{}-01-01 12:00am GMT", oldest), json!(1000));
        assert_eq!(filter.check_now(&inside), Eligibility::Eligible);
        assert!(filter.is_eligible(&inside));

        let outside = descriptor(&format!("{}-12-31 11:59pm GMT", oldest - 1), json!(1000));
        assert_eq!(filter.check_now(&outside), Eligibility::Stale { year: oldest - 1 });
    }

    #[test]
    fn test_string_install_count_is_accepted() {
        let filter = EligibilityFilter::default();
        let desc = descriptor("2024-06-01 10:00am UTC", json!("20000"));
        assert!(filter.check(&desc, 2025).is_eligible());
    }

    #[test]
    fn test_wall_clock_check_accepts_fresh_plugin() {
        let filter = EligibilityFilter::default();
        let today = Utc::now().format("%Y-%m-%d %I:%M%P").to_string();
        let desc = descriptor(&format!("{} GMT", today), json!(10_000));
        assert!(filter.is_eligible(&desc));
    }

    proptest! {
        #[test]
        fn prop_installs_below_threshold_never_eligible(
            year in 2000i32..2100,
            installs in 0u64..1000,
        ) {
            let filter = EligibilityFilter::default();
            let desc = descriptor(&format!("{}-03-15 08:30am GMT", year), json!(installs));
            prop_assert!(!filter.check(&desc, year).is_eligible());
        }

        #[test]
        fn prop_recent_and_popular_always_eligible(
            current in 2000i32..2100,
            age in 0i32..=2,
            installs in 1000u64..10_000_000,
        ) {
            let filter = EligibilityFilter::default();
            let desc = descriptor(&format!("{}-03-15 08:30pm GMT", current - age), json!(installs));
            prop_assert_eq!(filter.check(&desc, current), Eligibility::Eligible);
        }

        #[test]
        fn prop_older_than_window_never_eligible(
            current in 2000i32..2100,
            age in 3i32..20,
            installs in 0u64..10_000_000,
        ) {
            let filter = EligibilityFilter::default();
            let desc = descriptor(&format!("{}-07-01 01:00am GMT", current - age), json!(installs));
            prop_assert!(!filter.check(&desc, current).is_eligible());
        }
    }
}

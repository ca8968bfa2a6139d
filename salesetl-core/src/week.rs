//! Monday-anchored weekly bucketing.
//!
//! Each aggregation window covers the 7 days ending on a Monday, and the
//! window is labeled by that Monday. A Monday maps to itself; Tuesday
//! through Sunday map to the following Monday.

use chrono::{Datelike, Duration, NaiveDate};

/// The Monday on which the weekly window containing `date` ends.
pub fn week_ending_monday(date: NaiveDate) -> NaiveDate {
    let days_ahead = (7 - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(i64::from(days_ahead))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use proptest::prelude::*;

    #[test]
    fn monday_maps_to_itself() {
        // 2024-01-01 is a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(week_ending_monday(monday), monday);
    }

    #[test]
    fn tuesday_through_sunday_map_to_next_monday() {
        let next_monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        for day in 2..=7 {
            let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
            assert_eq!(week_ending_monday(date), next_monday, "day {day}");
        }
    }

    #[test]
    fn consecutive_weeks_get_distinct_anchors() {
        let first = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let second = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_ne!(week_ending_monday(first), week_ending_monday(second));
    }

    proptest! {
        #[test]
        fn anchor_is_a_monday_within_six_days(days in 0i64..40_000) {
            let date = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + Duration::days(days);
            let anchor = week_ending_monday(date);

            prop_assert_eq!(anchor.weekday(), Weekday::Mon);
            let gap = (anchor - date).num_days();
            prop_assert!((0..=6).contains(&gap));
            // Idempotent: bucketing an anchor returns the anchor
            prop_assert_eq!(week_ending_monday(anchor), anchor);
        }
    }
}

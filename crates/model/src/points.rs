use std::collections::HashSet;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::award::Award;

/// Aggregated points for one user over some window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PointsSummary {
    pub total_points: i64,
    pub bonus_points: i64,
    pub regular_points: i64,
    pub count: u64,
}

/// Filters applied while walking ledger entries.
pub struct AccumulateOptions<'a> {
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// When false (the default everywhere points are ranked), bonus points
    /// are tracked separately but excluded from `total_points`.
    pub include_bonus: bool,
    /// Utilization categories: percentage metrics, never additive points.
    pub utilization_ids: &'a [ObjectId],
    /// Categories flagged `is_bonus`; entries referencing them count as
    /// bonus even when the entry's own flag is unset.
    pub bonus_category_ids: &'a [ObjectId],
}

impl Default for AccumulateOptions<'_> {
    fn default() -> Self {
        AccumulateOptions {
            range: None,
            include_bonus: false,
            utilization_ids: &[],
            bonus_category_ids: &[],
        }
    }
}

impl PointsSummary {
    /// Fold ledger entries into a summary.
    ///
    /// An entry is skipped when it is a utilization record, falls outside
    /// the range, or repeats a `request_id` already counted (imported
    /// legacy data may carry duplicates; a financial event counts once).
    pub fn accumulate<'a>(
        entries: impl IntoIterator<Item = &'a Award>,
        opts: &AccumulateOptions<'_>,
    ) -> PointsSummary {
        let mut summary = PointsSummary::default();
        let mut counted_requests: HashSet<ObjectId> = HashSet::new();

        for entry in entries {
            if opts.utilization_ids.contains(&entry.category_id) {
                continue;
            }
            if let Some((from, to)) = opts.range {
                if entry.effective_date < from || entry.effective_date > to {
                    continue;
                }
            }
            if let Some(request_id) = entry.request_id {
                if !counted_requests.insert(request_id) {
                    continue;
                }
            }

            let is_bonus = entry.is_bonus || opts.bonus_category_ids.contains(&entry.category_id);
            if is_bonus {
                summary.bonus_points += entry.points;
                if opts.include_bonus {
                    summary.total_points += entry.points;
                }
            } else {
                summary.regular_points += entry.points;
                summary.total_points += entry.points;
            }
            summary.count += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn entry(points: i64, request_id: Option<ObjectId>) -> Award {
        Award {
            id: ObjectId::new(),
            user_id: ObjectId::new(),
            category_id: ObjectId::new(),
            points,
            effective_date: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
            awarded_by: ObjectId::new(),
            request_id,
            is_bonus: false,
            bonus_quarter: None,
            utilization_value: None,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_request_ids_count_once() {
        let request_id = ObjectId::new();
        let entries = vec![entry(100, Some(request_id)), entry(100, Some(request_id))];
        let summary = PointsSummary::accumulate(&entries, &AccumulateOptions::default());
        assert_eq!(summary.total_points, 100);
        assert_eq!(summary.count, 1);
    }

    #[test]
    fn direct_awards_are_never_deduplicated() {
        let entries = vec![entry(100, None), entry(100, None)];
        let summary = PointsSummary::accumulate(&entries, &AccumulateOptions::default());
        assert_eq!(summary.total_points, 200);
    }

    #[test]
    fn utilization_entries_are_excluded() {
        let mut util = entry(85, None);
        let util_category = util.category_id;
        util.utilization_value = Some(0.85);

        let summary = PointsSummary::accumulate(
            &[util, entry(100, None)],
            &AccumulateOptions {
                utilization_ids: &[util_category],
                ..Default::default()
            },
        );
        assert_eq!(summary.total_points, 100);
        assert_eq!(summary.count, 1);
    }

    #[test]
    fn bonus_split_respects_category_flag() {
        let mut flagged = entry(500, None);
        flagged.is_bonus = true;
        let by_category = entry(300, None);
        let bonus_ids = [by_category.category_id];
        let entries = vec![flagged, by_category, entry(100, None)];

        let opts = AccumulateOptions {
            bonus_category_ids: &bonus_ids,
            ..Default::default()
        };
        let summary = PointsSummary::accumulate(&entries, &opts);
        assert_eq!(summary.bonus_points, 800);
        assert_eq!(summary.regular_points, 100);
        assert_eq!(summary.total_points, 100);

        let with_bonus = AccumulateOptions {
            include_bonus: true,
            ..opts
        };
        let summary = PointsSummary::accumulate(&entries, &with_bonus);
        assert_eq!(summary.total_points, 900);
    }

    #[test]
    fn range_filters_on_effective_date() {
        let mut outside = entry(100, None);
        outside.effective_date = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let from = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 6, 30, 23, 59, 59).unwrap();

        let summary = PointsSummary::accumulate(
            &[outside, entry(100, None)],
            &AccumulateOptions {
                range: Some((from, to)),
                ..Default::default()
            },
        );
        assert_eq!(summary.total_points, 100);
    }
}

use std::collections::BTreeMap;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::Grade;

/// Bonus points a milestone pays, by the quarter it is reached in.
/// Later quarters pay less; reaching a yearly milestone in Q4 pays nothing.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuarterlyBonus {
    #[serde(rename = "Q1")]
    pub q1: i64,
    #[serde(rename = "Q2")]
    pub q2: i64,
    #[serde(rename = "Q3")]
    pub q3: i64,
    #[serde(rename = "Q4")]
    pub q4: i64,
}

impl QuarterlyBonus {
    pub const fn new(q1: i64, q2: i64, q3: i64, q4: i64) -> Self {
        QuarterlyBonus { q1, q2, q3, q4 }
    }

    pub fn for_quarter(&self, quarter: u8) -> i64 {
        match quarter {
            1 => self.q1,
            2 => self.q2,
            3 => self.q3,
            4 => self.q4,
            _ => 0,
        }
    }
}

/// A cumulative percentage-of-yearly-target threshold.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub percentage: u32,
    pub bonus_points: QuarterlyBonus,
}

/// Singleton reward configuration document.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RewardConfig {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub grade_targets: BTreeMap<Grade, i64>,
    pub milestones: Vec<Milestone>,
    #[serde(default = "default_utilization_threshold")]
    pub utilization_threshold: f64,
    #[serde(default = "default_yearly_bonus_limit")]
    pub yearly_bonus_limit: i64,
    #[serde(
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime",
        default = "Utc::now"
    )]
    pub last_updated: DateTime<Utc>,
}

fn default_utilization_threshold() -> f64 {
    80.0
}

fn default_yearly_bonus_limit() -> i64 {
    10_000
}

impl RewardConfig {
    pub fn quarterly_target(&self, grade: Grade) -> Option<i64> {
        self.grade_targets.get(&grade).copied()
    }

    pub fn yearly_target(&self, grade: Grade) -> Option<i64> {
        self.quarterly_target(grade).map(|target| target * 4)
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        let milestone = |name: &str, description: &str, percentage, bonus_points| Milestone {
            name: name.to_string(),
            description: description.to_string(),
            percentage,
            bonus_points,
        };

        RewardConfig {
            id: None,
            grade_targets: [
                (Grade::A1, 2750),
                (Grade::B1, 3950),
                (Grade::B2, 4850),
                (Grade::C1, 7700),
                (Grade::C2, 8700),
                (Grade::D1, 6700),
                (Grade::D2, 6200),
            ]
            .into_iter()
            .collect(),
            milestones: vec![
                milestone(
                    "Milestone 1",
                    "100% of Qtr target",
                    25,
                    QuarterlyBonus::new(1000, 1000, 1000, 1000),
                ),
                milestone(
                    "Milestone 2",
                    "50% of Yearly target",
                    50,
                    QuarterlyBonus::new(2000, 0, 0, 0),
                ),
                milestone(
                    "Milestone 3",
                    "75% of Yearly target",
                    75,
                    QuarterlyBonus::new(3000, 2000, 0, 0),
                ),
                milestone(
                    "Milestone 4",
                    "100% of Yearly target",
                    100,
                    QuarterlyBonus::new(4000, 3000, 2000, 0),
                ),
            ],
            utilization_threshold: default_utilization_threshold(),
            yearly_bonus_limit: default_yearly_bonus_limit(),
            last_updated: Utc::now(),
        }
    }
}

/// Percentage of `target` reached by `points`; 0 for a missing target.
pub fn progress_percent(points: i64, target: i64) -> f64 {
    if target <= 0 {
        return 0.0;
    }
    points as f64 / target as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_match_the_grade_table() {
        let config = RewardConfig::default();
        assert_eq!(config.quarterly_target(Grade::C1), Some(7700));
        assert_eq!(config.yearly_target(Grade::C1), Some(30_800));
        assert_eq!(config.milestones.len(), 4);
    }

    #[test]
    fn c1_progress_example() {
        // 8000 points against the 7700 quarterly target.
        let progress = progress_percent(8000, 7700);
        assert!((progress - 103.9).abs() < 0.1, "progress was {progress}");
    }

    #[test]
    fn quarterly_bonus_lookup() {
        let bonus = QuarterlyBonus::new(4000, 3000, 2000, 0);
        assert_eq!(bonus.for_quarter(1), 4000);
        assert_eq!(bonus.for_quarter(4), 0);
        assert_eq!(bonus.for_quarter(9), 0);
    }
}

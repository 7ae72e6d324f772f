use serde::Serialize;
use thiserror::Error;

use crate::config::{progress_percent, Milestone, RewardConfig};
use crate::user::Grade;

/// Outcome of evaluating the milestone ladder for one employee.
#[derive(Debug, Clone, Serialize, Default)]
pub struct MilestoneBonus {
    pub total: i64,
    pub achieved: Vec<Milestone>,
}

/// Sum the bonus for every milestone whose percentage-of-yearly-target
/// threshold `points` has reached, using each milestone's value for the
/// quarter it is being paid in. Milestones are cumulative: reaching 75%
/// pays the 25%, 50% and 75% amounts together.
pub fn milestone_bonus(
    points: i64,
    yearly_target: i64,
    quarter: u8,
    milestones: &[Milestone],
) -> MilestoneBonus {
    let reached = progress_percent(points, yearly_target);

    let mut ladder: Vec<&Milestone> = milestones.iter().collect();
    ladder.sort_by_key(|m| m.percentage);

    let mut result = MilestoneBonus::default();
    for milestone in ladder {
        if reached < milestone.percentage as f64 {
            continue;
        }
        let amount = milestone.bonus_points.for_quarter(quarter);
        if amount > 0 {
            result.total += amount;
            result.achieved.push(milestone.clone());
        }
    }
    result
}

/// Why an employee does not qualify for a milestone bonus this quarter.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum Ineligibility {
    #[error("bonus already awarded in {0}")]
    AlreadyAwarded(String),
    #[error("no quarterly target configured for this grade")]
    UnknownGrade,
    #[error("insufficient points: {points}/{required}")]
    InsufficientPoints { points: i64, required: i64 },
    #[error("insufficient billability: {actual:.1}% (required: {required:.1}%)")]
    InsufficientUtilization { actual: f64, required: f64 },
    #[error("yearly bonus points limit reached: {earned}/{limit}")]
    LimitReached { earned: i64, limit: i64 },
}

pub struct EligibilityInput {
    pub grade: Grade,
    pub quarterly_points: i64,
    /// Average quarter billability percentage, when the grade requires one.
    pub utilization_avg: Option<f64>,
    /// Label of the quarter a bonus was already paid in, if any.
    pub already_awarded_in: Option<String>,
    pub yearly_bonus_points: Option<i64>,
}

/// The gate in front of `milestone_bonus`: grade target met, billability
/// above threshold (grade A1 exempt), at most one bonus per quarter,
/// yearly cap not exhausted.
pub fn check_eligibility(
    config: &RewardConfig,
    input: &EligibilityInput,
) -> Result<(), Ineligibility> {
    if let Some(quarter) = &input.already_awarded_in {
        return Err(Ineligibility::AlreadyAwarded(quarter.clone()));
    }

    let required = config
        .quarterly_target(input.grade)
        .ok_or(Ineligibility::UnknownGrade)?;
    if input.quarterly_points < required {
        return Err(Ineligibility::InsufficientPoints {
            points: input.quarterly_points,
            required,
        });
    }

    if input.grade != Grade::A1 {
        if let Some(actual) = input.utilization_avg {
            if actual < config.utilization_threshold {
                return Err(Ineligibility::InsufficientUtilization {
                    actual,
                    required: config.utilization_threshold,
                });
            }
        }
    }

    if let Some(earned) = input.yearly_bonus_points {
        if earned >= config.yearly_bonus_limit {
            return Err(Ineligibility::LimitReached {
                earned,
                limit: config.yearly_bonus_limit,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuarterlyBonus;

    fn ladder() -> Vec<Milestone> {
        let milestone = |percentage, bonus| Milestone {
            name: format!("{percentage}%"),
            description: String::new(),
            percentage,
            bonus_points: bonus,
        };
        vec![
            milestone(25, QuarterlyBonus::new(1000, 1000, 1000, 1000)),
            milestone(50, QuarterlyBonus::new(2000, 0, 0, 0)),
            milestone(75, QuarterlyBonus::new(3000, 2000, 0, 0)),
        ]
    }

    #[test]
    fn milestones_accumulate() {
        // 6000 of 10000 = 60%: the 25% and 50% milestones both pay in Q1.
        let bonus = milestone_bonus(6000, 10_000, 1, &ladder());
        assert_eq!(bonus.total, 3000);
        assert_eq!(bonus.achieved.len(), 2);
    }

    #[test]
    fn quarter_selects_the_payout_column() {
        // Same 60% in Q2: the 50% milestone pays nothing there.
        let bonus = milestone_bonus(6000, 10_000, 2, &ladder());
        assert_eq!(bonus.total, 1000);
    }

    #[test]
    fn bonus_is_monotonic_in_points() {
        let mut last = 0;
        for points in (0..=12_000).step_by(500) {
            let bonus = milestone_bonus(points, 10_000, 1, &ladder());
            assert!(
                bonus.total >= last,
                "bonus dropped from {last} to {} at {points} points",
                bonus.total
            );
            last = bonus.total;
        }
    }

    #[test]
    fn zero_target_pays_nothing() {
        assert_eq!(milestone_bonus(5000, 0, 1, &ladder()).total, 0);
    }

    fn input(grade: Grade, points: i64) -> EligibilityInput {
        EligibilityInput {
            grade,
            quarterly_points: points,
            utilization_avg: None,
            already_awarded_in: None,
            yearly_bonus_points: None,
        }
    }

    #[test]
    fn eligibility_requires_the_grade_target() {
        let config = RewardConfig::default();
        let verdict = check_eligibility(&config, &input(Grade::C1, 7000));
        assert_eq!(
            verdict,
            Err(Ineligibility::InsufficientPoints {
                points: 7000,
                required: 7700
            })
        );
        assert!(check_eligibility(&config, &input(Grade::C1, 8000)).is_ok());
    }

    #[test]
    fn a1_is_exempt_from_utilization() {
        let config = RewardConfig::default();

        let mut low_util = input(Grade::A1, 3000);
        low_util.utilization_avg = Some(40.0);
        assert!(check_eligibility(&config, &low_util).is_ok());

        let mut c1 = input(Grade::C1, 8000);
        c1.utilization_avg = Some(40.0);
        assert!(matches!(
            check_eligibility(&config, &c1),
            Err(Ineligibility::InsufficientUtilization { .. })
        ));
    }

    #[test]
    fn one_bonus_per_quarter() {
        let config = RewardConfig::default();
        let mut again = input(Grade::C1, 8000);
        again.already_awarded_in = Some("Q2-2025".into());
        assert_eq!(
            check_eligibility(&config, &again),
            Err(Ineligibility::AlreadyAwarded("Q2-2025".into()))
        );
    }

    #[test]
    fn yearly_cap_blocks() {
        let config = RewardConfig::default();
        let mut capped = input(Grade::C1, 8000);
        capped.yearly_bonus_points = Some(10_000);
        assert!(matches!(
            check_eligibility(&config, &capped),
            Err(Ineligibility::LimitReached { .. })
        ));
    }
}

use bson::oid::ObjectId;
use model::bonus::{
    check_eligibility, milestone_bonus, EligibilityInput, Ineligibility,
};
use model::config::RewardConfig;
use model::errors::RewardsError;
use model::fiscal::{fiscal_year_bounds, FiscalQuarter};
use model::points::{AccumulateOptions, PointsSummary};
use model::session::Session;
use model::user::{Grade, Role};
use serde::Serialize;
use storage::awards::AwardStore;
use storage::config::ConfigStore;
use storage::users::UserStore;

use super::statistics::Statistics;

#[derive(Clone)]
pub struct Bonuses {
    users: UserStore,
    awards: AwardStore,
    config: ConfigStore,
    statistics: Statistics,
}

/// One line of the Central eligibility dashboard.
#[derive(Debug, Serialize)]
pub struct EligibilityRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub grade: Option<Grade>,
    pub role: Role,
    pub quarterly_points: i64,
    pub quarterly_target: Option<i64>,
    pub quarterly_progress: f64,
    pub yearly_points: i64,
    pub yearly_target: Option<i64>,
    pub utilization_avg: f64,
    pub yearly_bonus_points: i64,
    pub potential_bonus: i64,
    pub achieved_milestones: Vec<String>,
    pub eligible: bool,
    pub ineligibility: Option<String>,
}

impl Bonuses {
    pub(crate) fn new(
        users: UserStore,
        awards: AwardStore,
        config: ConfigStore,
        statistics: Statistics,
    ) -> Self {
        Bonuses {
            users,
            awards,
            config,
            statistics,
        }
    }

    pub(crate) fn awards(&self) -> &AwardStore {
        &self.awards
    }

    pub async fn config(&self, session: &mut Session) -> Result<RewardConfig, RewardsError> {
        Ok(self.config.get_or_init(session).await?)
    }

    pub async fn update_config(
        &self,
        session: &mut Session,
        config: &mut RewardConfig,
    ) -> Result<(), RewardsError> {
        Ok(self.config.update(session, config).await?)
    }

    /// Bonus points already collected in a fiscal year.
    pub async fn yearly_bonus_points(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        fiscal_year: i32,
    ) -> Result<i64, RewardsError> {
        let entries = self
            .awards
            .for_user(session, user_id, Some(fiscal_year_bounds(fiscal_year)))
            .await?;
        Ok(entries
            .iter()
            .filter(|entry| entry.is_bonus)
            .map(|entry| entry.points)
            .sum())
    }

    /// Evaluate every rewards participant against the milestone ladder and
    /// the eligibility gate for one quarter.
    pub async fn eligibility_report(
        &self,
        session: &mut Session,
        quarter: &FiscalQuarter,
    ) -> Result<Vec<EligibilityRow>, RewardsError> {
        let config = self.config.get_or_init(session).await?;
        let participants = self.users.rewards_participants(session).await?;
        let utilization_ids = self.statistics.utilization_ids(session).await?;
        let bonus_ids = self.statistics.bonus_category_ids(session).await?;
        let year_range = fiscal_year_bounds(quarter.fiscal_year);

        let mut rows = Vec::with_capacity(participants.len());
        for user in participants {
            let entries = self
                .awards
                .for_user(session, user.id, Some(year_range))
                .await?;
            let opts = AccumulateOptions {
                utilization_ids: &utilization_ids,
                bonus_category_ids: &bonus_ids,
                ..Default::default()
            };
            let yearly = PointsSummary::accumulate(&entries, &opts);
            let quarterly = PointsSummary::accumulate(
                &entries,
                &AccumulateOptions {
                    range: Some(quarter.bounds()),
                    ..opts
                },
            );

            let utilization_avg = self
                .statistics
                .quarter_utilization(session, user.id, quarter)
                .await?;
            let already_awarded = self
                .awards
                .bonus_in_quarter(session, user.id, &quarter.label())
                .await?
                .map(|_| quarter.label());

            let (quarterly_target, yearly_target, verdict) = match user.grade {
                Some(grade) => {
                    let verdict = check_eligibility(
                        &config,
                        &EligibilityInput {
                            grade,
                            quarterly_points: quarterly.total_points,
                            utilization_avg: Some(utilization_avg),
                            already_awarded_in: already_awarded,
                            yearly_bonus_points: Some(yearly.bonus_points),
                        },
                    );
                    (
                        config.quarterly_target(grade),
                        config.yearly_target(grade),
                        verdict,
                    )
                }
                None => (None, None, Err(Ineligibility::UnknownGrade)),
            };

            let preview = milestone_bonus(
                yearly.total_points,
                yearly_target.unwrap_or(0),
                quarter.quarter,
                &config.milestones,
            );

            rows.push(EligibilityRow {
                user_id: user.id.to_hex(),
                name: user.name,
                email: user.email,
                grade: user.grade,
                role: user.role,
                quarterly_points: quarterly.total_points,
                quarterly_target,
                quarterly_progress: model::config::progress_percent(
                    quarterly.total_points,
                    quarterly_target.unwrap_or(0),
                ),
                yearly_points: yearly.total_points,
                yearly_target,
                utilization_avg,
                yearly_bonus_points: yearly.bonus_points,
                potential_bonus: preview.total,
                achieved_milestones: preview
                    .achieved
                    .iter()
                    .map(|milestone| milestone.name.clone())
                    .collect(),
                eligible: verdict.is_ok(),
                ineligibility: verdict.err().map(|reason| reason.to_string()),
            });
        }

        rows.sort_by(|a, b| b.quarterly_points.cmp(&a.quarterly_points));
        Ok(rows)
    }
}

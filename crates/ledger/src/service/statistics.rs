use std::collections::{BTreeMap, HashMap};

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use model::award::Award;
use model::category::MergedCategory;
use model::config::progress_percent;
use model::errors::RewardsError;
use model::fiscal::{fiscal_year_bounds, FiscalQuarter};
use model::points::{AccumulateOptions, PointsSummary};
use model::session::Session;
use model::user::{Grade, Role, User};
use model::utilization;
use serde::Serialize;
use storage::awards::AwardStore;
use storage::categories::CategoryStore;
use storage::config::ConfigStore;
use storage::users::UserStore;

#[derive(Clone)]
pub struct Statistics {
    users: UserStore,
    awards: AwardStore,
    categories: CategoryStore,
    config: ConfigStore,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub quarter: String,
    pub quarterly: PointsSummary,
    pub yearly: PointsSummary,
    pub utilization_avg: f64,
    pub quarterly_target: Option<i64>,
    pub yearly_target: Option<i64>,
    pub quarterly_progress: f64,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub grade: Option<Grade>,
    pub department: Option<String>,
    pub role: Role,
    #[serde(flatten)]
    pub summary: PointsSummary,
    pub by_category: BTreeMap<String, i64>,
}

pub struct LeaderboardQuery {
    pub range: (DateTime<Utc>, DateTime<Utc>),
    pub include_bonus: bool,
    /// Merged-category name filter.
    pub category: Option<String>,
    pub grade: Option<Grade>,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub category_name: String,
    pub points: i64,
    pub is_bonus: bool,
    pub effective_date: DateTime<Utc>,
    pub notes: String,
}

impl Statistics {
    pub(crate) fn new(
        users: UserStore,
        awards: AwardStore,
        categories: CategoryStore,
        config: ConfigStore,
    ) -> Self {
        Statistics {
            users,
            awards,
            categories,
            config,
        }
    }

    pub async fn user_summary(
        &self,
        session: &mut Session,
        user: &User,
        quarter: &FiscalQuarter,
    ) -> Result<UserSummary, RewardsError> {
        let utilization_ids = self.categories.utilization_ids(session).await?;
        let bonus_ids = self.bonus_category_ids(session).await?;
        let year_range = fiscal_year_bounds(quarter.fiscal_year);
        let entries = self
            .awards
            .for_user(session, user.id, Some(year_range))
            .await?;

        let quarterly = PointsSummary::accumulate(
            &entries,
            &AccumulateOptions {
                range: Some(quarter.bounds()),
                utilization_ids: &utilization_ids,
                bonus_category_ids: &bonus_ids,
                ..Default::default()
            },
        );
        let yearly = PointsSummary::accumulate(
            &entries,
            &AccumulateOptions {
                utilization_ids: &utilization_ids,
                bonus_category_ids: &bonus_ids,
                ..Default::default()
            },
        );

        let utilization_avg = self
            .quarter_utilization(session, user.id, quarter)
            .await?;

        let config = self.config.get_or_init(session).await?;
        let quarterly_target = user.grade.and_then(|g| config.quarterly_target(g));
        let yearly_target = user.grade.and_then(|g| config.yearly_target(g));
        let quarterly_progress =
            progress_percent(quarterly.total_points, quarterly_target.unwrap_or(0));

        Ok(UserSummary {
            quarter: quarter.label(),
            quarterly,
            yearly,
            utilization_avg,
            quarterly_target,
            yearly_target,
            quarterly_progress,
        })
    }

    /// Average billability across the quarter's months. The latest record
    /// of each month wins; months without one count as zero.
    pub async fn quarter_utilization(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        quarter: &FiscalQuarter,
    ) -> Result<f64, RewardsError> {
        let utilization_ids = self.categories.utilization_ids(session).await?;
        if utilization_ids.is_empty() {
            return Ok(0.0);
        }
        let entries = self
            .awards
            .utilization_for_user(session, user_id, &utilization_ids)
            .await?;
        let monthly = monthly_map(&entries, Some(quarter.bounds()));
        Ok(utilization::quarter_average(&monthly, quarter))
    }

    /// Billability per month in a range, keyed `YYYY-MM`.
    pub async fn monthly_utilization(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BTreeMap<String, f64>, RewardsError> {
        let utilization_ids = self.categories.utilization_ids(session).await?;
        if utilization_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let entries = self
            .awards
            .utilization_for_user(session, user_id, &utilization_ids)
            .await?;
        Ok(monthly_map(&entries, Some((from, to))))
    }

    pub async fn leaderboard(
        &self,
        session: &mut Session,
        query: LeaderboardQuery,
    ) -> Result<Vec<LeaderboardRow>, RewardsError> {
        let mut participants = self.users.rewards_participants(session).await?;
        if let Some(grade) = query.grade {
            participants.retain(|user| user.grade == Some(grade));
        }
        if let Some(role) = query.role {
            participants.retain(|user| user.role == role);
        }

        let legacy = self.categories.legacy_all(session).await?;
        let hr = self.categories.hr_all(session).await?;
        let merged = MergedCategory::merge_by_name(&legacy, &hr);
        let utilization_ids = self.categories.utilization_ids(session).await?;
        let bonus_ids = self.bonus_category_ids(session).await?;

        let category_filter: Option<&MergedCategory> = match &query.category {
            Some(name) => Some(
                merged
                    .iter()
                    .find(|category| &category.name == name)
                    .ok_or_else(|| {
                        RewardsError::InvalidInput(format!("unknown category: {name}"))
                    })?,
            ),
            None => None,
        };

        let ids: Vec<ObjectId> = participants.iter().map(|user| user.id).collect();
        let mut entries = self
            .awards
            .for_users(session, &ids, Some(query.range))
            .await?;
        if let Some(filter) = category_filter {
            entries.retain(|entry| filter.contains(&entry.category_id));
        }

        let mut by_user: HashMap<ObjectId, Vec<Award>> = HashMap::new();
        for entry in entries {
            by_user.entry(entry.user_id).or_default().push(entry);
        }

        let name_of: HashMap<ObjectId, &str> = merged
            .iter()
            .flat_map(|category| category.ids.iter().map(move |id| (*id, category.name.as_str())))
            .collect();

        let opts = AccumulateOptions {
            include_bonus: query.include_bonus,
            utilization_ids: &utilization_ids,
            bonus_category_ids: &bonus_ids,
            ..Default::default()
        };

        let mut rows: Vec<LeaderboardRow> = participants
            .into_iter()
            .map(|user| {
                let empty = Vec::new();
                let entries = by_user.get(&user.id).unwrap_or(&empty);
                let summary = PointsSummary::accumulate(entries.iter(), &opts);

                let mut by_category: BTreeMap<String, i64> = BTreeMap::new();
                for entry in entries {
                    if utilization_ids.contains(&entry.category_id) {
                        continue;
                    }
                    let name = name_of
                        .get(&entry.category_id)
                        .copied()
                        .unwrap_or("Unknown");
                    *by_category.entry(name.to_string()).or_default() += entry.points;
                }

                LeaderboardRow {
                    rank: 0,
                    user_id: user.id.to_hex(),
                    name: user.name,
                    grade: user.grade,
                    department: user.department,
                    role: user.role,
                    summary,
                    by_category,
                }
            })
            .collect();

        rows.sort_by(|a, b| b.summary.total_points.cmp(&a.summary.total_points));
        for (index, row) in rows.iter_mut().enumerate() {
            row.rank = index + 1;
        }
        Ok(rows)
    }

    /// Fiscal years that actually have ledger data, newest first; the
    /// current one is always present.
    pub async fn available_fiscal_years(
        &self,
        session: &mut Session,
    ) -> Result<Vec<i32>, RewardsError> {
        let mut years: Vec<i32> = Vec::new();
        for (year, month) in self.awards.months_with_data(session).await? {
            let fiscal = if month < 4 { year - 1 } else { year };
            if !years.contains(&fiscal) {
                years.push(fiscal);
            }
        }
        let current = FiscalQuarter::current().fiscal_year;
        if !years.contains(&current) {
            years.push(current);
        }
        years.sort_unstable_by(|a, b| b.cmp(a));
        Ok(years)
    }

    pub async fn history(
        &self,
        session: &mut Session,
        user_id: ObjectId,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<HistoryEntry>, RewardsError> {
        let entries = self.awards.for_user(session, user_id, range).await?;
        let mut history = Vec::with_capacity(entries.len());
        let mut names: HashMap<ObjectId, String> = HashMap::new();
        for entry in entries {
            let category_name = match names.get(&entry.category_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .categories
                        .get(session, entry.category_id)
                        .await?
                        .map(|category| category.name)
                        .unwrap_or_else(|| "Unknown".to_string());
                    names.insert(entry.category_id, name.clone());
                    name
                }
            };
            history.push(HistoryEntry {
                id: entry.id.to_hex(),
                category_name,
                points: entry.points,
                is_bonus: entry.is_bonus,
                effective_date: entry.effective_date,
                notes: entry.notes,
            });
        }
        Ok(history)
    }

    pub(crate) async fn utilization_ids(
        &self,
        session: &mut Session,
    ) -> Result<Vec<ObjectId>, RewardsError> {
        Ok(self.categories.utilization_ids(session).await?)
    }

    pub(crate) async fn bonus_category_ids(
        &self,
        session: &mut Session,
    ) -> Result<Vec<ObjectId>, RewardsError> {
        let mut ids: Vec<ObjectId> = Vec::new();
        for category in self
            .categories
            .legacy_all(session)
            .await?
            .into_iter()
            .chain(self.categories.hr_all(session).await?)
        {
            if category.is_bonus && !ids.contains(&category.id) {
                ids.push(category.id);
            }
        }
        Ok(ids)
    }
}

/// Month-keyed billability percentages; ascending by effective date so the
/// newest record of a month wins.
fn monthly_map(
    entries: &[Award],
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> BTreeMap<String, f64> {
    use chrono::Datelike as _;

    let mut sorted: Vec<&Award> = entries.iter().collect();
    sorted.sort_by_key(|entry| entry.effective_date);

    let mut monthly = BTreeMap::new();
    for entry in sorted {
        if let Some((from, to)) = range {
            if entry.effective_date < from || entry.effective_date > to {
                continue;
            }
        }
        if let Some(percent) = utilization::entry_percent(entry.utilization_value, entry.points) {
            let key = utilization::month_key(
                entry.effective_date.year(),
                entry.effective_date.month(),
            );
            monthly.insert(key, utilization::round2(percent));
        }
    }
    monthly
}

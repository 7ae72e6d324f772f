use std::collections::{BTreeMap, HashMap};

use bson::oid::ObjectId;
use chrono::{DateTime, Datelike as _, Utc};
use model::award::Award;
use model::config::progress_percent;
use model::errors::RewardsError;
use model::points::{AccumulateOptions, PointsSummary};
use model::session::Session;
use model::user::User;
use model::utilization;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use storage::awards::AwardStore;
use storage::config::ConfigStore;
use storage::users::UserStore;

use super::categories::Categories;
use super::statistics::Statistics;

/// The Central Excel report: four worksheets over an arbitrary date range.
#[derive(Clone)]
pub struct Export {
    users: UserStore,
    awards: AwardStore,
    config: ConfigStore,
    statistics: Statistics,
    categories: Categories,
}

struct ReportRow {
    user: User,
    summary: PointsSummary,
    by_category: BTreeMap<String, i64>,
    monthly_utilization: BTreeMap<String, f64>,
}

impl Export {
    pub(crate) fn new(
        users: UserStore,
        awards: AwardStore,
        config: ConfigStore,
        statistics: Statistics,
        categories: Categories,
    ) -> Self {
        Export {
            users,
            awards,
            config,
            statistics,
            categories,
        }
    }

    pub async fn excel_report(
        &self,
        session: &mut Session,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<u8>, RewardsError> {
        if from > to {
            return Err(RewardsError::InvalidInput(
                "start date cannot be after end date".into(),
            ));
        }

        let participants = self.users.rewards_participants(session).await?;
        let merged = self.categories.merged(session).await?;
        let utilization_ids = self.categories.utilization_ids(session).await?;
        let bonus_ids = self.categories.bonus_category_ids(session).await?;
        let config = self.config.get_or_init(session).await?;

        // Utilization has a dedicated sheet; keep it out of the category columns.
        let point_categories: Vec<_> = merged
            .iter()
            .filter(|category| {
                category.code != model::category::UTILIZATION_CODE
                    && category.name != model::category::UTILIZATION_NAME
            })
            .collect();
        let name_of: HashMap<ObjectId, &str> = merged
            .iter()
            .flat_map(|category| category.ids.iter().map(move |id| (*id, category.name.as_str())))
            .collect();

        let ids: Vec<ObjectId> = participants.iter().map(|user| user.id).collect();
        let entries = self
            .awards
            .for_users(session, &ids, Some((from, to)))
            .await?;
        let mut by_user: HashMap<ObjectId, Vec<Award>> = HashMap::new();
        for entry in entries {
            by_user.entry(entry.user_id).or_default().push(entry);
        }

        let opts = AccumulateOptions {
            utilization_ids: &utilization_ids,
            bonus_category_ids: &bonus_ids,
            ..Default::default()
        };

        let mut rows = Vec::with_capacity(participants.len());
        for user in participants {
            let empty = Vec::new();
            let user_entries = by_user.get(&user.id).unwrap_or(&empty);
            let summary = PointsSummary::accumulate(user_entries.iter(), &opts);

            let mut by_category: BTreeMap<String, i64> = BTreeMap::new();
            for entry in user_entries {
                if utilization_ids.contains(&entry.category_id) {
                    continue;
                }
                let name = name_of.get(&entry.category_id).copied().unwrap_or("Unknown");
                *by_category.entry(name.to_string()).or_default() += entry.points;
            }

            let monthly_utilization = self
                .statistics
                .monthly_utilization(session, user.id, from, to)
                .await?;

            rows.push(ReportRow {
                user,
                summary,
                by_category,
                monthly_utilization,
            });
        }
        rows.sort_by(|a, b| b.summary.total_points.cmp(&a.summary.total_points));

        let period = format!(
            "{} to {}",
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );
        let months = months_between(from, to);

        let mut workbook = Workbook::new();
        let formats = Formats::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name("Employee Points Data").map_err(xlsx)?;
        write_summary_sheet(sheet, &rows, &point_categories, &config, &period, &formats)
            .map_err(xlsx)?;

        let sheet = workbook.add_worksheet();
        sheet.set_name("Point Breakdown").map_err(xlsx)?;
        write_breakdown_sheet(sheet, &rows, &by_user, &name_of, &period, &formats)
            .map_err(xlsx)?;

        let sheet = workbook.add_worksheet();
        sheet.set_name("Category Summary").map_err(xlsx)?;
        write_category_sheet(sheet, &rows, &point_categories, &period, &formats).map_err(xlsx)?;

        let sheet = workbook.add_worksheet();
        sheet.set_name("Monthly Utilization").map_err(xlsx)?;
        write_utilization_sheet(sheet, &rows, &months, &period, &formats).map_err(xlsx)?;

        workbook.save_to_buffer().map_err(xlsx)
    }
}

struct Formats {
    title: Format,
    header: Format,
    data: Format,
    number: Format,
}

impl Formats {
    fn new() -> Self {
        Formats {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_background_color(Color::RGB(0x4F81BD))
                .set_font_color(Color::White),
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xDCE6F1))
                .set_border(FormatBorder::Thin)
                .set_align(FormatAlign::Center)
                .set_text_wrap(),
            data: Format::new().set_border(FormatBorder::Thin),
            number: Format::new()
                .set_border(FormatBorder::Thin)
                .set_num_format("#,##0.00"),
        }
    }
}

fn xlsx(err: XlsxError) -> RewardsError {
    RewardsError::Common(eyre::eyre!("xlsx: {err}"))
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    rows: &[ReportRow],
    categories: &[&model::category::MergedCategory],
    config: &model::config::RewardConfig,
    period: &str,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let fixed = [
        "#",
        "Name",
        "Email",
        "Grade",
        "Department",
        "Role",
        "Quarterly Target",
        "Regular Points",
        "Bonus Points",
        "Total Points",
        "Target Progress %",
        "Avg Utilization %",
    ];
    let total_cols = fixed.len() + categories.len();

    sheet.merge_range(
        0,
        0,
        0,
        (total_cols - 1) as u16,
        &format!("EMPLOYEE POINTS REPORT ({period})"),
        &formats.title,
    )?;

    for (col, name) in fixed.iter().enumerate() {
        sheet.write_string_with_format(2, col as u16, *name, &formats.header)?;
    }
    for (offset, category) in categories.iter().enumerate() {
        sheet.write_string_with_format(
            2,
            (fixed.len() + offset) as u16,
            &category.name,
            &formats.header,
        )?;
    }

    for (index, row) in rows.iter().enumerate() {
        let r = (index + 3) as u32;
        let user = &row.user;
        let target = user.grade.and_then(|g| config.quarterly_target(g));
        let avg_util = if row.monthly_utilization.is_empty() {
            0.0
        } else {
            utilization::round2(
                row.monthly_utilization.values().sum::<f64>()
                    / row.monthly_utilization.len() as f64,
            )
        };

        sheet.write_number_with_format(r, 0, (index + 1) as f64, &formats.data)?;
        sheet.write_string_with_format(r, 1, &user.name, &formats.data)?;
        sheet.write_string_with_format(r, 2, &user.email, &formats.data)?;
        sheet.write_string_with_format(
            r,
            3,
            &user.grade.map(|g| g.to_string()).unwrap_or_default(),
            &formats.data,
        )?;
        sheet.write_string_with_format(
            r,
            4,
            user.department.as_deref().unwrap_or(""),
            &formats.data,
        )?;
        sheet.write_string_with_format(r, 5, &user.role.to_string(), &formats.data)?;
        sheet.write_number_with_format(r, 6, target.unwrap_or(0) as f64, &formats.number)?;
        sheet.write_number_with_format(r, 7, row.summary.regular_points as f64, &formats.number)?;
        sheet.write_number_with_format(r, 8, row.summary.bonus_points as f64, &formats.number)?;
        sheet.write_number_with_format(r, 9, row.summary.total_points as f64, &formats.number)?;
        sheet.write_number_with_format(
            r,
            10,
            utilization::round2(progress_percent(
                row.summary.total_points,
                target.unwrap_or(0),
            )),
            &formats.number,
        )?;
        sheet.write_number_with_format(r, 11, avg_util, &formats.number)?;
        for (offset, category) in categories.iter().enumerate() {
            let points = row.by_category.get(&category.name).copied().unwrap_or(0);
            sheet.write_number_with_format(
                r,
                (fixed.len() + offset) as u16,
                points as f64,
                &formats.number,
            )?;
        }
    }

    sheet.set_column_width(1, 24)?;
    sheet.set_column_width(2, 28)?;
    Ok(())
}

fn write_breakdown_sheet(
    sheet: &mut Worksheet,
    rows: &[ReportRow],
    by_user: &HashMap<ObjectId, Vec<Award>>,
    name_of: &HashMap<ObjectId, &str>,
    period: &str,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let headers = ["Employee", "Category", "Points", "Bonus", "Effective Date", "Notes"];
    sheet.merge_range(
        0,
        0,
        0,
        (headers.len() - 1) as u16,
        &format!("POINT BREAKDOWN ({period})"),
        &formats.title,
    )?;
    for (col, name) in headers.iter().enumerate() {
        sheet.write_string_with_format(2, col as u16, *name, &formats.header)?;
    }

    let mut r = 3u32;
    for row in rows {
        let empty = Vec::new();
        for entry in by_user.get(&row.user.id).unwrap_or(&empty) {
            sheet.write_string_with_format(r, 0, &row.user.name, &formats.data)?;
            sheet.write_string_with_format(
                r,
                1,
                name_of.get(&entry.category_id).copied().unwrap_or("Unknown"),
                &formats.data,
            )?;
            sheet.write_number_with_format(r, 2, entry.points as f64, &formats.number)?;
            sheet.write_string_with_format(
                r,
                3,
                if entry.is_bonus { "Yes" } else { "No" },
                &formats.data,
            )?;
            sheet.write_string_with_format(
                r,
                4,
                &entry.effective_date.format("%Y-%m-%d").to_string(),
                &formats.data,
            )?;
            sheet.write_string_with_format(r, 5, &entry.notes, &formats.data)?;
            r += 1;
        }
    }
    sheet.set_column_width(0, 24)?;
    sheet.set_column_width(1, 24)?;
    sheet.set_column_width(5, 40)?;
    Ok(())
}

fn write_category_sheet(
    sheet: &mut Worksheet,
    rows: &[ReportRow],
    categories: &[&model::category::MergedCategory],
    period: &str,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let headers = ["Category", "Code", "Total Points", "Employees"];
    sheet.merge_range(
        0,
        0,
        0,
        (headers.len() - 1) as u16,
        &format!("CATEGORY SUMMARY ({period})"),
        &formats.title,
    )?;
    for (col, name) in headers.iter().enumerate() {
        sheet.write_string_with_format(2, col as u16, *name, &formats.header)?;
    }

    for (index, category) in categories.iter().enumerate() {
        let r = (index + 3) as u32;
        let total: i64 = rows
            .iter()
            .filter_map(|row| row.by_category.get(&category.name))
            .sum();
        let employees = rows
            .iter()
            .filter(|row| row.by_category.contains_key(&category.name))
            .count();
        sheet.write_string_with_format(r, 0, &category.name, &formats.data)?;
        sheet.write_string_with_format(r, 1, &category.code, &formats.data)?;
        sheet.write_number_with_format(r, 2, total as f64, &formats.number)?;
        sheet.write_number_with_format(r, 3, employees as f64, &formats.number)?;
    }
    sheet.set_column_width(0, 28)?;
    Ok(())
}

fn write_utilization_sheet(
    sheet: &mut Worksheet,
    rows: &[ReportRow],
    months: &[(i32, u32)],
    period: &str,
    formats: &Formats,
) -> Result<(), XlsxError> {
    sheet.merge_range(
        0,
        0,
        0,
        (months.len() + 1) as u16,
        &format!("MONTHLY UTILIZATION % ({period})"),
        &formats.title,
    )?;
    sheet.write_string_with_format(2, 0, "Employee", &formats.header)?;
    for (col, (year, month)) in months.iter().enumerate() {
        sheet.write_string_with_format(
            2,
            (col + 1) as u16,
            &utilization::month_key(*year, *month),
            &formats.header,
        )?;
    }
    sheet.write_string_with_format(2, (months.len() + 1) as u16, "Average", &formats.header)?;

    for (index, row) in rows.iter().enumerate() {
        let r = (index + 3) as u32;
        sheet.write_string_with_format(r, 0, &row.user.name, &formats.data)?;
        let mut total = 0.0;
        for (col, (year, month)) in months.iter().enumerate() {
            let value = row
                .monthly_utilization
                .get(&utilization::month_key(*year, *month))
                .copied()
                .unwrap_or(0.0);
            total += value;
            sheet.write_number_with_format(r, (col + 1) as u16, value, &formats.number)?;
        }
        let average = if months.is_empty() {
            0.0
        } else {
            utilization::round2(total / months.len() as f64)
        };
        sheet.write_number_with_format(r, (months.len() + 1) as u16, average, &formats.number)?;
    }
    sheet.set_column_width(0, 24)?;
    Ok(())
}

fn months_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut year, mut month) = (from.year(), from.month());
    while (year, month) <= (to.year(), to.month()) {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

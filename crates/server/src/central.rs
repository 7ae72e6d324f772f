use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use ledger::service::bonuses::EligibilityRow;
use ledger::service::statistics::{LeaderboardQuery, LeaderboardRow};
use log::warn;
use model::access::RoleTag;
use model::config::RewardConfig;
use model::user::{Grade, Role};
use notify::realtime::Event;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::Context;
use crate::employee::{resolve_quarter, resolve_range};
use crate::error::ApiError;
use crate::params;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/central/leaderboard", get(leaderboard))
        .route("/central/eligibility", get(eligibility))
        .route("/central/bonus/:employee_id", post(award_bonus))
        .route("/central/export/excel", get(export_excel))
        .route("/central/config", get(get_config).put(put_config))
}

#[derive(Deserialize)]
struct LeaderboardParams {
    quarter: Option<String>,
    year: Option<i32>,
    category: Option<String>,
    grade: Option<Grade>,
    role: Option<Role>,
    #[serde(default)]
    include_bonus: bool,
}

async fn leaderboard(
    Extension(ctx): Extension<Arc<Context>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Vec<LeaderboardRow>>, ApiError> {
    ctx.require_any(&[RoleTag::Central])?;
    let range = resolve_range(params.quarter.as_deref(), params.year)?;
    let mut session = ctx.session().await?;
    let rows = ctx
        .ledger
        .statistics
        .leaderboard(
            &mut session,
            LeaderboardQuery {
                range,
                include_bonus: params.include_bonus,
                category: params.category,
                grade: params.grade,
                role: params.role,
            },
        )
        .await?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
struct EligibilityParams {
    quarter: Option<String>,
}

async fn eligibility(
    Extension(ctx): Extension<Arc<Context>>,
    Query(params): Query<EligibilityParams>,
) -> Result<Json<Vec<EligibilityRow>>, ApiError> {
    ctx.require_any(&[RoleTag::Central])?;
    let quarter = resolve_quarter(params.quarter.as_deref())?;
    let mut session = ctx.session().await?;
    let rows = ctx
        .ledger
        .bonuses
        .eligibility_report(&mut session, &quarter)
        .await?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
struct BonusForm {
    bonus_points: i64,
    #[serde(default)]
    milestones: String,
    #[serde(default)]
    notes: String,
}

async fn award_bonus(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<Context>>,
    Path(employee_id): Path<String>,
    Json(form): Json<BonusForm>,
) -> Result<Json<Value>, ApiError> {
    ctx.require_any(&[RoleTag::Central])?;
    let employee_id = params::parse_oid(&employee_id)?;
    let mut session = ctx.session().await?;
    let award = ctx
        .ledger
        .award_bonus(
            &mut session,
            employee_id,
            form.bonus_points,
            form.milestones.clone(),
            form.notes,
            &ctx.me,
        )
        .await?;

    let employee = ctx.ledger.users.get(&mut session, employee_id).await?;
    let event = Event::BonusAwarded {
        data: json!({
            "points": award.points,
            "milestones": form.milestones,
            "quarter": award.bonus_quarter,
            "awarded_by": ctx.me.name.clone(),
        }),
        user_id: employee.id.to_hex(),
        role: employee.role.to_string().to_lowercase(),
    };
    if let Err(err) = state.realtime.publish(&event).await {
        warn!("Failed to publish bonus_points_awarded event: {err}");
    }

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Awarded {} bonus points to {}",
            award.points, employee.name
        ),
    })))
}

#[derive(Deserialize)]
struct ExportParams {
    start_date: String,
    end_date: String,
}

async fn export_excel(
    Extension(ctx): Extension<Arc<Context>>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    ctx.require_any(&[RoleTag::Central])?;
    let (from, to) = params::date_range(&params.start_date, &params.end_date)?;
    let mut session = ctx.session().await?;
    let bytes = ctx
        .ledger
        .export
        .excel_report(&mut session, from, to)
        .await?;

    let filename = format!(
        "Employee_Points_Report_{}_to_{}.xlsx",
        params.start_date, params.end_date
    );
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn get_config(
    Extension(ctx): Extension<Arc<Context>>,
) -> Result<Json<RewardConfig>, ApiError> {
    ctx.require_any(&[RoleTag::Central])?;
    let mut session = ctx.session().await?;
    let config = ctx.ledger.bonuses.config(&mut session).await?;
    Ok(Json(config))
}

async fn put_config(
    Extension(ctx): Extension<Arc<Context>>,
    Json(mut config): Json<RewardConfig>,
) -> Result<Json<RewardConfig>, ApiError> {
    ctx.require_any(&[RoleTag::Central])?;
    let mut session = ctx.session().await?;
    ctx.ledger
        .bonuses
        .update_config(&mut session, &mut config)
        .await?;
    Ok(Json(config))
}

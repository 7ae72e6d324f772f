use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use ledger::service::statistics::{HistoryEntry, LeaderboardQuery, LeaderboardRow, UserSummary};
use ledger::SubmitRequest;
use log::warn;
use model::fiscal::{fiscal_year_bounds, FiscalQuarter};
use model::request::RequestStatus;
use notify::realtime::Event;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::context::Context;
use crate::error::{invalid_input, ApiError};
use crate::params;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/employee/summary", get(summary))
        .route("/employee/history", get(history))
        .route("/employee/leaderboard", get(leaderboard))
        .route("/employee/requests", get(own_requests).post(submit))
        .route("/employee/quarters", get(quarters))
}

#[derive(Deserialize)]
struct QuarterParams {
    quarter: Option<String>,
}

async fn summary(
    Extension(ctx): Extension<Arc<Context>>,
    Query(params): Query<QuarterParams>,
) -> Result<Json<UserSummary>, ApiError> {
    let quarter = resolve_quarter(params.quarter.as_deref())?;
    let mut session = ctx.session().await?;
    let summary = ctx
        .ledger
        .statistics
        .user_summary(&mut session, &ctx.me, &quarter)
        .await?;
    Ok(Json(summary))
}

#[derive(Deserialize)]
struct HistoryParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn history(
    Extension(ctx): Extension<Arc<Context>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let range = match (params.start_date.as_deref(), params.end_date.as_deref()) {
        (Some(start), Some(end)) => Some(params::date_range(start, end)?),
        (None, None) => None,
        _ => return Err(invalid_input("start_date and end_date go together")),
    };
    let mut session = ctx.session().await?;
    let history = ctx
        .ledger
        .statistics
        .history(&mut session, ctx.me.id, range)
        .await?;
    Ok(Json(history))
}

#[derive(Deserialize)]
struct LeaderboardParams {
    quarter: Option<String>,
    year: Option<i32>,
    #[serde(default)]
    include_bonus: bool,
}

async fn leaderboard(
    Extension(ctx): Extension<Arc<Context>>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<Vec<LeaderboardRow>>, ApiError> {
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
                category: None,
                grade: None,
                role: None,
            },
        )
        .await?;
    Ok(Json(rows))
}

async fn quarters(Extension(ctx): Extension<Arc<Context>>) -> Result<Json<serde_json::Value>, ApiError> {
    let mut session = ctx.session().await?;
    let years = ctx
        .ledger
        .statistics
        .available_fiscal_years(&mut session)
        .await?;
    let current = FiscalQuarter::current();
    Ok(Json(json!({
        "current": current.label(),
        "years": years,
        "quarters": FiscalQuarter::all(current.fiscal_year)
            .iter()
            .map(FiscalQuarter::label)
            .collect::<Vec<_>>(),
    })))
}

#[derive(Deserialize)]
struct SubmitForm {
    category_id: String,
    #[serde(default)]
    points: i64,
    event_date: Option<String>,
    #[serde(default)]
    notes: String,
    utilization_value: Option<f64>,
    assigned_validator_id: Option<String>,
    attachment_id: Option<String>,
}

#[derive(Serialize)]
struct RequestView {
    id: String,
    category_name: String,
    points: i64,
    status: RequestStatus,
    request_date: DateTime<Utc>,
    event_date: Option<DateTime<Utc>>,
    notes: String,
    response_notes: Option<String>,
    has_attachment: bool,
}

async fn submit(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<Context>>,
    Json(form): Json<SubmitForm>,
) -> Result<Json<RequestView>, ApiError> {
    let category_id = params::parse_oid(&form.category_id)?;
    let event_date = form
        .event_date
        .as_deref()
        .map(params::parse_event_date)
        .transpose()?;
    let assigned_validator_id = form
        .assigned_validator_id
        .as_deref()
        .map(params::parse_oid)
        .transpose()?;
    let attachment_id = form
        .attachment_id
        .as_deref()
        .map(params::parse_oid)
        .transpose()?;

    let mut session = ctx.session().await?;
    let request = ctx
        .ledger
        .submit_request(
            &mut session,
            SubmitRequest {
                user_id: ctx.me.id,
                category_id,
                points: form.points,
                event_date,
                notes: form.notes,
                utilization_value: form.utilization_value,
                assigned_validator_id,
                attachment_id,
            },
        )
        .await?;

    let category = ctx
        .ledger
        .categories
        .resolve(&mut session, category_id)
        .await?;

    // Realtime ping for the validator pool; a publish failure is logged,
    // never surfaced, the request is already committed.
    let validator_role = category
        .department_tag()
        .map(|department| department.validator_tag().to_string())
        .unwrap_or_else(|| "manager".to_string());
    let event = Event::NewRequest {
        data: json!({
            "request_id": request.id.to_hex(),
            "employee": ctx.me.name,
            "category": category.name.clone(),
            "points": request.points,
        }),
        validator_id: request.assigned_validator_id.map(|id| id.to_hex()),
        validator_role,
        only_assigned: request.assigned_validator_id.is_some(),
    };
    if let Err(err) = state.realtime.publish(&event).await {
        warn!("Failed to publish new_request event: {err}");
    }

    let has_attachment = request.has_attachment();
    Ok(Json(RequestView {
        id: request.id.to_hex(),
        category_name: category.name,
        points: request.points,
        status: request.status,
        request_date: request.request_date,
        event_date: request.event_date,
        notes: request.submission_notes,
        response_notes: None,
        has_attachment,
    }))
}

#[derive(Deserialize)]
struct OwnRequestsParams {
    status: Option<RequestStatus>,
}

async fn own_requests(
    Extension(ctx): Extension<Arc<Context>>,
    Query(params): Query<OwnRequestsParams>,
) -> Result<Json<Vec<RequestView>>, ApiError> {
    let mut session = ctx.session().await?;
    let requests = ctx
        .ledger
        .requests
        .own_requests(&mut session, ctx.me.id, params.status)
        .await?;

    let mut views = Vec::with_capacity(requests.len());
    for request in requests {
        let category_name = ctx
            .ledger
            .categories
            .get(&mut session, request.category_id)
            .await?
            .map(|category| category.name)
            .unwrap_or_else(|| "Unknown".to_string());
        let has_attachment = request.has_attachment();
        views.push(RequestView {
            id: request.id.to_hex(),
            category_name,
            points: request.points,
            status: request.status,
            request_date: request.request_date,
            event_date: request.event_date,
            notes: request.submission_notes,
            response_notes: request.response_notes,
            has_attachment,
        });
    }
    Ok(Json(views))
}

pub(crate) fn resolve_quarter(label: Option<&str>) -> Result<FiscalQuarter, ApiError> {
    match label {
        Some(label) => FiscalQuarter::parse_label(label)
            .map_err(|_| invalid_input(format!("invalid quarter: {label}"))),
        None => Ok(FiscalQuarter::current()),
    }
}

pub(crate) fn resolve_range(
    quarter: Option<&str>,
    year: Option<i32>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    match (quarter, year) {
        (Some(label), _) => Ok(resolve_quarter(Some(label))?.bounds()),
        (None, Some(year)) => Ok(fiscal_year_bounds(year)),
        (None, None) => Ok(resolve_quarter(None)?.bounds()),
    }
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use ledger::service::requests::PendingRequestView;
use log::warn;
use model::access::RoleTag;
use model::category::{Category, Department};
use model::session::Session;
use notify::realtime::Event;
use serde::Deserialize;
use serde_json::{json, Value};
use strum::IntoEnumIterator as _;

use crate::context::Context;
use crate::error::{access_denied, ApiError};
use crate::params;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/validator/pending", get(pending))
        .route("/validator/requests/:id/approve", post(approve))
        .route("/validator/requests/:id/reject", post(reject))
}

/// Departments the caller validates for, from their dashboard tags.
fn validator_departments(ctx: &Context) -> Vec<Department> {
    Department::iter()
        .filter(|department| ctx.has_tag(department.validator_tag()))
        .collect()
}

async fn pending(
    Extension(ctx): Extension<Arc<Context>>,
) -> Result<Json<Vec<PendingRequestView>>, ApiError> {
    let departments = validator_departments(&ctx);
    if departments.is_empty() && !ctx.has_tag(RoleTag::Central) {
        return Err(access_denied());
    }
    let departments = if ctx.has_tag(RoleTag::Central) {
        Department::iter().collect()
    } else {
        departments
    };

    let mut session = ctx.session().await?;
    let queue = ctx
        .ledger
        .requests
        .pending_queue(&mut session, &departments)
        .await?;
    Ok(Json(queue))
}

#[derive(Deserialize)]
struct DecisionForm {
    response_notes: String,
}

/// The caller must validate for the department that currently owns the
/// request's category; Central may act on anything.
async fn authorize_decision(
    ctx: &Context,
    session: &mut Session,
    request_id: bson::oid::ObjectId,
) -> Result<Category, ApiError> {
    let request = ctx
        .ledger
        .requests
        .get(session, request_id)
        .await?
        .ok_or(model::errors::RewardsError::RequestNotFound(request_id))?;
    let category = ctx
        .ledger
        .categories
        .resolve(session, request.category_id)
        .await?;
    if ctx.has_tag(RoleTag::Central) {
        return Ok(category);
    }
    match category.department_tag() {
        Some(department) if ctx.has_tag(department.validator_tag()) => Ok(category),
        _ => Err(access_denied()),
    }
}

async fn approve(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<Context>>,
    Path(id): Path<String>,
    Json(form): Json<DecisionForm>,
) -> Result<Json<Value>, ApiError> {
    let request_id = params::parse_oid(&id)?;
    let mut session = ctx.session().await?;
    let category = authorize_decision(&ctx, &mut session, request_id).await?;

    let (request, award) = ctx
        .ledger
        .approve_request(&mut session, request_id, &ctx.me, form.response_notes)
        .await?;

    let employee = ctx.ledger.users.get(&mut session, request.user_id).await?;
    let role = employee.role.to_string().to_lowercase();
    let events = [
        Event::RequestStatusChanged {
            data: json!({
                "request_id": request.id.to_hex(),
                "status": "Approved",
                "category": category.name.clone(),
            }),
            user_id: employee.id.to_hex(),
            role: role.clone(),
        },
        Event::PointsAwarded {
            data: json!({
                "points": award.points,
                "category": category.name,
                "awarded_by": ctx.me.name.clone(),
            }),
            user_id: employee.id.to_hex(),
            role,
        },
    ];
    for event in &events {
        if let Err(err) = state.realtime.publish(event).await {
            warn!("Failed to publish {} event: {err}", event.event_type());
        }
    }

    Ok(Json(json!({
        "success": true,
        "request_id": request.id.to_hex(),
        "award_id": award.id.to_hex(),
    })))
}

async fn reject(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<Context>>,
    Path(id): Path<String>,
    Json(form): Json<DecisionForm>,
) -> Result<Json<Value>, ApiError> {
    let request_id = params::parse_oid(&id)?;
    let mut session = ctx.session().await?;
    let category = authorize_decision(&ctx, &mut session, request_id).await?;

    let request = ctx
        .ledger
        .reject_request(&mut session, request_id, &ctx.me, form.response_notes)
        .await?;

    let employee = ctx.ledger.users.get(&mut session, request.user_id).await?;
    let event = Event::RequestStatusChanged {
        data: json!({
            "request_id": request.id.to_hex(),
            "status": "Rejected",
            "category": category.name,
        }),
        user_id: employee.id.to_hex(),
        role: employee.role.to_string().to_lowercase(),
    };
    if let Err(err) = state.realtime.publish(&event).await {
        warn!("Failed to publish request_status_changed event: {err}");
    }

    Ok(Json(json!({
        "success": true,
        "request_id": request.id.to_hex(),
    })))
}

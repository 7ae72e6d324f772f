use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Json, Router};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::Context;
use crate::error::ApiError;
use crate::AppState;

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(me))
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: model::user::Role,
    pub grade: Option<model::user::Grade>,
    pub department: Option<String>,
    pub dashboard_access: model::access::DashboardAccess,
}

impl From<&model::user::User> for Profile {
    fn from(user: &model::user::User) -> Self {
        Profile {
            id: user.id.to_hex(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            grade: user.grade,
            department: user.department.clone(),
            dashboard_access: user.dashboard_access.clone(),
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> Result<Json<Value>, ApiError> {
    // The actor is unknown until the credentials check passes.
    let mut session = state.ledger.db.start_session(ObjectId::new()).await?;
    let user = state
        .ledger
        .users
        .verify_credentials(&mut session, &form.email, &form.password)
        .await?;
    session.set_actor(user.id);

    let token = state.jwt.issue(&user.id.to_hex())?;
    Ok(Json(json!({
        "token": token,
        "user": Profile::from(&user),
    })))
}

async fn me(Extension(ctx): Extension<Arc<Context>>) -> Json<Profile> {
    Json(Profile::from(&ctx.me))
}

use std::sync::Arc;

use axum::extract::Path;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bson::oid::ObjectId;
use ledger::service::users::NewUser;
use model::access::{DashboardAccess, RoleTag};
use model::category::{Category, CategoryStatus, MergedCategory, PointsPerUnit};
use model::user::{Grade, Role};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Profile;
use crate::context::Context;
use crate::error::{invalid_input, ApiError};
use crate::params;
use crate::AppState;

const HR_TAGS: &[RoleTag] = &[RoleTag::HrUp, RoleTag::HrVa, RoleTag::Central];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/hr/categories", get(list_categories).post(create_category))
        .route("/hr/categories/:id", axum::routing::put(update_category))
        .route("/hr/users", get(list_users).post(create_user))
        .route("/hr/users/:id", axum::routing::put(update_user))
        .route("/hr/users/:id/deactivate", post(deactivate_user))
}

async fn list_categories(
    Extension(ctx): Extension<Arc<Context>>,
) -> Result<Json<Vec<MergedCategory>>, ApiError> {
    ctx.require_any(HR_TAGS)?;
    let mut session = ctx.session().await?;
    let merged = ctx.ledger.categories.merged(&mut session).await?;
    Ok(Json(merged))
}

#[derive(Deserialize)]
struct CategoryForm {
    name: String,
    code: String,
    department: Option<String>,
    description: Option<String>,
    points_per_unit: Option<PointsPerUnit>,
    #[serde(default)]
    is_bonus: bool,
}

async fn create_category(
    Extension(ctx): Extension<Arc<Context>>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<Category>, ApiError> {
    ctx.require_any(HR_TAGS)?;
    if form.name.trim().is_empty() {
        return Err(invalid_input("category name is required"));
    }
    let category = Category {
        id: ObjectId::new(),
        name: form.name,
        code: form.code,
        department: form.department,
        description: form.description,
        points_per_unit: form.points_per_unit.unwrap_or_default(),
        is_bonus: form.is_bonus,
        status: CategoryStatus::Active,
    };
    let mut session = ctx.session().await?;
    let category = ctx
        .ledger
        .categories
        .create_hr(&mut session, category)
        .await?;
    Ok(Json(category))
}

#[derive(Deserialize)]
struct CategoryUpdateForm {
    name: Option<String>,
    department: Option<String>,
    description: Option<String>,
    points_per_unit: Option<PointsPerUnit>,
    is_bonus: Option<bool>,
    status: Option<CategoryStatus>,
}

async fn update_category(
    Extension(ctx): Extension<Arc<Context>>,
    Path(id): Path<String>,
    Json(form): Json<CategoryUpdateForm>,
) -> Result<Json<Category>, ApiError> {
    ctx.require_any(HR_TAGS)?;
    let id = params::parse_oid(&id)?;
    let mut session = ctx.session().await?;
    let mut category = ctx
        .ledger
        .categories
        .get_hr(&mut session, id)
        .await?
        .ok_or_else(|| invalid_input("legacy categories are read-only"))?;

    if let Some(name) = form.name {
        category.name = name;
    }
    if let Some(department) = form.department {
        category.department = Some(department);
    }
    if let Some(description) = form.description {
        category.description = Some(description);
    }
    if let Some(points_per_unit) = form.points_per_unit {
        category.points_per_unit = points_per_unit;
    }
    if let Some(is_bonus) = form.is_bonus {
        category.is_bonus = is_bonus;
    }
    if let Some(status) = form.status {
        category.status = status;
    }
    ctx.ledger
        .categories
        .update_hr(&mut session, &category)
        .await?;
    Ok(Json(category))
}

async fn list_users(
    Extension(ctx): Extension<Arc<Context>>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    ctx.require_any(HR_TAGS)?;
    let mut session = ctx.session().await?;
    let users = ctx.ledger.users.all(&mut session).await?;
    Ok(Json(users.iter().map(Profile::from).collect()))
}

#[derive(Deserialize)]
struct NewUserForm {
    name: String,
    email: String,
    password: String,
    role: Role,
    grade: Option<Grade>,
    department: Option<String>,
    manager_id: Option<String>,
    dp_id: Option<String>,
    #[serde(default)]
    dashboard_access: DashboardAccess,
}

async fn create_user(
    Extension(ctx): Extension<Arc<Context>>,
    Json(form): Json<NewUserForm>,
) -> Result<Json<Profile>, ApiError> {
    ctx.require_any(HR_TAGS)?;
    let manager_id = form.manager_id.as_deref().map(params::parse_oid).transpose()?;
    let dp_id = form.dp_id.as_deref().map(params::parse_oid).transpose()?;
    let mut session = ctx.session().await?;
    let user = ctx
        .ledger
        .users
        .create(
            &mut session,
            NewUser {
                name: form.name,
                email: form.email,
                password: form.password,
                role: form.role,
                grade: form.grade,
                department: form.department,
                manager_id,
                dp_id,
                dashboard_access: form.dashboard_access,
            },
        )
        .await?;
    Ok(Json(Profile::from(&user)))
}

#[derive(Deserialize)]
struct UserUpdateForm {
    name: Option<String>,
    grade: Option<Grade>,
    department: Option<String>,
    role: Option<Role>,
    manager_id: Option<String>,
    dp_id: Option<String>,
    dashboard_access: Option<DashboardAccess>,
}

async fn update_user(
    Extension(ctx): Extension<Arc<Context>>,
    Path(id): Path<String>,
    Json(form): Json<UserUpdateForm>,
) -> Result<Json<Profile>, ApiError> {
    ctx.require_any(HR_TAGS)?;
    let id = params::parse_oid(&id)?;
    let mut session = ctx.session().await?;
    let mut user = ctx.ledger.users.get(&mut session, id).await?;

    if let Some(name) = form.name {
        user.name = name;
    }
    if let Some(grade) = form.grade {
        user.grade = Some(grade);
    }
    if let Some(department) = form.department {
        user.department = Some(department);
    }
    if let Some(role) = form.role {
        user.role = role;
    }
    if let Some(manager_id) = form.manager_id {
        user.manager_id = Some(params::parse_oid(&manager_id)?);
    }
    if let Some(dp_id) = form.dp_id {
        user.dp_id = Some(params::parse_oid(&dp_id)?);
    }
    if let Some(dashboard_access) = form.dashboard_access {
        user.dashboard_access = dashboard_access;
    }
    ctx.ledger.users.update(&mut session, &user).await?;
    Ok(Json(Profile::from(&user)))
}

async fn deactivate_user(
    Extension(ctx): Extension<Arc<Context>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ctx.require_any(HR_TAGS)?;
    let id = params::parse_oid(&id)?;
    let mut session = ctx.session().await?;
    ctx.ledger.users.deactivate(&mut session, id).await?;
    Ok(Json(json!({ "success": true })))
}

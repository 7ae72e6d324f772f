use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use model::access::RoleTag;
use model::errors::RewardsError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::Context;
use crate::error::{access_denied, invalid_input, ApiError};
use crate::params;
use crate::AppState;

const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/attachments", post(upload))
        .route("/attachments/:request_id", get(download))
}

#[derive(Deserialize)]
struct UploadParams {
    filename: String,
    #[serde(default = "default_content_type")]
    content_type: String,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

/// Upload a supporting document; the returned id is attached to a request
/// at submission time.
async fn upload(
    Extension(ctx): Extension<Arc<Context>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    if body.is_empty() {
        return Err(invalid_input("attachment is empty"));
    }
    if body.len() > MAX_ATTACHMENT_BYTES {
        return Err(invalid_input("attachment exceeds the 10 MB limit"));
    }
    let id = ctx
        .ledger
        .attachments
        .upload(&params.filename, &params.content_type, &body)
        .await?;
    Ok(Json(json!({ "attachment_id": id.to_hex() })))
}

/// Stream a request's attachment back with its original content type and
/// filename. Allowed: the owner, a validator/updater of the category's
/// department, and HR/Central.
async fn download(
    Extension(ctx): Extension<Arc<Context>>,
    Path(request_id): Path<String>,
) -> Result<Response, ApiError> {
    let request_id = params::parse_oid(&request_id)?;
    let mut session = ctx.session().await?;
    let request = ctx
        .ledger
        .requests
        .get(&mut session, request_id)
        .await?
        .ok_or(RewardsError::RequestNotFound(request_id))?;
    let attachment_id = request
        .attachment_id
        .ok_or(RewardsError::AttachmentNotFound(request_id))?;

    if request.user_id != ctx.me.id {
        let category = ctx
            .ledger
            .categories
            .resolve(&mut session, request.category_id)
            .await?;
        let department_access = category
            .department_tag()
            .map(|department| {
                ctx.has_tag(department.validator_tag()) || ctx.has_tag(department.updater_tag())
            })
            .unwrap_or(false);
        let admin_access =
            ctx.has_tag(RoleTag::Central) || ctx.has_tag(RoleTag::HrUp) || ctx.has_tag(RoleTag::HrVa);
        if !department_access && !admin_access {
            return Err(access_denied());
        }
    }

    let (meta, bytes) = ctx.ledger.attachments.download(attachment_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, meta.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", meta.filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

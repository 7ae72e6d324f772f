use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};
use bson::oid::ObjectId;
use ledger::Ledger;
use log::warn;
use model::access::RoleTag;
use model::session::Session;
use model::user::User;

use crate::error::{access_denied, ApiError};
use crate::AppState;

/// Per-request context: the authenticated user plus the ledger. Handlers
/// open their own Mongo session bound to the caller as actor.
pub struct Context {
    pub me: User,
    pub ledger: Ledger,
}

impl Context {
    pub async fn session(&self) -> Result<Session, ApiError> {
        Ok(self.ledger.db.start_session(self.me.id).await?)
    }

    pub fn has_tag(&self, tag: RoleTag) -> bool {
        self.me.dashboard_access.has(tag)
    }

    pub fn require_any(&self, tags: &[RoleTag]) -> Result<(), ApiError> {
        if self.me.dashboard_access.has_any(tags) {
            Ok(())
        } else {
            Err(access_denied())
        }
    }
}

pub async fn middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let Some(token) = token else {
        return unauthorized();
    };

    let claims = match state.jwt.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            warn!("Rejected token: {err}");
            return unauthorized();
        }
    };
    let user_id = match ObjectId::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized(),
    };

    let mut session = match state.ledger.db.start_session(user_id).await {
        Ok(session) => session,
        Err(err) => {
            warn!("Failed to start session: {err:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };
    let user = match state.ledger.users.find(&mut session, user_id).await {
        Ok(Some(user)) if user.is_active => user,
        Ok(_) => return unauthorized(),
        Err(err) => {
            warn!("Failed to load user {user_id}: {err:#}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    request.extensions_mut().insert(Arc::new(Context {
        me: user,
        ledger: state.ledger.clone(),
    }));
    next.run(request).await
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

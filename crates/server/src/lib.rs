use std::sync::Arc;

use axum::routing::post;
use axum::{middleware, Router};
use eyre::Result;
use jwt::Jwt;
use ledger::Ledger;
use notify::realtime::Realtime;

pub mod auth;
pub mod central;
pub mod context;
pub mod employee;
pub mod error;
pub mod hr;
pub mod jwt;
mod params;
pub mod validator;

mod attachments;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub jwt: Arc<Jwt>,
    pub realtime: Realtime,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::protected_routes())
        .merge(employee::routes())
        .merge(validator::routes())
        .merge(central::routes())
        .merge(hr::routes())
        .merge(attachments::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            context::middleware,
        ));

    Router::new()
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}

pub async fn serve(state: AppState, bind_addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

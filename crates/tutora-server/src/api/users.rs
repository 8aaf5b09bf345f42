//! Admin-only account endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use tutora_shared::Role;
use tutora_store::{Account, Overview};

use super::{ok, parse_id, ApiJson, ApiResult, AppState};
use crate::auth::AuthUser;
use crate::error::{store_error, ApiError};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats/overview", get(overview))
        .route("/:id/verify", put(set_verified))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest {
    is_verified: Option<bool>,
}

async fn overview(State(state): State<AppState>, user: AuthUser) -> ApiResult<Overview> {
    user.require(Role::Admin)?;
    let stats = state.with_db(|db| Ok(db.overview(Utc::now())?))?;
    ok(stats)
}

async fn set_verified(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> ApiResult<Account> {
    user.require(Role::Admin)?;
    let id = parse_id(&id, "User")?;
    let verified = req
        .is_verified
        .ok_or_else(|| ApiError::BadRequest("isVerified must be a boolean".into()))?;

    let account = state.with_db(|db| db.set_verified(id, verified).map_err(store_error("User")))?;
    info!(account = %id, verified, by = %user.id(), "Verification changed");
    ok(account)
}

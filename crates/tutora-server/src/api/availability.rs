//! Teacher-managed weekly availability.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tutora_shared::schedule::{is_valid_weekday, parse_time, validate_slot_bounds};
use tutora_shared::{FieldErrors, Role, TimeOfDay, ValidationError};
use tutora_store::availability::group_by_weekday;
use tutora_store::{AvailabilitySlot, SlotSpec};
use uuid::Uuid;

use super::{blank_as_none, created, ok, parse_id, ApiJson, ApiQuery, ApiResult, AppState};
use crate::auth::AuthUser;
use crate::error::{store_error, ApiError};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_slot).get(my_slots))
        .route("/bulk", post(replace_slots))
        .route("/teacher/:teacher_id", get(teacher_slots))
        .route("/:id", put(update_slot).delete(delete_slot))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotRequest {
    day_of_week: Option<i64>,
    start_time: Option<String>,
    end_time: Option<String>,
    is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    slots: Option<Vec<SlotRequest>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotUpdate {
    start_time: Option<String>,
    end_time: Option<String>,
    is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeacherSlotsQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    day_of_week: Option<u8>,
}

/// Validate a slot definition, reporting fields under `prefix`.
fn slot_spec(req: &SlotRequest, prefix: &str) -> Result<SlotSpec, Vec<ValidationError>> {
    let field = |name: &str| format!("{prefix}{name}");
    let mut errors = FieldErrors::new();

    let day = match req.day_of_week {
        Some(day) if is_valid_weekday(day) => Some(day as u8),
        _ => {
            errors.push(ValidationError::new(
                field("dayOfWeek"),
                "Day of week must be between 0-6",
            ));
            None
        }
    };
    let start = errors.take(time_field(&field("startTime"), "Start time", req.start_time.as_deref()));
    let end = errors.take(time_field(&field("endTime"), "End time", req.end_time.as_deref()));

    let (Some(day_of_week), Some(start_time), Some(end_time)) = (day, start, end) else {
        return Err(errors.into_inner());
    };
    if let Err(mut e) = validate_slot_bounds(start_time, end_time) {
        e.field = field("endTime");
        errors.push(e);
    }
    errors.finish()?;

    Ok(SlotSpec {
        day_of_week,
        start_time,
        end_time,
        is_available: req.is_available.unwrap_or(true),
    })
}

fn time_field(field: &str, label: &str, value: Option<&str>) -> Result<TimeOfDay, ValidationError> {
    let message = || format!("{label} must be in HH:MM format");
    let value = value.ok_or_else(|| ValidationError::new(field, message()))?;
    parse_time(field, value).map_err(|_| ValidationError::new(field, message()))
}

/// Load a slot and make sure `user` owns it.
fn owned_slot(state: &AppState, user: &AuthUser, id: Uuid) -> Result<AvailabilitySlot, ApiError> {
    let slot = state.with_db(|db| db.get_slot(id).map_err(store_error("Availability slot")))?;
    if slot.teacher_id != user.id() {
        return Err(ApiError::Forbidden);
    }
    Ok(slot)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_slot(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<SlotRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Teacher)?;
    let spec = slot_spec(&req, "")?;
    let slot = state.with_db(|db| Ok(db.create_slot(user.id(), &spec)?))?;
    tracing::debug!(slot = %slot.id, teacher = %user.id(), "Availability slot created");
    created(slot)
}

/// The caller's slots keyed by weekday.
async fn my_slots(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<BTreeMap<u8, Vec<AvailabilitySlot>>> {
    user.require(Role::Teacher)?;
    let slots = state.with_db(|db| Ok(db.list_slots(user.id(), None, false)?))?;
    ok(group_by_weekday(slots))
}

async fn replace_slots(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<BulkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Teacher)?;
    let slots = req
        .slots
        .ok_or_else(|| ApiError::BadRequest("Slots must be an array".into()))?;

    let mut errors = Vec::new();
    let mut specs = Vec::with_capacity(slots.len());
    for (i, slot) in slots.iter().enumerate() {
        match slot_spec(slot, &format!("slots[{i}].")) {
            Ok(spec) => specs.push(spec),
            Err(mut e) => errors.append(&mut e),
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let replaced = state.with_db(|db| Ok(db.replace_slots(user.id(), &specs)?))?;
    created(replaced)
}

async fn teacher_slots(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
    ApiQuery(q): ApiQuery<TeacherSlotsQuery>,
) -> ApiResult<Vec<AvailabilitySlot>> {
    let teacher_id = parse_id(&teacher_id, "Teacher")?;
    let slots = state.with_db(|db| Ok(db.list_slots(teacher_id, q.day_of_week, false)?))?;
    ok(slots)
}

async fn update_slot(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<SlotUpdate>,
) -> ApiResult<AvailabilitySlot> {
    user.require(Role::Teacher)?;
    let id = parse_id(&id, "Availability slot")?;
    let current = owned_slot(&state, &user, id)?;

    let mut errors = FieldErrors::new();
    let start = match req.start_time.as_deref() {
        Some(v) => errors.take(time_field("startTime", "Start time", Some(v))),
        None => Some(current.start_time),
    };
    let end = match req.end_time.as_deref() {
        Some(v) => errors.take(time_field("endTime", "End time", Some(v))),
        None => Some(current.end_time),
    };
    errors.finish()?;

    if let (Some(start), Some(end)) = (start, end) {
        if req.start_time.is_some() || req.end_time.is_some() {
            validate_slot_bounds(start, end)?;
        }
    }

    let slot = state.with_db(|db| {
        Ok(db.update_slot(id, start, end, req.is_available)?)
    })?;
    ok(slot)
}

async fn delete_slot(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require(Role::Teacher)?;
    let id = parse_id(&id, "Availability slot")?;
    owned_slot(&state, &user, id)?;

    if !state.with_db(|db| Ok(db.delete_slot(id)?))? {
        return Err(ApiError::not_found("Availability slot"));
    }
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Availability slot deleted",
    })))
}

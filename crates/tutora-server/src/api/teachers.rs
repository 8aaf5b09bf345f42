//! Public teacher directory.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use tutora_shared::constants::POPULAR_SUBJECTS_LIMIT;
use tutora_shared::schedule::{parse_calendar_date, weekday_index};
use tutora_shared::PageRequest;
use tutora_store::availability::group_by_weekday;
use tutora_store::{Account, AvailabilitySlot, SubjectCount, TeacherFilter};

use super::{blank_as_none, ok, paged, parse_id, ApiQuery, ApiResult, AppState};
use crate::error::{store_error, ApiError};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_teachers))
        .route("/subjects/popular", get(popular_subjects))
        .route("/:id", get(get_teacher))
        .route("/:id/availability", get(day_availability))
        .route("/:id/schedule", get(weekly_schedule))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryQuery {
    subject: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    min_rating: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    max_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DateQuery {
    date: Option<String>,
}

async fn list_teachers(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<DirectoryQuery>,
) -> ApiResult<Vec<Account>> {
    let page = PageRequest::new(q.page, q.limit);
    let filter = TeacherFilter {
        subject: q.subject,
        min_rating: q.min_rating,
        max_price: q.max_price,
    };
    let (teachers, total) = state.with_db(|db| Ok(db.list_teachers(&filter, page)?))?;
    paged(teachers, page.info(total))
}

async fn popular_subjects(State(state): State<AppState>) -> ApiResult<Vec<SubjectCount>> {
    let subjects = state.with_db(|db| Ok(db.popular_subjects(POPULAR_SUBJECTS_LIMIT)?))?;
    ok(subjects)
}

async fn get_teacher(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Account> {
    let id = parse_id(&id, "Teacher")?;
    let teacher = state.with_db(|db| db.get_teacher(id).map_err(store_error("Teacher")))?;
    ok(teacher)
}

/// Available slots on the weekday of `?date=`.
async fn day_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(q): ApiQuery<DateQuery>,
) -> ApiResult<Vec<AvailabilitySlot>> {
    let id = parse_id(&id, "Teacher")?;
    let raw = q
        .date
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Date parameter is required".into()))?;
    let weekday = weekday_index(parse_calendar_date(&raw)?);

    let slots = state.with_db(|db| {
        db.get_teacher(id).map_err(store_error("Teacher"))?;
        Ok(db.list_slots(id, Some(weekday), true)?)
    })?;
    ok(slots)
}

/// Available slots grouped by weekday.
async fn weekly_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<BTreeMap<u8, Vec<AvailabilitySlot>>> {
    let id = parse_id(&id, "Teacher")?;
    let slots = state.with_db(|db| {
        db.get_teacher(id).map_err(store_error("Teacher"))?;
        Ok(db.list_slots(id, None, true)?)
    })?;
    ok(group_by_weekday(slots))
}

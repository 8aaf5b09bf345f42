//! Booking lifecycle: creation, queries, status changes and reviews.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use tutora_shared::constants::{
    MAX_BOOKING_MINUTES, MAX_NOTES_LEN, MAX_RATING, MAX_REVIEW_LEN, MIN_BOOKING_MINUTES, MIN_RATING,
};
use tutora_shared::schedule::{parse_calendar_date, parse_time};
use tutora_shared::{
    BookingStatus, BookingWindow, FieldErrors, PageRequest, Role, TimeOfDay, ValidationError,
};
use tutora_store::{BookingDetails, BookingScope, NewBooking};
use uuid::Uuid;

use super::{blank_as_none, created, ok, paged, parse_id, ApiJson, ApiQuery, ApiResult, AppState};
use crate::auth::AuthUser;
use crate::error::{store_error, ApiError};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/:id", get(get_booking))
        .route("/:id/status", put(update_status))
        .route("/:id/cancel", put(cancel_booking))
        .route("/:id/review", post(add_review))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingRequest {
    teacher_id: Option<String>,
    subject: Option<String>,
    date: Option<String>,
    start_time: Option<String>,
    duration: Option<i64>,
    notes: Option<String>,
}

#[derive(Debug)]
struct BookingInput {
    teacher_id: Uuid,
    subject: String,
    date: NaiveDate,
    start: TimeOfDay,
    duration: u32,
    notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    status: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    page: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
    status: Option<String>,
    teacher_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReviewRequest {
    rating: Option<i64>,
    review: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_booking(req: &CreateBookingRequest) -> Result<BookingInput, Vec<ValidationError>> {
    let mut errors = FieldErrors::new();

    let teacher_id = req
        .teacher_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id.trim()).ok());
    errors.check(teacher_id.is_some(), "teacherId", "Valid teacher ID is required");

    let subject = req.subject.as_deref().map(str::trim).unwrap_or_default();
    errors.check(!subject.is_empty(), "subject", "Subject is required");

    let date = match req.date.as_deref() {
        Some(raw) => errors.take(parse_calendar_date(raw)),
        None => {
            errors.push(ValidationError::new("date", "Valid date is required"));
            None
        }
    };

    let start = req.start_time.as_deref().and_then(|raw| parse_time("startTime", raw).ok());
    errors.check(start.is_some(), "startTime", "Start time must be in HH:MM format");

    let duration = req
        .duration
        .and_then(|d| u32::try_from(d).ok())
        .filter(|d| (MIN_BOOKING_MINUTES..=MAX_BOOKING_MINUTES).contains(d));
    errors.check(
        duration.is_some(),
        "duration",
        "Duration must be between 15 and 480 minutes",
    );

    if let Some(notes) = &req.notes {
        errors.check(
            notes.chars().count() <= MAX_NOTES_LEN,
            "notes",
            "Notes cannot exceed 500 characters",
        );
    }

    errors.finish()?;
    match (teacher_id, date, start, duration) {
        (Some(teacher_id), Some(date), Some(start), Some(duration)) => Ok(BookingInput {
            teacher_id,
            subject: subject.to_string(),
            date,
            start,
            duration,
            notes: req.notes.clone().filter(|n| !n.trim().is_empty()),
        }),
        _ => Err(Vec::new()),
    }
}

/// Statuses a teacher may request through the status endpoint.
fn requested_status(raw: Option<&str>) -> Result<BookingStatus, ValidationError> {
    let invalid = || ValidationError::new("status", "Invalid status");
    let status: BookingStatus = raw.ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    if status == BookingStatus::Pending {
        return Err(invalid());
    }
    Ok(status)
}

fn validate_review(req: &ReviewRequest) -> Result<(u8, Option<String>), Vec<ValidationError>> {
    let mut errors = FieldErrors::new();

    let rating = req
        .rating
        .and_then(|r| u8::try_from(r).ok())
        .filter(|r| (MIN_RATING..=MAX_RATING).contains(r));
    errors.check(rating.is_some(), "rating", "Rating must be between 1 and 5");

    if let Some(review) = &req.review {
        errors.check(
            review.chars().count() <= MAX_REVIEW_LEN,
            "review",
            "Review cannot exceed 1000 characters",
        );
    }

    errors.finish()?;
    let review = req.review.clone().filter(|r| !r.trim().is_empty());
    rating.map(|r| (r, review)).ok_or_else(Vec::new)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require(Role::Student)?;
    let input = validate_booking(&req)?;

    let teacher = state.with_db(|db| {
        db.get_teacher(input.teacher_id)
            .map_err(store_error("Teacher"))
    })?;

    if input.date <= Utc::now().date_naive() {
        return Err(ApiError::BadRequest("Cannot book classes in the past".into()));
    }
    let window = BookingWindow::new(input.date, input.start, input.duration)?;

    let rate = teacher.hourly_rate.unwrap_or_default();
    let new = NewBooking {
        student_id: user.id(),
        teacher_id: teacher.id,
        subject: input.subject,
        window,
        amount: rate * f64::from(window.duration) / 60.0,
        meeting_link: state.config.meeting_link(Uuid::new_v4()),
        notes: input.notes,
    };

    let details = state.with_db(|db| {
        let booking = db.create_booking_checked(&new)?;
        Ok(db.get_booking_details(booking.id)?)
    })?;

    state.notifier.dispatch_booking_created(details.clone());
    created(details)
}

async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> ApiResult<Vec<BookingDetails>> {
    let status = match q.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<BookingStatus>()
                .map_err(|_| ValidationError::new("status", "Invalid status"))?,
        ),
        None => None,
    };
    let scope = match user.role() {
        Role::Student => BookingScope::AsStudent(user.id()),
        Role::Teacher => BookingScope::AsTeacher(user.id()),
        Role::Admin => BookingScope::All,
    };
    let page = PageRequest::new(q.page, q.limit);

    let (bookings, total) = state.with_db(|db| Ok(db.list_bookings(scope, status, page)?))?;
    paged(bookings, page.info(total))
}

async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<BookingDetails> {
    let id = parse_id(&id, "Booking")?;
    let details = state.with_db(|db| db.get_booking_details(id).map_err(store_error("Booking")))?;
    if !details.booking.involves(user.id()) {
        return Err(ApiError::Forbidden);
    }
    ok(details)
}

async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> ApiResult<BookingDetails> {
    user.require(Role::Teacher)?;
    let id = parse_id(&id, "Booking")?;

    let mut errors = FieldErrors::new();
    let next = errors.take(requested_status(req.status.as_deref()));
    if let Some(notes) = &req.teacher_notes {
        errors.check(
            notes.chars().count() <= MAX_NOTES_LEN,
            "teacherNotes",
            "Teacher notes cannot exceed 500 characters",
        );
    }
    errors.finish()?;
    let next = next.ok_or_else(|| ApiError::Validation(Vec::new()))?;
    let notes = req.teacher_notes.as_deref().filter(|n| !n.trim().is_empty());

    let details = state.with_db(|db| {
        let current = db.get_booking(id).map_err(store_error("Booking"))?;
        if current.teacher_id != user.id() {
            return Err(ApiError::Forbidden);
        }
        if !current.status.teacher_can_move_to(next) {
            return Err(ApiError::Conflict(format!(
                "Cannot change booking status from {} to {}",
                current.status, next
            )));
        }
        db.update_booking_status(id, current.status, next, notes)?;
        Ok(db.get_booking_details(id)?)
    })?;

    info!(booking = %id, status = %next, "Booking status updated");
    ok(details)
}

async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<BookingDetails> {
    let id = parse_id(&id, "Booking")?;

    let details = state.with_db(|db| {
        let current = db.get_booking(id).map_err(store_error("Booking"))?;
        if !current.involves(user.id()) {
            return Err(ApiError::Forbidden);
        }
        if !current.status.can_cancel() {
            return Err(ApiError::BadRequest("Booking cannot be cancelled".into()));
        }
        db.update_booking_status(id, current.status, BookingStatus::Cancelled, None)?;
        Ok(db.get_booking_details(id)?)
    })?;

    info!(booking = %id, by = %user.id(), "Booking cancelled");
    ok(details)
}

async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> ApiResult<BookingDetails> {
    user.require(Role::Student)?;
    let id = parse_id(&id, "Booking")?;
    let (rating, review) = validate_review(&req)?;

    let details = state.with_db(|db| {
        let current = db.get_booking(id).map_err(store_error("Booking"))?;
        if current.student_id != user.id() {
            return Err(ApiError::Forbidden);
        }
        if current.status != BookingStatus::Completed {
            return Err(ApiError::BadRequest("Can only review completed bookings".into()));
        }
        if current.rating.is_some() {
            return Err(ApiError::BadRequest("Booking already reviewed".into()));
        }
        db.add_review(id, rating, review.as_deref())?;
        Ok(db.get_booking_details(id)?)
    })?;
    ok(details)
}

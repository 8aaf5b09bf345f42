//! Video-room presence for confirmed bookings.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tutora_shared::BookingStatus;
use uuid::Uuid;

use super::{ok, parse_id, ApiResult, AppState};
use crate::auth::AuthUser;
use crate::error::{store_error, ApiError};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:booking_id", get(room_state))
        .route("/:booking_id/join", post(join_room))
        .route("/:booking_id/leave", post(leave_room))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomView {
    booking_id: Uuid,
    meeting_link: String,
    participants: Vec<Uuid>,
}

/// Resolve the booking behind a room and check the caller is on it.
/// Returns the meeting link.
fn room_access(
    state: &AppState,
    user: &AuthUser,
    booking_id: Uuid,
    require_confirmed: bool,
) -> Result<String, ApiError> {
    let booking = state.with_db(|db| db.get_booking(booking_id).map_err(store_error("Booking")))?;
    if !booking.involves(user.id()) {
        return Err(ApiError::Forbidden);
    }
    if require_confirmed && booking.status != BookingStatus::Confirmed {
        return Err(ApiError::BadRequest(
            "Class room is only open for confirmed bookings".into(),
        ));
    }
    Ok(booking.meeting_link)
}

async fn join_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> ApiResult<RoomView> {
    let booking_id = parse_id(&booking_id, "Booking")?;
    let meeting_link = room_access(&state, &user, booking_id, true)?;

    // Presence is tracked server-side; the HTTP caller has no event stream.
    drop(state.rooms.join(booking_id, user.id()).await);

    ok(RoomView {
        booking_id,
        meeting_link,
        participants: state.rooms.participants(booking_id).await,
    })
}

async fn leave_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> ApiResult<RoomView> {
    let booking_id = parse_id(&booking_id, "Booking")?;
    let meeting_link = room_access(&state, &user, booking_id, false)?;

    state.rooms.leave(booking_id, user.id()).await;

    ok(RoomView {
        booking_id,
        meeting_link,
        participants: state.rooms.participants(booking_id).await,
    })
}

async fn room_state(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> ApiResult<RoomView> {
    let booking_id = parse_id(&booking_id, "Booking")?;
    let meeting_link = room_access(&state, &user, booking_id, false)?;

    ok(RoomView {
        booking_id,
        meeting_link,
        participants: state.rooms.participants(booking_id).await,
    })
}

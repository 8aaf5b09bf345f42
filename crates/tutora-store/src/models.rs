//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer and decoded again by the client. Field names
//! are camelCase on the wire.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tutora_shared::{BookingStatus, BookingWindow, Role, TimeOfDay};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A registered user. Teacher-only and student-only fields are empty for
/// the other roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub subjects: Vec<String>,
    pub bio: Option<String>,
    pub hourly_rate: Option<f64>,
    /// Mean review rating, maintained by the review rollup.
    pub rating: f64,
    pub total_reviews: u32,
    pub grade: Option<String>,
    pub interests: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`Database::create_account`](crate::Database::create_account).
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub subjects: Vec<String>,
    pub bio: Option<String>,
    pub hourly_rate: Option<f64>,
    pub grade: Option<String>,
    pub interests: Vec<String>,
    pub is_verified: bool,
}

impl NewAccount {
    /// A bare account of `role`; role-specific fields start empty.
    pub fn new(name: &str, email: &str, password_hash: &str, role: Role) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            subjects: Vec::new(),
            bio: None,
            hourly_rate: None,
            grade: None,
            interests: Vec::new(),
            is_verified: false,
        }
    }
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
}

/// Directory filters for the public teacher listing.
#[derive(Debug, Clone, Default)]
pub struct TeacherFilter {
    /// Case-insensitive substring matched against every subject.
    pub subject: Option<String>,
    pub min_rating: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectCount {
    pub subject: String,
    pub count: u32,
}

/// Who is on the other side of a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartySummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// A recurring weekly window in which a teacher accepts bookings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub teacher_id: Uuid,
    /// 0 = Sunday … 6 = Saturday.
    pub day_of_week: u8,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

/// A slot definition before it is stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlotSpec {
    pub day_of_week: u8,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub subject: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    /// Minutes.
    pub duration: u32,
    pub status: BookingStatus,
    pub amount: f64,
    pub meeting_link: String,
    pub notes: Option<String>,
    pub student_notes: Option<String>,
    pub teacher_notes: Option<String>,
    pub rating: Option<u8>,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn involves(&self, account_id: Uuid) -> bool {
        self.student_id == account_id || self.teacher_id == account_id
    }
}

/// A booking with both parties resolved, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub student: PartySummary,
    pub teacher: PartySummary,
}

/// Input for [`Database::create_booking_checked`](crate::Database::create_booking_checked).
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub subject: String,
    pub window: BookingWindow,
    pub amount: f64,
    pub meeting_link: String,
    pub notes: Option<String>,
}

/// Filter for booking listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingScope {
    AsStudent(Uuid),
    AsTeacher(Uuid),
    All,
}

// ---------------------------------------------------------------------------
// Admin overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_users: u64,
    pub total_students: u64,
    pub total_teachers: u64,
    pub verified_teachers: u64,
    pub recent_registrations: u64,
    pub top_teachers: Vec<Account>,
}

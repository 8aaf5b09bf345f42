//! Fixtures shared by the store's unit tests.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use tutora_shared::{BookingWindow, Role, TimeOfDay};
use uuid::Uuid;

use crate::database::Database;
use crate::models::{Account, Booking, NewAccount, NewBooking, SlotSpec};

pub(crate) fn teacher(db: &Database, email: &str, rate: f64, subjects: &[&str]) -> Account {
    let mut new = NewAccount::new("Teacher", email, "hash", Role::Teacher);
    new.hourly_rate = Some(rate);
    new.subjects = subjects.iter().map(|s| s.to_string()).collect();
    db.create_account(&new).unwrap()
}

pub(crate) fn student(db: &Database, email: &str) -> Account {
    db.create_account(&NewAccount::new("Student", email, "hash", Role::Student))
        .unwrap()
}

pub(crate) fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

/// The first date at least a week from today that falls on `weekday`
/// (0 = Sunday).
pub(crate) fn upcoming(weekday: u8) -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(7);
    while date.weekday().num_days_from_sunday() as u8 != weekday {
        date += Duration::days(1);
    }
    date
}

pub(crate) fn slot(day: u8, start: &str, end: &str) -> SlotSpec {
    SlotSpec {
        day_of_week: day,
        start_time: t(start),
        end_time: t(end),
        is_available: true,
    }
}

pub(crate) fn new_booking(
    student_id: Uuid,
    teacher: &Account,
    date: NaiveDate,
    start: &str,
    duration: u32,
) -> NewBooking {
    let window = BookingWindow::new(date, t(start), duration).unwrap();
    NewBooking {
        student_id,
        teacher_id: teacher.id,
        subject: "Math".into(),
        window,
        amount: teacher.hourly_rate.unwrap_or(0.0) * f64::from(duration) / 60.0,
        meeting_link: "https://meet.example/class-test".into(),
        notes: None,
    }
}

pub(crate) fn book(
    db: &mut Database,
    student_id: Uuid,
    teacher: &Account,
    date: NaiveDate,
    start: &str,
    duration: u32,
) -> Booking {
    db.create_booking_checked(&new_booking(student_id, teacher, date, start, duration))
        .unwrap()
}

//! Booking persistence.
//!
//! The conflict checks that guard a new booking (availability coverage and
//! overlap with active bookings) run inside the same `BEGIN IMMEDIATE`
//! transaction as the insert. SQLite grants one writer at a time, so two
//! racing requests for the same window are serialized and the second one
//! sees the first booking.

use chrono::Utc;
use rusqlite::{params, TransactionBehavior};
use tutora_shared::{BookingStatus, PageRequest};
use uuid::Uuid;

use crate::convert;
use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{Booking, BookingDetails, BookingScope, NewBooking, PartySummary};

const BOOKING_COLUMNS: &str = "b.id, b.student_id, b.teacher_id, b.subject, b.date, \
     b.start_time, b.end_time, b.duration, b.status, b.amount, b.meeting_link, b.notes, \
     b.student_notes, b.teacher_notes, b.rating, b.review, b.created_at, b.updated_at";

const PARTY_COLUMNS: &str = "s.name, s.email, t.name, t.email";

const DETAILS_FROM: &str = "FROM bookings b
     JOIN accounts s ON s.id = b.student_id
     JOIN accounts t ON t.id = b.teacher_id";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a `pending` booking if, and only if, the teacher has an
    /// available slot covering the window and no active booking overlaps it.
    ///
    /// # Errors
    /// [`StoreError::SlotUnavailable`] or [`StoreError::SlotTaken`] when the
    /// respective check fails; nothing is written in that case.
    pub fn create_booking_checked(&mut self, new: &NewBooking) -> Result<Booking> {
        let window = &new.window;
        let teacher = new.teacher_id.to_string();
        let date = convert::date(&window.date);
        let start = window.start.to_string();
        let end = window.end.to_string();

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let covered: bool = tx.query_row(
            "SELECT EXISTS (
                 SELECT 1 FROM availability
                 WHERE teacher_id = ?1 AND day_of_week = ?2
                   AND start_time <= ?3 AND end_time >= ?4
                   AND is_available = 1)",
            params![teacher, window.weekday(), start, end],
            |row| row.get(0),
        )?;
        if !covered {
            return Err(StoreError::SlotUnavailable);
        }

        let taken: bool = tx.query_row(
            "SELECT EXISTS (
                 SELECT 1 FROM bookings
                 WHERE teacher_id = ?1 AND date = ?2
                   AND status IN ('pending', 'confirmed')
                   AND start_time < ?4 AND end_time > ?3)",
            params![teacher, date, start, end],
            |row| row.get(0),
        )?;
        if taken {
            return Err(StoreError::SlotTaken);
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            student_id: new.student_id,
            teacher_id: new.teacher_id,
            subject: new.subject.trim().to_string(),
            date: window.date,
            start_time: window.start,
            end_time: window.end,
            duration: window.duration,
            status: BookingStatus::Pending,
            amount: new.amount,
            meeting_link: new.meeting_link.clone(),
            notes: new.notes.clone(),
            student_notes: None,
            teacher_notes: None,
            rating: None,
            review: None,
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            "INSERT INTO bookings (id, student_id, teacher_id, subject, date, start_time,
                                   end_time, duration, status, amount, meeting_link, notes,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                booking.id.to_string(),
                booking.student_id.to_string(),
                teacher,
                booking.subject,
                date,
                start,
                end,
                booking.duration,
                booking.status.as_str(),
                booking.amount,
                booking.meeting_link,
                booking.notes,
                convert::timestamp(&now),
            ],
        )?;
        tx.commit()?;

        tracing::info!(
            booking = %booking.id,
            teacher = %booking.teacher_id,
            date = %booking.date,
            start = %booking.start_time,
            end = %booking.end_time,
            "booking created"
        );
        Ok(booking)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_booking(&self, id: Uuid) -> Result<Booking> {
        self.conn()
            .query_row(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = ?1"),
                params![id.to_string()],
                row_to_booking,
            )
            .map_err(not_found)
    }

    /// Fetch a booking together with both parties' name and email.
    pub fn get_booking_details(&self, id: Uuid) -> Result<BookingDetails> {
        self.conn()
            .query_row(
                &format!("SELECT {BOOKING_COLUMNS}, {PARTY_COLUMNS} {DETAILS_FROM} WHERE b.id = ?1"),
                params![id.to_string()],
                row_to_details,
            )
            .map_err(not_found)
    }

    /// Page through bookings visible in `scope`, soonest first.
    pub fn list_bookings(
        &self,
        scope: BookingScope,
        status: Option<BookingStatus>,
        page: PageRequest,
    ) -> Result<(Vec<BookingDetails>, u64)> {
        const WHERE: &str = "WHERE (?1 IS NULL OR b.student_id = ?1)
               AND (?2 IS NULL OR b.teacher_id = ?2)
               AND (?3 IS NULL OR b.status = ?3)";

        let (student, teacher) = match scope {
            BookingScope::AsStudent(id) => (Some(id.to_string()), None),
            BookingScope::AsTeacher(id) => (None, Some(id.to_string())),
            BookingScope::All => (None, None),
        };
        let status = status.map(|s| s.as_str());

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM bookings b {WHERE}"),
            params![student, teacher, status],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {BOOKING_COLUMNS}, {PARTY_COLUMNS} {DETAILS_FROM} {WHERE}
             ORDER BY b.date ASC, b.start_time ASC
             LIMIT ?4 OFFSET ?5"
        ))?;
        let rows = stmt.query_map(
            params![student, teacher, status, page.limit, page.offset()],
            row_to_details,
        )?;

        let mut bookings = Vec::new();
        for row in rows {
            bookings.push(row?);
        }
        Ok((bookings, total as u64))
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Move a booking from `expected` to `next`.
    ///
    /// The write only happens if the stored status still equals `expected`,
    /// so a transition decided on a stale read fails with
    /// [`StoreError::StaleStatus`] instead of overwriting a newer state.
    /// `teacher_notes`, when given, replaces the stored notes.
    pub fn update_booking_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        next: BookingStatus,
        teacher_notes: Option<&str>,
    ) -> Result<Booking> {
        let affected = self.conn().execute(
            "UPDATE bookings
             SET status = ?3,
                 teacher_notes = COALESCE(?4, teacher_notes),
                 updated_at = ?5
             WHERE id = ?1 AND status = ?2",
            params![
                id.to_string(),
                expected.as_str(),
                next.as_str(),
                teacher_notes,
                convert::timestamp(&Utc::now()),
            ],
        )?;

        if affected == 0 {
            // Distinguish a missing booking from a concurrent change.
            self.get_booking(id)?;
            return Err(StoreError::StaleStatus);
        }

        tracing::info!(booking = %id, from = %expected, to = %next, "booking status changed");
        self.get_booking(id)
    }

    /// Attach a rating (and optional text) to a completed, unrated booking
    /// and fold it into the teacher's running average.
    ///
    /// The teacher keeps `rating_sum` and `total_reviews`; the mean is
    /// recomputed from those two columns, never from the full review set.
    pub fn add_review(&mut self, id: Uuid, rating: u8, review: Option<&str>) -> Result<Booking> {
        let now = convert::timestamp(&Utc::now());
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let affected = tx.execute(
            "UPDATE bookings
             SET rating = ?2, review = ?3, updated_at = ?4
             WHERE id = ?1 AND status = 'completed' AND rating IS NULL",
            params![id.to_string(), rating, review, now],
        )?;
        if affected == 0 {
            return Err(StoreError::AlreadyReviewed);
        }

        let teacher_id: String = tx.query_row(
            "SELECT teacher_id FROM bookings WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;

        // Right-hand sides see the pre-update column values.
        tx.execute(
            "UPDATE accounts
             SET rating_sum    = rating_sum + ?2,
                 total_reviews = total_reviews + 1,
                 rating        = (rating_sum + ?2) / (total_reviews + 1),
                 updated_at    = ?3
             WHERE id = ?1",
            params![teacher_id, f64::from(rating), now],
        )?;
        tx.commit()?;

        tracing::info!(booking = %id, teacher = %teacher_id, rating, "review recorded");
        self.get_booking(id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_booking(row: &rusqlite::Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: convert::uuid_at(row, 0)?,
        student_id: convert::uuid_at(row, 1)?,
        teacher_id: convert::uuid_at(row, 2)?,
        subject: row.get(3)?,
        date: convert::date_at(row, 4)?,
        start_time: convert::time_at(row, 5)?,
        end_time: convert::time_at(row, 6)?,
        duration: row.get(7)?,
        status: convert::parsed_at(row, 8)?,
        amount: row.get(9)?,
        meeting_link: row.get(10)?,
        notes: row.get(11)?,
        student_notes: row.get(12)?,
        teacher_notes: row.get(13)?,
        rating: row.get(14)?,
        review: row.get(15)?,
        created_at: convert::timestamp_at(row, 16)?,
        updated_at: convert::timestamp_at(row, 17)?,
    })
}

fn row_to_details(row: &rusqlite::Row<'_>) -> rusqlite::Result<BookingDetails> {
    let booking = row_to_booking(row)?;
    Ok(BookingDetails {
        student: PartySummary {
            id: booking.student_id,
            name: row.get(18)?,
            email: row.get(19)?,
        },
        teacher: PartySummary {
            id: booking.teacher_id,
            name: row.get(20)?,
            email: row.get(21)?,
        },
        booking,
    })
}

//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `accounts`, `availability` and `bookings`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Accounts (students, teachers, admins)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS accounts (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,        -- lower-cased
    password_hash TEXT NOT NULL,               -- Argon2 PHC string
    role          TEXT NOT NULL CHECK (role IN ('student', 'teacher', 'admin')),
    phone         TEXT,
    avatar_url    TEXT,
    is_verified   INTEGER NOT NULL DEFAULT 0,
    -- teacher
    subjects      TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    bio           TEXT,
    hourly_rate   REAL,
    rating        REAL NOT NULL DEFAULT 0,
    rating_sum    REAL NOT NULL DEFAULT 0,
    total_reviews INTEGER NOT NULL DEFAULT 0,
    -- student
    grade         TEXT,
    interests     TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    created_at    TEXT NOT NULL,               -- RFC-3339, UTC, millis
    updated_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_accounts_role_rating
    ON accounts(role, rating DESC, total_reviews DESC);

-- ----------------------------------------------------------------
-- Weekly availability slots
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS availability (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    teacher_id   TEXT NOT NULL,               -- FK -> accounts(id)
    day_of_week  INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
    start_time   TEXT NOT NULL,               -- HH:MM
    end_time     TEXT NOT NULL,               -- HH:MM
    is_available INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,

    CHECK (start_time < end_time),
    FOREIGN KEY (teacher_id) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_availability_unique
    ON availability(teacher_id, day_of_week, start_time, end_time);

-- ----------------------------------------------------------------
-- Bookings
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS bookings (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    student_id    TEXT NOT NULL,              -- FK -> accounts(id)
    teacher_id    TEXT NOT NULL,              -- FK -> accounts(id)
    subject       TEXT NOT NULL,
    date          TEXT NOT NULL,              -- YYYY-MM-DD
    start_time    TEXT NOT NULL,              -- HH:MM
    end_time      TEXT NOT NULL,              -- HH:MM
    duration      INTEGER NOT NULL CHECK (duration BETWEEN 15 AND 480),
    status        TEXT NOT NULL DEFAULT 'pending'
                  CHECK (status IN ('pending', 'confirmed', 'completed', 'cancelled', 'no-show')),
    amount        REAL NOT NULL CHECK (amount >= 0),
    meeting_link  TEXT NOT NULL DEFAULT '',
    notes         TEXT,
    student_notes TEXT,
    teacher_notes TEXT,
    rating        INTEGER CHECK (rating BETWEEN 1 AND 5),
    review        TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,

    FOREIGN KEY (student_id) REFERENCES accounts(id),
    FOREIGN KEY (teacher_id) REFERENCES accounts(id)
);

CREATE INDEX IF NOT EXISTS idx_bookings_student_date ON bookings(student_id, date);
CREATE INDEX IF NOT EXISTS idx_bookings_teacher_date ON bookings(teacher_id, date);
CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

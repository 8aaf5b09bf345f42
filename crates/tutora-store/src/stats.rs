//! Aggregate counters for the admin dashboard.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use tutora_shared::constants::{RECENT_REGISTRATION_DAYS, TOP_TEACHERS_LIMIT};

use crate::accounts::{row_to_account, ACCOUNT_COLUMNS};
use crate::convert;
use crate::database::Database;
use crate::error::Result;
use crate::models::Overview;

impl Database {
    /// Platform-wide account counts as of `now`.
    pub fn overview(&self, now: DateTime<Utc>) -> Result<Overview> {
        let since = convert::timestamp(&(now - Duration::days(RECENT_REGISTRATION_DAYS)));

        let (total_users, total_students, total_teachers, verified_teachers, recent): (
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = self.conn().query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(role = 'student'), 0),
                    COALESCE(SUM(role = 'teacher'), 0),
                    COALESCE(SUM(role = 'teacher' AND is_verified = 1), 0),
                    COALESCE(SUM(created_at >= ?1), 0)
             FROM accounts",
            params![since],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )?;

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE role = 'teacher'
             ORDER BY rating DESC, total_reviews DESC, name ASC
             LIMIT ?1"
        ))?;
        let top_teachers = stmt
            .query_map(params![TOP_TEACHERS_LIMIT], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Overview {
            total_users: total_users as u64,
            total_students: total_students as u64,
            total_teachers: total_teachers as u64,
            verified_teachers: verified_teachers as u64,
            recent_registrations: recent as u64,
            top_teachers,
        })
    }
}

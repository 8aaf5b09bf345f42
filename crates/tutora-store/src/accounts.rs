//! CRUD operations for [`Account`] records and the teacher directory.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tutora_shared::{PageRequest, Role};
use uuid::Uuid;

use crate::convert;
use crate::database::Database;
use crate::error::{is_unique_violation, not_found, Result, StoreError};
use crate::models::{Account, NewAccount, ProfileUpdate, SubjectCount, TeacherFilter};

pub(crate) const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, role, phone, avatar_url, \
     is_verified, subjects, bio, hourly_rate, rating, total_reviews, grade, interests, \
     created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new account. Emails are stored trimmed and lower-cased and
    /// must be unique.
    pub fn create_account(&self, new: &NewAccount) -> Result<Account> {
        let id = Uuid::new_v4();
        let now = convert::timestamp(&Utc::now());

        let inserted = self.conn().execute(
            "INSERT INTO accounts (id, name, email, password_hash, role, is_verified,
                                   subjects, bio, hourly_rate, grade, interests,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
            params![
                id.to_string(),
                new.name.trim(),
                normalize_email(&new.email),
                new.password_hash,
                new.role.as_str(),
                new.is_verified,
                convert::string_list(&new.subjects)?,
                new.bio,
                new.hourly_rate,
                new.grade,
                convert::string_list(&new.interests)?,
                now,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(StoreError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(account = %id, role = %new.role, "account created");
        self.get_account(id)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_account(&self, id: Uuid) -> Result<Account> {
        self.conn()
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id.to_string()],
                row_to_account,
            )
            .map_err(not_found)
    }

    /// Look an account up by email (case-insensitive).
    pub fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = self
            .conn()
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
                params![normalize_email(email)],
                row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    /// Fetch `id` only if it is a teacher.
    pub fn get_teacher(&self, id: Uuid) -> Result<Account> {
        let account = self.get_account(id)?;
        if account.role == Role::Teacher {
            Ok(account)
        } else {
            Err(StoreError::NotFound)
        }
    }

    /// Public teacher directory, best rated first.
    ///
    /// Returns the requested page and the total number of matches.
    pub fn list_teachers(
        &self,
        filter: &TeacherFilter,
        page: PageRequest,
    ) -> Result<(Vec<Account>, u64)> {
        const WHERE: &str = "WHERE a.role = 'teacher'
               AND (?1 IS NULL OR EXISTS (
                    SELECT 1 FROM json_each(a.subjects) s
                    WHERE instr(fold_case(s.value), ?1) > 0))
               AND (?2 IS NULL OR a.rating >= ?2)
               AND (?3 IS NULL OR a.hourly_rate <= ?3)";

        let subject = filter
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM accounts a {WHERE}"),
            params![subject, filter.min_rating, filter.max_price],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {cols} FROM accounts a {WHERE}
             ORDER BY a.rating DESC, a.total_reviews DESC, a.name ASC
             LIMIT ?4 OFFSET ?5",
            cols = prefixed_columns("a"),
        ))?;
        let rows = stmt.query_map(
            params![
                subject,
                filter.min_rating,
                filter.max_price,
                page.limit,
                page.offset()
            ],
            row_to_account,
        )?;

        let mut teachers = Vec::new();
        for row in rows {
            teachers.push(row?);
        }
        Ok((teachers, total as u64))
    }

    /// Subjects taught by the most teachers, most common first.
    pub fn popular_subjects(&self, limit: u32) -> Result<Vec<SubjectCount>> {
        let mut stmt = self.conn().prepare(
            "SELECT s.value, COUNT(*) AS n
             FROM accounts a, json_each(a.subjects) s
             WHERE a.role = 'teacher'
             GROUP BY s.value
             ORDER BY n DESC, s.value ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(SubjectCount {
                subject: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a partial profile update and return the new state.
    pub fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<Account> {
        let subjects = update
            .subjects
            .as_deref()
            .map(convert::string_list)
            .transpose()?;
        let interests = update
            .interests
            .as_deref()
            .map(convert::string_list)
            .transpose()?;

        let affected = self.conn().execute(
            "UPDATE accounts SET
                 name        = COALESCE(?2, name),
                 phone       = COALESCE(?3, phone),
                 avatar_url  = COALESCE(?4, avatar_url),
                 bio         = COALESCE(?5, bio),
                 subjects    = COALESCE(?6, subjects),
                 hourly_rate = COALESCE(?7, hourly_rate),
                 grade       = COALESCE(?8, grade),
                 interests   = COALESCE(?9, interests),
                 updated_at  = ?10
             WHERE id = ?1",
            params![
                id.to_string(),
                update.name.as_deref().map(str::trim),
                update.phone,
                update.avatar_url,
                update.bio,
                subjects,
                update.hourly_rate,
                update.grade,
                interests,
                convert::timestamp(&Utc::now()),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_account(id)
    }

    /// Mark an account as verified (or not). Returns the new state.
    pub fn set_verified(&self, id: Uuid, verified: bool) -> Result<Account> {
        let affected = self.conn().execute(
            "UPDATE accounts SET is_verified = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                verified,
                convert::timestamp(&Utc::now())
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_account(id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn prefixed_columns(alias: &str) -> String {
    ACCOUNT_COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a `rusqlite::Row` selected with [`ACCOUNT_COLUMNS`] to an [`Account`].
pub(crate) fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: convert::uuid_at(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: convert::parsed_at(row, 4)?,
        phone: row.get(5)?,
        avatar_url: row.get(6)?,
        is_verified: row.get(7)?,
        subjects: convert::string_list_at(row, 8)?,
        bio: row.get(9)?,
        hourly_rate: row.get(10)?,
        rating: row.get(11)?,
        total_reviews: row.get(12)?,
        grade: row.get(13)?,
        interests: convert::string_list_at(row, 14)?,
        created_at: convert::timestamp_at(row, 15)?,
        updated_at: convert::timestamp_at(row, 16)?,
    })
}

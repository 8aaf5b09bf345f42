//! CRUD operations for recurring [`AvailabilitySlot`] records.
//!
//! Slots for the same teacher and weekday may overlap; only exact duplicates
//! (same day, start and end) are refused.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tutora_shared::TimeOfDay;
use uuid::Uuid;

use crate::convert;
use crate::database::Database;
use crate::error::{is_unique_violation, not_found, Result, StoreError};
use crate::models::{AvailabilitySlot, SlotSpec};

const SLOT_COLUMNS: &str = "id, teacher_id, day_of_week, start_time, end_time, is_available, created_at";

impl Database {
    /// Insert a slot for `teacher_id`.
    pub fn create_slot(&self, teacher_id: Uuid, spec: &SlotSpec) -> Result<AvailabilitySlot> {
        if self.find_duplicate_slot(teacher_id, spec, None)?.is_some() {
            return Err(StoreError::DuplicateSlot);
        }
        insert_slot(self.conn(), teacher_id, spec)
    }

    pub fn get_slot(&self, id: Uuid) -> Result<AvailabilitySlot> {
        self.conn()
            .query_row(
                &format!("SELECT {SLOT_COLUMNS} FROM availability WHERE id = ?1"),
                params![id.to_string()],
                row_to_slot,
            )
            .map_err(not_found)
    }

    /// A teacher's slots ordered by weekday then start time, optionally
    /// restricted to one weekday and/or to slots marked available.
    pub fn list_slots(
        &self,
        teacher_id: Uuid,
        day_of_week: Option<u8>,
        only_available: bool,
    ) -> Result<Vec<AvailabilitySlot>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SLOT_COLUMNS}
             FROM availability
             WHERE teacher_id = ?1
               AND (?2 IS NULL OR day_of_week = ?2)
               AND (?3 = 0 OR is_available = 1)
             ORDER BY day_of_week ASC, start_time ASC"
        ))?;
        let rows = stmt.query_map(
            params![teacher_id.to_string(), day_of_week, only_available],
            row_to_slot,
        )?;

        let mut slots = Vec::new();
        for row in rows {
            slots.push(row?);
        }
        Ok(slots)
    }

    /// Change a slot's bounds and/or availability flag. Fields left `None`
    /// keep their value. Ordering of the resulting bounds is the caller's
    /// responsibility.
    pub fn update_slot(
        &self,
        id: Uuid,
        start_time: Option<TimeOfDay>,
        end_time: Option<TimeOfDay>,
        is_available: Option<bool>,
    ) -> Result<AvailabilitySlot> {
        let current = self.get_slot(id)?;
        let spec = SlotSpec {
            day_of_week: current.day_of_week,
            start_time: start_time.unwrap_or(current.start_time),
            end_time: end_time.unwrap_or(current.end_time),
            is_available: is_available.unwrap_or(current.is_available),
        };

        if self
            .find_duplicate_slot(current.teacher_id, &spec, Some(id))?
            .is_some()
        {
            return Err(StoreError::DuplicateSlot);
        }

        let updated = self.conn().execute(
            "UPDATE availability
             SET start_time = ?2, end_time = ?3, is_available = ?4
             WHERE id = ?1",
            params![
                id.to_string(),
                spec.start_time.to_string(),
                spec.end_time.to_string(),
                spec.is_available,
            ],
        );
        match updated {
            Ok(0) => Err(StoreError::NotFound),
            Ok(_) => self.get_slot(id),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateSlot),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a slot. Returns `true` if a row was deleted.
    pub fn delete_slot(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM availability WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    /// Replace every slot of `teacher_id` with `specs`, atomically. On any
    /// error (including duplicates inside `specs`) the old slots survive.
    pub fn replace_slots(
        &mut self,
        teacher_id: Uuid,
        specs: &[SlotSpec],
    ) -> Result<Vec<AvailabilitySlot>> {
        let tx = self.conn_mut().transaction()?;

        let removed = tx.execute(
            "DELETE FROM availability WHERE teacher_id = ?1",
            params![teacher_id.to_string()],
        )?;

        let mut created = Vec::with_capacity(specs.len());
        for spec in specs {
            created.push(insert_slot(&tx, teacher_id, spec)?);
        }
        tx.commit()?;

        tracing::info!(
            teacher = %teacher_id,
            removed,
            created = created.len(),
            "availability replaced"
        );

        created.sort_by_key(|s| (s.day_of_week, s.start_time));
        Ok(created)
    }

    fn find_duplicate_slot(
        &self,
        teacher_id: Uuid,
        spec: &SlotSpec,
        except: Option<Uuid>,
    ) -> Result<Option<Uuid>> {
        let id: Option<String> = self
            .conn()
            .query_row(
                "SELECT id FROM availability
                 WHERE teacher_id = ?1 AND day_of_week = ?2
                   AND start_time = ?3 AND end_time = ?4
                   AND (?5 IS NULL OR id <> ?5)",
                params![
                    teacher_id.to_string(),
                    spec.day_of_week,
                    spec.start_time.to_string(),
                    spec.end_time.to_string(),
                    except.map(|id| id.to_string()),
                ],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.and_then(|s| Uuid::parse_str(&s).ok()))
    }
}

/// Group slots by weekday. Every weekday 0..=6 is present, empty or not.
pub fn group_by_weekday(slots: Vec<AvailabilitySlot>) -> BTreeMap<u8, Vec<AvailabilitySlot>> {
    let mut schedule: BTreeMap<u8, Vec<AvailabilitySlot>> = (0..7).map(|d| (d, Vec::new())).collect();
    for slot in slots {
        schedule.entry(slot.day_of_week).or_default().push(slot);
    }
    schedule
}

fn insert_slot(
    conn: &rusqlite::Connection,
    teacher_id: Uuid,
    spec: &SlotSpec,
) -> Result<AvailabilitySlot> {
    let slot = AvailabilitySlot {
        id: Uuid::new_v4(),
        teacher_id,
        day_of_week: spec.day_of_week,
        start_time: spec.start_time,
        end_time: spec.end_time,
        is_available: spec.is_available,
        created_at: Utc::now(),
    };

    let inserted = conn.execute(
        "INSERT INTO availability (id, teacher_id, day_of_week, start_time, end_time,
                                   is_available, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            slot.id.to_string(),
            teacher_id.to_string(),
            slot.day_of_week,
            slot.start_time.to_string(),
            slot.end_time.to_string(),
            slot.is_available,
            convert::timestamp(&slot.created_at),
        ],
    );
    match inserted {
        Ok(_) => Ok(slot),
        Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateSlot),
        Err(e) => Err(e.into()),
    }
}

fn row_to_slot(row: &rusqlite::Row<'_>) -> rusqlite::Result<AvailabilitySlot> {
    Ok(AvailabilitySlot {
        id: convert::uuid_at(row, 0)?,
        teacher_id: convert::uuid_at(row, 1)?,
        day_of_week: row.get(2)?,
        start_time: convert::time_at(row, 3)?,
        end_time: convert::time_at(row, 4)?,
        is_available: row.get(5)?,
        created_at: convert::timestamp_at(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{slot, t, teacher};

    #[test]
    fn create_list_and_reject_duplicates() {
        let db = Database::open_in_memory().unwrap();
        let tch = teacher(&db, "t@x.io", 30.0, &["Math"]);

        db.create_slot(tch.id, &slot(1, "13:00", "15:00")).unwrap();
        db.create_slot(tch.id, &slot(1, "09:00", "12:00")).unwrap();
        // Overlapping windows are allowed.
        db.create_slot(tch.id, &slot(1, "10:00", "11:00")).unwrap();
        db.create_slot(tch.id, &slot(3, "09:00", "12:00")).unwrap();

        let err = db.create_slot(tch.id, &slot(1, "09:00", "12:00")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlot));

        let monday = db.list_slots(tch.id, Some(1), false).unwrap();
        let starts: Vec<_> = monday.iter().map(|s| s.start_time.to_string()).collect();
        assert_eq!(starts, vec!["09:00", "10:00", "13:00"]);

        assert_eq!(db.list_slots(tch.id, None, false).unwrap().len(), 4);
        assert!(db.list_slots(Uuid::new_v4(), None, false).unwrap().is_empty());
    }

    #[test]
    fn update_changes_only_given_fields() {
        let db = Database::open_in_memory().unwrap();
        let tch = teacher(&db, "t@x.io", 30.0, &["Math"]);
        let s = db.create_slot(tch.id, &slot(2, "09:00", "12:00")).unwrap();

        let off = db.update_slot(s.id, None, None, Some(false)).unwrap();
        assert!(!off.is_available);
        assert_eq!(off.start_time, t("09:00"));

        let moved = db.update_slot(s.id, Some(t("08:00")), None, None).unwrap();
        assert_eq!(moved.start_time, t("08:00"));
        assert_eq!(moved.end_time, t("12:00"));
        assert!(!moved.is_available);

        assert!(db.list_slots(tch.id, None, true).unwrap().is_empty());
        assert!(matches!(
            db.update_slot(Uuid::new_v4(), None, None, Some(true)),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn update_into_existing_bounds_is_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let tch = teacher(&db, "t@x.io", 30.0, &["Math"]);
        db.create_slot(tch.id, &slot(2, "09:00", "12:00")).unwrap();
        let other = db.create_slot(tch.id, &slot(2, "13:00", "15:00")).unwrap();

        let err = db
            .update_slot(other.id, Some(t("09:00")), Some(t("12:00")), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlot));

        // Re-saving a slot with its own bounds is not a duplicate.
        db.update_slot(other.id, Some(t("13:00")), None, Some(false))
            .unwrap();
    }

    #[test]
    fn delete_reports_whether_removed() {
        let db = Database::open_in_memory().unwrap();
        let tch = teacher(&db, "t@x.io", 30.0, &["Math"]);
        let s = db.create_slot(tch.id, &slot(0, "09:00", "10:00")).unwrap();
        assert!(db.delete_slot(s.id).unwrap());
        assert!(!db.delete_slot(s.id).unwrap());
        assert!(matches!(db.get_slot(s.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn replace_is_all_or_nothing() {
        let mut db = Database::open_in_memory().unwrap();
        let tch = teacher(&db, "t@x.io", 30.0, &["Math"]);
        db.create_slot(tch.id, &slot(1, "09:00", "12:00")).unwrap();

        let created = db
            .replace_slots(tch.id, &[slot(5, "10:00", "11:00"), slot(2, "08:00", "09:00")])
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].day_of_week, 2);
        assert_eq!(db.list_slots(tch.id, None, false).unwrap().len(), 2);

        let err = db
            .replace_slots(tch.id, &[slot(4, "10:00", "11:00"), slot(4, "10:00", "11:00")])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlot));
        let kept = db.list_slots(tch.id, None, false).unwrap();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|s| s.day_of_week != 4));
    }

    #[test]
    fn grouping_has_every_weekday() {
        let db = Database::open_in_memory().unwrap();
        let tch = teacher(&db, "t@x.io", 30.0, &["Math"]);
        db.create_slot(tch.id, &slot(6, "09:00", "10:00")).unwrap();
        db.create_slot(tch.id, &slot(6, "11:00", "12:00")).unwrap();

        let grouped = group_by_weekday(db.list_slots(tch.id, None, false).unwrap());
        assert_eq!(grouped.len(), 7);
        assert_eq!(grouped[&6].len(), 2);
        assert!(grouped[&0].is_empty());
    }
}

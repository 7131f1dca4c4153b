//! Database module for the workout log
//!
//! Provides persistence for users, exercises and workout sets. Conversation
//! state never lands here; flows call in to validate and commit.

mod schema;

pub use schema::*;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Exercise name already exists: {0}")]
    DuplicateName(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        db.seed_exercises()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        db.seed_exercises()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;

        // Stores created before set_number existed lack the column; its
        // absence is the schema-version marker.
        let has_set_number = {
            let mut stmt = conn.prepare("PRAGMA table_info(workout_sets)")?;
            let columns = stmt.query_map([], |row| row.get::<_, String>(1))?;
            let found = columns.filter_map(Result::ok).any(|name| name == "set_number");
            found
        };
        if !has_set_number {
            tracing::info!("applying set_number migration");
            conn.execute(MIGRATION_ADD_SET_NUMBER, [])?;
        }
        // Backfill runs every startup; legacy rows may hold NULL or 0
        conn.execute(MIGRATION_BACKFILL_SET_NUMBER, [])?;

        Ok(())
    }

    fn seed_exercises(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;
        for (name, category) in SEED_EXERCISES {
            inserted += conn.execute(
                "INSERT OR IGNORE INTO exercises (name, category, created_at) VALUES (?1, ?2, ?3)",
                params![name, category, now],
            )?;
        }
        if inserted > 0 {
            tracing::info!(count = inserted, "seeded exercise catalog");
        }
        Ok(())
    }

    // ==================== Users ====================

    /// Register a user on first contact. Repeat registrations are no-ops.
    pub fn create_user(
        &self,
        telegram_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT OR IGNORE INTO users (telegram_id, username, first_name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![telegram_id, username, first_name, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Internal id for a platform identity, if registered
    pub fn lookup_user_id(&self, telegram_id: i64) -> DbResult<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id FROM users WHERE telegram_id = ?1",
            params![telegram_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(DbError::from)
    }

    // ==================== Exercises ====================

    /// Full catalog, sorted by (category, name)
    pub fn list_exercises(&self) -> DbResult<Vec<Exercise>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name, category FROM exercises ORDER BY category, name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Exercise {
                id: row.get(0)?,
                name: row.get(1)?,
                category: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn get_exercise(&self, id: i64) -> DbResult<Option<Exercise>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, category FROM exercises WHERE id = ?1",
            params![id],
            |row| {
                Ok(Exercise {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(DbError::from)
    }

    /// Case-sensitive exact match («Присед» and «присед» are distinct)
    pub fn exercise_exists(&self, name: &str) -> DbResult<bool> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM exercises WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )
        .map_err(DbError::from)
    }

    /// Create a user-defined exercise. The UNIQUE constraint guards the
    /// name even when the caller pre-checked with `exercise_exists`.
    pub fn create_exercise(&self, name: &str, category: &str) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO exercises (name, category, created_at) VALUES (?1, ?2, ?3)",
            params![name, category, now.to_rfc3339()],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::DuplicateName(name.to_string())
            }
            other => DbError::Sqlite(other),
        })?;
        Ok(conn.last_insert_rowid())
    }

    // ==================== Workout sets ====================

    /// Pure insert; range validation is the flow's job
    pub fn record_set(
        &self,
        user_id: i64,
        exercise_id: i64,
        weight: f64,
        reps: i64,
        set_number: i64,
    ) -> DbResult<()> {
        self.insert_set(user_id, exercise_id, weight, reps, set_number, Utc::now())
    }

    /// Insert with an explicit timestamp, for tests that need sets on
    /// specific days.
    #[cfg(test)]
    pub(crate) fn record_set_at(
        &self,
        user_id: i64,
        exercise_id: i64,
        weight: f64,
        reps: i64,
        set_number: i64,
        created_at: DateTime<Utc>,
    ) -> DbResult<()> {
        self.insert_set(user_id, exercise_id, weight, reps, set_number, created_at)
    }

    fn insert_set(
        &self,
        user_id: i64,
        exercise_id: i64,
        weight: f64,
        reps: i64,
        set_number: i64,
        created_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO workout_sets (user_id, exercise_id, weight, reps, set_number, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                exercise_id,
                weight,
                reps,
                set_number,
                created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Next set number for (user, exercise, day). Numbers are assigned
    /// max + 1 and never reused, even when sets land out of order.
    pub fn next_set_number(
        &self,
        user_id: i64,
        exercise_id: i64,
        day: NaiveDate,
    ) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COALESCE(MAX(set_number), 0) + 1 FROM workout_sets
             WHERE user_id = ?1 AND exercise_id = ?2 AND DATE(created_at) = ?3",
            params![user_id, exercise_id, day_str(day)],
            |row| row.get(0),
        )
        .map_err(DbError::from)
    }

    /// One row per exercise touched on `day`, most recent activity first.
    /// Bare weight/reps columns follow `MAX(created_at)`, so they carry
    /// the latest set's values.
    pub fn exercises_logged_today(
        &self,
        user_id: i64,
        day: NaiveDate,
    ) -> DbResult<Vec<LoggedExercise>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.name, w.weight, w.reps, COUNT(*) AS set_count,
                    MAX(w.created_at) AS last_at
             FROM workout_sets w
             JOIN exercises e ON w.exercise_id = e.id
             WHERE w.user_id = ?1 AND DATE(w.created_at) = ?2
             GROUP BY e.id, e.name
             ORDER BY last_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id, day_str(day)], |row| {
            Ok(LoggedExercise {
                exercise_id: row.get(0)?,
                name: row.get(1)?,
                last_weight: row.get(2)?,
                last_reps: row.get(3)?,
                set_count: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Sets recorded on a single day
    pub fn sets_on_date(&self, user_id: i64, day: NaiveDate) -> DbResult<Vec<SetRecord>> {
        self.sets_in_range(user_id, day, day)
    }

    /// Sets recorded between `start` and `end` inclusive, newest first,
    /// `set_number` ascending within a timestamp tie
    pub fn sets_in_range(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<SetRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT e.name, w.weight, w.reps, COALESCE(w.set_number, 1), w.created_at
             FROM workout_sets w
             JOIN exercises e ON w.exercise_id = e.id
             WHERE w.user_id = ?1 AND DATE(w.created_at) BETWEEN ?2 AND ?3
             ORDER BY w.created_at DESC, COALESCE(w.set_number, 1) ASC",
        )?;
        let rows = stmt.query_map(params![user_id, day_str(start), day_str(end)], |row| {
            Ok(SetRecord {
                exercise_name: row.get(0)?,
                weight: row.get(1)?,
                reps: row.get(2)?,
                set_number: row.get(3)?,
                created_at: parse_datetime(&row.get::<_, String>(4)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn day_str(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

//! SQL schema, migrations and row types for the workout store

use chrono::{DateTime, Utc};

/// Database schema - applied with `CREATE TABLE IF NOT EXISTS` on every startup
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    telegram_id INTEGER UNIQUE NOT NULL,
    username TEXT,
    first_name TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS exercises (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    category TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS workout_sets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    exercise_id INTEGER NOT NULL,
    weight REAL NOT NULL,
    reps INTEGER NOT NULL,
    set_number INTEGER DEFAULT 1,
    created_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users (id),
    FOREIGN KEY (exercise_id) REFERENCES exercises (id)
);

CREATE INDEX IF NOT EXISTS idx_sets_user_date ON workout_sets (user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_sets_user_exercise ON workout_sets (user_id, exercise_id);
";

/// Adds the `set_number` column to stores created before it existed.
/// Guarded by a `PRAGMA table_info` check; the column doubles as the
/// schema-version marker.
pub const MIGRATION_ADD_SET_NUMBER: &str =
    "ALTER TABLE workout_sets ADD COLUMN set_number INTEGER DEFAULT 1";

/// Backfill for legacy rows. Runs on every startup; idempotent.
pub const MIGRATION_BACKFILL_SET_NUMBER: &str =
    "UPDATE workout_sets SET set_number = 1 WHERE set_number IS NULL OR set_number = 0";

/// Starter catalog, inserted with INSERT OR IGNORE so repeated startups
/// never duplicate rows.
pub const SEED_EXERCISES: &[(&str, &str)] = &[
    ("Жим лежа", "Грудь"),
    ("Жим с паузами", "Грудь"),
    ("Присед", "Ноги"),
    ("Тяга гантелей", "Спина"),
    ("Тяга блока", "Спина"),
    ("Трицепс", "Руки"),
    ("Бицепс", "Руки"),
];

/// A catalog exercise
#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub category: String,
}

/// Aggregate for one exercise touched on a given day; drives the
/// add-set selection menu.
#[derive(Debug, Clone)]
pub struct LoggedExercise {
    pub exercise_id: i64,
    pub name: String,
    pub last_weight: f64,
    pub last_reps: i64,
    pub set_count: i64,
}

/// One recorded set joined with its exercise name, as the history
/// queries return it.
#[derive(Debug, Clone)]
pub struct SetRecord {
    pub exercise_name: String,
    pub weight: f64,
    pub reps: i64,
    pub set_number: i64,
    pub created_at: DateTime<Utc>,
}

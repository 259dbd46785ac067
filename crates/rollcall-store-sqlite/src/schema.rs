//! SQL schema for the rollcall SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS students (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    roll_no     TEXT NOT NULL DEFAULT '',
    photo_url   TEXT,
    created_at  TEXT NOT NULL    -- ISO 8601 UTC
);

-- Attendance is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS attendance (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    roll_no     TEXT NOT NULL DEFAULT '',
    recorded_at TEXT NOT NULL,   -- ISO 8601 UTC, millisecond precision
    day         TEXT NOT NULL,   -- local calendar day, YYYY-MM-DD
    source      TEXT NOT NULL DEFAULT 'web',
    student_id  TEXT,            -- weak reference; students may disappear
    UNIQUE (name, day)
);

CREATE INDEX IF NOT EXISTS students_name_idx      ON students(name);
CREATE INDEX IF NOT EXISTS attendance_recorded_idx ON attendance(recorded_at);
CREATE INDEX IF NOT EXISTS attendance_day_idx      ON attendance(day);

PRAGMA user_version = 1;
";

//! SQL for the SQLite adapter.
//!
//! [`SETTINGS_SCHEMA`] belongs to the application and is executed when a
//! [`crate::SqliteSettingsStore`] opens. [`BOOTSTRAP_SQL`] belongs to the
//! user's project: it is shown during setup and never executed by this crate.

/// Shared `user_settings` table; idempotent thanks to `IF NOT EXISTS`.
pub const SETTINGS_SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS user_settings (
    id                TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL UNIQUE,
    supabase_url      TEXT NOT NULL,
    supabase_anon_key TEXT NOT NULL,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);
";

/// Bootstrap script for a local project, the SQLite counterpart of
/// [`drill_core::schema::BOOTSTRAP_SQL`].
pub const BOOTSTRAP_SQL: &str = "-- Notes: one row per practice question
CREATE TABLE IF NOT EXISTS notes (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    title           TEXT NOT NULL,
    question        TEXT NOT NULL,
    standard_answer TEXT,
    key_points      TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- Attempts: numbered tries at a note, removed with their note
CREATE TABLE IF NOT EXISTS attempts (
    id             TEXT PRIMARY KEY,
    note_id        TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    attempt_number INTEGER NOT NULL,
    answer_content TEXT NOT NULL,
    is_correct     INTEGER NOT NULL DEFAULT 0,
    correction     TEXT,
    error_content  TEXT,
    usecase        TEXT,
    created_at     TEXT NOT NULL,
    UNIQUE (note_id, attempt_number)
);

CREATE INDEX IF NOT EXISTS attempts_note_id_idx ON attempts(note_id);
";

//! Personal-backend table names and the bootstrap script users run by hand.
//!
//! The application never executes this script. It is shown to the user, who
//! runs it in their project's SQL editor; the setup flow then only verifies
//! that the tables exist.

/// The tables a personal backend must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Notes,
  Attempts,
}

impl Table {
  pub const REQUIRED: [Table; 2] = [Table::Notes, Table::Attempts];

  pub fn name(self) -> &'static str {
    match self {
      Self::Notes => "notes",
      Self::Attempts => "attempts",
    }
  }
}

impl std::fmt::Display for Table {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

/// Postgres bootstrap script for a Supabase personal project.
///
/// Isolation comes from every user owning a separate project, so the row
/// level security policies allow everything.
pub const BOOTSTRAP_SQL: &str = "-- Notes: one row per practice question
CREATE TABLE IF NOT EXISTS notes (
  id UUID DEFAULT gen_random_uuid() PRIMARY KEY,
  user_id TEXT NOT NULL,
  title TEXT NOT NULL,
  question TEXT NOT NULL,
  standard_answer TEXT,
  key_points TEXT,
  created_at TIMESTAMPTZ DEFAULT NOW(),
  updated_at TIMESTAMPTZ DEFAULT NOW()
);

-- Attempts: numbered tries at a note, removed with their note
CREATE TABLE IF NOT EXISTS attempts (
  id UUID DEFAULT gen_random_uuid() PRIMARY KEY,
  note_id UUID NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
  attempt_number INTEGER NOT NULL,
  answer_content TEXT NOT NULL,
  is_correct BOOLEAN NOT NULL DEFAULT FALSE,
  correction TEXT,
  error_content TEXT,
  usecase TEXT,
  created_at TIMESTAMPTZ DEFAULT NOW(),
  UNIQUE (note_id, attempt_number)
);

CREATE INDEX IF NOT EXISTS attempts_note_id_idx ON attempts(note_id);

ALTER TABLE notes ENABLE ROW LEVEL SECURITY;
ALTER TABLE attempts ENABLE ROW LEVEL SECURITY;

DROP POLICY IF EXISTS \"Allow all on notes\" ON notes;
CREATE POLICY \"Allow all on notes\" ON notes
  FOR ALL USING (true) WITH CHECK (true);

DROP POLICY IF EXISTS \"Allow all on attempts\" ON attempts;
CREATE POLICY \"Allow all on attempts\" ON attempts
  FOR ALL USING (true) WITH CHECK (true);
";

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn script_creates_every_required_table() {
    for table in Table::REQUIRED {
      let stmt = format!("CREATE TABLE IF NOT EXISTS {table} (");
      assert!(BOOTSTRAP_SQL.contains(&stmt), "missing {table}");
    }
    assert!(BOOTSTRAP_SQL.contains("ON DELETE CASCADE"));
  }
}

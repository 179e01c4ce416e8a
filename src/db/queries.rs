pub const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  name               TEXT PRIMARY KEY,
  weekly_goal_hours  REAL NOT NULL DEFAULT 40.0
);
"#;

pub const CREATE_TASKS: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  user        TEXT NOT NULL,
  title       TEXT NOT NULL,
  kind        TEXT NOT NULL DEFAULT 'work',
  completed   INTEGER NOT NULL DEFAULT 0,
  started_at  INTEGER,
  ended_at    INTEGER,
  created_at  INTEGER
);
"#;

pub const CREATE_BREAKS: &str = r#"
CREATE TABLE IF NOT EXISTS breaks (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  user        TEXT NOT NULL,
  occurred_at INTEGER,
  logged_at   INTEGER,
  created_at  INTEGER
);
"#;

pub const CREATE_MOODS: &str = r#"
CREATE TABLE IF NOT EXISTS moods (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  user        TEXT NOT NULL,
  mood        REAL,
  stress      REAL,
  occurred_at INTEGER,
  logged_at   INTEGER,
  created_at  INTEGER
);
"#;

pub const CREATE_STREAKS: &str = r#"
CREATE TABLE IF NOT EXISTS streaks (
  user            TEXT PRIMARY KEY,
  history         TEXT NOT NULL DEFAULT '[]',
  current_streak  INTEGER NOT NULL DEFAULT 0,
  longest_streak  INTEGER NOT NULL DEFAULT 0,
  last_active_day TEXT,
  updated_at      INTEGER NOT NULL DEFAULT 0
);
"#;

pub const CREATE_WEEKLY_CACHE: &str = r#"
CREATE TABLE IF NOT EXISTS weekly_cache (
  user         TEXT PRIMARY KEY,
  payload      TEXT NOT NULL,
  refreshed_at INTEGER NOT NULL
);
"#;

pub const INDEX_TASKS_USER_ENDED_AT: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_user_ended_at ON tasks(user, ended_at);";

pub const INDEX_BREAKS_USER_OCCURRED_AT: &str =
    "CREATE INDEX IF NOT EXISTS idx_breaks_user_occurred_at ON breaks(user, occurred_at);";

pub const INDEX_MOODS_USER_OCCURRED_AT: &str =
    "CREATE INDEX IF NOT EXISTS idx_moods_user_occurred_at ON moods(user, occurred_at);";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_USERS,
        CREATE_TASKS,
        CREATE_BREAKS,
        CREATE_MOODS,
        CREATE_STREAKS,
        CREATE_WEEKLY_CACHE,
        INDEX_TASKS_USER_ENDED_AT,
        INDEX_BREAKS_USER_OCCURRED_AT,
        INDEX_MOODS_USER_OCCURRED_AT,
    ]
}

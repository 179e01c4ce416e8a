pub mod queries;

use crate::stats::calendar::DayKey;
use crate::stats::streak::StreakState;
use anyhow::{Context, Result};
use chrono::{Duration, Local};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Work,
    Break,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "work" => Some(Self::Work),
            "break" => Some(Self::Break),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub user: String,
    pub title: String,
    pub kind: TaskKind,
    pub completed: bool,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub created_at: Option<i64>,
}

impl TaskRow {
    pub fn is_work(&self) -> bool {
        self.kind == TaskKind::Work
    }

    /// Day attribution for buckets and streaks: completion time first, then
    /// creation time, then start time. First present field wins.
    pub fn bucket_timestamp(&self) -> Option<i64> {
        self.ended_at.or(self.created_at).or(self.started_at)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakRow {
    pub id: i64,
    pub user: String,
    pub occurred_at: Option<i64>,
    pub logged_at: Option<i64>,
    pub created_at: Option<i64>,
}

impl BreakRow {
    /// Explicit occurrence time first, then the legacy logged-at field, then
    /// creation time.
    pub fn bucket_timestamp(&self) -> Option<i64> {
        self.occurred_at.or(self.logged_at).or(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoodRow {
    pub id: i64,
    pub user: String,
    pub mood: Option<f64>,
    pub stress: Option<f64>,
    pub occurred_at: Option<i64>,
    pub logged_at: Option<i64>,
    pub created_at: Option<i64>,
}

impl MoodRow {
    pub fn bucket_timestamp(&self) -> Option<i64> {
        self.occurred_at.or(self.logged_at).or(self.created_at)
    }
}

/// Insert payload for a task; the id is assigned by the database.
#[derive(Debug, Clone)]
pub struct TaskInput {
    pub user: String,
    pub title: String,
    pub kind: TaskKind,
    pub completed: bool,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub created_at: Option<i64>,
}

impl TaskInput {
    pub fn into_row(self, id: i64) -> TaskRow {
        TaskRow {
            id,
            user: self.user,
            title: self.title,
            kind: self.kind,
            completed: self.completed,
            started_at: self.started_at,
            ended_at: self.ended_at,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyCacheRow {
    pub user: String,
    pub payload: String,
    pub refreshed_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RecordCounts {
    pub users: i64,
    pub tasks: i64,
    pub breaks: i64,
    pub moods: i64,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn ensure_user(&self, user: &str, default_weekly_goal_hours: f64) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO users (name, weekly_goal_hours) VALUES (?1, ?2)",
                params![user, default_weekly_goal_hours],
            )
            .context("Failed to ensure user row")?;

        Ok(())
    }

    pub fn user_names(&self) -> Result<Vec<String>> {
        let mut statement = self.conn.prepare("SELECT name FROM users ORDER BY name")?;

        let names = statement
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list users")?;

        Ok(names)
    }

    pub fn weekly_goal(&self, user: &str) -> Result<Option<f64>> {
        self.conn
            .query_row(
                "SELECT weekly_goal_hours FROM users WHERE name = ?1",
                params![user],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to query weekly goal")
    }

    pub fn set_weekly_goal(&self, user: &str, weekly_goal_hours: f64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (name, weekly_goal_hours) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET weekly_goal_hours=excluded.weekly_goal_hours",
                params![user, weekly_goal_hours],
            )
            .context("Failed to set weekly goal")?;

        Ok(())
    }

    pub fn insert_task(&self, task: &TaskInput) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO tasks (user, title, kind, completed, started_at, ended_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    task.user,
                    task.title,
                    task.kind.as_str(),
                    task.completed,
                    task.started_at,
                    task.ended_at,
                    task.created_at
                ],
            )
            .context("Failed to insert task")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_break(
        &self,
        user: &str,
        occurred_at: Option<i64>,
        logged_at: Option<i64>,
        created_at: Option<i64>,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO breaks (user, occurred_at, logged_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user, occurred_at, logged_at, created_at],
            )
            .context("Failed to insert break")?;

        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_mood(
        &self,
        user: &str,
        mood: Option<f64>,
        stress: Option<f64>,
        occurred_at: Option<i64>,
        logged_at: Option<i64>,
        created_at: Option<i64>,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO moods (user, mood, stress, occurred_at, logged_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![user, mood, stress, occurred_at, logged_at, created_at],
            )
            .context("Failed to insert mood check-in")?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Tasks whose resolved day-attribution timestamp falls at or after
    /// `from_ts`. The COALESCE order matches `TaskRow::bucket_timestamp`.
    pub fn tasks_since(&self, user: &str, from_ts: i64) -> Result<Vec<TaskRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, user, title, kind, completed, started_at, ended_at, created_at
             FROM tasks
             WHERE user = ?1 AND COALESCE(ended_at, created_at, started_at) >= ?2
             ORDER BY COALESCE(ended_at, created_at, started_at) ASC",
        )?;

        let rows = statement
            .query_map(params![user, from_ts], |row| {
                let kind: String = row.get(3)?;

                Ok(TaskRow {
                    id: row.get(0)?,
                    user: row.get(1)?,
                    title: row.get(2)?,
                    // Unknown kinds never qualify for work-only aggregation.
                    kind: TaskKind::parse(&kind).unwrap_or(TaskKind::Break),
                    completed: row.get(4)?,
                    started_at: row.get(5)?,
                    ended_at: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query tasks")?;

        Ok(rows)
    }

    pub fn breaks_since(&self, user: &str, from_ts: i64) -> Result<Vec<BreakRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, user, occurred_at, logged_at, created_at
             FROM breaks
             WHERE user = ?1 AND COALESCE(occurred_at, logged_at, created_at) >= ?2
             ORDER BY COALESCE(occurred_at, logged_at, created_at) ASC",
        )?;

        let rows = statement
            .query_map(params![user, from_ts], |row| {
                Ok(BreakRow {
                    id: row.get(0)?,
                    user: row.get(1)?,
                    occurred_at: row.get(2)?,
                    logged_at: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query breaks")?;

        Ok(rows)
    }

    pub fn moods_since(&self, user: &str, from_ts: i64) -> Result<Vec<MoodRow>> {
        let mut statement = self.conn.prepare(
            "SELECT id, user, mood, stress, occurred_at, logged_at, created_at
             FROM moods
             WHERE user = ?1 AND COALESCE(occurred_at, logged_at, created_at) >= ?2
             ORDER BY COALESCE(occurred_at, logged_at, created_at) ASC",
        )?;

        let rows = statement
            .query_map(params![user, from_ts], |row| {
                Ok(MoodRow {
                    id: row.get(0)?,
                    user: row.get(1)?,
                    mood: row.get(2)?,
                    stress: row.get(3)?,
                    occurred_at: row.get(4)?,
                    logged_at: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query mood check-ins")?;

        Ok(rows)
    }

    pub fn streak_state(&self, user: &str) -> Result<StreakState> {
        let row = self
            .conn
            .query_row(
                "SELECT history, current_streak, longest_streak, last_active_day
                 FROM streaks
                 WHERE user = ?1",
                params![user],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query streak state")?;

        let Some((history_json, current_streak, longest_streak, last_active)) = row else {
            return Ok(StreakState::default());
        };

        let history: Vec<DayKey> =
            serde_json::from_str(&history_json).context("Failed to parse streak history")?;
        let last_active_day = last_active.as_deref().map(DayKey::parse).transpose()?;

        Ok(StreakState {
            history,
            current_streak,
            longest_streak,
            last_active_day,
        })
    }

    pub fn upsert_streak(&self, user: &str, state: &StreakState, updated_at: i64) -> Result<()> {
        let history =
            serde_json::to_string(&state.history).context("Failed to serialize streak history")?;

        self.conn
            .execute(
                "INSERT INTO streaks (user, history, current_streak, longest_streak, last_active_day, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user)
                 DO UPDATE SET history=excluded.history, current_streak=excluded.current_streak,
                               longest_streak=excluded.longest_streak,
                               last_active_day=excluded.last_active_day, updated_at=excluded.updated_at",
                params![
                    user,
                    history,
                    state.current_streak,
                    state.longest_streak,
                    state.last_active_day.map(|day| day.to_string()),
                    updated_at
                ],
            )
            .context("Failed to upsert streak state")?;

        Ok(())
    }

    pub fn weekly_cache(&self, user: &str) -> Result<Option<WeeklyCacheRow>> {
        self.conn
            .query_row(
                "SELECT user, payload, refreshed_at FROM weekly_cache WHERE user = ?1",
                params![user],
                |row| {
                    Ok(WeeklyCacheRow {
                        user: row.get(0)?,
                        payload: row.get(1)?,
                        refreshed_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to query weekly cache")
    }

    pub fn upsert_weekly_cache(&self, user: &str, payload: &str, refreshed_at: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO weekly_cache (user, payload, refreshed_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user)
                 DO UPDATE SET payload=excluded.payload, refreshed_at=excluded.refreshed_at",
                params![user, payload, refreshed_at],
            )
            .context("Failed to upsert weekly cache")?;

        Ok(())
    }

    pub fn latest_refresh_at(&self) -> Result<Option<i64>> {
        self.conn
            .query_row("SELECT MAX(refreshed_at) FROM weekly_cache", [], |row| {
                row.get(0)
            })
            .context("Failed to query latest refresh time")
    }

    pub fn record_counts(&self) -> Result<RecordCounts> {
        self.conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM users),
                        (SELECT COUNT(*) FROM tasks),
                        (SELECT COUNT(*) FROM breaks),
                        (SELECT COUNT(*) FROM moods)",
                [],
                |row| {
                    Ok(RecordCounts {
                        users: row.get(0)?,
                        tasks: row.get(1)?,
                        breaks: row.get(2)?,
                        moods: row.get(3)?,
                    })
                },
            )
            .context("Failed to count records")
    }

    /// Deletes raw records whose resolved timestamp fell out of the retention
    /// window. Streak history prunes itself inside the engine.
    pub fn cleanup_old_records(&self, retention_days: u32) -> Result<usize> {
        let threshold = (Local::now() - Duration::days(i64::from(retention_days))).timestamp();

        let tasks = self
            .conn
            .execute(
                "DELETE FROM tasks WHERE COALESCE(ended_at, created_at, started_at) < ?1",
                params![threshold],
            )
            .context("Failed to clean up old tasks")?;
        let breaks = self
            .conn
            .execute(
                "DELETE FROM breaks WHERE COALESCE(occurred_at, logged_at, created_at) < ?1",
                params![threshold],
            )
            .context("Failed to clean up old breaks")?;
        let moods = self
            .conn
            .execute(
                "DELETE FROM moods WHERE COALESCE(occurred_at, logged_at, created_at) < ?1",
                params![threshold],
            )
            .context("Failed to clean up old mood check-ins")?;

        Ok(tasks + breaks + moods)
    }
}

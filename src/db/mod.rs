use crate::errors::{poisoned, AppError, AppResult};
use crate::kanban::{task_not_found, validate_task, TasksStore};
use crate::models::{KanbanTask, NoteRecord, TaskDraft};
use crate::notes::{note_not_found, validate_note, NotesStore};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const NOTE_COLUMNS: &str = "id, note_title, note_content, created_at, updated_at";

const TASK_COLUMNS: &str = "id, title, description, status, priority, created_at, updated_at";

/// Table-backed notes and kanban store. Ids and timestamps are assigned by
/// SQLite and read back with `RETURNING`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| AppError::Storage(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;
        tracing::info!(path = %path.display(), "database schema initialized");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| poisoned("database"))
    }
}

impl NotesStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn create(&self, title: &str, content: &str) -> AppResult<NoteRecord> {
        validate_note(title, content)?;
        let conn = self.lock()?;
        let note = conn.query_row(
            &format!(
                "INSERT INTO notes_records (note_title, note_content) VALUES (?1, ?2)
                 RETURNING {NOTE_COLUMNS}"
            ),
            params![title, content],
            map_note,
        )?;
        tracing::debug!(id = note.id, "note created");
        Ok(note)
    }

    fn get_all(&self) -> AppResult<Vec<NoteRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes_records ORDER BY updated_at DESC, id DESC"
        ))?;
        let notes = stmt
            .query_map([], map_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    fn get_by_id(&self, id: i64) -> AppResult<NoteRecord> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {NOTE_COLUMNS} FROM notes_records WHERE id = ?1"),
            [id],
            map_note,
        )
        .optional()?
        .ok_or_else(|| note_not_found(id))
    }

    fn update(&self, id: i64, title: &str, content: &str) -> AppResult<NoteRecord> {
        validate_note(title, content)?;
        let conn = self.lock()?;
        let note = conn
            .query_row(
                &format!(
                    "UPDATE notes_records
                     SET note_title = ?1, note_content = ?2,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?3
                     RETURNING {NOTE_COLUMNS}"
                ),
                params![title, content, id],
                map_note,
            )
            .optional()?
            .ok_or_else(|| note_not_found(id))?;
        tracing::debug!(id, "note updated");
        Ok(note)
    }

    fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM notes_records WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(note_not_found(id));
        }
        tracing::debug!(id, "note deleted");
        Ok(())
    }
}

impl TasksStore for SqliteStore {
    fn create(&self, draft: &TaskDraft) -> AppResult<KanbanTask> {
        validate_task(draft)?;
        let conn = self.lock()?;
        let task = conn.query_row(
            &format!(
                "INSERT INTO kanban_tasks (title, description, status, priority) VALUES (?1, ?2, ?3, ?4)
                 RETURNING {TASK_COLUMNS}"
            ),
            params![draft.title, draft.description, draft.status, draft.priority],
            map_task,
        )?;
        tracing::debug!(id = task.id, "task created");
        Ok(task)
    }

    fn get_all(&self) -> AppResult<Vec<KanbanTask>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM kanban_tasks ORDER BY updated_at DESC, id DESC"
        ))?;
        let tasks = stmt
            .query_map([], map_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn update(&self, id: i64, draft: &TaskDraft) -> AppResult<KanbanTask> {
        validate_task(draft)?;
        let conn = self.lock()?;
        let task = conn
            .query_row(
                &format!(
                    "UPDATE kanban_tasks
                     SET title = ?1, description = ?2, status = ?3, priority = ?4,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?5
                     RETURNING {TASK_COLUMNS}"
                ),
                params![draft.title, draft.description, draft.status, draft.priority, id],
                map_task,
            )
            .optional()?
            .ok_or_else(|| task_not_found(id))?;
        tracing::debug!(id, "task updated");
        Ok(task)
    }

    fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM kanban_tasks WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(task_not_found(id));
        }
        tracing::debug!(id, "task deleted");
        Ok(())
    }
}

fn map_note(row: &Row<'_>) -> rusqlite::Result<NoteRecord> {
    Ok(NoteRecord {
        id: row.get(0)?,
        note_title: row.get(1)?,
        note_content: row.get(2)?,
        created_at: parse_time(3, &row.get::<_, String>(3)?)?,
        updated_at: parse_time(4, &row.get::<_, String>(4)?)?,
    })
}

fn map_task(row: &Row<'_>) -> rusqlite::Result<KanbanTask> {
    Ok(KanbanTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        created_at: parse_time(5, &row.get::<_, String>(5)?)?,
        updated_at: parse_time(6, &row.get::<_, String>(6)?)?,
    })
}

fn parse_time(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
            )
        })
}

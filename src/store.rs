use crate::config::{HubConfig, NotesBackend};
use crate::db::SqliteStore;
use crate::errors::{AppError, AppResult};
use crate::kanban::{FileTasksStore, SharedTasksStore};
use crate::models::TableSummary;
use crate::notes::{FileNotesStore, SharedNotesStore};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const NOTES_TABLE: &str = "notes_records";
pub const KANBAN_TABLE: &str = "kanban_tasks";

/// The notes and kanban stores of one backend, plus the read-only table viewer over them.
#[derive(Clone)]
pub struct Stores {
    pub notes: SharedNotesStore,
    pub tasks: SharedTasksStore,
}

impl Stores {
    pub fn backend_name(&self) -> &'static str {
        self.notes.backend_name()
    }

    pub fn tables(&self) -> AppResult<Vec<TableSummary>> {
        Ok(vec![
            TableSummary {
                table_name: NOTES_TABLE.to_string(),
                row_count: self.notes.get_all()?.len(),
            },
            TableSummary {
                table_name: KANBAN_TABLE.to_string(),
                row_count: self.tasks.get_all()?.len(),
            },
        ])
    }

    /// Rows of a known table as JSON objects; unknown names give no rows.
    pub fn table_rows(&self, table: &str) -> AppResult<Vec<Value>> {
        match table {
            NOTES_TABLE => to_rows(self.notes.get_all()?),
            KANBAN_TABLE => to_rows(self.tasks.get_all()?),
            _ => Ok(Vec::new()),
        }
    }
}

fn to_rows<T: Serialize>(records: Vec<T>) -> AppResult<Vec<Value>> {
    records
        .into_iter()
        .map(|record| serde_json::to_value(record).map_err(AppError::from))
        .collect()
}

/// Opens the backend selected in config. `Ok(None)` means storage is disabled.
pub fn open_stores(config: &HubConfig) -> AppResult<Option<Stores>> {
    let stores = match config.notes_backend {
        NotesBackend::File => Stores {
            notes: Arc::new(FileNotesStore::open(&config.notes_file)?),
            tasks: Arc::new(FileTasksStore::open(&config.kanban_file)?),
        },
        NotesBackend::Sqlite => {
            let database = Arc::new(SqliteStore::new(&config.database_path)?);
            let notes: SharedNotesStore = database.clone();
            let tasks: SharedTasksStore = database;
            Stores { notes, tasks }
        }
        NotesBackend::Disabled => return Ok(None),
    };
    tracing::info!(backend = stores.backend_name(), "data stores ready");
    Ok(Some(stores))
}

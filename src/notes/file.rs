use crate::errors::AppResult;
use crate::models::NoteRecord;
use crate::notes::{note_not_found, validate_note, NotesStore};
use crate::snapshot::{Record, SnapshotTable};
use chrono::Utc;
use std::path::Path;

impl Record for NoteRecord {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Notes kept in memory and mirrored to one JSON array on disk.
#[derive(Debug)]
pub struct FileNotesStore {
    table: SnapshotTable<NoteRecord>,
}

impl FileNotesStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        Ok(Self {
            table: SnapshotTable::open(path, "notes")?,
        })
    }
}

impl NotesStore for FileNotesStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn create(&self, title: &str, content: &str) -> AppResult<NoteRecord> {
        validate_note(title, content)?;
        let now = Utc::now();
        let note = self.table.insert_with(|id| NoteRecord {
            id,
            note_title: title.to_string(),
            note_content: content.to_string(),
            created_at: now,
            updated_at: now,
        })?;
        tracing::debug!(id = note.id, "note created");
        Ok(note)
    }

    fn get_all(&self) -> AppResult<Vec<NoteRecord>> {
        self.table.all()
    }

    fn get_by_id(&self, id: i64) -> AppResult<NoteRecord> {
        self.table.get(id)?.ok_or_else(|| note_not_found(id))
    }

    fn update(&self, id: i64, title: &str, content: &str) -> AppResult<NoteRecord> {
        validate_note(title, content)?;
        let note = self
            .table
            .replace_with(id, |previous| NoteRecord {
                note_title: title.to_string(),
                note_content: content.to_string(),
                updated_at: Utc::now(),
                ..previous.clone()
            })?
            .ok_or_else(|| note_not_found(id))?;
        tracing::debug!(id, "note updated");
        Ok(note)
    }

    fn delete(&self, id: i64) -> AppResult<()> {
        if !self.table.remove(id)? {
            return Err(note_not_found(id));
        }
        tracing::debug!(id, "note deleted");
        Ok(())
    }
}

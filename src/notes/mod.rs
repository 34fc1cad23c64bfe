pub mod file;

use crate::errors::{AppError, AppResult};
use crate::models::NoteRecord;
use std::sync::Arc;

pub use file::FileNotesStore;

/// CRUD contract shared by every notes backend.
pub trait NotesStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    fn create(&self, title: &str, content: &str) -> AppResult<NoteRecord>;

    fn get_all(&self) -> AppResult<Vec<NoteRecord>>;

    fn get_by_id(&self, id: i64) -> AppResult<NoteRecord>;

    fn update(&self, id: i64, title: &str, content: &str) -> AppResult<NoteRecord>;

    fn delete(&self, id: i64) -> AppResult<()>;
}

pub type SharedNotesStore = Arc<dyn NotesStore>;

pub fn validate_note(title: &str, content: &str) -> AppResult<()> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(AppError::Validation("Title and content are required".to_string()));
    }
    Ok(())
}

pub(crate) fn note_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("note with ID {} not found", id))
}

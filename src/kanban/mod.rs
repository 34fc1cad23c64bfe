pub mod file;

use crate::errors::{AppError, AppResult};
use crate::models::{KanbanTask, TaskDraft};
use std::sync::Arc;

pub use file::FileTasksStore;

/// Kanban board storage, implemented by the same backends as notes.
pub trait TasksStore: Send + Sync {
    fn create(&self, draft: &TaskDraft) -> AppResult<KanbanTask>;

    fn get_all(&self) -> AppResult<Vec<KanbanTask>>;

    fn update(&self, id: i64, draft: &TaskDraft) -> AppResult<KanbanTask>;

    fn delete(&self, id: i64) -> AppResult<()>;
}

pub type SharedTasksStore = Arc<dyn TasksStore>;

pub fn validate_task(draft: &TaskDraft) -> AppResult<()> {
    if draft.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    Ok(())
}

pub(crate) fn task_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("task with ID {} not found", id))
}

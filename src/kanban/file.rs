use crate::errors::AppResult;
use crate::kanban::{task_not_found, validate_task, TasksStore};
use crate::models::{KanbanTask, TaskDraft};
use crate::snapshot::{Record, SnapshotTable};
use chrono::Utc;
use std::path::Path;

impl Record for KanbanTask {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug)]
pub struct FileTasksStore {
    table: SnapshotTable<KanbanTask>,
}

impl FileTasksStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        Ok(Self {
            table: SnapshotTable::open(path, "kanban")?,
        })
    }
}

impl TasksStore for FileTasksStore {
    fn create(&self, draft: &TaskDraft) -> AppResult<KanbanTask> {
        validate_task(draft)?;
        let now = Utc::now();
        let task = self.table.insert_with(|id| KanbanTask {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: draft.status.clone(),
            priority: draft.priority.clone(),
            created_at: now,
            updated_at: now,
        })?;
        tracing::debug!(id = task.id, "task created");
        Ok(task)
    }

    fn get_all(&self) -> AppResult<Vec<KanbanTask>> {
        self.table.all()
    }

    fn update(&self, id: i64, draft: &TaskDraft) -> AppResult<KanbanTask> {
        validate_task(draft)?;
        let task = self
            .table
            .replace_with(id, |previous| KanbanTask {
                title: draft.title.clone(),
                description: draft.description.clone(),
                status: draft.status.clone(),
                priority: draft.priority.clone(),
                updated_at: Utc::now(),
                ..previous.clone()
            })?
            .ok_or_else(|| task_not_found(id))?;
        tracing::debug!(id, "task updated");
        Ok(task)
    }

    fn delete(&self, id: i64) -> AppResult<()> {
        if !self.table.remove(id)? {
            return Err(task_not_found(id));
        }
        tracing::debug!(id, "task deleted");
        Ok(())
    }
}

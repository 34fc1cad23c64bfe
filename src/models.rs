use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_APP_DESCRIPTION: &str = "A tiny app";
pub const DEFAULT_APP_ICON: &str = "mdi:application";
pub const DEFAULT_APP_COLOR: &str = "#3498db";
pub const DEFAULT_APP_CATEGORY: &str = "General";
pub const DEFAULT_TASK_STATUS: &str = "todo";
pub const DEFAULT_TASK_PRIORITY: &str = "medium";

/// Catalog entry for one discovered app.
///
/// `name` and `path` always come from the directory name, never from the
/// sidecar document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub visit_count: u64,
    pub color: String,
    pub category: String,
    pub tags: Vec<String>,
    pub path: String,
}

impl AppDescriptor {
    pub fn with_defaults(name: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            title: name.to_string(),
            description: DEFAULT_APP_DESCRIPTION.to_string(),
            icon: DEFAULT_APP_ICON.to_string(),
            created: now,
            modified: now,
            visit_count: 0,
            color: DEFAULT_APP_COLOR.to_string(),
            category: DEFAULT_APP_CATEGORY.to_string(),
            tags: Vec::new(),
            path: name.to_string(),
        }
    }
}

/// Partial descriptor read from `app-metadata.json`. Unset fields keep defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppMetadataOverride {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub visit_count: Option<u64>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: i64,
    pub note_title: String,
    pub note_content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update request body. The short `title`/`content` names are
/// accepted as a fallback for older clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotePayload {
    pub note_title: Option<String>,
    pub note_content: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NotePayload {
    pub fn into_parts(self) -> (String, String) {
        let title = non_empty(self.note_title).or_else(|| non_empty(self.title));
        let content = non_empty(self.note_content).or_else(|| non_empty(self.content));
        (title.unwrap_or_default(), content.unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KanbanTask {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task fields for a create or update, with defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl TaskPayload {
    /// Missing or empty status and priority fall back to `todo` / `medium`.
    pub fn into_draft(self) -> TaskDraft {
        TaskDraft {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            status: non_empty(self.status).unwrap_or_else(|| DEFAULT_TASK_STATUS.to_string()),
            priority: non_empty(self.priority).unwrap_or_else(|| DEFAULT_TASK_PRIORITY.to_string()),
        }
    }
}

/// One line of the database viewer's table listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub table_name: String,
    pub row_count: usize,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|current| !current.is_empty())
}

use crate::errors::{AppError, AppResult};
use std::path::PathBuf;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_APPS_DIR: &str = "tiny_Apps";
const DEFAULT_NOTES_FILE: &str = "data/notes.json";
const DEFAULT_KANBAN_FILE: &str = "data/kanban.json";
const DEFAULT_DATABASE_PATH: &str = "data/notes.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesBackend {
    File,
    Sqlite,
    Disabled,
}

impl NotesBackend {
    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "sqlite" | "table" => Ok(Self::Sqlite),
            "none" | "off" => Ok(Self::Disabled),
            other => Err(AppError::Config(format!(
                "unknown notes backend '{}' (expected file, sqlite or none)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    pub apps_dir: PathBuf,
    pub static_dir: PathBuf,
    pub notes_backend: NotesBackend,
    pub notes_file: PathBuf,
    pub kanban_file: PathBuf,
    pub database_path: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            apps_dir: PathBuf::from(DEFAULT_APPS_DIR),
            static_dir: PathBuf::from("."),
            notes_backend: NotesBackend::File,
            notes_file: PathBuf::from(DEFAULT_NOTES_FILE),
            kanban_file: PathBuf::from(DEFAULT_KANBAN_FILE),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            log_dir: None,
        }
    }
}

impl HubConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        let defaults = Self::default();

        let port = match get("HUB_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::Config(format!("HUB_PORT must be a port number, got '{}'", raw)))?,
            None => defaults.port,
        };
        let notes_backend = match get("HUB_NOTES_BACKEND") {
            Some(raw) => NotesBackend::parse(&raw)?,
            None => defaults.notes_backend,
        };

        Ok(Self {
            host: get("HUB_HOST").unwrap_or(defaults.host),
            port,
            apps_dir: get("HUB_APPS_DIR").map(PathBuf::from).unwrap_or(defaults.apps_dir),
            static_dir: get("HUB_STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            notes_backend,
            notes_file: get("HUB_NOTES_FILE").map(PathBuf::from).unwrap_or(defaults.notes_file),
            kanban_file: get("HUB_KANBAN_FILE").map(PathBuf::from).unwrap_or(defaults.kanban_file),
            database_path: get("HUB_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            log_dir: get("HUB_LOG_DIR").map(PathBuf::from),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

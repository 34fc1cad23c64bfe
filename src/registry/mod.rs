pub mod guard;
pub mod metadata;

use crate::errors::{poisoned, AppError, AppResult};
use crate::models::AppDescriptor;
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

pub const ENTRY_POINT: &str = "index.html";
pub const SERVE_PREFIX: &str = "/app";

const HEAD_TAG: &str = "<head>";

type Catalog = HashMap<String, AppDescriptor>;

/// Catalog of the apps found directly under the apps root.
///
/// A rescan builds a complete new catalog before swapping it in, so readers
/// see either the previous catalog or the new one.
#[derive(Debug)]
pub struct AppRegistry {
    root: PathBuf,
    catalog: RwLock<Catalog>,
}

impl AppRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            root,
            catalog: RwLock::new(Catalog::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Replaces the catalog with a fresh scan and returns the number of apps found.
    /// On failure the previous catalog is left in place.
    pub fn rescan(&self) -> AppResult<usize> {
        let fresh = self.scan()?;
        let count = fresh.len();
        let mut catalog = self.catalog.write().map_err(|_| poisoned("app catalog"))?;
        *catalog = fresh;
        Ok(count)
    }

    pub fn list(&self) -> AppResult<Vec<AppDescriptor>> {
        let catalog = self.catalog.read().map_err(|_| poisoned("app catalog"))?;
        Ok(catalog.values().cloned().collect())
    }

    pub fn get(&self, name: &str) -> AppResult<Option<AppDescriptor>> {
        let catalog = self.catalog.read().map_err(|_| poisoned("app catalog"))?;
        Ok(catalog.get(name).cloned())
    }

    /// Unknown names are ignored.
    pub fn record_visit(&self, name: &str) -> AppResult<()> {
        let mut catalog = self.catalog.write().map_err(|_| poisoned("app catalog"))?;
        if let Some(descriptor) = catalog.get_mut(name) {
            descriptor.visit_count = descriptor.visit_count.saturating_add(1);
        }
        Ok(())
    }

    /// Reads the app's entry document with a `<base>` tag pointing at its
    /// serving prefix. The document is handled as raw bytes, whatever its encoding.
    pub fn resolve(&self, name: &str) -> AppResult<Vec<u8>> {
        self.require(name)?;
        let entry_point = self.root.join(name).join(ENTRY_POINT);
        let document = fs::read(&entry_point)
            .map_err(|error| AppError::NotFound(format!("entry point for app '{}' unreadable: {}", name, error)))?;
        Ok(inject_base_tag(&document, name))
    }

    /// Absolute path of an asset inside the app. Containment is checked
    /// before existence, so traversal attempts are denied even for unknown apps.
    pub fn static_asset(&self, name: &str, relative: &str) -> AppResult<PathBuf> {
        let path = guard::contain(&self.root, name, relative)?;
        self.require(name)?;
        Ok(path)
    }

    fn require(&self, name: &str) -> AppResult<()> {
        let catalog = self.catalog.read().map_err(|_| poisoned("app catalog"))?;
        if catalog.contains_key(name) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("app '{}' not found", name)))
        }
    }

    fn scan(&self) -> AppResult<Catalog> {
        let mut catalog = Catalog::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::info!(root = %self.root.display(), "creating apps directory");
                fs::create_dir_all(&self.root).map_err(|error| {
                    AppError::Storage(format!("failed to create {}: {}", self.root.display(), error))
                })?;
                return Ok(catalog);
            }
            Err(error) => {
                return Err(AppError::Storage(format!(
                    "failed to read {}: {}",
                    self.root.display(),
                    error
                )))
            }
        };

        let now = Utc::now();
        // Direct children only; nested directories are never candidates.
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let app_dir = entry.path();
            if !app_dir.join(ENTRY_POINT).is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(ToString::to_string) else {
                tracing::warn!(path = %app_dir.display(), "skipping app with non UTF-8 directory name");
                continue;
            };

            let descriptor = metadata::build_descriptor(&app_dir, &name, now);
            tracing::info!(app = %name, "discovered app");
            catalog.insert(name, descriptor);
        }

        Ok(catalog)
    }
}

/// Inserts `<base href="/app/<name>/">` right after the first `<head>`.
/// Documents without one are returned unchanged.
pub fn inject_base_tag(document: &[u8], app_name: &str) -> Vec<u8> {
    let head = HEAD_TAG.as_bytes();
    let Some(index) = document.windows(head.len()).position(|window| window == head) else {
        return document.to_vec();
    };

    let split = index + head.len();
    let base = format!("\n    <base href=\"{}/{}/\">", SERVE_PREFIX, app_name);
    let mut rewritten = Vec::with_capacity(document.len() + base.len());
    rewritten.extend_from_slice(&document[..split]);
    rewritten.extend_from_slice(base.as_bytes());
    rewritten.extend_from_slice(&document[split..]);
    rewritten
}

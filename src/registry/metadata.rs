use crate::models::{AppDescriptor, AppMetadataOverride};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const SIDECAR_FILE: &str = "app-metadata.json";

/// Builds the descriptor for the app living in `app_dir`, named after its directory.
pub fn build_descriptor(app_dir: &Path, name: &str, now: DateTime<Utc>) -> AppDescriptor {
    let mut descriptor = AppDescriptor::with_defaults(name, now);
    if let Some(overrides) = read_sidecar(&app_dir.join(SIDECAR_FILE), name) {
        merge(&mut descriptor, overrides);
    }

    // identity is always the directory name
    descriptor.name = name.to_string();
    descriptor.path = name.to_string();
    descriptor
}

pub fn merge(descriptor: &mut AppDescriptor, overrides: AppMetadataOverride) {
    if let Some(title) = overrides.title {
        descriptor.title = title;
    }
    if let Some(description) = overrides.description {
        descriptor.description = description;
    }
    if let Some(icon) = overrides.icon {
        descriptor.icon = icon;
    }
    if let Some(created) = overrides.created {
        descriptor.created = created;
    }
    if let Some(modified) = overrides.modified {
        descriptor.modified = modified;
    }
    if let Some(visit_count) = overrides.visit_count {
        descriptor.visit_count = visit_count;
    }
    if let Some(color) = overrides.color {
        descriptor.color = color;
    }
    if let Some(category) = overrides.category {
        descriptor.category = category;
    }
    if let Some(tags) = overrides.tags {
        let mut seen = HashSet::new();
        descriptor.tags = tags.into_iter().filter(|tag| seen.insert(tag.clone())).collect();
    }
}

fn read_sidecar(path: &Path, app_name: &str) -> Option<AppMetadataOverride> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => return None,
        Err(error) => {
            tracing::warn!(app = app_name, error = %error, "failed to read app metadata; using defaults");
            return None;
        }
    };

    match serde_json::from_slice::<AppMetadataOverride>(&bytes) {
        Ok(overrides) => Some(overrides),
        Err(error) => {
            tracing::warn!(app = app_name, error = %error, "failed to parse app metadata; using defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{build_descriptor, SIDECAR_FILE};
    use crate::models::{DEFAULT_APP_COLOR, DEFAULT_APP_DESCRIPTION};
    use chrono::Utc;
    use std::fs;

    #[test]
    fn missing_sidecar_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let descriptor = build_descriptor(dir.path(), "calc", Utc::now());
        assert_eq!(descriptor.title, "calc");
        assert_eq!(descriptor.description, DEFAULT_APP_DESCRIPTION);
        assert_eq!(descriptor.color, DEFAULT_APP_COLOR);
    }

    #[test]
    fn partial_sidecar_overrides_only_its_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(SIDECAR_FILE),
            r##"{"title":"Calculator","color":"#ff0000","tags":["math","tools","math"]}"##,
        )
        .expect("write sidecar");

        let descriptor = build_descriptor(dir.path(), "calc", Utc::now());
        assert_eq!(descriptor.title, "Calculator");
        assert_eq!(descriptor.color, "#ff0000");
        assert_eq!(descriptor.tags, vec!["math".to_string(), "tools".to_string()]);
        assert_eq!(descriptor.category, "General");
        assert_eq!(descriptor.description, DEFAULT_APP_DESCRIPTION);
    }

    #[test]
    fn sidecar_cannot_claim_another_identity() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(SIDECAR_FILE),
            r#"{"name":"kanban","path":"../kanban","title":"Totally Kanban"}"#,
        )
        .expect("write sidecar");

        let descriptor = build_descriptor(dir.path(), "calc", Utc::now());
        assert_eq!(descriptor.name, "calc");
        assert_eq!(descriptor.path, "calc");
        assert_eq!(descriptor.title, "Totally Kanban");
    }

    #[test]
    fn malformed_sidecar_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(SIDECAR_FILE), "{ not json").expect("write sidecar");

        let descriptor = build_descriptor(dir.path(), "calc", Utc::now());
        assert_eq!(descriptor.title, "calc");
        assert_eq!(descriptor.path, "calc");
    }
}

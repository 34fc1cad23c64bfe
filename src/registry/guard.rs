use crate::errors::{AppError, AppResult};
use std::path::{Component, Path, PathBuf};

/// Lexically resolves `.` and `..` without touching the filesystem.
/// `..` never climbs above a root or prefix component.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Returns `<root>/<app_name>/<relative>` normalized, or `AccessDenied` when
/// the result is not inside `<root>/<app_name>`.
pub fn contain(root: &Path, app_name: &str, relative: &str) -> AppResult<PathBuf> {
    let mut components = Path::new(app_name).components();
    let single_segment = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_segment {
        return Err(AppError::AccessDenied(format!("invalid app name '{}'", app_name)));
    }

    let base = normalize(&root.join(app_name));
    let target = normalize(&base.join(relative));
    if target.starts_with(&base) {
        Ok(target)
    } else {
        Err(AppError::AccessDenied(format!(
            "path '{}' escapes app '{}'",
            relative, app_name
        )))
    }
}

//! Path utilities for package files.
//!
//! Manifest file names come from downloaded packages, so every host join
//! goes through `safe_join` to keep files inside the package directory.

use crate::error::{SprigError, SprigResult};
use crate::MODULES_DIR;
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                if components.is_empty() {
                    components.push(component);
                } else {
                    components.pop();
                }
            },
            other => components.push(other),
        }
    }

    components.iter().collect()
}

/// Check if a path is safe (relative, never escaping its base)
pub fn is_safe_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => depth += 1,
            _ => return false,
        }
    }

    true
}

/// Safely join paths, preventing directory traversal
pub fn safe_join(base: &Path, path: &Path) -> SprigResult<PathBuf> {
    if !is_safe_path(path) {
        return Err(SprigError::ConfigValidation {
            field: "files".to_string(),
            reason: format!("path escapes its package: {}", path.display()),
        });
    }

    Ok(base.join(normalize_path(path)))
}

/// Name a dependency file gets in the flattened compiler file system
pub fn module_path(package: &str, file: &str) -> String {
    format!("{}/{}/{}", MODULES_DIR, package, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        let path = Path::new("./src/../lib/./file.ts");
        assert_eq!(normalize_path(path), Path::new("lib/file.ts"));
    }

    #[test]
    fn test_is_safe_path() {
        assert!(is_safe_path(Path::new("main.ts")));
        assert!(is_safe_path(Path::new("./_locales/de/radio-strings.json")));
        assert!(!is_safe_path(Path::new("../../etc/passwd")));
        assert!(!is_safe_path(Path::new("/absolute/path")));
    }

    #[test]
    fn test_safe_join() {
        let base = Path::new("/work/project");
        let joined = safe_join(base, Path::new("sub/../main.ts")).unwrap();
        assert_eq!(joined, Path::new("/work/project/main.ts"));
        assert!(safe_join(base, Path::new("../x")).is_err());
    }

    #[test]
    fn test_module_path() {
        assert_eq!(module_path("radio", "radio.ts"), "sprig_modules/radio/radio.ts");
    }
}

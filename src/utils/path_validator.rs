use crate::error::{ExtMgrError, Result};
use std::path::{Path, PathBuf};

/// Provides safe path validation helpers to avoid traversal and host intrusion.
pub struct PathValidator;

impl PathValidator {
    /// Validates and canonicalises the directory holding installed extensions.
    pub fn validate_install_root(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            ExtMgrError::ProjectValidation(format!(
                "Invalid extensions directory '{}': {e}",
                path.display()
            ))
        })?;

        if !canonical.is_dir() {
            return Err(ExtMgrError::ProjectValidation(format!(
                "Path '{}' is not a directory",
                canonical.display()
            )));
        }

        const FORBIDDEN: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot"];

        for forbidden in FORBIDDEN {
            let forbidden_path = Path::new(forbidden);

            if path.starts_with(forbidden_path) || canonical.starts_with(forbidden_path) {
                return Err(ExtMgrError::ProjectValidation(format!(
                    "Access to system directory '{}' is not allowed",
                    forbidden
                )));
            }

            if let Ok(canonical_forbidden) = forbidden_path.canonicalize() {
                if canonical.starts_with(&canonical_forbidden) {
                    return Err(ExtMgrError::ProjectValidation(format!(
                        "Access to system directory '{}' is not allowed",
                        forbidden
                    )));
                }
            }
        }

        Ok(canonical)
    }

    /// An extension name is also its folder name, so it must be a single plain path segment.
    pub fn validate_extension_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ExtMgrError::ProjectValidation(
                "Extension name must not be empty".to_string(),
            ));
        }

        if name == "." || name == ".." {
            return Err(ExtMgrError::ProjectValidation(format!(
                "Extension name '{name}' is not a folder name"
            )));
        }

        let dangerous = ['/', '\\', ';', '|', '&', '$', '`', '\n', '\r', '\0'];
        if let Some(ch) = dangerous.iter().find(|c| name.contains(**c)) {
            return Err(ExtMgrError::ProjectValidation(format!(
                "Extension name '{}' contains forbidden character {:?}",
                name, ch
            )));
        }

        Ok(())
    }
}

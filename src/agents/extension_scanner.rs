use crate::error::Result;
use crate::utils::PathValidator;
use std::path::{Path, PathBuf};

/// ExtensionScannerAgent locates an installed extension below the install root
pub struct ExtensionScannerAgent {
    install_root: PathBuf,
}

impl ExtensionScannerAgent {
    pub fn new<P: AsRef<Path>>(install_root: P) -> Self {
        Self {
            install_root: install_root.as_ref().to_path_buf(),
        }
    }

    /// Path where the extension is expected; the folder name equals the extension name.
    pub fn extension_path(&self, name: &str) -> Result<PathBuf> {
        PathValidator::validate_extension_name(name)?;
        Ok(self.install_root.join(name))
    }

    /// Looks up the extension folder. `Ok(None)` means it is not installed.
    pub fn locate(&self, name: &str) -> Result<Option<ExtensionInfo>> {
        let path = self.extension_path(name)?;
        if !path.is_dir() {
            return Ok(None);
        }

        let git_dir = path.join(".git");
        Ok(Some(ExtensionInfo {
            has_git: git_dir.exists(),
            has_manifest: path.join("package.json").is_file(),
            path,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct ExtensionInfo {
    pub path: PathBuf,
    pub has_git: bool,
    pub has_manifest: bool,
}

pub mod config_editor;
pub mod extension_scanner;
pub mod package_manager;
pub mod version_control;

pub mod update;

pub use config_editor::{AddResult, ConfigEditor};
pub use extension_scanner::ExtensionScannerAgent;
pub use version_control::VersionControlAgent;

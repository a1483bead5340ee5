use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtMgrError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid extension source: {0}")]
    SourceParse(String),

    #[error("Validation failed: {0}")]
    ProjectValidation(String),

    #[error("Failed to execute {program}: {reason}")]
    CommandSpawn { program: String, reason: String },

    #[error("Git operation failed: {0}")]
    VersionControl(String),

    #[error("An extension update run is already in progress")]
    RunInProgress,

    #[error("Run log error: {0}")]
    RunLog(String),

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML document error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExtMgrError>;

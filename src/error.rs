use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimesheetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode or decode stored data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("project not found: {0}")]
    UnknownProject(String),

    #[error("project name must not be empty")]
    EmptyProjectName,

    #[error("a timer is already running")]
    AlreadyRunning,

    #[error("no timer is running")]
    NotRunning,

    #[error("no stopped entry is waiting to be saved")]
    NotStopped,
}

pub type Result<T> = std::result::Result<T, TimesheetError>;

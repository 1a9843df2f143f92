use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] antibot_store::StoreError),

    #[error("gatekeeper error: {0}")]
    Gate(#[from] antibot_verification::GateError),

    #[error("platform error: {0}")]
    Platform(#[from] antibot_platform::PlatformError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("node not started")]
    NotStarted,

    #[error("node already started")]
    AlreadyStarted,

    #[error("background task failed: {0}")]
    Task(String),
}

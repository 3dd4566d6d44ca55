use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeofedError {
    #[error("Source error: {0}")]
    SourceError(#[from] geofed_sources::SourceError),
    #[error("Spatial filter error: {0}")]
    SpatialError(#[from] crate::spatial::SpatialError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Search coordinator has shut down")]
    CoordinatorClosed,
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GeofedError>;

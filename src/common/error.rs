use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Data unavailable from {source_name}: {reason}")]
    DataUnavailable { source_name: String, reason: String },

    #[error("Unresolved location: {id}")]
    UnresolvedLocation { id: String },

    #[error("Malformed event: {reason}")]
    MalformedEvent { reason: String },

    #[error("Entity {id} is already animating")]
    EntityBusy { id: String },

    #[error("Connectivity lost: {0}")]
    ConnectivityLoss(String),

    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

impl DomainError {
    pub fn unavailable(source_name: &str, reason: impl Into<String>) -> Self {
        DomainError::DataUnavailable {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        DomainError::MalformedEvent { reason: reason.into() }
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;

use crate::store::EntityKind;
use thiserror::Error;

// Errors raised by a record store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} with id {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("{0}")]
    Rejected(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Errors surfaced by the task and category repositories
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("failed to load: {0}")]
    Load(String),

    #[error("{kind} with id {id} not found")]
    NotFound { kind: EntityKind, id: u64 },

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("write rejected: {0}")]
    Write(String),

    #[error("field mapping failed: {0}")]
    Mapping(String),
}

impl RepoError {
    /// Classifies a store failure that happened on a read path.
    pub fn from_load(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => RepoError::NotFound { kind, id },
            other => RepoError::Load(other.to_string()),
        }
    }

    /// Classifies a store failure that happened on a create/update/delete path.
    pub fn from_write(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => RepoError::NotFound { kind, id },
            StoreError::Rejected(message) => RepoError::Write(message),
            other => RepoError::Write(other.to_string()),
        }
    }

    /// A record that cannot be read back counts as a failed load.
    pub fn on_read(self) -> Self {
        match self {
            RepoError::Mapping(message) => RepoError::Load(message),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("unknown store '{0}', expected 'remote' or 'memory'")]
    UnknownStore(String),

    #[error("invalid project id '{0}'")]
    InvalidProjectId(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

//! Error types for the relay server.

use dispatcher::ConfigError;
use thiserror::Error;

/// Failure applying a single world command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Actor is no longer online
    #[error("actor {0} is not online")]
    UnknownActor(String),
    /// Spawn position lies in a chunk that could not be loaded
    #[error("chunk unavailable in world {world}")]
    ChunkUnavailable { world: String },
    /// Entity kind the world does not know how to spawn
    #[error("unknown entity type: {0}")]
    UnknownEntityKind(String),
    /// Item kind the world does not know
    #[error("unknown item: {0}")]
    UnknownItem(String),
    /// World the command names does not exist
    #[error("unknown world: {0}")]
    UnknownWorld(String),
}

/// Errors that stop the server from running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Relay task panicked
    #[error("relay task failed: {0}")]
    Task(String),
}

impl ServerError {
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        ServerError::Bind {
            addr: addr.into(),
            source,
        }
    }
}

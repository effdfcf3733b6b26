//! Engine-level error type.

use std::path::PathBuf;

use magick_ecs::entity::EntityId;
use magick_ecs::EcsError;

/// Errors raised by the engine: configuration problems, attachment consumers
/// and anything bubbling up from the ECS.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid tick configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tick configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("entity {host} has no hardpoint")]
    NoHardpoint { host: EntityId },

    #[error("hardpoint on {host} already holds {held}")]
    HardpointOccupied { host: EntityId, held: EntityId },

    #[error("entity {child} is already attached to {host}")]
    AlreadyAttached { child: EntityId, host: EntityId },

    #[error("entity {child} is not attached to any hardpoint")]
    NotAttached { child: EntityId },

    #[error(transparent)]
    Ecs(#[from] EcsError),
}

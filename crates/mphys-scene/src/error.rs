//! Error types for the scene graph.

use thiserror::Error;

use crate::scene::MobjectId;

/// Errors that can occur while building or transforming a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The id does not name a mobject in this scene.
    #[error("mobject not found: {0:?}")]
    UnknownMobject(MobjectId),

    /// The operation only applies to lines.
    #[error("mobject {0:?} is not a line")]
    NotALine(MobjectId),

    /// A group with no leaves has no centre or extent.
    #[error("group {0:?} has no members")]
    EmptyGroup(MobjectId),

    /// Shape parameters do not describe a valid mobject.
    #[error("invalid shape: {0}")]
    InvalidShape(String),
}

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, SceneError>;

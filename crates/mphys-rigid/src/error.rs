//! Error types for rigid-body simulation.

use mphys_scene::{MobjectId, SceneError};
use thiserror::Error;

use crate::binding::BodyKind;

/// Errors that can occur while binding mobjects or stepping the space.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// A scene operation failed.
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Time steps must be finite and non-negative.
    #[error("Invalid time step: {0}")]
    InvalidTimeStep(f64),

    /// Space configuration is out of range.
    #[error("Invalid space configuration: {0}")]
    InvalidConfig(String),

    /// Material coefficients are out of range.
    #[error("Invalid material: {0}")]
    InvalidMaterial(String),

    /// No collider can be derived for this geometry.
    #[error("Unsupported geometry for {mobject:?}: {reason}")]
    UnsupportedGeometry {
        /// The mobject that could not be bound.
        mobject: MobjectId,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to create collision shape.
    #[error("Failed to create collision shape for {mobject:?}: {reason}")]
    CollisionShape {
        /// The mobject whose shape is degenerate.
        mobject: MobjectId,
        /// Reason for failure.
        reason: String,
    },

    /// The mobject has no physics body.
    #[error("Mobject {0:?} is not bound to a body")]
    NotBound(MobjectId),

    /// The mobject is already bound with a different body kind.
    #[error("Mobject {mobject:?} is already bound as a {kind:?} body")]
    AlreadyBound {
        /// The mobject.
        mobject: MobjectId,
        /// Kind of the existing body.
        kind: BodyKind,
    },

    /// A body handle no longer exists in the space.
    #[error("Body not found in the simulation space")]
    MissingBody,

    /// A binding id no longer exists.
    #[error("Binding not found")]
    MissingBinding,

    /// A pendulum id no longer exists.
    #[error("Pendulum not found")]
    MissingPendulum,

    /// `start_swinging` on a pendulum that is already swinging.
    #[error("Pendulum is already swinging")]
    AlreadySwinging,

    /// `end_swinging` on a pendulum that is not swinging.
    #[error("Pendulum is not swinging")]
    NotSwinging,

    /// Invalid pendulum configuration.
    #[error("Invalid pendulum: {0}")]
    InvalidPendulum(String),

    /// A document references a mobject name that does not exist.
    #[error("Mobject not found in document: {0}")]
    MissingMobject(String),

    /// A document defines the same mobject name twice.
    #[error("Duplicate mobject name in document: {0}")]
    DuplicateMobject(String),
}

/// Result type for physics operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;

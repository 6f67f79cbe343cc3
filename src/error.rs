use thiserror::Error;

use crate::types::BodyId;

/// Rejected world operations. These are caller bugs, reported instead of
/// silently repairing state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    #[error("Body not found: {0:?}")]
    UnknownBody(BodyId),

    #[error("Body already destroyed: {0:?}")]
    AlreadyDestroyed(BodyId),

    #[error("Body {child:?} is already attached to {parent:?}")]
    AlreadyAttached { child: BodyId, parent: BodyId },

    #[error("Body {0:?} cannot be attached to itself")]
    SelfAttach(BodyId),

    #[error("Attaching {child:?} to {parent:?} would create a cycle")]
    AttachCycle { child: BodyId, parent: BodyId },

    #[error("Body {child:?} is not attached to {parent:?}")]
    NotAttached { child: BodyId, parent: BodyId },

    #[error("Body {0:?} is solid but does not collide with solids")]
    SolidNotCollidable(BodyId),
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid max_speed: {0} (must be > 0)")]
    InvalidMaxSpeed(f32),

    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },

    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },
}

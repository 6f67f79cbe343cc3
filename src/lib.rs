//! tilebody: fixed-step 2D body physics with box contacts and a tile collision grid

pub mod types;
pub mod error;
pub mod api;
pub mod body;
pub mod tiles;
pub mod registry;
pub mod world;
pub mod narrowphase;

pub use crate::types::*;
pub use crate::error::*;
pub use crate::api::*;
pub use crate::body::Body;
pub use crate::tiles::TileCollisionGrid;
pub use crate::registry::CollisionRegistry;
pub use crate::world::PhysicsWorld;

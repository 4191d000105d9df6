//! Collision module: слои, box brushes, shape-запросы.
//!
//! Ядро владеет своими kinematic-запросами (ground probe, overhead clearance,
//! capsule move) поверх parry3d shapes — без полного physics pipeline.

pub mod layers;
pub mod world;

// Re-export основных типов
pub use layers::LayerMask;
pub use world::{CapsuleMove, CollisionWorld, ContactFlags, RayHit};

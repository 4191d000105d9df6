//! Общие ECS-компоненты персонажа
//!
//! Организация по доменам:
//! - player: player control marker (Player)
//! - input: логический input snapshot от хоста (кнопки, оси, эджи)
//! - body: kinematic capsule proxy (размеры + контакты последнего move)
//!
//! Доменные компоненты (locomotion, stamina, camera, platform, fov) живут
//! в своих модулях рядом с системами.

pub mod body;
pub mod input;
pub mod player;

// Re-exports для удобного импорта
pub use body::*;
pub use input::*;
pub use player::*;

//! Player control marker component

use bevy::prelude::Component;

/// Marker component для player-controlled entity
///
/// Симуляционные модули работают с любым entity, несущим полный набор
/// компонентов персонажа; marker нужен хосту для адресации "своего" персонажа
/// (input routing, камера, HUD).
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

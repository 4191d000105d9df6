//! Collision layers для фильтрации запросов.
//!
//! Слои назначаются brush'ам при регистрации; каждый запрос (probe, overlap,
//! move) несёт маску слоёв, с которыми он сталкивается.

use serde::{Deserialize, Serialize};

/// Битовая маска collision-слоёв
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Пустая маска — ни с чем не сталкивается
    pub const NONE: Self = Self(0);

    /// Статичная геометрия уровня (пол, склоны)
    pub const GROUND: Self = Self(1 << 0);

    /// Движущиеся платформы (динамические коллайдеры)
    pub const PLATFORM: Self = Self(1 << 1);

    /// Стены, потолки, прочие препятствия
    pub const OBSTACLE: Self = Self(1 << 2);

    /// Всё, на чём можно стоять
    pub const MASK_WALKABLE: Self = Self(Self::GROUND.0 | Self::PLATFORM.0);

    /// Всё твёрдое для движения персонажа
    pub const MASK_SOLID: Self =
        Self(Self::GROUND.0 | Self::PLATFORM.0 | Self::OBSTACLE.0);

    /// Есть ли пересечение масок
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Содержит ли маска все биты `other`
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Маска пуста
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Объединение масок
    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

//! Kinematic capsule proxy персонажа.
//!
//! Transform.translation персонажа — точка опоры (ноги); капсула висит над
//! ней: центр = translation + center. Двигается исключительно через
//! CollisionWorld::move_capsule, контактные флаги последнего move хранятся
//! здесь и читаются state machine на следующем тике.

use bevy::prelude::*;

use crate::collision::ContactFlags;

/// Капсульное тело персонажа
#[derive(Component, Debug, Clone, Copy)]
pub struct CharacterBody {
    /// Радиус капсулы (м)
    pub radius: f32,

    /// Полная высота капсулы, включая полусферы (м)
    pub height: f32,

    /// Смещение центра капсулы от точки опоры
    pub center: Vec3,

    /// Контакты последнего move_capsule
    pub contacts: ContactFlags,
}

impl Default for CharacterBody {
    fn default() -> Self {
        Self::new(0.4, 1.8)
    }
}

impl CharacterBody {
    pub fn new(radius: f32, height: f32) -> Self {
        Self {
            radius,
            height,
            center: Vec3::Y * height * 0.5,
            contacts: ContactFlags::default(),
        }
    }

    /// Половина цилиндрической части капсулы
    #[inline]
    pub fn half_height(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.01)
    }

    /// Центр капсулы в мире
    #[inline]
    pub fn capsule_center(&self, feet: Vec3) -> Vec3 {
        feet + self.center
    }

    /// Выставить высоту капсулы, держа ноги на месте (присед)
    pub fn set_height(&mut self, height: f32) {
        self.height = height;
        self.center = Vec3::Y * height * 0.5;
    }
}

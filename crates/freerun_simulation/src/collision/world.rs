//! Collision world: box brushes + shape queries.
//!
//! Хранит статичную геометрию уровня (box brushes) и динамические коллайдеры
//! платформ (пересинхронизируются каждый тик). Запросы: raycast, capsule
//! overlap, kinematic capsule move с пер-осевым разрешением коллизий.
//!
//! Shapes и ray/intersection-запросы — parry3d; sweep реализован бинарным
//! поиском по фракции (точности хватает, зазор контролируется SKIN).

use bevy::prelude::*;
use parry3d::math::{Isometry, Point, Real, Vector};
use parry3d::na;
use parry3d::query::{intersection_test, Ray, RayCast};
use parry3d::shape::{Ball, Capsule, Cuboid};

use super::layers::LayerMask;

/// Зазор, оставляемый между капсулой и поверхностью после разрешения коллизии
const SKIN: f32 = 0.001;

/// Итерации бинарного поиска фракции движения
const SWEEP_ITERATIONS: u32 = 20;

/// Box brush — единица collision-геометрии
pub struct Brush {
    pub id: u32,
    pub cuboid: Cuboid,
    pub iso: Isometry<Real>,
    pub layers: LayerMask,
    /// Entity-владелец для динамических коллайдеров (платформ); у статики None
    pub entity: Option<Entity>,
}

/// Результат raycast'а
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub entity: Option<Entity>,
}

/// Контактные флаги последнего capsule move (по осям)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactFlags(pub u8);

impl ContactFlags {
    pub const BELOW: u8 = 1 << 0;
    pub const ABOVE: u8 = 1 << 1;
    pub const SIDES: u8 = 1 << 2;

    #[inline]
    pub fn has(self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    #[inline]
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    #[inline]
    pub fn below(self) -> bool {
        self.has(Self::BELOW)
    }

    #[inline]
    pub fn above(self) -> bool {
        self.has(Self::ABOVE)
    }
}

/// Результат kinematic capsule move
#[derive(Debug, Clone, Copy)]
pub struct CapsuleMove {
    /// Итоговый центр капсулы
    pub position: Vec3,
    pub flags: ContactFlags,
    /// Стартовая позиция уже была внутри геометрии — движение не выполнялось
    pub started_in_solid: bool,
}

/// Collision world resource
#[derive(Resource, Default)]
pub struct CollisionWorld {
    brushes: Vec<Brush>,
    dynamic: Vec<Brush>,
    next_id: u32,
}

fn isometry(pos: Vec3, rot: Quat) -> Isometry<Real> {
    let translation = na::Translation3::new(pos.x, pos.y, pos.z);
    let rotation =
        na::Unit::new_normalize(na::Quaternion::new(rot.w, rot.x, rot.y, rot.z));
    Isometry::from_parts(translation, rotation)
}

/// Капсула по оси Y: `half_height` — половина цилиндрической части
fn capsule_y(half_height: f32, radius: f32) -> Capsule {
    Capsule::new_y(half_height.max(0.01), radius.max(0.01))
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить статичный axis-aligned box (центр + half-extents)
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3, layers: LayerMask) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        self.brushes.push(Brush {
            id,
            cuboid: Cuboid::new(Vector::new(half_extents.x, half_extents.y, half_extents.z)),
            iso: isometry(center, Quat::IDENTITY),
            layers,
            entity: None,
        });

        id
    }

    /// Убрать всю статичную геометрию
    pub fn clear(&mut self) {
        self.brushes.clear();
    }

    /// Сброс динамических коллайдеров (начало пересинхронизации тика)
    pub fn clear_dynamic(&mut self) {
        self.dynamic.clear();
    }

    /// Зарегистрировать динамический коллайдер (платформу) на этот тик
    pub fn push_dynamic(
        &mut self,
        entity: Entity,
        center: Vec3,
        rotation: Quat,
        half_extents: Vec3,
        layers: LayerMask,
    ) {
        let id = self.next_id;
        self.next_id += 1;

        self.dynamic.push(Brush {
            id,
            cuboid: Cuboid::new(Vector::new(half_extents.x, half_extents.y, half_extents.z)),
            iso: isometry(center, rotation),
            layers,
            entity: Some(entity),
        });
    }

    pub fn brush_count(&self) -> usize {
        self.brushes.len() + self.dynamic.len()
    }

    fn iter_masked(&self, mask: LayerMask) -> impl Iterator<Item = &Brush> {
        self.brushes
            .iter()
            .chain(self.dynamic.iter())
            .filter(move |b| mask.intersects(b.layers))
    }

    /// Raycast по миру, ближайшее попадание
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let dir = direction.normalize_or_zero();
        if dir.length_squared() < 0.5 {
            return None;
        }

        let ray = Ray::new(
            Point::new(origin.x, origin.y, origin.z),
            Vector::new(dir.x, dir.y, dir.z),
        );

        let mut closest: Option<RayHit> = None;

        for brush in self.iter_masked(mask) {
            let Some(hit) =
                brush
                    .cuboid
                    .cast_ray_and_get_normal(&brush.iso, &ray, max_distance, true)
            else {
                continue;
            };

            let is_closer = closest
                .as_ref()
                .map_or(true, |c| hit.time_of_impact < c.distance);
            if !is_closer {
                continue;
            }

            let point = ray.point_at(hit.time_of_impact);
            // Луч стартовал внутри brush'а — нормаль вырождена, берём up
            let normal = if hit.time_of_impact <= 0.0 {
                Vec3::Y
            } else {
                Vec3::new(hit.normal.x, hit.normal.y, hit.normal.z)
            };

            closest = Some(RayHit {
                point: Vec3::new(point.x, point.y, point.z),
                normal,
                distance: hit.time_of_impact,
                entity: brush.entity,
            });
        }

        closest
    }

    /// Пересекается ли капсула (центр `center`) с геометрией маски
    pub fn overlap_capsule(
        &self,
        center: Vec3,
        half_height: f32,
        radius: f32,
        mask: LayerMask,
    ) -> bool {
        let capsule = capsule_y(half_height, radius);
        let iso = isometry(center, Quat::IDENTITY);

        self.iter_masked(mask).any(|brush| {
            intersection_test(&iso, &capsule, &brush.iso, &brush.cuboid).unwrap_or(false)
        })
    }

    /// Пересекается ли сфера с геометрией маски (sphere-режим ground probe)
    pub fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> bool {
        let ball = Ball::new(radius.max(0.01));
        let iso = isometry(center, Quat::IDENTITY);

        self.iter_masked(mask).any(|brush| {
            intersection_test(&iso, &ball, &brush.iso, &brush.cuboid).unwrap_or(false)
        })
    }

    /// Kinematic move капсулы: пер-осевое разрешение (X, Z, затем Y).
    ///
    /// Заблокированная ось даёт контактный флаг (BELOW/ABOVE для Y по знаку
    /// дельты, SIDES для горизонтали). Свободное движение применяется точно,
    /// без потерь — бинарный поиск включается только при реальном контакте.
    pub fn move_capsule(
        &self,
        center: Vec3,
        delta: Vec3,
        half_height: f32,
        radius: f32,
        mask: LayerMask,
    ) -> CapsuleMove {
        let mut flags = ContactFlags::default();

        if self.overlap_capsule(center, half_height, radius, mask) {
            return CapsuleMove {
                position: center,
                flags,
                started_in_solid: true,
            };
        }

        let mut position = center;

        // Горизонталь раньше вертикали: ground-stick не должен съедать strafe
        let axes = [
            (Vec3::X, delta.x, ContactFlags::SIDES),
            (Vec3::Z, delta.z, ContactFlags::SIDES),
            (
                Vec3::Y,
                delta.y,
                if delta.y < 0.0 {
                    ContactFlags::BELOW
                } else {
                    ContactFlags::ABOVE
                },
            ),
        ];

        for (axis, amount, flag) in axes {
            if amount.abs() < f32::EPSILON {
                continue;
            }

            // Сэмплируем путь с шагом не больше радиуса — длинная дельта не
            // туннелирует сквозь тонкую геометрию
            let steps = (amount.abs() / radius.max(0.05)).ceil().max(1.0) as u32;
            let mut blocked: Option<(f32, f32)> = None;
            for k in 1..=steps {
                let fraction = k as f32 / steps as f32;
                let sample = position + axis * amount * fraction;
                if self.overlap_capsule(sample, half_height, radius, mask) {
                    blocked = Some(((k - 1) as f32 / steps as f32, fraction));
                    break;
                }
            }

            let Some((mut lo, mut hi)) = blocked else {
                position += axis * amount;
                continue;
            };

            // Контакт: бинарный поиск максимальной свободной фракции
            for _ in 0..SWEEP_ITERATIONS {
                let mid = 0.5 * (lo + hi);
                if self.overlap_capsule(position + axis * amount * mid, half_height, radius, mask)
                {
                    hi = mid;
                } else {
                    lo = mid;
                }
            }

            // Отступаем на SKIN от поверхности
            let step = amount * lo;
            let backed = step - SKIN.min(step.abs()).copysign(amount);
            position += axis * backed;
            flags.set(flag);
        }

        CapsuleMove {
            position,
            flags,
            started_in_solid: false,
        }
    }
}

//! Moving-platform tracker.
//!
//! Персонаж едет на kinematic-платформе, не занося её скорость в velocity
//! locomotion (иначе ломается математика прыжка/гравитации): каждый тик
//! дельта платформы применяется поверх собственного движения персонажа.
//!
//! Порядок внутри тика: применить дельту (если прикреплены) → probe →
//! attach/resample или отвал. Потерянная платформа переобнаруживается не
//! позднее следующего тика, застарелое состояние привязки не читается.

use bevy::prelude::*;

use crate::collision::{CollisionWorld, LayerMask};
use crate::components::CharacterBody;
use crate::math::yaw_component;
use crate::module::ModuleState;

/// Платформа: динамический box-коллайдер, двигается хостом через Transform
#[derive(Component, Debug, Clone)]
pub struct Platform {
    pub half_extents: Vec3,
    pub layers: LayerMask,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            half_extents: Vec3::new(2.0, 0.25, 2.0),
            layers: LayerMask::PLATFORM,
        }
    }
}

/// Трекер привязки персонажа к платформе
#[derive(Component, Debug, Clone)]
pub struct PlatformTracker {
    pub module: ModuleState,

    /// Дальность probe вниз — заметно короче locomotion ground probe
    pub probe_distance: f32,
    /// Максимальный наклон опоры от вертикали (градусы); круче — detach
    pub max_slope_deg: f32,
    /// Дельты меньше порога применяются сырым сдвигом, без collision move
    pub noise_threshold: f32,
    /// Слои probe (тот же ground-набор, что у locomotion)
    pub probe_layers: LayerMask,
    /// Маска твёрдого для collision-aware переноса
    pub move_mask: LayerMask,

    /// Текущая платформа (None = не прикреплены)
    pub platform: Option<Entity>,
    /// Позиция персонажа в локальных координатах платформы
    pub local_point: Vec3,
    /// Поворот персонажа относительно платформы
    pub local_rotation: Quat,
    /// Мировая позиция/поворот персонажа на момент последнего сэмпла
    pub last_global_point: Vec3,
    pub last_global_rotation: Quat,
}

impl Default for PlatformTracker {
    fn default() -> Self {
        Self {
            module: ModuleState::default(),
            probe_distance: 0.08,
            max_slope_deg: 30.0,
            noise_threshold: 0.001,
            probe_layers: LayerMask::MASK_WALKABLE,
            move_mask: LayerMask::MASK_SOLID,
            platform: None,
            local_point: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            last_global_point: Vec3::ZERO,
            last_global_rotation: Quat::IDENTITY,
        }
    }
}

impl PlatformTracker {
    /// Сэмпл локальной привязки к платформе (и мировой базы для дельт)
    fn sample(&mut self, platform: Entity, platform_tf: &Transform, character_tf: &Transform) {
        self.platform = Some(platform);
        self.local_point = platform_tf
            .rotation
            .inverse()
            .mul_vec3(character_tf.translation - platform_tf.translation);
        self.local_rotation = platform_tf.rotation.inverse() * character_tf.rotation;
        self.last_global_point = character_tf.translation;
        self.last_global_rotation = character_tf.rotation;
    }

    fn detach(&mut self) {
        self.platform = None;
    }
}

/// Система: пересинхронизация динамических коллайдеров платформ (SimSet::Sync)
pub fn sync_platform_colliders(
    mut world: ResMut<CollisionWorld>,
    query: Query<(Entity, &Transform, &Platform)>,
) {
    world.clear_dynamic();
    for (entity, transform, platform) in query.iter() {
        world.push_dynamic(
            entity,
            transform.translation,
            transform.rotation,
            platform.half_extents,
            platform.layers,
        );
    }
}

/// Система: one-shot инициализация трекера (SimSet::Init)
pub fn initialize_platform_tracker(mut query: Query<&mut PlatformTracker>) {
    for mut tracker in query.iter_mut() {
        if tracker.module.is_initialized() || tracker.module.is_failed() {
            continue;
        }

        let validation = if tracker.probe_layers.is_empty() {
            Err("platform probe layer mask is empty".to_string())
        } else if tracker.probe_distance <= 0.0 {
            Err("platform probe distance must be positive".to_string())
        } else {
            Ok(())
        };
        tracker.module.initialize("platform_tracker", validation);
    }
}

/// Система: platform tracking (SimSet::Platform, сразу после locomotion move)
pub fn update_platform_tracker(
    world: Res<CollisionWorld>,
    mut characters: Query<
        (&mut Transform, &mut PlatformTracker, &CharacterBody),
        Without<Platform>,
    >,
    platforms: Query<&Transform, With<Platform>>,
) {
    for (mut transform, mut tracker, body) in characters.iter_mut() {
        if !tracker.module.guard("platform_tracker") {
            continue;
        }

        let max_slope_cos = tracker.max_slope_deg.to_radians().cos();

        // Фаза 1: применить дельту платформы, если прикреплены
        if let Some(platform) = tracker.platform {
            match platforms.get(platform) {
                Ok(platform_tf) => {
                    let platform_up = platform_tf.rotation * Vec3::Y;
                    if platform_up.dot(Vec3::Y) < max_slope_cos {
                        // Платформа накренилась круче лимита — отвал,
                        // частичную коррекцию не пытаемся делать
                        tracker.detach();
                    } else {
                        // Перенос: куда уехала сэмпленная локальная точка
                        let new_point = platform_tf.translation
                            + platform_tf.rotation.mul_vec3(tracker.local_point);
                        let delta = new_point - tracker.last_global_point;

                        if delta.length_squared() > 0.0 {
                            if delta.length() <= tracker.noise_threshold {
                                // Суб-миллиметровый шум: collision move не
                                // окупается, сырой сдвиг неотличим визуально
                                transform.translation += delta;
                            } else {
                                let center = body.capsule_center(transform.translation);
                                let result = world.move_capsule(
                                    center,
                                    delta,
                                    body.half_height(),
                                    body.radius,
                                    tracker.move_mask,
                                );
                                if !result.started_in_solid {
                                    transform.translation = result.position - body.center;
                                }
                            }
                        }

                        // Поворот: только yaw-компонента дельты (банкование
                        // не заваливает персонажа)
                        let new_rotation = platform_tf.rotation * tracker.local_rotation;
                        let rotation_delta =
                            new_rotation * tracker.last_global_rotation.inverse();
                        let yaw_delta = yaw_component(rotation_delta);
                        if yaw_delta != Quat::IDENTITY {
                            transform.rotation = yaw_delta * transform.rotation;
                        }
                    }
                }
                // Платформа удалена хостом
                Err(_) => tracker.detach(),
            }
        }

        // Фаза 2: probe вниз — подтверждение/пересэмпл или отвал + re-attach
        let inset = 0.05;
        let hit = world.raycast(
            transform.translation + Vec3::Y * inset,
            Vec3::NEG_Y,
            inset + tracker.probe_distance,
            tracker.probe_layers,
        );

        match hit {
            Some(hit) if hit.normal.dot(Vec3::Y) >= max_slope_cos => {
                match hit.entity.and_then(|e| platforms.get(e).ok().map(|tf| (e, tf))) {
                    Some((platform_entity, platform_tf)) => {
                        // Attach или пересэмпл каждый тик, пока опора жива
                        let platform_tf = *platform_tf;
                        tracker.sample(platform_entity, &platform_tf, &transform);
                    }
                    // Статичная опора — привязка не нужна
                    None => tracker.detach(),
                }
            }
            _ => tracker.detach(),
        }
    }
}

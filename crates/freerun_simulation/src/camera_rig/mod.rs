//! Camera rig: mouse-look со сглаживанием и клампом, split head/body,
//! recoil, Perlin-тряска, принудительный look-at.
//!
//! Углы хранятся в градусах. Pitch — на X головы (положительный = вверх),
//! yaw — на Y тела. Yaw применяется к телу ДЕЛЬТОЙ, чтобы компоноваться с
//! поворотом от platform tracker'а, а не затирать его.
//!
//! Итоговая поза головы публикуется в head_local_rotation/position —
//! хост копирует её на реальный camera node (strategic/tactical split).

pub mod noise;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::InputSnapshot;
use crate::locomotion::LocomotionSummary;
use crate::math::{delta_angle_deg, smooth_damp};
use crate::module::ModuleState;

pub use noise::PerlinNoise;

/// Тюнинг camera rig
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Чувствительность по yaw (X мыши)
    pub sensitivity_x: f32,
    /// Чувствительность по pitch (Y мыши)
    pub sensitivity_y: f32,

    pub invert_x: bool,
    pub invert_y: bool,

    /// Кламп pitch (градусы): minimum_x — вниз, maximum_x — вверх
    pub minimum_x: f32,
    pub maximum_x: f32,

    /// Время сглаживания look (SmoothDamp, сек; 0 = мгновенно)
    pub look_damping: f32,

    /// Yaw копится только на голове, тело не вращается
    pub rotate_camera_only: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            sensitivity_x: 2.0,
            sensitivity_y: 2.0,
            invert_x: false,
            invert_y: false,
            minimum_x: -80.0,
            maximum_x: 80.0,
            look_damping: 0.03,
            rotate_camera_only: false,
        }
    }
}

/// Событие: тряска камеры закончилась (ровно один раз на переход)
#[derive(Event, Debug, Clone, Copy)]
pub struct ShakeFinished {
    pub entity: Entity,
}

/// Состояние camera rig
#[derive(Component, Debug, Clone, Default)]
pub struct CameraRig {
    pub module: ModuleState,

    /// Целевые и сглаженные углы головы (pitch на X) и тела (yaw на Y)
    pub target_head_angles: Vec3,
    pub follow_head_angles: Vec3,
    pub target_body_angles: Vec3,
    pub follow_body_angles: Vec3,

    /// Внутренние скорости SmoothDamp
    pub head_velocity: Vec3,
    pub body_velocity: Vec3,

    /// Последний применённый к телу yaw (для дельта-применения)
    pub last_applied_body_yaw: f32,

    /// Recoil: текущая величина (градусы) и скорость линейного спада
    pub recoil: f32,
    pub recoil_rate: f32,

    /// Shake
    pub shake_active: bool,
    pub shake_frequency: f32,
    pub shake_magnitude: f32,
    pub shake_magnitude_full: f32,
    pub shake_duration: f32,
    pub shake_elapsed: f32,
    pub noise: PerlinNoise,

    /// Force look
    pub force_looking: bool,
    pub force_strength: f32,
    pub force_target: Option<Entity>,
    pub force_point: Vec3,
    force_was_active: bool,

    /// Выход для хоста: локальная поза camera head
    pub head_local_rotation: Quat,
    pub head_local_position: Vec3,
}

impl CameraRig {
    /// Кик отдачи: `amount` градусов вверх, линейный спад за `decay_time` сек
    pub fn apply_recoil(&mut self, amount: f32, decay_time: f32) {
        self.recoil = amount.max(0.0);
        self.recoil_rate = if decay_time > 0.0 {
            self.recoil / decay_time
        } else {
            f32::INFINITY
        };
    }

    /// Запуск тряски камеры
    pub fn camera_shake(&mut self, frequency: f32, magnitude: f32, duration: f32) {
        self.shake_active = duration > 0.0;
        self.shake_frequency = frequency;
        self.shake_magnitude_full = magnitude;
        self.shake_magnitude = magnitude;
        self.shake_duration = duration;
        self.shake_elapsed = 0.0;
    }

    /// Синхронный сброс тряски (без события — тряску остановили, не доиграли)
    pub fn stop_shake(&mut self) {
        self.shake_active = false;
        self.shake_magnitude = 0.0;
    }

    /// Принудительный взгляд на мировую точку; strength 0 = мгновенно
    pub fn force_look_at_point(&mut self, point: Vec3, strength: f32) {
        self.force_looking = true;
        self.force_strength = strength.max(0.0);
        self.force_target = None;
        self.force_point = point;
    }

    /// Принудительный взгляд на трекаемый entity
    pub fn force_look_at_entity(&mut self, target: Entity, strength: f32) {
        self.force_looking = true;
        self.force_strength = strength.max(0.0);
        self.force_target = Some(target);
    }

    /// Выключение force look; free look продолжится без рывка
    pub fn stop_force_look(&mut self) {
        self.force_looking = false;
        self.force_target = None;
    }
}

/// Система: one-shot инициализация rig (SimSet::Init).
/// Perlin-таблица тряски сеется из детерминированного RNG симуляции.
pub fn initialize_camera_rig(
    mut rng: ResMut<crate::DeterministicRng>,
    mut query: Query<(&mut CameraRig, &CameraConfig)>,
) {
    for (mut rig, cfg) in query.iter_mut() {
        if rig.module.is_initialized() || rig.module.is_failed() {
            continue;
        }

        let validation = if cfg.minimum_x >= cfg.maximum_x {
            Err("pitch clamp is inverted (minimum_x >= maximum_x)".to_string())
        } else if cfg.look_damping < 0.0 {
            Err("look damping must be non-negative".to_string())
        } else {
            Ok(())
        };
        rig.module.initialize("camera_rig", validation);

        if rig.module.ready() {
            rig.noise = PerlinNoise::from_rng(&mut rng.rng);
            rig.head_local_rotation = Quat::IDENTITY;
        }
    }
}

/// Система: camera rig per-tick (SimSet::Camera, после locomotion)
pub fn update_camera_rig(
    time: Res<Time<Fixed>>,
    mut shake_events: EventWriter<ShakeFinished>,
    mut query: Query<(
        Entity,
        &mut Transform,
        &mut CameraRig,
        &CameraConfig,
        &InputSnapshot,
        &LocomotionSummary,
    )>,
    targets: Query<&Transform, Without<CameraRig>>,
) {
    let dt = time.delta_secs();

    for (entity, mut transform, mut rig, cfg, input, summary) in query.iter_mut() {
        if !rig.module.guard("camera_rig") {
            continue;
        }

        // Recoil: линейный возврат к нулю
        if rig.recoil > 0.0 {
            rig.recoil = (rig.recoil - rig.recoil_rate * dt).max(0.0);
        }

        if rig.force_looking {
            // Точка интереса: трекаемый entity приоритетнее статичной точки
            let target_point = rig
                .force_target
                .and_then(|e| targets.get(e).ok())
                .map(|tf| tf.translation)
                .unwrap_or(rig.force_point);

            let eye = transform.translation + Vec3::Y * summary.eye_height;
            let dir = target_point - eye;
            let horizontal_len = Vec2::new(dir.x, dir.z).length();

            if dir.length_squared() > 1e-8 {
                // atan2 по горизонтальной дистанции корректно держит знак
                // pitch и для целей позади персонажа
                let desired_pitch = dir.y.atan2(horizontal_len).to_degrees();
                let desired_yaw = (-dir.x).atan2(-dir.z).to_degrees();

                rig.target_head_angles.x =
                    desired_pitch.clamp(cfg.minimum_x, cfg.maximum_x);
                // Ближайший эквивалентный yaw — без лишнего полного оборота
                rig.target_body_angles.y = rig.follow_body_angles.y
                    + delta_angle_deg(rig.follow_body_angles.y, desired_yaw);
            }

            if rig.force_strength <= 0.0 {
                // Мгновенный snap
                rig.follow_head_angles.x = rig.target_head_angles.x;
                rig.follow_body_angles.y = rig.target_body_angles.y;
                rig.head_velocity.x = 0.0;
                rig.body_velocity.y = 0.0;
            } else {
                let strength = rig.force_strength;
                rig.follow_head_angles.x = smooth_damp(
                    rig.follow_head_angles.x,
                    rig.target_head_angles.x,
                    &mut rig.head_velocity.x,
                    strength,
                    dt,
                );
                rig.follow_body_angles.y = smooth_damp(
                    rig.follow_body_angles.y,
                    rig.target_body_angles.y,
                    &mut rig.body_velocity.y,
                    strength,
                    dt,
                );
            }
            rig.force_was_active = true;
        } else {
            if rig.force_was_active {
                // Выход из force look: ресид акумуляторов с фактических
                // углов, чтобы free look продолжился без видимого рывка
                rig.target_head_angles.x = rig.follow_head_angles.x;
                rig.target_body_angles.y = rig.follow_body_angles.y;
                rig.head_velocity.x = 0.0;
                rig.body_velocity.y = 0.0;
                rig.force_was_active = false;
            }

            // Free look
            let mut look = input.look_delta;
            if cfg.invert_x {
                look.x = -look.x;
            }
            if cfg.invert_y {
                look.y = -look.y;
            }

            rig.target_head_angles.x = (rig.target_head_angles.x
                + look.y * cfg.sensitivity_y)
                .clamp(cfg.minimum_x, cfg.maximum_x);
            rig.target_body_angles.y += look.x * cfg.sensitivity_x;

            let damping = cfg.look_damping;
            rig.follow_head_angles.x = smooth_damp(
                rig.follow_head_angles.x,
                rig.target_head_angles.x,
                &mut rig.head_velocity.x,
                damping,
                dt,
            );
            rig.follow_body_angles.y = smooth_damp(
                rig.follow_body_angles.y,
                rig.target_body_angles.y,
                &mut rig.body_velocity.y,
                damping,
                dt,
            );
        }

        // Защитный кламп pitch независимо от пути выше
        rig.follow_head_angles.x =
            rig.follow_head_angles.x.clamp(cfg.minimum_x, cfg.maximum_x);

        // Yaw тела — дельтой, компонуется с поворотом платформы
        if !cfg.rotate_camera_only {
            let yaw_delta = rig.follow_body_angles.y - rig.last_applied_body_yaw;
            if yaw_delta.abs() > 0.0 {
                transform.rotate_y(yaw_delta.to_radians());
                rig.last_applied_body_yaw = rig.follow_body_angles.y;
            }
        }

        // Поза головы: pitch + recoil (recoil кикает вверх)
        let pitch = (rig.follow_head_angles.x + rig.recoil)
            .clamp(cfg.minimum_x, cfg.maximum_x + 45.0);
        let mut head_rotation = if cfg.rotate_camera_only {
            Quat::from_rotation_y(rig.follow_body_angles.y.to_radians())
                * Quat::from_rotation_x(pitch.to_radians())
        } else {
            Quat::from_rotation_x(pitch.to_radians())
        };

        // Shake: затухающий Perlin поверх позы головы
        if rig.shake_active {
            rig.shake_elapsed += dt;
            if rig.shake_elapsed >= rig.shake_duration {
                rig.shake_active = false;
                rig.shake_magnitude = 0.0;
                // Ровно одно уведомление на переход shaking → not shaking
                shake_events.write(ShakeFinished { entity });
            } else {
                rig.shake_magnitude = rig.shake_magnitude_full
                    * (1.0 - rig.shake_elapsed / rig.shake_duration);
                let t = rig.shake_elapsed * rig.shake_frequency;
                // Пер-осевые сдвиги декоррелируют оси на одной шкале времени
                let shake = Vec3::new(
                    rig.noise.sample(t) * rig.shake_magnitude,
                    rig.noise.sample(t + 17.3) * rig.shake_magnitude,
                    rig.noise.sample(t + 31.7) * rig.shake_magnitude,
                );
                head_rotation = head_rotation
                    * Quat::from_euler(
                        EulerRot::YXZ,
                        shake.y.to_radians(),
                        shake.x.to_radians(),
                        shake.z.to_radians(),
                    );
            }
        }

        rig.head_local_rotation = head_rotation;
        rig.head_local_position = Vec3::Y * summary.eye_height;
    }
}

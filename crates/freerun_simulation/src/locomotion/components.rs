//! Locomotion компоненты: конфиг, состояние, итог тика

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::collision::LayerMask;
use crate::module::ModuleState;

/// Тройка скоростей походки (units/sec)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MovementSpeeds {
    pub forward: f32,
    pub sideways: f32,
    pub backward: f32,
}

impl MovementSpeeds {
    pub const fn new(forward: f32, sideways: f32, backward: f32) -> Self {
        Self {
            forward,
            sideways,
            backward,
        }
    }
}

/// Триггер "бег активен" — общий словарь для stamina drain и FOV kick,
/// чтобы расход стамины и кик поля зрения включались синхронно
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunTrigger {
    /// Только флаг locomotion.is_running этого тика
    #[default]
    Running,
    /// Флаг is_running И удержание кнопки бега
    RunningAndHeld,
}

/// Режим кнопки бега
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    #[default]
    Hold,
    Toggle,
}

/// Режим кнопки приседа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrouchMode {
    #[default]
    Hold,
    Toggle,
}

/// Стратегия ground probe (выбирается один раз на старте, без cfg-флагов)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroundProbeKind {
    /// Короткий луч вниз от точки опоры
    #[default]
    Ray,
    /// Сфера чуть ниже капсулы (надёжнее на кромках)
    Sphere,
}

/// Тюнинг locomotion. Все значения метрические (метры, секунды).
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct LocomotionConfig {
    pub walk_speeds: MovementSpeeds,
    pub run_speeds: MovementSpeeds,
    pub crouch_speeds: MovementSpeeds,

    /// Время сглаживания directional input (SmoothDamp, сек)
    pub acceleration: f32,

    /// Модуль гравитации (знак применяется явно)
    pub gravity: f32,

    /// Высота прыжка (м); стартовая скорость = sqrt(2*h*g)
    pub jump_height: f32,

    /// Разрешены ли прыжки в воздухе
    pub air_jump: bool,
    /// Лимит air-прыжков за один airborne-период
    pub air_jumps_amount: u32,

    /// Глобальные разрешения
    pub allow_movement: bool,
    pub allow_jumping: bool,
    pub allow_running: bool,
    pub allow_crouching: bool,
    /// Можно ли прыгать из приседа
    pub allow_crouch_jumping: bool,

    pub run_mode: RunMode,
    pub crouch_mode: CrouchMode,

    /// Прижим к земле (m/s, 0 = выключен) — гасит подпрыгивание на спусках
    pub ground_stick: f32,

    pub ground_probe: GroundProbeKind,
    /// Дальность ground probe от точки опоры (м)
    pub ground_probe_distance: f32,
    /// Слои, считающиеся опорой
    pub ground_layers: LayerMask,
    /// Слои, твёрдые для движения капсулы
    pub move_mask: LayerMask,

    /// Присед: высоты капсулы и глаз, время перехода
    pub standing_height: f32,
    pub crouch_height: f32,
    pub standing_eye_height: f32,
    pub crouch_eye_height: f32,
    pub crouch_time: f32,

    /// Стоимость прыжка в стамине (0 = прыжок не гейтится)
    pub jump_stamina_cost: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            walk_speeds: MovementSpeeds::new(4.0, 3.0, 2.0),
            run_speeds: MovementSpeeds::new(8.0, 6.0, 4.0),
            crouch_speeds: MovementSpeeds::new(2.0, 2.0, 1.5),
            acceleration: 0.1,
            gravity: 20.0,
            jump_height: 1.2,
            air_jump: false,
            air_jumps_amount: 1,
            allow_movement: true,
            allow_jumping: true,
            allow_running: true,
            allow_crouching: true,
            allow_crouch_jumping: false,
            run_mode: RunMode::Hold,
            crouch_mode: CrouchMode::Hold,
            ground_stick: 2.0,
            ground_probe: GroundProbeKind::Ray,
            ground_probe_distance: 0.15,
            ground_layers: LayerMask::MASK_WALKABLE,
            move_mask: LayerMask::MASK_SOLID,
            standing_height: 1.8,
            crouch_height: 1.0,
            standing_eye_height: 1.65,
            crouch_eye_height: 0.9,
            crouch_time: 0.25,
            jump_stamina_cost: 0.0,
        }
    }
}

/// Состояние locomotion state machine.
///
/// Инварианты:
/// - в воздухе активен максимум один из {is_jumping, is_falling},
///   на земле оба false;
/// - air_jumps_used сбрасывается только при приземлении.
#[derive(Component, Debug, Clone, Default)]
pub struct Locomotion {
    pub module: ModuleState,

    /// World-space скорость (y — вертикаль)
    pub velocity: Vec3,

    pub is_grounded: bool,
    pub is_running: bool,
    pub is_jumping: bool,
    pub is_falling: bool,
    pub is_crouching: bool,

    pub air_jumps_used: u32,

    /// Интерполированная высота глаз (зависит от приседа)
    pub current_eye_height: f32,

    /// Сглаженный directional input, |v| <= 1
    pub move_input_smoothed: Vec2,
    /// Внутреннее состояние SmoothDamp
    pub smooth_velocity: Vec2,

    /// Состояние toggle-бега (RunMode::Toggle)
    pub run_toggled: bool,

    /// Нормаль опоры последнего ground probe
    pub ground_normal: Vec3,
    /// Entity опоры (динамический коллайдер), если есть
    pub ground_entity: Option<Entity>,
}

/// Итог locomotion за текущий тик — то, что читают stamina gate, camera rig,
/// FOV kick и внешние подписчики (оружие/аудио/HUD). Стабилен до конца тика.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct LocomotionSummary {
    pub is_grounded: bool,
    pub is_running: bool,
    pub is_jumping: bool,
    pub is_falling: bool,
    pub is_crouching: bool,
    /// Высота глаз для camera rig
    pub eye_height: f32,
    /// Горизонтальный forward тела
    pub body_forward: Vec3,
}

//! FREERUN Simulation Core
//!
//! Локомоция персонажа от первого лица + camera rig как headless
//! ECS-симуляция на Bevy 0.16. Ядро владеет стейтовой, численно-чувствительной
//! работой: ground detection, интеграция скорости/гравитации, прыжки,
//! присед, привязка к движущимся платформам, stamina gate, look/recoil/
//! shake/force-look и FOV kick.
//!
//! HYBRID ARCHITECTURE:
//! - ECS = simulation layer (state machines, интеграция, инварианты)
//! - Хост = tactical layer (рендер, девайс-input, реальные camera nodes)
//!
//! Хост каждый кадр заполняет InputSnapshot и двигает платформы, ядро
//! выполняет фиксированный порядок модулей в FixedUpdate, хост читает
//! LocomotionSummary / CameraRig.head_local_* / FovKick.current_fov.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod camera_rig;
pub mod collision;
pub mod components;
pub mod fov;
pub mod locomotion;
pub mod math;
pub mod module;
pub mod platform;
pub mod stamina;

// Re-export базовых типов для удобства
pub use camera_rig::{CameraConfig, CameraRig, PerlinNoise, ShakeFinished};
pub use collision::{CollisionWorld, ContactFlags, LayerMask};
pub use components::*;
pub use fov::FovKick;
pub use locomotion::*;
pub use module::{ModuleState, SimSet};
pub use platform::{Platform, PlatformTracker};
pub use stamina::Stamina;

/// Главный plugin симуляции (объединяет все модули в один fixed-order тик)
///
/// Порядок — жёсткий контракт: locomotion раньше камеры (FOV kick и stamina
/// drain читают свежий is_running), platform tracker сразу после движения
/// locomotion (иначе дельта платформы либо затирается, либо опаздывает на
/// тик на кромках платформ).
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .init_resource::<CollisionWorld>()
            // Детерминистичный RNG (seed по умолчанию; headless задаёт свой)
            .insert_resource(DeterministicRng::new(42))
            .add_event::<ShakeFinished>()
            .configure_sets(
                FixedUpdate,
                (
                    SimSet::Sync,
                    SimSet::Init,
                    SimSet::Locomotion,
                    SimSet::Platform,
                    SimSet::Stamina,
                    SimSet::Camera,
                    SimSet::Fov,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    components::latch_input_edges,
                    platform::sync_platform_colliders,
                )
                    .in_set(SimSet::Sync),
            )
            .add_systems(
                FixedUpdate,
                (
                    locomotion::initialize_locomotion,
                    stamina::initialize_stamina,
                    platform::initialize_platform_tracker,
                    camera_rig::initialize_camera_rig,
                    fov::initialize_fov_kick,
                )
                    .in_set(SimSet::Init),
            )
            .add_systems(
                FixedUpdate,
                locomotion::update_locomotion.in_set(SimSet::Locomotion),
            )
            .add_systems(
                FixedUpdate,
                platform::update_platform_tracker.in_set(SimSet::Platform),
            )
            .add_systems(
                FixedUpdate,
                stamina::update_stamina_gate.in_set(SimSet::Stamina),
            )
            .add_systems(
                FixedUpdate,
                camera_rig::update_camera_rig.in_set(SimSet::Camera),
            )
            .add_systems(FixedUpdate, fov::update_fov_kick.in_set(SimSet::Fov));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .add_plugins(SimulationPlugin)
        .insert_resource(DeterministicRng::new(seed));

    app
}

/// Прогнать ровно один fixed-тик с заданным dt.
///
/// Тесты и headless runner управляют временем сами: advance часов + прямой
/// запуск FixedUpdate, без зависимости от wall-clock.
pub fn step_fixed(app: &mut App, dt: f32) {
    {
        let mut time = app.world_mut().resource_mut::<Time<Fixed>>();
        time.advance_by(std::time::Duration::from_secs_f32(dt));
    }
    app.world_mut().run_schedule(FixedUpdate);
}

/// Spawn-хелпер: персонаж с полным набором модулей и дефолтным тюнингом.
///
/// Кастомный тюнинг — вставить свои конфиги поверх до первого тика.
pub fn spawn_character(commands: &mut Commands, position: Vec3) -> Entity {
    commands
        .spawn((
            Transform::from_translation(position),
            Player,
            InputSnapshot::default(),
            CharacterBody::default(),
            LocomotionConfig::default(),
            Locomotion::default(),
            LocomotionSummary::default(),
            Stamina::default(),
            PlatformTracker::default(),
            CameraConfig::default(),
            CameraRig::default(),
            FovKick::default(),
        ))
        .id()
}

/// Snapshot мира для сравнения детерминизма
/// (Debug-формат компонентов, отсортированный по Entity)
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

// ============================================================================
// Global logger (pluggable, потокобезопасный)
// ============================================================================

use once_cell::sync::Lazy;
use std::sync::Mutex;

static LOGGER: Lazy<Mutex<Option<Box<dyn LogPrinter>>>> = Lazy::new(|| Mutex::new(None));

static LOGGER_LEVEL: Lazy<Mutex<LogLevel>> = Lazy::new(|| Mutex::new(LogLevel::Debug));

/// Уровень логирования (порядок = серьёзность)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Приёмник логов; хост подменяет на свой (консоль движка, файл)
pub trait LogPrinter: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

pub fn set_logger(logger: Box<dyn LogPrinter>) {
    *LOGGER.lock().unwrap() = Some(logger);
}

pub fn set_logger_if_needed(logger: Box<dyn LogPrinter>) {
    let mut slot = LOGGER.lock().unwrap();
    if slot.is_none() {
        *slot = Some(logger);
    }
}

pub fn set_log_level(level: LogLevel) {
    *LOGGER_LEVEL.lock().unwrap() = level;
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

pub fn log_with_level(level: LogLevel, message: &str) {
    // Фильтр по уровню, timestamp добавляем здесь, не в принтере
    if level < *LOGGER_LEVEL.lock().unwrap() {
        return;
    }
    if let Some(logger) = LOGGER.lock().unwrap().as_ref() {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        logger.log(level, &format!("[{}] {}", timestamp, message));
    }
}

struct ConsoleLogger;

impl LogPrinter for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_str(), message);
    }
}

pub fn init_logger() {
    set_logger_if_needed(Box::new(ConsoleLogger));
}

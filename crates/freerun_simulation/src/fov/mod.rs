//! Field-of-view kick: расширение FOV на бегу.
//!
//! Бинарная политика поверх run-флага locomotion (словарь триггеров общий со
//! stamina gate — кик и расход стамины включаются синхронно). Вся динамика
//! непрерывная: экспоненциальная интерполяция к цели, разные скорости входа
//! и возврата. Текущий FOV читает хост и выставляет на реальную камеру.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{Buttons, InputSnapshot};
use crate::locomotion::{LocomotionSummary, RunTrigger};
use crate::module::ModuleState;

/// FOV kick: состояние + тюнинг
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct FovKick {
    #[serde(skip)]
    pub module: ModuleState,

    pub enabled: bool,

    /// Базовый FOV (градусы), задаётся хостом один раз
    pub base_fov: f32,
    /// Прибавка на бегу
    pub kick_amount: f32,
    /// Скорость входа в кик (1/сек)
    pub lerp_in: f32,
    /// Скорость возврата (1/сек)
    pub lerp_out: f32,

    pub trigger: RunTrigger,

    /// Захваченный при инициализации исходный FOV
    pub original_fov: f32,
    /// Живое значение — его читает хост
    pub current_fov: f32,
}

impl Default for FovKick {
    fn default() -> Self {
        Self {
            module: ModuleState::default(),
            enabled: true,
            base_fov: 70.0,
            kick_amount: 10.0,
            lerp_in: 8.0,
            lerp_out: 6.0,
            trigger: RunTrigger::default(),
            original_fov: 0.0,
            current_fov: 0.0,
        }
    }
}

/// Система: one-shot инициализация FOV kick (SimSet::Init)
pub fn initialize_fov_kick(mut query: Query<&mut FovKick>) {
    for mut fov in query.iter_mut() {
        if fov.module.is_initialized() || fov.module.is_failed() {
            continue;
        }

        let validation = if fov.base_fov <= 0.0 {
            Err("base FOV must be positive".to_string())
        } else if fov.lerp_in < 0.0 || fov.lerp_out < 0.0 {
            Err("FOV lerp rates must be non-negative".to_string())
        } else {
            Ok(())
        };
        fov.module.initialize("fov_kick", validation);

        if fov.module.ready() {
            // Исходный FOV захватывается ровно один раз
            fov.original_fov = fov.base_fov;
            fov.current_fov = fov.base_fov;
        }
    }
}

/// Система: FOV kick per-tick (SimSet::Fov, читает is_running этого тика)
pub fn update_fov_kick(
    time: Res<Time<Fixed>>,
    mut query: Query<(&mut FovKick, &LocomotionSummary, &InputSnapshot)>,
) {
    let dt = time.delta_secs();

    for (mut fov, summary, input) in query.iter_mut() {
        if !fov.module.guard("fov_kick") {
            continue;
        }
        if !fov.enabled {
            continue;
        }

        let active = match fov.trigger {
            RunTrigger::Running => summary.is_running,
            RunTrigger::RunningAndHeld => summary.is_running && input.held(Buttons::RUN),
        };

        let target = if active {
            fov.original_fov + fov.kick_amount
        } else {
            fov.original_fov
        };
        let rate = if active { fov.lerp_in } else { fov.lerp_out };

        // Экспоненциальная интерполяция; шаг не перелетает цель
        let t = (rate * dt).min(1.0);
        fov.current_fov += (target - fov.current_fov) * t;

        // Защитный кламп в пределах [base, base+kick] (или наоборот при
        // отрицательном kick)
        let lo = fov.original_fov.min(fov.original_fov + fov.kick_amount);
        let hi = fov.original_fov.max(fov.original_fov + fov.kick_amount);
        fov.current_fov = fov.current_fov.clamp(lo, hi);
    }
}

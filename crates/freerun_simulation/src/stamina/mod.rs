//! Stamina gate — ресурс, гейтящий бег и (опционально) прыжки.
//!
//! - Drain при активном run-триггере (тот же флаг is_running, который
//!   locomotion посчитал в этом тике — gate выполняется после locomotion)
//! - Regen только после паузы regen_wait с момента последнего расхода
//! - Depleted-гистерезис: опустошённая стамина снова разрешает бег только
//!   после восстановления выше порога (без дребезга на нуле)
//!
//! Инвариант: 0 ≤ current ≤ max, 0 ≤ regen_wait_timer ≤ regen_wait.
//! Все значения кламплются каждый тик.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{Buttons, InputSnapshot};
use crate::locomotion::{LocomotionConfig, LocomotionSummary, RunTrigger};
use crate::module::ModuleState;

/// Выносливость персонажа: состояние + тюнинг
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct Stamina {
    #[serde(skip)]
    pub module: ModuleState,

    /// Гейт включён; false = бег/прыжки не ограничиваются
    pub enabled: bool,

    pub current: f32,
    pub max: f32,

    /// Расход при беге (units/sec)
    pub drain_rate: f32,
    /// Восстановление (units/sec)
    pub regen_rate: f32,
    /// Пауза перед восстановлением (сек)
    pub regen_wait: f32,
    /// Таймер паузы; regen начинается по достижении regen_wait
    pub regen_wait_timer: f32,

    /// Порог выхода из depleted-состояния
    pub recover_threshold: f32,
    /// Стамина опустошена — бег запрещён до восстановления
    pub depleted: bool,

    /// Условие расхода (общий словарь с FOV kick)
    pub drain_trigger: RunTrigger,
    /// Regen требует отпущенной кнопки бега
    pub regen_requires_release: bool,
}

impl Default for Stamina {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Stamina {
    pub fn new(max: f32) -> Self {
        Self {
            module: ModuleState::default(),
            enabled: true,
            current: max,
            max,
            drain_rate: 15.0,
            regen_rate: 10.0,
            regen_wait: 1.0,
            regen_wait_timer: 1.0,
            recover_threshold: max * 0.1,
            depleted: false,
            drain_trigger: RunTrigger::default(),
            regen_requires_release: true,
        }
    }

    pub fn can_afford(&self, cost: f32) -> bool {
        self.current >= cost
    }

    /// Разрешает ли стамина бег прямо сейчас
    pub fn allows_running(&self) -> bool {
        !self.enabled || (!self.depleted && self.current > 0.0)
    }

    /// Разовый расход (прыжок). Успех = хватило; любой расход сбрасывает
    /// паузу восстановления.
    pub fn try_consume(&mut self, cost: f32) -> bool {
        if !self.enabled {
            return true;
        }
        if !self.can_afford(cost) {
            return false;
        }
        self.current = (self.current - cost).max(0.0);
        self.regen_wait_timer = 0.0;
        if self.current <= 0.0 {
            self.depleted = true;
        }
        true
    }

    /// Непрерывный расход бега
    pub fn drain(&mut self, dt: f32) {
        self.current = (self.current - self.drain_rate * dt).max(0.0);
        self.regen_wait_timer = 0.0;
        if self.current <= 0.0 {
            self.depleted = true;
        }
    }

    /// Тик восстановления: сначала пауза заполняется до конца, регенерация
    /// начинается только со следующего тика после заполнения
    pub fn tick_regen(&mut self, dt: f32) {
        if self.regen_wait_timer < self.regen_wait {
            self.regen_wait_timer = (self.regen_wait_timer + dt).min(self.regen_wait);
        } else {
            self.current = (self.current + self.regen_rate * dt).min(self.max);
        }
        if self.depleted && self.current >= self.recover_threshold {
            self.depleted = false;
        }
    }

    /// Защитный кламп всех числовых полей
    pub fn clamp_all(&mut self) {
        self.current = self.current.clamp(0.0, self.max);
        self.regen_wait_timer = self.regen_wait_timer.clamp(0.0, self.regen_wait);
    }
}

/// Система: one-shot инициализация stamina gate (SimSet::Init)
pub fn initialize_stamina(mut query: Query<&mut Stamina>) {
    for mut stamina in query.iter_mut() {
        if stamina.module.is_initialized() || stamina.module.is_failed() {
            continue;
        }

        let validation = if stamina.max <= 0.0 {
            Err("max stamina must be positive".to_string())
        } else if stamina.drain_rate < 0.0 || stamina.regen_rate < 0.0 || stamina.regen_wait < 0.0
        {
            Err("stamina rates must be non-negative".to_string())
        } else {
            Ok(())
        };
        stamina.module.initialize("stamina", validation);

        if stamina.module.ready() {
            stamina.current = stamina.max;
            stamina.regen_wait_timer = stamina.regen_wait;
        }
    }
}

/// Система: stamina gate per-tick (SimSet::Stamina, после locomotion)
pub fn update_stamina_gate(
    time: Res<Time<Fixed>>,
    mut query: Query<(
        &mut Stamina,
        &LocomotionSummary,
        &InputSnapshot,
        &LocomotionConfig,
    )>,
) {
    let dt = time.delta_secs();

    for (mut stamina, summary, input, cfg) in query.iter_mut() {
        if !stamina.module.guard("stamina") {
            continue;
        }
        // Бег выключен глобально или гейт отключён — ничего не делаем
        if !stamina.enabled || !cfg.allow_running {
            continue;
        }

        let should_drain = match stamina.drain_trigger {
            RunTrigger::Running => summary.is_running,
            RunTrigger::RunningAndHeld => summary.is_running && input.held(Buttons::RUN),
        };

        if should_drain {
            stamina.drain(dt);
        } else {
            let eligible = !stamina.regen_requires_release || !input.held(Buttons::RUN);
            if eligible {
                stamina.tick_regen(dt);
            }
        }

        stamina.clamp_all();
    }
}

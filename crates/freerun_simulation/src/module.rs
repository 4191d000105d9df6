//! Lifecycle-контракт симуляционных модулей.
//!
//! Каждый модуль (locomotion, stamina, platform tracker, camera rig, FOV kick)
//! несёт ModuleState: одноразовая инициализация с валидацией конфига,
//! fail-safe при фатальной ошибке конфигурации, guard от вызова update до
//! инициализации.
//!
//! Порядок выполнения модулей фиксирован на этапе компиляции через SimSet —
//! никакого динамического диспатча, набор модулей известен заранее.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{log_error, log_warning};

/// Фазы одного simulation-тика (FixedUpdate, строго по порядку)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    /// Латч input-эджей, пересинхронизация динамических коллайдеров
    Sync,
    /// Инициализация модулей (one-shot, с валидацией конфигов)
    Init,
    /// Locomotion state machine + применение движения
    Locomotion,
    /// Platform tracker — сразу после движения locomotion
    Platform,
    /// Stamina gate — читает run-флаг этого тика
    Stamina,
    /// Camera rig (look, recoil, shake, force-look)
    Camera,
    /// FOV kick — читает is_running этого тика
    Fov,
}

/// Состояние lifecycle-контракта одного модуля
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModuleState {
    initialized: bool,
    failed: bool,
    misuse_logged: bool,
}

impl ModuleState {
    /// Одноразовая инициализация: валидация конфига, логирование фатальной
    /// ошибки. Повторные вызовы — no-op.
    pub fn initialize(&mut self, module_name: &str, validation: Result<(), String>) {
        if self.initialized || self.failed {
            return;
        }
        match validation {
            Ok(()) => {
                self.initialized = true;
            }
            Err(reason) => {
                // Fail-safe: модуль выключается, сессия продолжает жить
                self.failed = true;
                log_error(&format!(
                    "{}: fatal config error, module disabled: {}",
                    module_name, reason
                ));
            }
        }
    }

    /// Готов ли модуль выполнять per-tick работу
    #[inline]
    pub fn ready(&self) -> bool {
        self.initialized && !self.failed
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Guard для update-хуков: false = пропустить тик.
    /// Вызов до инициализации — programmer misuse, логируется один раз.
    pub fn guard(&mut self, module_name: &str) -> bool {
        if !self.initialized {
            if !self.failed && !self.misuse_logged {
                self.misuse_logged = true;
                log_warning(&format!(
                    "{}: update called before initialize, skipping",
                    module_name
                ));
            }
            return false;
        }
        !self.failed
    }
}

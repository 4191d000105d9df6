//! Логический input snapshot.
//!
//! Хост заполняет компонент каждый кадр (device mapping — не наша забота):
//! удержания кнопок, оси движения, look-дельта. Эджи (just_pressed /
//! just_released) латчит само ядро в начале тика — хосту достаточно
//! выставлять текущее состояние.
//!
//! Для headless-тестов input задаётся прямо через этот компонент.

use bevy::prelude::*;

/// Битсет логических кнопок
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buttons(pub u16);

impl Buttons {
    /// Прыжок
    pub const JUMP: u16 = 1 << 0;

    /// Бег (sprint)
    pub const RUN: u16 = 1 << 1;

    /// Присед
    pub const CROUCH: u16 = 1 << 2;

    #[inline]
    pub fn pressed(self, button: u16) -> bool {
        (self.0 & button) != 0
    }

    #[inline]
    pub fn press(&mut self, button: u16) {
        self.0 |= button;
    }

    #[inline]
    pub fn release(&mut self, button: u16) {
        self.0 &= !button;
    }
}

/// Input snapshot одного персонажа
#[derive(Component, Debug, Clone, Default)]
pub struct InputSnapshot {
    /// Оси движения: x = strafe (вправо +), y = вперёд/назад (вперёд +)
    pub move_axis: Vec2,

    /// Look-дельта за кадр (x = yaw, y = pitch вверх +)
    pub look_delta: Vec2,

    /// Текущие удержания кнопок (пишет хост)
    pub buttons: Buttons,

    prev_buttons: Buttons,
    just_pressed: Buttons,
    just_released: Buttons,
}

impl InputSnapshot {
    #[inline]
    pub fn held(&self, button: u16) -> bool {
        self.buttons.pressed(button)
    }

    /// Эдж нажатия этого тика (валиден после латча в SimSet::Sync)
    #[inline]
    pub fn just_pressed(&self, button: u16) -> bool {
        self.just_pressed.pressed(button)
    }

    /// Эдж отпускания этого тика
    #[inline]
    pub fn just_released(&self, button: u16) -> bool {
        self.just_released.pressed(button)
    }

    /// Латч эджей: сравнение с прошлым тиком. Вызывается ядром раз в тик.
    pub fn latch_edges(&mut self) {
        self.just_pressed = Buttons(self.buttons.0 & !self.prev_buttons.0);
        self.just_released = Buttons(self.prev_buttons.0 & !self.buttons.0);
        self.prev_buttons = self.buttons;
    }
}

/// Система: латч input-эджей в начале тика (SimSet::Sync)
pub fn latch_input_edges(mut query: Query<&mut InputSnapshot>) {
    for mut input in query.iter_mut() {
        input.latch_edges();
    }
}

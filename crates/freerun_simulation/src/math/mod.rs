//! Math helpers для движения и камеры
//!
//! Критически-демпфированное сглаживание (SmoothDamp), линейный move_toward,
//! работа с углами в градусах (камера хранит углы в градусах).

use bevy::prelude::*;

/// Критически-демпфированная пружина (SmoothDamp).
///
/// `smooth_time` — примерное время достижения цели (сек). `velocity` —
/// внутреннее состояние сглаживания, хранится вызывающей стороной между тиками.
/// `smooth_time <= 0` означает мгновенный snap (velocity сбрасывается).
pub fn smooth_damp(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    dt: f32,
) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    if smooth_time <= f32::EPSILON {
        *velocity = 0.0;
        return target;
    }

    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    // Паде-аппроксимация exp(-x), стабильна для больших dt
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    let mut output = target + (change + temp) * exp;

    // Защита от перелёта цели
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }

    output
}

/// SmoothDamp для Vec2 (покомпонентно, общий velocity-вектор)
pub fn smooth_damp_vec2(
    current: Vec2,
    target: Vec2,
    velocity: &mut Vec2,
    smooth_time: f32,
    dt: f32,
) -> Vec2 {
    Vec2::new(
        smooth_damp(current.x, target.x, &mut velocity.x, smooth_time, dt),
        smooth_damp(current.y, target.y, &mut velocity.y, smooth_time, dt),
    )
}

/// Линейное приближение к цели с ограничением шага
pub fn move_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(diff)
    }
}

/// Кратчайшая угловая разница в градусах, результат в (-180, 180]
pub fn delta_angle_deg(from: f32, to: f32) -> f32 {
    let mut delta = (to - from) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Yaw-составляющая кватерниона (twist вокруг мировой оси Y).
///
/// Используется platform tracker'ом: банкование платформы (крен/тангаж)
/// не должно заваливать персонажа, переносится только поворот вокруг up.
pub fn yaw_component(q: Quat) -> Quat {
    // Проекция векторной части на ось Y (swing-twist decomposition)
    let twist = Quat::from_xyzw(0.0, q.y, 0.0, q.w);
    if twist.length_squared() > 1e-10 {
        twist.normalize()
    } else {
        Quat::IDENTITY
    }
}

/// Yaw-угол кватерниона в градусах (вокруг Y)
pub fn yaw_deg(q: Quat) -> f32 {
    let twist = yaw_component(q);
    // Угол со знаком: forward -Z, положительный yaw поворачивает -Z к -X
    let angle = 2.0 * twist.w.clamp(-1.0, 1.0).acos();
    let signed = if twist.y >= 0.0 { angle } else { -angle };
    let mut deg = signed.to_degrees() % 360.0;
    if deg > 180.0 {
        deg -= 360.0;
    } else if deg <= -180.0 {
        deg += 360.0;
    }
    deg
}

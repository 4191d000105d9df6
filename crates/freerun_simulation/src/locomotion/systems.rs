//! Locomotion state machine: per-tick системы.
//!
//! Порядок внутри тика (спецификация движения):
//! ground query → input smoothing → вертикальная интеграция → горизонтальная
//! интеграция → прыжок → присед → применение движения капсулой. Platform
//! tracker выполняется следующей системой в цепочке, сразу после движения.

use bevy::prelude::*;

use crate::collision::CollisionWorld;
use crate::components::{Buttons, CharacterBody, InputSnapshot};
use crate::math::{move_toward, smooth_damp_vec2};
use crate::stamina::Stamina;

use super::components::{
    CrouchMode, GroundProbeKind, Locomotion, LocomotionConfig, LocomotionSummary, RunMode,
};

/// Результат ground probe
struct GroundHit {
    normal: Vec3,
    entity: Option<Entity>,
}

fn probe_ground(
    world: &CollisionWorld,
    feet: Vec3,
    body: &CharacterBody,
    cfg: &LocomotionConfig,
) -> Option<GroundHit> {
    // Луч стартует чуть внутри капсулы: точка опоры висит на SKIN над полом
    let inset = 0.05;

    match cfg.ground_probe {
        GroundProbeKind::Ray => world
            .raycast(
                feet + Vec3::Y * inset,
                Vec3::NEG_Y,
                inset + cfg.ground_probe_distance,
                cfg.ground_layers,
            )
            .map(|hit| GroundHit {
                normal: hit.normal,
                entity: hit.entity,
            }),
        GroundProbeKind::Sphere => {
            let radius = body.radius * 0.95;
            let center = feet + Vec3::Y * (radius - cfg.ground_probe_distance);
            if !world.overlap_sphere(center, radius, cfg.ground_layers) {
                return None;
            }
            // Нормаль уточняем лучом; нет луча — считаем опору горизонтальной
            let ray = world.raycast(
                feet + Vec3::Y * inset,
                Vec3::NEG_Y,
                inset + cfg.ground_probe_distance,
                cfg.ground_layers,
            );
            Some(GroundHit {
                normal: ray.map_or(Vec3::Y, |h| h.normal),
                entity: ray.and_then(|h| h.entity),
            })
        }
    }
}

/// Свободно ли над головой для вставания в полный рост
fn can_stand(
    world: &CollisionWorld,
    feet: Vec3,
    body: &CharacterBody,
    cfg: &LocomotionConfig,
) -> bool {
    let radius = body.radius * 0.95;
    let half = (cfg.standing_height * 0.5 - radius).max(0.01);
    // Приподнимаем тестовую капсулу, чтобы не ловить контакт с полом
    let center = feet + Vec3::Y * (cfg.standing_height * 0.5 + 0.02);
    !world.overlap_capsule(center, half, radius, cfg.move_mask)
}

fn validate_config(cfg: &LocomotionConfig, body: &CharacterBody) -> Result<(), String> {
    if cfg.ground_layers.is_empty() {
        return Err("ground layer mask is empty".into());
    }
    if cfg.move_mask.is_empty() {
        return Err("move mask is empty".into());
    }
    if body.radius <= 0.0 || cfg.standing_height <= 2.0 * body.radius {
        return Err("capsule dimensions are degenerate".into());
    }
    if cfg.crouch_height >= cfg.standing_height {
        return Err("crouch height must be below standing height".into());
    }
    if cfg.gravity < 0.0 {
        return Err("gravity must be a non-negative magnitude".into());
    }
    if cfg.crouch_time <= 0.0 {
        return Err("crouch transition time must be positive".into());
    }
    Ok(())
}

/// Система: one-shot инициализация locomotion (SimSet::Init)
pub fn initialize_locomotion(
    mut query: Query<(
        &mut Locomotion,
        &mut CharacterBody,
        &mut LocomotionSummary,
        &LocomotionConfig,
    )>,
) {
    for (mut loco, mut body, mut summary, cfg) in query.iter_mut() {
        if loco.module.is_initialized() || loco.module.is_failed() {
            continue;
        }

        let validation = validate_config(cfg, &body);
        loco.module.initialize("locomotion", validation);

        if loco.module.ready() {
            // Начальное состояние: Grounded, Standing
            body.set_height(cfg.standing_height);
            loco.current_eye_height = cfg.standing_eye_height;
            loco.ground_normal = Vec3::Y;
            summary.eye_height = cfg.standing_eye_height;
            summary.body_forward = Vec3::NEG_Z;
        }
    }
}

/// Система: основной locomotion-тик (SimSet::Locomotion)
pub fn update_locomotion(
    world: Res<CollisionWorld>,
    time: Res<Time<Fixed>>,
    mut query: Query<(
        &mut Transform,
        &mut Locomotion,
        &mut CharacterBody,
        &mut LocomotionSummary,
        &LocomotionConfig,
        &InputSnapshot,
        Option<&mut Stamina>,
    )>,
) {
    let dt = time.delta_secs();

    for (mut transform, mut loco, mut body, mut summary, cfg, input, mut stamina) in
        query.iter_mut()
    {
        if !loco.module.guard("locomotion") {
            continue;
        }

        // 1. Ground query
        let feet = transform.translation;
        let hit = probe_ground(&world, feet, &body, cfg);
        let was_grounded = loco.is_grounded;
        // Сразу после прыжка луч ещё достаёт до опоры — восходящее движение
        // не считается заземлённым
        loco.is_grounded = hit.is_some() && loco.velocity.y <= 0.1;
        match &hit {
            Some(h) => {
                loco.ground_normal = h.normal;
                loco.ground_entity = h.entity;
            }
            None => {
                loco.ground_normal = Vec3::Y;
                loco.ground_entity = None;
            }
        }
        if loco.is_grounded && !was_grounded {
            loco.air_jumps_used = 0;
        }

        // 2. Input smoothing (критически-демпфированный, |v| <= 1)
        let raw = if cfg.allow_movement {
            input.move_axis.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        };
        let smoothed = smooth_damp_vec2(
            loco.move_input_smoothed,
            raw,
            &mut loco.smooth_velocity,
            cfg.acceleration,
            dt,
        );
        loco.move_input_smoothed = smoothed.clamp_length_max(1.0);

        // Идёт ли переход приседа (высота ещё не на пресете)
        let settled_height = if loco.is_crouching {
            cfg.crouch_height
        } else {
            cfg.standing_height
        };
        let crouch_transitioning = (body.height - settled_height).abs() > 1e-3;

        // 3. Вертикальная интеграция
        if loco.is_grounded {
            loco.is_jumping = false;
            loco.is_falling = false;
            loco.velocity.y = if cfg.ground_stick > 0.0 && !crouch_transitioning {
                -cfg.ground_stick
            } else {
                0.0
            };
        } else {
            if !loco.is_jumping && !loco.is_falling {
                // Сошли с кромки: падение начинается с нулевой вертикали
                loco.is_falling = true;
                loco.velocity.y = 0.0;
            }
            if loco.is_jumping && loco.velocity.y <= 0.0 {
                loco.is_jumping = false;
                loco.is_falling = true;
            }
            loco.velocity.y -= cfg.gravity * dt;
            // Контакт с потолком на прошлом move — не липнем к геометрии
            if body.contacts.above() {
                loco.velocity.y = -1.0;
            }
        }

        // 4. Горизонтальная интеграция
        let run_engaged = match cfg.run_mode {
            RunMode::Hold => input.held(Buttons::RUN),
            RunMode::Toggle => {
                if input.just_pressed(Buttons::RUN) {
                    loco.run_toggled = !loco.run_toggled;
                }
                loco.run_toggled
            }
        };
        let stamina_ok = stamina.as_ref().map_or(true, |s| s.allows_running());
        loco.is_running = cfg.allow_running
            && run_engaged
            && loco.is_grounded
            && !loco.is_crouching
            && loco.move_input_smoothed.y > 0.1
            && stamina_ok;

        let speeds = if loco.is_crouching {
            &cfg.crouch_speeds
        } else if loco.is_running {
            &cfg.run_speeds
        } else {
            &cfg.walk_speeds
        };

        if cfg.allow_movement {
            let axis = loco.move_input_smoothed;
            let forward_speed = if axis.y >= 0.0 {
                speeds.forward
            } else {
                speeds.backward
            };
            // Вперёд = -Z в локальных осях тела
            let local = Vec3::new(axis.x * speeds.sideways, 0.0, -axis.y * forward_speed);
            let horizontal = transform.rotation * local;
            loco.velocity.x = horizontal.x;
            loco.velocity.z = horizontal.z;
        } else {
            loco.velocity.x = 0.0;
            loco.velocity.z = 0.0;
        }

        // 5. Прыжок (по эджу)
        if cfg.allow_jumping && input.just_pressed(Buttons::JUMP) {
            let crouch_block = loco.is_crouching && !cfg.allow_crouch_jumping;
            let air_ok = cfg.air_jump && loco.air_jumps_used < cfg.air_jumps_amount;

            if !crouch_block && (loco.is_grounded || air_ok) {
                let stamina_pass = if cfg.jump_stamina_cost > 0.0 {
                    stamina
                        .as_mut()
                        .map_or(true, |s| s.try_consume(cfg.jump_stamina_cost))
                } else {
                    true
                };

                if stamina_pass {
                    if !loco.is_grounded {
                        loco.air_jumps_used += 1;
                    }
                    loco.velocity.y = (2.0 * cfg.jump_height * cfg.gravity).sqrt();
                    loco.is_jumping = true;
                    loco.is_falling = false;
                    loco.is_grounded = false;
                }
            }
        }

        // 6. Присед
        if cfg.allow_crouching {
            let wants = match cfg.crouch_mode {
                CrouchMode::Hold => input.held(Buttons::CROUCH),
                CrouchMode::Toggle => {
                    if input.just_pressed(Buttons::CROUCH) {
                        !loco.is_crouching
                    } else {
                        loco.is_crouching
                    }
                }
            };

            if wants && !loco.is_crouching {
                loco.is_crouching = true;
            } else if !wants && loco.is_crouching {
                // Вставание вето, пока над головой нет места
                if can_stand(&world, feet, &body, cfg) {
                    loco.is_crouching = false;
                }
            }
        }

        let target_height = if loco.is_crouching {
            cfg.crouch_height
        } else {
            cfg.standing_height
        };
        if (body.height - target_height).abs() > f32::EPSILON {
            let rate = (cfg.standing_height - cfg.crouch_height) / cfg.crouch_time;
            let new_height = move_toward(body.height, target_height, rate * dt);
            body.set_height(new_height.clamp(cfg.crouch_height, cfg.standing_height));
        }
        let span = (cfg.standing_height - cfg.crouch_height).max(1e-3);
        let t = ((body.height - cfg.crouch_height) / span).clamp(0.0, 1.0);
        loco.current_eye_height =
            cfg.crouch_eye_height + (cfg.standing_eye_height - cfg.crouch_eye_height) * t;

        // 7. Применение движения (kinematic capsule move)
        let delta = loco.velocity * dt;
        let center = body.capsule_center(transform.translation);
        let result = world.move_capsule(
            center,
            delta,
            body.half_height(),
            body.radius,
            cfg.move_mask,
        );
        if !result.started_in_solid {
            transform.translation = result.position - body.center;
        }
        body.contacts = result.flags;

        // Итог тика для downstream-модулей (стабилен до конца тика)
        summary.is_grounded = loco.is_grounded;
        summary.is_running = loco.is_running;
        summary.is_jumping = loco.is_jumping;
        summary.is_falling = loco.is_falling;
        summary.is_crouching = loco.is_crouching;
        summary.eye_height = loco.current_eye_height;
        summary.body_forward = transform.rotation * Vec3::NEG_Z;
    }
}

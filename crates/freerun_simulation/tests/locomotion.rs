//! Интеграционные тесты locomotion state machine: прыжки, гравитация,
//! air-jump лимит, присед, потолок, глобальные запреты.

use bevy::prelude::*;
use freerun_simulation::{
    create_headless_app, spawn_character, step_fixed, Buttons, CharacterBody, CollisionWorld,
    InputSnapshot, LayerMask, Locomotion, LocomotionConfig, LocomotionSummary,
};

const DT: f32 = 1.0 / 60.0;

/// App с полом (верхняя грань y=0) и персонажем чуть над ним
fn setup() -> (App, Entity) {
    let mut app = create_headless_app(7);
    {
        let mut world = app.world_mut().resource_mut::<CollisionWorld>();
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(100.0, 0.5, 100.0),
            LayerMask::GROUND,
        );
    }
    let character = {
        let mut commands = app.world_mut().commands();
        spawn_character(&mut commands, Vec3::new(0.0, 0.05, 0.0))
    };
    app.world_mut().flush();
    (app, character)
}

fn set_input(app: &mut App, entity: Entity, f: impl FnOnce(&mut InputSnapshot)) {
    let mut entity_mut = app.world_mut().entity_mut(entity);
    let mut input = entity_mut.get_mut::<InputSnapshot>().unwrap();
    f(&mut input);
}

fn set_config(app: &mut App, entity: Entity, config: LocomotionConfig) {
    app.world_mut().entity_mut(entity).insert(config);
}

fn locomotion(app: &App, entity: Entity) -> Locomotion {
    app.world().entity(entity).get::<Locomotion>().unwrap().clone()
}

fn feet_y(app: &App, entity: Entity) -> f32 {
    app.world()
        .entity(entity)
        .get::<Transform>()
        .unwrap()
        .translation
        .y
}

#[test]
fn test_settles_grounded_on_floor() {
    let (mut app, character) = setup();

    for _ in 0..5 {
        step_fixed(&mut app, DT);
    }

    let loco = locomotion(&app, character);
    assert!(loco.is_grounded);
    assert!(!loco.is_jumping);
    assert!(!loco.is_falling);

    let summary = app
        .world()
        .entity(character)
        .get::<LocomotionSummary>()
        .unwrap();
    assert!(summary.is_grounded);
}

#[test]
fn test_jump_initial_speed_matches_formula() {
    let (mut app, character) = setup();
    set_config(
        &mut app,
        character,
        LocomotionConfig {
            gravity: 20.0,
            jump_height: 2.0,
            ..Default::default()
        },
    );

    // Устаканиться на земле
    for _ in 0..5 {
        step_fixed(&mut app, DT);
    }

    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::JUMP);
    });
    step_fixed(&mut app, DT);

    // v = sqrt(2*h*g) = sqrt(80) ≈ 8.944
    let loco = locomotion(&app, character);
    assert!(loco.is_jumping);
    assert!(
        (loco.velocity.y - 8.944).abs() < 1e-2,
        "velocity.y = {}",
        loco.velocity.y
    );
}

#[test]
fn test_jump_apex_converges_to_jump_height() {
    let (mut app, character) = setup();
    set_config(
        &mut app,
        character,
        LocomotionConfig {
            gravity: 20.0,
            jump_height: 2.0,
            ..Default::default()
        },
    );

    let dt = 0.002;
    for _ in 0..20 {
        step_fixed(&mut app, dt);
    }
    let base_y = feet_y(&app, character);

    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::JUMP);
    });
    step_fixed(&mut app, dt);
    set_input(&mut app, character, |input| {
        input.buttons.release(Buttons::JUMP);
    });

    let mut peak = base_y;
    for _ in 0..1500 {
        step_fixed(&mut app, dt);
        peak = peak.max(feet_y(&app, character));
    }

    let apex = peak - base_y;
    assert!((apex - 2.0).abs() < 0.05, "apex = {}", apex);

    // К концу прогона приземлились обратно
    assert!(locomotion(&app, character).is_grounded);
}

#[test]
fn test_jumping_and_falling_are_exclusive() {
    let (mut app, character) = setup();

    for _ in 0..5 {
        step_fixed(&mut app, DT);
    }
    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::JUMP);
    });
    step_fixed(&mut app, DT);
    set_input(&mut app, character, |input| {
        input.buttons.release(Buttons::JUMP);
    });

    // Вся дуга прыжка: инвариант состояния держится каждый тик
    for _ in 0..120 {
        step_fixed(&mut app, DT);
        let loco = locomotion(&app, character);
        assert!(
            !(loco.is_jumping && loco.is_falling),
            "jumping и falling одновременно"
        );
        if loco.is_grounded {
            assert!(!loco.is_jumping && !loco.is_falling);
        }
    }
}

#[test]
fn test_air_jumps_never_exceed_limit() {
    let (mut app, character) = setup();
    set_config(
        &mut app,
        character,
        LocomotionConfig {
            air_jump: true,
            air_jumps_amount: 2,
            ..Default::default()
        },
    );

    for _ in 0..5 {
        step_fixed(&mut app, DT);
    }

    // Спамим прыжок каждый второй тик всю дугу
    let mut max_used = 0;
    for tick in 0..240 {
        set_input(&mut app, character, |input| {
            if tick % 2 == 0 {
                input.buttons.press(Buttons::JUMP);
            } else {
                input.buttons.release(Buttons::JUMP);
            }
        });
        step_fixed(&mut app, DT);
        let loco = locomotion(&app, character);
        max_used = max_used.max(loco.air_jumps_used);
        assert!(loco.air_jumps_used <= 2);
    }
    assert_eq!(max_used, 2, "air-jump лимит должен быть выбран полностью");

    // После приземления счётчик сбрасывается
    set_input(&mut app, character, |input| {
        input.buttons.release(Buttons::JUMP);
    });
    for _ in 0..300 {
        step_fixed(&mut app, DT);
    }
    let loco = locomotion(&app, character);
    assert!(loco.is_grounded);
    assert_eq!(loco.air_jumps_used, 0);
}

#[test]
fn test_crouch_height_interpolation_is_monotonic() {
    let (mut app, character) = setup();

    for _ in 0..5 {
        step_fixed(&mut app, DT);
    }

    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::CROUCH);
    });

    let mut prev_height = app
        .world()
        .entity(character)
        .get::<CharacterBody>()
        .unwrap()
        .height;

    // Вниз: монотонно, в пределах [crouch, standing]
    for _ in 0..60 {
        step_fixed(&mut app, DT);
        let height = app
            .world()
            .entity(character)
            .get::<CharacterBody>()
            .unwrap()
            .height;
        assert!(height <= prev_height + 1e-6);
        assert!(height >= 1.0 - 1e-6 && height <= 1.8 + 1e-6);
        prev_height = height;
    }
    assert!((prev_height - 1.0).abs() < 1e-4, "не дошли до crouch height");
    assert!(locomotion(&app, character).is_crouching);

    // Вверх: монотонно обратно
    set_input(&mut app, character, |input| {
        input.buttons.release(Buttons::CROUCH);
    });
    for _ in 0..60 {
        step_fixed(&mut app, DT);
        let height = app
            .world()
            .entity(character)
            .get::<CharacterBody>()
            .unwrap()
            .height;
        assert!(height >= prev_height - 1e-6);
        prev_height = height;
    }
    assert!((prev_height - 1.8).abs() < 1e-4);
    assert!(!locomotion(&app, character).is_crouching);
}

#[test]
fn test_stand_up_vetoed_under_low_ceiling() {
    let (mut app, character) = setup();
    {
        // Низкий потолок над точкой спавна: нижняя грань y=1.3
        let mut world = app.world_mut().resource_mut::<CollisionWorld>();
        world.add_box(
            Vec3::new(0.0, 1.8, 0.0),
            Vec3::new(3.0, 0.5, 3.0),
            LayerMask::OBSTACLE,
        );
    }

    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::CROUCH);
    });
    for _ in 0..60 {
        step_fixed(&mut app, DT);
    }
    assert!(locomotion(&app, character).is_crouching);

    // Отпустили присед — встать некуда, остаёмся в приседе
    set_input(&mut app, character, |input| {
        input.buttons.release(Buttons::CROUCH);
    });
    for _ in 0..30 {
        step_fixed(&mut app, DT);
    }
    let loco = locomotion(&app, character);
    assert!(loco.is_crouching, "вставание должно быть вето под потолком");
    let height = app
        .world()
        .entity(character)
        .get::<CharacterBody>()
        .unwrap()
        .height;
    assert!((height - 1.0).abs() < 1e-3);
}

#[test]
fn test_ceiling_contact_forces_downward_velocity() {
    let (mut app, character) = setup();
    {
        // Потолок: нижняя грань y=2.2 — прыжок на 2.0 упрётся головой
        let mut world = app.world_mut().resource_mut::<CollisionWorld>();
        world.add_box(
            Vec3::new(0.0, 2.7, 0.0),
            Vec3::new(100.0, 0.5, 100.0),
            LayerMask::OBSTACLE,
        );
    }
    set_config(
        &mut app,
        character,
        LocomotionConfig {
            gravity: 20.0,
            jump_height: 2.0,
            ..Default::default()
        },
    );

    for _ in 0..5 {
        step_fixed(&mut app, DT);
    }
    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::JUMP);
    });
    step_fixed(&mut app, DT);
    set_input(&mut app, character, |input| {
        input.buttons.release(Buttons::JUMP);
    });

    // После контакта с потолком вертикаль принудительно -1
    let mut saw_ceiling_response = false;
    for _ in 0..60 {
        step_fixed(&mut app, DT);
        let loco = locomotion(&app, character);
        if (loco.velocity.y + 1.0).abs() < 1e-4 && !loco.is_grounded {
            saw_ceiling_response = true;
            break;
        }
    }
    assert!(saw_ceiling_response, "не увидели velocity.y = -1 после потолка");
}

#[test]
fn test_movement_globally_disabled_zeroes_horizontal() {
    let (mut app, character) = setup();
    set_config(
        &mut app,
        character,
        LocomotionConfig {
            allow_movement: false,
            ..Default::default()
        },
    );

    set_input(&mut app, character, |input| {
        input.move_axis = Vec2::new(1.0, 1.0);
    });

    for _ in 0..30 {
        step_fixed(&mut app, DT);
    }

    let loco = locomotion(&app, character);
    assert_eq!(loco.velocity.x, 0.0);
    assert_eq!(loco.velocity.z, 0.0);

    let translation = app
        .world()
        .entity(character)
        .get::<Transform>()
        .unwrap()
        .translation;
    assert!(translation.x.abs() < 1e-5 && translation.z.abs() < 1e-5);
}

#[test]
fn test_walk_and_run_speeds_select_presets() {
    let (mut app, character) = setup();

    set_input(&mut app, character, |input| {
        input.move_axis = Vec2::new(0.0, 1.0);
    });

    // Секунда ходьбы — input сгладился, скорость на walk-пресете (4.0)
    for _ in 0..60 {
        step_fixed(&mut app, DT);
    }
    let loco = locomotion(&app, character);
    let horizontal = Vec2::new(loco.velocity.x, loco.velocity.z).length();
    assert!((horizontal - 4.0).abs() < 0.1, "walk speed = {}", horizontal);
    assert!(!loco.is_running);

    // Зажали бег — run-пресет (8.0)
    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::RUN);
    });
    for _ in 0..60 {
        step_fixed(&mut app, DT);
    }
    let loco = locomotion(&app, character);
    let horizontal = Vec2::new(loco.velocity.x, loco.velocity.z).length();
    assert!(loco.is_running);
    assert!((horizontal - 8.0).abs() < 0.1, "run speed = {}", horizontal);

    // Диагональ не суммирует скорости: |smoothed| клампится единицей
    set_input(&mut app, character, |input| {
        input.buttons.release(Buttons::RUN);
        input.move_axis = Vec2::new(1.0, 1.0);
    });
    for _ in 0..60 {
        step_fixed(&mut app, DT);
    }
    let loco = locomotion(&app, character);
    let horizontal = Vec2::new(loco.velocity.x, loco.velocity.z).length();
    // Максимум при диагонали ограничен наибольшим из пресетов
    assert!(horizontal <= 4.0 + 0.1, "diagonal speed = {}", horizontal);
}

#[test]
fn test_walking_off_ledge_enters_falling() {
    let mut app = create_headless_app(7);
    {
        // Узкий пол: кромка на x=2
        let mut world = app.world_mut().resource_mut::<CollisionWorld>();
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(2.0, 0.5, 10.0),
            LayerMask::GROUND,
        );
    }
    let character = {
        let mut commands = app.world_mut().commands();
        spawn_character(&mut commands, Vec3::new(0.0, 0.05, 0.0))
    };
    app.world_mut().flush();

    // Поворачиваем движение в +X: strafe вправо
    set_input(&mut app, character, |input| {
        input.move_axis = Vec2::new(1.0, 0.0);
    });

    let mut entered_falling = false;
    for _ in 0..240 {
        step_fixed(&mut app, DT);
        let loco = locomotion(&app, character);
        if loco.is_falling {
            entered_falling = true;
            assert!(!loco.is_jumping);
            break;
        }
    }
    assert!(entered_falling, "сход с кромки должен перевести в falling");
}

//! Интеграционные тесты stamina gate: точный сценарий drain/wait/regen,
//! гейт бега при опустошении, стоимость прыжка.

use bevy::prelude::*;
use freerun_simulation::{
    create_headless_app, spawn_character, step_fixed, Buttons, CollisionWorld, InputSnapshot,
    LayerMask, Locomotion, LocomotionConfig, Stamina,
};

const DT: f32 = 1.0 / 60.0;

fn setup() -> (App, Entity) {
    let mut app = create_headless_app(7);
    {
        let mut world = app.world_mut().resource_mut::<CollisionWorld>();
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(200.0, 0.5, 200.0),
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

fn stamina(app: &App, entity: Entity) -> Stamina {
    app.world().entity(entity).get::<Stamina>().unwrap().clone()
}

#[test]
fn test_drain_then_wait_then_regen_scenario() {
    // Сценарий спецификации: max=10, drain=1, regen=0.8, wait=1.
    // 3 секунды бега → 7; секунда на месте (таймер заполняется);
    // дальше рост 0.8/сек.
    let (mut app, character) = setup();
    {
        let mut entity_mut = app.world_mut().entity_mut(character);
        let mut st = entity_mut.get_mut::<Stamina>().unwrap();
        st.max = 10.0;
        st.current = 10.0;
        st.drain_rate = 1.0;
        st.regen_rate = 0.8;
        st.regen_wait = 1.0;
        st.regen_wait_timer = 1.0;
        st.recover_threshold = 1.0;
    }

    // Бег: вперёд + RUN, шаги по целой секунде
    set_input(&mut app, character, |input| {
        input.move_axis = Vec2::new(0.0, 1.0);
        input.buttons.press(Buttons::RUN);
    });
    for _ in 0..3 {
        step_fixed(&mut app, 1.0);
        assert!(
            app.world()
                .entity(character)
                .get::<Locomotion>()
                .unwrap()
                .is_running,
            "персонаж должен бежать все 3 секунды"
        );
    }
    assert!((stamina(&app, character).current - 7.0).abs() < 1e-4);

    // Отпустили бег: первая секунда — таймер, current стоит на 7
    set_input(&mut app, character, |input| {
        input.move_axis = Vec2::ZERO;
        input.buttons.release(Buttons::RUN);
    });
    step_fixed(&mut app, 1.0);
    let st = stamina(&app, character);
    assert!((st.current - 7.0).abs() < 1e-4, "current = {}", st.current);
    assert!((st.regen_wait_timer - 1.0).abs() < 1e-4);

    // Дальше +0.8/сек
    step_fixed(&mut app, 1.0);
    assert!((stamina(&app, character).current - 7.8).abs() < 1e-4);
    step_fixed(&mut app, 1.0);
    assert!((stamina(&app, character).current - 8.6).abs() < 1e-4);
}

#[test]
fn test_depleted_stamina_stops_running_until_recovered() {
    let (mut app, character) = setup();
    {
        let mut entity_mut = app.world_mut().entity_mut(character);
        let mut st = entity_mut.get_mut::<Stamina>().unwrap();
        st.max = 2.0;
        st.current = 2.0;
        st.drain_rate = 10.0;
        st.regen_rate = 2.0;
        st.regen_wait = 0.2;
        st.recover_threshold = 1.0;
    }

    set_input(&mut app, character, |input| {
        input.move_axis = Vec2::new(0.0, 1.0);
        input.buttons.press(Buttons::RUN);
    });

    // Стамина кончается за ~0.2 сек
    for _ in 0..30 {
        step_fixed(&mut app, DT);
    }
    let st = stamina(&app, character);
    assert_eq!(st.current, 0.0);
    assert!(st.depleted);
    assert!(
        !app.world()
            .entity(character)
            .get::<Locomotion>()
            .unwrap()
            .is_running,
        "бег с пустой стаминой должен быть запрещён"
    );

    // Кнопка всё ещё зажата — regen заблокирован, бег не возвращается
    for _ in 0..120 {
        step_fixed(&mut app, DT);
    }
    assert_eq!(stamina(&app, character).current, 0.0);

    // Отпустили: восстановление выше порога снова разрешает бег
    set_input(&mut app, character, |input| {
        input.buttons.release(Buttons::RUN);
    });
    for _ in 0..60 {
        step_fixed(&mut app, DT);
    }
    let st = stamina(&app, character);
    assert!(st.current >= 1.0, "current = {}", st.current);
    assert!(!st.depleted);

    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::RUN);
    });
    // Эдж + разгон бега
    for _ in 0..5 {
        step_fixed(&mut app, DT);
    }
    assert!(
        app.world()
            .entity(character)
            .get::<Locomotion>()
            .unwrap()
            .is_running
    );
}

#[test]
fn test_stamina_gated_jump_costs_and_blocks() {
    let (mut app, character) = setup();
    app.world_mut().entity_mut(character).insert(LocomotionConfig {
        jump_stamina_cost: 6.0,
        ..Default::default()
    });
    {
        let mut entity_mut = app.world_mut().entity_mut(character);
        let mut st = entity_mut.get_mut::<Stamina>().unwrap();
        st.max = 10.0;
        st.current = 10.0;
        st.regen_rate = 0.0;
    }

    for _ in 0..5 {
        step_fixed(&mut app, DT);
    }

    // Первый прыжок: -6 стамины
    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::JUMP);
    });
    step_fixed(&mut app, DT);
    set_input(&mut app, character, |input| {
        input.buttons.release(Buttons::JUMP);
    });
    assert!(app
        .world()
        .entity(character)
        .get::<Locomotion>()
        .unwrap()
        .is_jumping);
    assert!((stamina(&app, character).current - 4.0).abs() < 1e-4);

    // Дождаться приземления
    for _ in 0..300 {
        step_fixed(&mut app, DT);
        if app
            .world()
            .entity(character)
            .get::<Locomotion>()
            .unwrap()
            .is_grounded
        {
            break;
        }
    }
    assert!(app
        .world()
        .entity(character)
        .get::<Locomotion>()
        .unwrap()
        .is_grounded);

    // Второй прыжок: стамины не хватает (4 < 6) — прыжок подавлен
    set_input(&mut app, character, |input| {
        input.buttons.press(Buttons::JUMP);
    });
    step_fixed(&mut app, DT);
    let loco = app.world().entity(character).get::<Locomotion>().unwrap();
    assert!(!loco.is_jumping, "прыжок без стамины должен быть подавлен");
    assert!((stamina(&app, character).current - 4.0).abs() < 1e-4);
}

#[test]
fn test_stamina_invariants_hold_under_mixed_input() {
    let (mut app, character) = setup();

    // Рваный input: бег/стоп/прыжки — инварианты держатся каждый тик
    for tick in 0..600 {
        set_input(&mut app, character, |input| {
            input.move_axis = if tick % 7 < 4 {
                Vec2::new(0.0, 1.0)
            } else {
                Vec2::ZERO
            };
            if tick % 5 == 0 {
                input.buttons.press(Buttons::RUN);
            } else {
                input.buttons.release(Buttons::RUN);
            }
            if tick % 97 == 0 {
                input.buttons.press(Buttons::JUMP);
            } else {
                input.buttons.release(Buttons::JUMP);
            }
        });
        step_fixed(&mut app, DT);

        let st = stamina(&app, character);
        assert!(st.current >= 0.0 && st.current <= st.max);
        assert!(st.regen_wait_timer >= 0.0 && st.regen_wait_timer <= st.regen_wait);
    }
}

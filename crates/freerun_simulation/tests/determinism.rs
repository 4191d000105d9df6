//! Детерминизм: одинаковый seed + одинаковый input-скрипт → идентичное
//! состояние симуляции (позиции, state machine, камера с тряской).

use bevy::prelude::*;
use freerun_simulation::{
    create_headless_app, spawn_character, step_fixed, Buttons, CameraRig, CollisionWorld,
    InputSnapshot, LayerMask, Locomotion, Platform, world_snapshot,
};

const DT: f32 = 1.0 / 60.0;
const TICKS: u32 = 300;

/// Полный прогон сценария: пол, платформа, скриптованный input, тряска
fn run_scenario(seed: u64) -> (Vec<u8>, Vec<u8>) {
    let mut app = create_headless_app(seed);
    {
        let mut world = app.world_mut().resource_mut::<CollisionWorld>();
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(200.0, 0.5, 200.0),
            LayerMask::GROUND,
        );
    }
    let platform = app
        .world_mut()
        .spawn((
            Transform::from_translation(Vec3::new(5.0, -0.25, 0.0)),
            Platform::default(),
        ))
        .id();
    let character = {
        let mut commands = app.world_mut().commands();
        spawn_character(&mut commands, Vec3::new(0.0, 0.05, 0.0))
    };
    app.world_mut().flush();

    for tick in 0..TICKS {
        // Скрипт: бег вперёд с поворотами, прыжки, тряска на 50-м тике
        {
            let mut entity_mut = app.world_mut().entity_mut(character);
            let mut input = entity_mut.get_mut::<InputSnapshot>().unwrap();
            input.move_axis = Vec2::new(0.0, 1.0);
            input.look_delta = Vec2::new(0.3 * DT, (tick % 40) as f32 * 0.01 * DT);
            input.buttons.press(Buttons::RUN);
            if tick % 90 == 0 {
                input.buttons.press(Buttons::JUMP);
            } else {
                input.buttons.release(Buttons::JUMP);
            }
        }
        if tick == 50 {
            let mut entity_mut = app.world_mut().entity_mut(character);
            let mut rig = entity_mut.get_mut::<CameraRig>().unwrap();
            rig.camera_shake(12.0, 3.0, 1.0);
        }
        {
            let mut entity_mut = app.world_mut().entity_mut(platform);
            let mut tf = entity_mut.get_mut::<Transform>().unwrap();
            tf.translation.x += 0.5 * DT;
        }

        step_fixed(&mut app, DT);
    }

    let transforms = world_snapshot::<Transform>(app.world_mut());
    let locomotion = world_snapshot::<Locomotion>(app.world_mut());
    (transforms, locomotion)
}

#[test]
fn test_determinism_same_seed() {
    const SEED: u64 = 12345;

    let (transforms_a, locomotion_a) = run_scenario(SEED);
    let (transforms_b, locomotion_b) = run_scenario(SEED);

    assert_eq!(
        transforms_a, transforms_b,
        "одинаковый seed дал разные позиции"
    );
    assert_eq!(
        locomotion_a, locomotion_b,
        "одинаковый seed дал разные state machine"
    );
}

#[test]
fn test_determinism_multiple_runs() {
    const SEED: u64 = 42;

    let runs: Vec<_> = (0..3).map(|_| run_scenario(SEED)).collect();

    for (i, run) in runs.iter().enumerate().skip(1) {
        assert_eq!(runs[0], *run, "прогон {} отличается от прогона 0", i);
    }
}

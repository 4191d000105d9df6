//! Headless симуляция FREERUN
//!
//! Прогоняет персонажа по тестовой сцене без рендера: пол, движущаяся
//! платформа, скриптованный input (бег вперёд + прыжки). Smoke-проверка
//! порядка модулей и детерминизма.

use bevy::prelude::*;
use freerun_simulation::{
    create_headless_app, spawn_character, step_fixed, Buttons, CollisionWorld, InputSnapshot,
    LayerMask, Locomotion, Platform, Stamina,
};

const DT: f32 = 1.0 / 60.0;
const TICKS: u32 = 600;

fn main() {
    let seed = 42;
    println!("Starting FREERUN headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);

    // Сцена: пол + платформа, ездящая по X
    {
        let mut world = app.world_mut().resource_mut::<CollisionWorld>();
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(100.0, 0.5, 100.0),
            LayerMask::GROUND,
        );
    }
    app.world_mut().spawn((
        Transform::from_translation(Vec3::new(10.0, -0.25, 0.0)),
        Platform::default(),
    ));

    let character = {
        let mut commands = app.world_mut().commands();
        let id = spawn_character(&mut commands, Vec3::new(0.0, 0.0, 0.0));
        id
    };
    app.world_mut().flush();

    for tick in 0..TICKS {
        // Скриптованный input: бег вперёд, прыжок каждые 2 секунды
        {
            let mut entity = app.world_mut().entity_mut(character);
            let mut input = entity.get_mut::<InputSnapshot>().unwrap();
            input.move_axis = Vec2::new(0.0, 1.0);
            input.buttons.press(Buttons::RUN);
            if tick % 120 == 0 {
                input.buttons.press(Buttons::JUMP);
            } else {
                input.buttons.release(Buttons::JUMP);
            }
        }

        step_fixed(&mut app, DT);

        if tick % 100 == 0 {
            let entity = app.world().entity(character);
            let transform = entity.get::<Transform>().unwrap();
            let loco = entity.get::<Locomotion>().unwrap();
            let stamina = entity.get::<Stamina>().unwrap();
            println!(
                "Tick {}: pos=({:.2}, {:.2}, {:.2}) grounded={} running={} stamina={:.1}",
                tick,
                transform.translation.x,
                transform.translation.y,
                transform.translation.z,
                loco.is_grounded,
                loco.is_running,
                stamina.current,
            );
        }
    }

    println!("Simulation complete!");
}

//! Interactive sprite demo -- walk a square around a walled field.
//!
//! Run with:
//!   cargo run --example scenes_visual --features renderer -p tessera-engine
//!
//! Controls:
//!   Arrow keys or WASD -- move
//!   Mouse wheel -- zoom
//!   Escape -- quit

use tessera_engine::logging;
use tessera_engine::prelude::*;

const FIELD: f32 = 1600.0;
const WALL: f32 = 32.0;
const SPEED: f32 = 240.0;

// ---------------------------------------------------------------------------
// Player movement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Player;

#[derive(Default)]
struct PlayerSystem {
    players: EntityTable<Shared<SpaceComponent>>,
}

impl System<EngineContext> for PlayerSystem {
    fn name(&self) -> &str {
        "player"
    }

    fn update(&mut self, ctx: &EngineContext, dt: f32) {
        let (dx, dy) = {
            let input = ctx.input.borrow();
            if input.just_pressed(Key::Escape) {
                ctx.close.request();
            }
            let axis = |neg: [Key; 2], pos: [Key; 2]| {
                let held = |keys: [Key; 2]| keys.iter().any(|k| input.down(*k));
                match (held(neg), held(pos)) {
                    (true, false) => -1.0,
                    (false, true) => 1.0,
                    _ => 0.0,
                }
            };
            (
                axis([Key::ArrowLeft, Key::A], [Key::ArrowRight, Key::D]),
                axis([Key::ArrowUp, Key::W], [Key::ArrowDown, Key::S]),
            )
        };

        for (_, space) in self.players.iter() {
            space.borrow_mut().position += Point::new(dx, dy) * (SPEED * dt);
        }
    }

    fn remove(&mut self, entity: EntityId) {
        self.players.remove(entity);
    }

    fn try_add(&mut self, entity: EntityId, bag: &ComponentBag) -> bool {
        match (bag.contains::<Player>(), bag.get::<SpaceComponent>()) {
            (true, Some(space)) => self.players.insert(entity, space).is_ok(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

struct Field;

impl Field {
    fn block(world: &mut EngineWorld, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let texture = Texture::solid(w as u32, h as u32, color);
        let bag = ComponentBag::new()
            .with_value(SpaceComponent::new(Point::new(x, y), w, h))
            .with_value(RenderComponent::new(Drawable::from_texture(texture)))
            .with_value(CollisionComponent::new(true, false));
        world.add_entity(EntityId::next(), &bag);
    }
}

impl Scene for Field {
    fn name(&self) -> &str {
        "Field"
    }

    fn preload(&mut self, _ctx: &EngineContext) {}

    fn setup(&mut self, world: &mut EngineWorld) {
        world.add_system(PlayerSystem::default());
        world.add_system(CollisionSystem::new());
        world.add_system(MouseZoomer::new(0.1));
        world.add_system(RenderSystem::new());

        {
            let mut camera = world.context().camera.borrow_mut();
            camera.set_bounds(Aabb::new(Point::ZERO, Point::new(FIELD, FIELD)));
        }

        let wall = Color::rgb(90, 90, 110);
        Self::block(world, 0.0, 0.0, FIELD, WALL, wall);
        Self::block(world, 0.0, FIELD - WALL, FIELD, WALL, wall);
        Self::block(world, 0.0, 0.0, WALL, FIELD, wall);
        Self::block(world, FIELD - WALL, 0.0, WALL, FIELD, wall);
        for i in 1..6 {
            let offset = i as f32 * 240.0;
            Self::block(world, offset, offset, 64.0, 64.0, Color::rgb(200, 120, 60));
        }

        let player = EntityId::next();
        let space = shared(SpaceComponent::new(Point::new(100.0, 100.0), 40.0, 40.0));
        let sprite = Drawable::from_texture(Texture::solid(40, 40, Color::rgb(80, 200, 120)));
        let bag = ComponentBag::new()
            .with(space.clone())
            .with_value(Player)
            .with_value(CollisionComponent::new(true, true))
            .with_value(RenderComponent::new(sprite).with_z_index(1.0));
        world.add_entity(player, &bag);
        world.context().camera.borrow_mut().follow(player, space);

        let hud = world.context().shaders.hud().clone();
        let badge = Drawable::from_texture(Texture::solid(120, 24, Color::rgba(20, 20, 20, 200)));
        let bag = ComponentBag::new()
            .with_value(SpaceComponent::new(Point::new(8.0, 8.0), 120.0, 24.0))
            .with_value(RenderComponent::new(badge).with_shader(hud).with_z_index(10.0));
        world.add_entity(EntityId::next(), &bag);
    }
}

fn main() -> Result<(), anyhow::Error> {
    logging::init();

    let options = RunOptions::default()
        .with_title("Tessera -- arrows/WASD to move, wheel to zoom, ESC to quit")
        .with_size(960, 720)
        .with_background(Color::rgb(30, 30, 40));
    let mut engine = Engine::new(options)?;
    engine.run(Box::new(Field))?;
    Ok(())
}

//! Camera messages, long tasks and following, plus draw ordering and shader
//! runs observed through the recorded frame.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tessera_engine::prelude::*;
use tessera_engine::render::{CameraView, QuadBuffer, RenderCommand, RenderFrame, Viewport};

// -- Helpers -----------------------------------------------------------------

fn camera_world() -> EngineWorld {
    let mut world = World::new(EngineContext::default());
    world.add_system(CameraSystem::new());
    world
}

fn send(world: &EngineWorld, msg: CameraMessage) {
    world.context().bus.dispatch(&msg);
}

fn camera_xyz(world: &EngineWorld) -> (f32, f32, f32) {
    let camera = world.context().camera.borrow();
    (camera.x(), camera.y(), camera.zoom())
}

type Calls = Rc<RefCell<Vec<String>>>;

/// Logs program switches so tests can count shader runs.
struct Recording {
    name: &'static str,
    calls: Calls,
}

impl Shader for Recording {
    fn initialize(&mut self, _viewport: Viewport) {}

    fn set_viewport(&mut self, _viewport: Viewport) {}

    fn pre(&mut self, _frame: &mut RenderFrame, _camera: CameraView) {
        self.calls.borrow_mut().push(format!("pre:{}", self.name));
    }

    fn draw(
        &mut self,
        _frame: &mut RenderFrame,
        _texture: &Texture,
        _buffer: &QuadBuffer,
        _x: f32,
        _y: f32,
        _rotation: f32,
    ) {
        self.calls.borrow_mut().push(format!("draw:{}", self.name));
    }

    fn post(&mut self, _frame: &mut RenderFrame) {
        self.calls.borrow_mut().push(format!("post:{}", self.name));
    }
}

fn render_world(headless: bool) -> EngineWorld {
    let ctx = EngineContext::default();
    ctx.display.borrow_mut().headless = headless;
    let mut world = World::new(ctx);
    world.add_system(RenderSystem::new());
    world
}

fn sprite(
    world: &mut EngineWorld,
    z: f32,
    shader: Option<&ShaderHandle>,
) -> (EntityId, Shared<RenderComponent>) {
    let drawable = Drawable::from_texture(Texture::solid(4, 4, Color::WHITE));
    let mut render = RenderComponent::new(drawable).with_z_index(z);
    if let Some(shader) = shader {
        render = render.with_shader(shader.clone());
    }
    let render = shared(render);
    let id = EntityId::next();
    let bag = ComponentBag::new()
        .with(render.clone())
        .with_value(SpaceComponent::new(Point::ZERO, 4.0, 4.0));
    world.add_entity(id, &bag);
    (id, render)
}

// -- 1. Camera -----------------------------------------------------------------

#[test]
fn messages_move_and_clamp_the_camera() {
    let world = camera_world();
    send(&world, CameraMessage::absolute(CameraAxis::X, 120.0));
    send(&world, CameraMessage::incremental(CameraAxis::Y, -1_000.0));
    send(&world, CameraMessage::absolute(CameraAxis::Zoom, 2.0));
    assert_eq!(camera_xyz(&world), (120.0, 0.0, 2.0));
}

#[test]
fn long_task_spreads_the_move_over_its_duration() {
    let mut world = camera_world();
    send(
        &world,
        CameraMessage::absolute(CameraAxis::X, 500.0).over(Duration::from_secs(1)),
    );
    assert_eq!(camera_xyz(&world).0, 400.0);

    world.update(0.5);
    assert_eq!(camera_xyz(&world).0, 450.0);
    world.update(0.5);
    assert_eq!(camera_xyz(&world).0, 500.0);
    assert!(!world.context().camera.borrow().has_long_task(CameraAxis::X));
}

#[test]
fn new_message_replaces_the_long_task() {
    let mut world = camera_world();
    send(
        &world,
        CameraMessage::absolute(CameraAxis::X, 500.0).over(Duration::from_secs(1)),
    );
    world.update(0.5);
    send(&world, CameraMessage::absolute(CameraAxis::X, 10.0));
    world.update(0.5);

    assert_eq!(camera_xyz(&world).0, 10.0);
    assert!(!world.context().camera.borrow().has_long_task(CameraAxis::X));
}

#[test]
fn followed_entity_is_tracked_until_removed() {
    let mut world = camera_world();
    let id = EntityId::next();
    let space = shared(SpaceComponent::new(Point::new(90.0, 190.0), 20.0, 20.0));
    world.add_entity(id, &ComponentBag::new().with(space.clone()));
    world.context().camera.borrow_mut().follow(id, space.clone());

    world.update(0.016);
    assert_eq!(camera_xyz(&world), (100.0, 200.0, 1.0));

    world.remove_entity(id);
    space.borrow_mut().position = Point::new(290.0, 290.0);
    world.update(0.016);
    assert_eq!(camera_xyz(&world), (100.0, 200.0, 1.0));
    assert_eq!(world.context().camera.borrow().following(), None);
}

#[test]
fn keyboard_scroller_pans_while_held() {
    let mut world = camera_world();
    world.add_system(KeyboardScroller::new(100.0, Key::W, Key::D, Key::S, Key::A));
    world.context().input.borrow_mut().set_key(Key::D, true);

    world.update(0.5);
    assert_eq!(camera_xyz(&world).0, 450.0);

    world.context().input.borrow_mut().set_key(Key::D, false);
    world.update(0.5);
    assert_eq!(camera_xyz(&world).0, 450.0);
}

// -- 2. Draw order -------------------------------------------------------------

#[test]
fn entities_draw_in_z_order() {
    let mut world = render_world(true);
    let (a, _) = sprite(&mut world, 2.0, None);
    let (b, _) = sprite(&mut world, 0.0, None);
    let (c, _) = sprite(&mut world, 1.0, None);

    world.update(0.016);

    let order = world.system::<RenderSystem>().unwrap().draw_order();
    assert_eq!(order, vec![b, c, a]);
}

#[test]
fn changing_z_index_resorts_next_frame() {
    let mut world = render_world(true);
    let (a, render_a) = sprite(&mut world, 0.0, None);
    let (b, _) = sprite(&mut world, 1.0, None);
    world.update(0.016);
    assert_eq!(world.system::<RenderSystem>().unwrap().draw_order(), vec![a, b]);

    render_a.borrow_mut().set_z_index(5.0);
    world.update(0.016);
    assert_eq!(world.system::<RenderSystem>().unwrap().draw_order(), vec![b, a]);
}

#[test]
fn equal_z_groups_entities_by_shader() {
    let calls = Calls::default();
    let first = ShaderHandle::new(Recording {
        name: "first",
        calls: calls.clone(),
    });
    let second = ShaderHandle::new(Recording {
        name: "second",
        calls: calls.clone(),
    });

    let mut world = render_world(false);
    sprite(&mut world, 0.0, Some(&second));
    sprite(&mut world, 0.0, Some(&first));
    sprite(&mut world, 0.0, Some(&second));
    sprite(&mut world, 0.0, Some(&first));
    world.update(0.016);

    let calls = calls.borrow();
    assert_eq!(
        *calls,
        [
            "pre:first",
            "draw:first",
            "draw:first",
            "post:first",
            "pre:second",
            "draw:second",
            "draw:second",
            "post:second",
        ]
    );
}

#[test]
fn switching_shader_moves_entity_between_runs() {
    let calls = Calls::default();
    let custom = ShaderHandle::new(Recording {
        name: "custom",
        calls: calls.clone(),
    });

    let mut world = render_world(false);
    let (_, render) = sprite(&mut world, 0.0, Some(&custom));
    sprite(&mut world, 1.0, Some(&custom));
    world.update(0.016);
    assert_eq!(calls.borrow().iter().filter(|c| c.starts_with("pre")).count(), 1);

    calls.borrow_mut().clear();
    render.borrow_mut().set_shader(None);
    world.update(0.016);
    assert_eq!(calls.borrow().iter().filter(|c| c.starts_with("pre")).count(), 1);
    assert_eq!(calls.borrow().iter().filter(|c| c.starts_with("draw")).count(), 1);
}

#[test]
fn hidden_entities_are_skipped() {
    let mut world = render_world(false);
    let (_, render) = sprite(&mut world, 0.0, None);
    sprite(&mut world, 1.0, None);
    render.borrow_mut().set_hidden(true);

    world.update(0.016);

    let frame = world.context().frame.borrow();
    assert_eq!(frame.draw_count(), 1);
    assert!(matches!(frame.commands()[0], RenderCommand::Clear { .. }));
}

#[test]
fn headless_worlds_record_nothing() {
    let mut world = render_world(true);
    sprite(&mut world, 0.0, None);
    world.update(0.016);
    assert!(world.context().frame.borrow().is_empty());
}

// -- 4. Engine-driven frames ---------------------------------------------------

/// One sprite drawn by the default shader.
struct OneSprite;

impl Scene for OneSprite {
    fn name(&self) -> &str {
        "OneSprite"
    }

    fn preload(&mut self, _ctx: &EngineContext) {}

    fn setup(&mut self, world: &mut EngineWorld) {
        world.add_system(RenderSystem::new());
        sprite(world, 0.0, None);
    }
}

fn projection_of(shader: &ShaderHandle) -> [f32; 2] {
    let mut frame = RenderFrame::new();
    shader.borrow_mut().pre(&mut frame, CameraView::default());
    match &frame.commands()[0] {
        RenderCommand::UseProgram { uniforms, .. } => uniforms.projection,
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn embedded_engine_keeps_only_the_latest_frame() {
    let mut engine = Engine::new(RunOptions::default().with_no_run(true)).unwrap();
    engine.run(Box::new(OneSprite)).unwrap();

    engine.run_iteration(0.016);
    let first = engine.context().frame.borrow().commands().len();
    for _ in 0..99 {
        engine.run_iteration(0.016);
    }

    let frame = engine.context().frame.borrow();
    assert_eq!(frame.commands().len(), first);
    assert_eq!(frame.draw_count(), 1);
}

#[test]
fn scale_on_resize_keeps_both_projections() {
    let options = RunOptions::default()
        .with_headless(true)
        .with_no_run(true)
        .with_scale_on_resize(true);
    let mut engine = Engine::new(options).unwrap();
    engine.run(Box::new(OneSprite)).unwrap();

    engine.resize(1600.0, 1600.0);

    let shaders = engine.context().shaders.clone();
    assert_eq!(projection_of(shaders.world()), [400.0, 400.0]);
    assert_eq!(projection_of(shaders.hud()), [400.0, 400.0]);
}

#[test]
fn resize_without_scaling_moves_both_projections() {
    let options = RunOptions::default().with_headless(true).with_no_run(true);
    let mut engine = Engine::new(options).unwrap();
    engine.run(Box::new(OneSprite)).unwrap();

    engine.resize(1600.0, 1600.0);

    let shaders = engine.context().shaders.clone();
    assert_eq!(projection_of(shaders.world()), [800.0, 800.0]);
    assert_eq!(projection_of(shaders.hud()), [800.0, 800.0]);
}

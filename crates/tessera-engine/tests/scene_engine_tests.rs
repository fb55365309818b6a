//! Scene switching and the headless frame loop, driven through the public
//! engine API.

use std::cell::RefCell;
use std::rc::Rc;

use tessera_engine::prelude::*;

// -- Helpers -----------------------------------------------------------------

type Log = Rc<RefCell<Vec<String>>>;

/// Records every lifecycle hook and adds a counter system on setup.
struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    fn boxed(name: &'static str, log: &Log) -> Box<dyn Scene> {
        Box::new(Self {
            name,
            log: log.clone(),
        })
    }

    fn note(&self, hook: &str) {
        self.log.borrow_mut().push(format!("{}:{hook}", self.name));
    }
}

impl Scene for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn preload(&mut self, _ctx: &EngineContext) {
        self.note("preload");
    }

    fn setup(&mut self, world: &mut EngineWorld) {
        self.note("setup");
        world.add_system(FrameCounter::default());
    }

    fn show(&mut self, _world: &mut EngineWorld) {
        self.note("show");
    }

    fn hide(&mut self, _world: &mut EngineWorld) {
        self.note("hide");
    }

    fn exit(&mut self) {
        self.note("exit");
    }
}

/// Counts frames and asks the engine to close after `close_after` of them.
#[derive(Default)]
struct FrameCounter {
    frames: u32,
    close_after: Option<u32>,
}

impl System<EngineContext> for FrameCounter {
    fn name(&self) -> &str {
        "frame_counter"
    }

    fn update(&mut self, ctx: &EngineContext, _dt: f32) {
        self.frames += 1;
        if Some(self.frames) == self.close_after {
            ctx.close.request();
        }
    }

    fn remove(&mut self, _entity: EntityId) {}
}

fn drain(log: &Log) -> Vec<String> {
    log.borrow_mut().drain(..).collect()
}

fn headless(no_run: bool) -> Engine {
    let options = RunOptions::default()
        .with_headless(true)
        .with_no_run(no_run)
        .with_fps_limit(1000);
    Engine::new(options).unwrap()
}

fn frames_of(engine: &Engine, scene: &str) -> u32 {
    engine
        .scenes()
        .world_of(scene)
        .and_then(|w| w.system::<FrameCounter>())
        .map(|c| c.frames)
        .unwrap_or_default()
}

// -- 1. Scene switching --------------------------------------------------------

#[test]
fn switching_back_shows_instead_of_setting_up() {
    let log = Log::default();
    let mut engine = headless(true);
    engine.run(Recorder::boxed("A", &log)).unwrap();
    engine.scenes_mut().register_scene(Recorder::boxed("B", &log));
    assert_eq!(drain(&log), ["A:preload", "A:setup"]);

    engine.scenes_mut().set_scene_by_name("B", false).unwrap();
    assert_eq!(drain(&log), ["A:hide", "B:preload", "B:setup"]);

    engine.scenes_mut().set_scene_by_name("A", false).unwrap();
    assert_eq!(drain(&log), ["B:hide", "A:show"]);
    assert_eq!(engine.scenes().current_scene_name(), Some("A"));
    assert_eq!(engine.scenes().state(), SceneState::Active);
}

#[test]
fn only_the_active_world_updates() {
    let log = Log::default();
    let mut engine = headless(true);
    engine.run(Recorder::boxed("A", &log)).unwrap();
    engine.run_iteration(0.016);
    engine.run_iteration(0.016);

    engine.scenes_mut().set_scene(Recorder::boxed("B", &log), false);
    engine.run_iteration(0.016);

    assert_eq!(frames_of(&engine, "A"), 2);
    assert_eq!(frames_of(&engine, "B"), 1);
}

#[test]
fn forced_world_starts_from_scratch() {
    let log = Log::default();
    let mut engine = headless(true);
    engine.run(Recorder::boxed("A", &log)).unwrap();
    engine.run_iteration(0.016);
    drain(&log);

    engine.scenes_mut().set_scene_by_name("A", true).unwrap();
    assert_eq!(drain(&log), ["A:hide", "A:preload", "A:setup"]);
    assert_eq!(frames_of(&engine, "A"), 0);
}

#[test]
fn unknown_scene_is_reported() {
    let mut engine = headless(true);
    let err = engine.scenes_mut().set_scene_by_name("Missing", false);
    assert!(matches!(err, Err(EngineError::SceneNotRegistered { .. })));
    assert_eq!(engine.scenes().state(), SceneState::NoScene);
}

#[test]
fn scenes_keep_separate_cameras() {
    let log = Log::default();
    let mut engine = headless(true);
    engine.run(Recorder::boxed("A", &log)).unwrap();
    engine
        .scenes()
        .current_context()
        .unwrap()
        .bus
        .dispatch(&CameraMessage::absolute(CameraAxis::X, 100.0));

    engine.scenes_mut().set_scene(Recorder::boxed("B", &log), false);
    let b_camera_x = engine.scenes().current_context().unwrap().camera.borrow().x();
    let a_camera_x = engine
        .scenes()
        .world_of("A")
        .unwrap()
        .context()
        .camera
        .borrow()
        .x();

    assert_eq!(a_camera_x, 100.0);
    assert_eq!(b_camera_x, 400.0);
}

// -- 2. Frame loop -----------------------------------------------------------

#[test]
fn headless_run_loops_until_close() {
    struct Closing;

    impl Scene for Closing {
        fn name(&self) -> &str {
            "Closing"
        }

        fn preload(&mut self, _ctx: &EngineContext) {}

        fn setup(&mut self, world: &mut EngineWorld) {
            world.add_system(FrameCounter {
                frames: 0,
                close_after: Some(5),
            });
        }
    }

    let mut engine = headless(false);
    engine.run(Box::new(Closing)).unwrap();

    assert!(engine.is_closed());
    assert_eq!(frames_of(&engine, "Closing"), 5);
    assert!(engine.clock().frames() >= 6);
}

#[test]
fn close_request_runs_exit_hooks_once() {
    let log = Log::default();
    let mut engine = headless(true);
    engine.run(Recorder::boxed("A", &log)).unwrap();
    engine.scenes_mut().register_scene(Recorder::boxed("B", &log));
    drain(&log);

    engine.request_close();
    engine.run_iteration(0.016);
    engine.run_iteration(0.016);

    let mut exits = drain(&log);
    exits.sort();
    assert_eq!(exits, ["A:exit", "B:exit"]);
    assert!(engine.is_closed());
    assert_eq!(frames_of(&engine, "A"), 0);
}

#[test]
fn overridden_close_keeps_running_until_exit() {
    let log = Log::default();
    let mut engine = headless(true);
    engine.override_close_action();
    engine.run(Recorder::boxed("A", &log)).unwrap();

    engine.request_close();
    engine.run_iteration(0.016);
    assert!(!engine.is_closed());
    assert_eq!(frames_of(&engine, "A"), 1);

    engine.exit();
    engine.run_iteration(0.016);
    assert!(engine.is_closed());
    assert_eq!(frames_of(&engine, "A"), 1);
}

#[test]
fn options_load_from_json() {
    let options = RunOptions::from_json_str(r#"{ "title": "Demo", "fps_limit": 30, "headless": true }"#)
        .unwrap();
    assert_eq!(options.title, "Demo");
    assert_eq!(options.fps_limit, 30);
    assert_eq!(options.width, 800);

    let err = RunOptions::from_json_str(r#"{ "fps_limit": 0 }"#).unwrap_err();
    assert!(matches!(err, EngineError::InvalidFpsLimit { limit: 0 }));
}

//! Scenes and the scene manager.
//!
//! A [`Scene`] is one screen of a game (a menu, a level). Every scene gets
//! its own [`EngineWorld`] with a private message bus and camera, created the
//! first time the scene becomes active:
//!
//! 1. [`Scene::preload`] queues assets on the shared loader.
//! 2. The loader loads everything queued, synchronously.
//! 3. The world's bus is reset and a [`CameraSystem`] is attached.
//! 4. [`Scene::setup`] adds systems and entities.
//!
//! Activating the scene again reuses that world and only calls
//! [`Scene::show`], unless a fresh world is forced.
//!
//! ```
//! use tessera_engine::context::{EngineContext, EngineWorld};
//! use tessera_engine::scene::{Scene, SceneManager, SceneState};
//!
//! struct Menu;
//!
//! impl Scene for Menu {
//!     fn name(&self) -> &str {
//!         "Menu"
//!     }
//!     fn preload(&mut self, _ctx: &EngineContext) {}
//!     fn setup(&mut self, _world: &mut EngineWorld) {}
//! }
//!
//! let mut scenes = SceneManager::new(EngineContext::default());
//! assert_eq!(scenes.state(), SceneState::NoScene);
//!
//! scenes.set_scene(Box::new(Menu), false);
//! assert_eq!(scenes.current_scene_name(), Some("Menu"));
//! assert_eq!(scenes.state(), SceneState::Active);
//! ```

use std::fmt;

use tessera_ecs::world::World;

use crate::camera::CameraSystem;
use crate::context::{EngineContext, EngineWorld};
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// One screen of a game.
///
/// `show`, `hide` and `exit` are optional; their default bodies do nothing.
pub trait Scene {
    /// Unique name, used for lookups and logging.
    fn name(&self) -> &str;

    /// Queue assets on `ctx.assets`. Called before they are loaded.
    fn preload(&mut self, ctx: &EngineContext);

    /// Populate a freshly created world.
    fn setup(&mut self, world: &mut EngineWorld);

    /// The scene became active again with its existing world.
    fn show(&mut self, _world: &mut EngineWorld) {}

    /// Another scene is about to become active.
    fn hide(&mut self, _world: &mut EngineWorld) {}

    /// The game is closing.
    fn exit(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneState {
    NoScene,
    /// Between hiding the old scene and finishing setup or show of the new one.
    Transitioning,
    Active,
}

/// A registered scene and its world, once created.
struct SceneEntry {
    scene: Box<dyn Scene>,
    world: Option<EngineWorld>,
}

// ---------------------------------------------------------------------------
// SceneManager
// ---------------------------------------------------------------------------

/// Owns every registered scene and decides which world runs.
pub struct SceneManager {
    root: EngineContext,
    entries: Vec<SceneEntry>,
    current: Option<usize>,
    state: SceneState,
}

impl fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.entries.iter().map(|e| e.scene.name()).collect();
        f.debug_struct("SceneManager")
            .field("scenes", &names)
            .field("current", &self.current_scene_name())
            .field("state", &self.state)
            .finish()
    }
}

impl SceneManager {
    /// A manager whose scene worlds derive from `root`.
    pub fn new(root: EngineContext) -> Self {
        Self {
            root,
            entries: Vec::new(),
            current: None,
            state: SceneState::NoScene,
        }
    }

    /// The engine-wide context scene contexts are cloned from.
    pub fn root_context(&self) -> &EngineContext {
        &self.root
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.scene.name() == name)
    }

    /// Make `scene` available to [`set_scene_by_name`](Self::set_scene_by_name).
    ///
    /// A scene whose name is already registered is ignored.
    pub fn register_scene(&mut self, scene: Box<dyn Scene>) {
        if self.position(scene.name()).is_some() {
            tracing::debug!(scene = scene.name(), "scene already registered");
            return;
        }
        tracing::debug!(scene = scene.name(), "scene registered");
        self.entries.push(SceneEntry { scene, world: None });
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Make `scene` the active scene, registering it if needed.
    ///
    /// If a scene with the same name is registered, `scene` replaces it but
    /// keeps its world. A world is created (and the scene set up) when there
    /// is none yet or `force_new_world` is set; otherwise the scene is shown.
    pub fn set_scene(&mut self, scene: Box<dyn Scene>, force_new_world: bool) {
        self.hide_current();
        let index = match self.position(scene.name()) {
            Some(index) => {
                self.entries[index].scene = scene;
                index
            }
            None => {
                self.entries.push(SceneEntry { scene, world: None });
                self.entries.len() - 1
            }
        };
        self.activate(index, force_new_world);
    }

    /// Activate a registered scene by name.
    pub fn set_scene_by_name(&mut self, name: &str, force_new_world: bool) -> Result<(), EngineError> {
        let index = self.position(name).ok_or_else(|| EngineError::SceneNotRegistered {
            name: name.to_owned(),
        })?;
        self.hide_current();
        self.activate(index, force_new_world);
        Ok(())
    }

    fn hide_current(&mut self) {
        self.state = SceneState::Transitioning;
        if let Some(index) = self.current {
            let entry = &mut self.entries[index];
            if let Some(world) = entry.world.as_mut() {
                entry.scene.hide(world);
            }
        }
    }

    fn activate(&mut self, index: usize, force_new_world: bool) {
        self.current = Some(index);

        let root = &self.root;
        let entry = &mut self.entries[index];
        let name = entry.scene.name().to_owned();

        match entry.world.as_mut().filter(|_| !force_new_world) {
            Some(world) => {
                tracing::info!(scene = %name, "showing scene");
                entry.scene.show(world);
            }
            None => {
                tracing::info!(scene = %name, fresh = force_new_world, "setting up scene");
                let ctx = root.for_scene();
                let mut world = World::new(ctx.clone());

                entry.scene.preload(&ctx);
                let loaded = ctx.assets.borrow_mut().load(|| {
                    tracing::debug!(scene = %name, "scene assets loaded");
                });
                tracing::debug!(scene = %name, loaded, "preload finished");

                ctx.bus.clear();
                world.add_system(CameraSystem::new());
                entry.scene.setup(&mut world);
                entry.world = Some(world);
            }
        }

        self.state = SceneState::Active;
    }

    pub fn current_scene_name(&self) -> Option<&str> {
        self.current.map(|i| self.entries[i].scene.name())
    }

    pub fn state(&self) -> SceneState {
        self.state
    }

    /// The active scene's world.
    pub fn current_world(&self) -> Option<&EngineWorld> {
        self.current.and_then(|i| self.entries[i].world.as_ref())
    }

    pub fn current_world_mut(&mut self) -> Option<&mut EngineWorld> {
        self.current.and_then(|i| self.entries[i].world.as_mut())
    }

    /// The active scene's context: its own bus and camera plus the shared
    /// engine state.
    pub fn current_context(&self) -> Option<&EngineContext> {
        self.current_world().map(World::context)
    }

    /// The world of a registered scene, whether active or not.
    pub fn world_of(&self, name: &str) -> Option<&EngineWorld> {
        self.position(name).and_then(|i| self.entries[i].world.as_ref())
    }

    /// Update the active world, if any.
    pub fn update(&mut self, dt: f32) {
        if let Some(world) = self.current_world_mut() {
            world.update(dt);
        }
    }

    /// Call every registered scene's exit hook.
    pub fn exit_all(&mut self) {
        for entry in &mut self.entries {
            tracing::debug!(scene = entry.scene.name(), "exiting scene");
            entry.scene.exit();
        }
    }

    /// Names of all registered scenes, in registration order.
    pub fn scene_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.scene.name()).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Calls = Rc<RefCell<Vec<String>>>;

    struct Recording {
        name: &'static str,
        calls: Calls,
    }

    impl Recording {
        fn boxed(name: &'static str, calls: &Calls) -> Box<dyn Scene> {
            Box::new(Self {
                name,
                calls: calls.clone(),
            })
        }

        fn log(&self, hook: &str) {
            self.calls.borrow_mut().push(format!("{}.{hook}", self.name));
        }
    }

    impl Scene for Recording {
        fn name(&self) -> &str {
            self.name
        }
        fn preload(&mut self, _ctx: &EngineContext) {
            self.log("preload");
        }
        fn setup(&mut self, _world: &mut EngineWorld) {
            self.log("setup");
        }
        fn show(&mut self, _world: &mut EngineWorld) {
            self.log("show");
        }
        fn hide(&mut self, _world: &mut EngineWorld) {
            self.log("hide");
        }
        fn exit(&mut self) {
            self.log("exit");
        }
    }

    fn take(calls: &Calls) -> Vec<String> {
        calls.borrow_mut().drain(..).collect()
    }

    // -- 1. Lifecycle ------------------------------------------------------

    #[test]
    fn first_activation_sets_up_then_reuse_shows() {
        let calls = Calls::default();
        let mut scenes = SceneManager::new(EngineContext::default());
        scenes.register_scene(Recording::boxed("B", &calls));

        scenes.set_scene(Recording::boxed("A", &calls), false);
        assert_eq!(take(&calls), ["A.preload", "A.setup"]);

        scenes.set_scene_by_name("B", false).unwrap();
        assert_eq!(take(&calls), ["A.hide", "B.preload", "B.setup"]);

        scenes.set_scene_by_name("A", false).unwrap();
        assert_eq!(take(&calls), ["B.hide", "A.show"]);
        assert_eq!(scenes.current_scene_name(), Some("A"));
    }

    #[test]
    fn forcing_a_new_world_runs_setup_again() {
        let calls = Calls::default();
        let mut scenes = SceneManager::new(EngineContext::default());
        scenes.set_scene(Recording::boxed("A", &calls), false);
        let first_bus = scenes.current_context().unwrap().bus.clone();
        take(&calls);

        scenes.set_scene_by_name("A", true).unwrap();
        assert_eq!(take(&calls), ["A.hide", "A.preload", "A.setup"]);
        assert!(!Rc::ptr_eq(&first_bus, &scenes.current_context().unwrap().bus));
    }

    #[test]
    fn unknown_name_is_an_error() {
        let mut scenes = SceneManager::new(EngineContext::default());
        let err = scenes.set_scene_by_name("Nope", false).unwrap_err();
        assert!(matches!(err, EngineError::SceneNotRegistered { ref name } if name == "Nope"));
        assert_eq!(scenes.state(), SceneState::NoScene);
    }

    #[test]
    fn exit_all_reaches_inactive_scenes() {
        let calls = Calls::default();
        let mut scenes = SceneManager::new(EngineContext::default());
        scenes.register_scene(Recording::boxed("A", &calls));
        scenes.register_scene(Recording::boxed("B", &calls));
        scenes.set_scene_by_name("A", false).unwrap();
        take(&calls);

        scenes.exit_all();
        assert_eq!(take(&calls), ["A.exit", "B.exit"]);
    }

    // -- 2. Worlds ---------------------------------------------------------

    #[test]
    fn new_worlds_get_a_camera_system_and_clean_bus() {
        struct Listening;
        impl Scene for Listening {
            fn name(&self) -> &str {
                "L"
            }
            fn preload(&mut self, ctx: &EngineContext) {
                // Cleared before setup.
                ctx.bus.listen("Early", |_| {});
            }
            fn setup(&mut self, _world: &mut EngineWorld) {}
        }

        let mut scenes = SceneManager::new(EngineContext::default());
        scenes.set_scene(Box::new(Listening), false);
        let world = scenes.current_world().unwrap();
        let ctx = world.context();

        assert_eq!(world.system_names(), ["camera"]);
        assert_eq!(ctx.bus.listener_count("Early"), 0);
        assert_eq!(ctx.bus.listener_count(crate::camera::CameraMessage::KIND), 1);
    }

    #[test]
    fn scenes_have_their_own_bus_and_camera() {
        let calls = Calls::default();
        let mut scenes = SceneManager::new(EngineContext::default());
        scenes.set_scene(Recording::boxed("A", &calls), false);
        scenes.set_scene(Recording::boxed("B", &calls), false);

        let a = scenes.world_of("A").unwrap().context();
        let b = scenes.world_of("B").unwrap().context();
        assert!(!Rc::ptr_eq(&a.bus, &b.bus));
        assert!(!Rc::ptr_eq(&a.camera, &b.camera));
        assert!(Rc::ptr_eq(&a.assets, &b.assets));

        a.bus.dispatch(&crate::camera::CameraMessage::absolute(
            crate::camera::CameraAxis::X,
            10.0,
        ));
        assert_eq!(a.camera.borrow().x(), 10.0);
        assert_eq!(b.camera.borrow().x(), 400.0);
    }

    #[test]
    fn preloaded_assets_are_loaded_before_setup() {
        struct Loading {
            seen: Rc<RefCell<bool>>,
            path: std::path::PathBuf,
        }
        impl Scene for Loading {
            fn name(&self) -> &str {
                "Loading"
            }
            fn preload(&mut self, ctx: &EngineContext) {
                ctx.assets.borrow_mut().add_resource(&self.path);
            }
            fn setup(&mut self, world: &mut EngineWorld) {
                *self.seen.borrow_mut() = world.context().assets.borrow().is_loaded("level.json");
            }
        }

        let dir = std::env::temp_dir().join(format!("tessera-scene-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("level.json");
        std::fs::write(&path, br#"{"width": 3}"#).unwrap();

        let seen = Rc::new(RefCell::new(false));
        let mut scenes = SceneManager::new(EngineContext::default());
        scenes.set_scene(
            Box::new(Loading {
                seen: seen.clone(),
                path,
            }),
            false,
        );

        assert!(*seen.borrow());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

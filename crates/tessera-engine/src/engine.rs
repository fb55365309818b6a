//! The engine entry point and frame loop.
//!
//! [`Engine::run`] activates the initial scene and then loops until a close
//! is requested. Each frame:
//!
//! 1. A pending close request runs the close sequence.
//! 2. The active scene's world updates with the elapsed time.
//! 3. Per-frame input state is cleared.
//!
//! Frames are paced by a [`Ticker`] at the configured FPS limit. Headless
//! runs loop on the calling thread; windowed runs (feature `renderer`) hand
//! the loop to winit.
//!
//! # Example
//!
//! ```
//! use tessera_engine::context::{EngineContext, EngineWorld};
//! use tessera_engine::engine::{Engine, RunOptions};
//! use tessera_engine::scene::Scene;
//!
//! struct Empty;
//!
//! impl Scene for Empty {
//!     fn name(&self) -> &str {
//!         "Empty"
//!     }
//!     fn preload(&mut self, _ctx: &EngineContext) {}
//!     fn setup(&mut self, _world: &mut EngineWorld) {}
//! }
//!
//! let options = RunOptions::default().with_headless(true).with_no_run(true);
//! let mut engine = Engine::new(options).unwrap();
//! engine.run(Box::new(Empty)).unwrap();
//!
//! engine.run_iteration(1.0 / 60.0);
//! assert_eq!(engine.scenes().current_scene_name(), Some("Empty"));
//! ```

use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use tessera_ecs::message::Message;

use crate::context::{Display, EngineContext};
use crate::error::EngineError;
use crate::render::Color;
use crate::scene::{Scene, SceneManager};

// ---------------------------------------------------------------------------
// RunOptions
// ---------------------------------------------------------------------------

/// How to run the engine.
///
/// Every field has a default, so JSON files only need the fields they
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Window title.
    pub title: String,
    /// Window and game width.
    pub width: u32,
    /// Window and game height.
    pub height: u32,
    /// No window and no drawing.
    pub headless: bool,
    pub fullscreen: bool,
    /// Wait for the display's vertical sync before presenting.
    pub vsync: bool,
    /// Keep the game size fixed when the window is resized.
    pub scale_on_resize: bool,
    /// Frames per second. Must be positive.
    pub fps_limit: u32,
    /// Keep running after a close request; the game handles closing itself.
    pub override_close_action: bool,
    /// Return from [`Engine::run`] right after activating the scene.
    pub no_run: bool,
    /// Clear colour.
    pub background: Color,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            title: "Tessera".to_owned(),
            width: 800,
            height: 800,
            headless: false,
            fullscreen: false,
            vsync: true,
            scale_on_resize: false,
            fps_limit: 60,
            override_close_action: false,
            no_run: false,
            background: Color::BLACK,
        }
    }
}

impl RunOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_scale_on_resize(mut self, scale_on_resize: bool) -> Self {
        self.scale_on_resize = scale_on_resize;
        self
    }

    pub fn with_fps_limit(mut self, fps_limit: u32) -> Self {
        self.fps_limit = fps_limit;
        self
    }

    pub fn with_override_close_action(mut self, override_close_action: bool) -> Self {
        self.override_close_action = override_close_action;
        self
    }

    pub fn with_no_run(mut self, no_run: bool) -> Self {
        self.no_run = no_run;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Parse options from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Read and parse a JSON options file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| EngineError::Config {
            reason: format!("{}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.fps_limit == 0 {
            return Err(EngineError::InvalidFpsLimit {
                limit: self.fps_limit,
            });
        }
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::Config {
                reason: format!("window size {}x{} must be positive", self.width, self.height),
            });
        }
        Ok(())
    }

    fn display(&self) -> Display {
        let mut display = Display::new(self.width as f32, self.height as f32);
        display.headless = self.headless;
        display.scale_on_resize = self.scale_on_resize;
        display.background = self.background;
        display
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Dispatched on the active scene's bus when the window changes size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowResizeMessage {
    pub old_width: f32,
    pub old_height: f32,
    pub new_width: f32,
    pub new_height: f32,
}

impl WindowResizeMessage {
    pub const KIND: &'static str = "WindowResizeMessage";
}

impl Message for WindowResizeMessage {
    fn kind(&self) -> &str {
        Self::KIND
    }
}

// ---------------------------------------------------------------------------
// Ticker and Clock
// ---------------------------------------------------------------------------

/// Fixed-rate frame pacer.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    /// A ticker firing `fps` times per second, first due one period from now.
    pub fn new(fps: u32) -> Result<Self, EngineError> {
        if fps == 0 {
            return Err(EngineError::InvalidFpsLimit { limit: fps });
        }
        let period = Duration::from_secs(1) / fps;
        Ok(Self {
            period,
            next: Instant::now() + period,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// When the next frame is due.
    pub fn deadline(&self) -> Instant {
        self.next
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    /// Schedule the next frame after one that ran at `now`. A ticker that
    /// fell more than a period behind drops the missed frames.
    pub fn advance(&mut self, now: Instant) {
        self.next += self.period;
        if self.next < now {
            self.next = now + self.period;
        }
    }

    /// Sleep until the next frame is due, then schedule the one after.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if now < self.next {
            std::thread::sleep(self.next - now);
        }
        self.advance(Instant::now());
    }
}

/// Frame timing: delta, total time and a once-per-second FPS estimate.
#[derive(Debug, Clone)]
pub struct Clock {
    start: Instant,
    last: Instant,
    delta: f32,
    frames: u64,
    window_start: Instant,
    window_frames: u32,
    fps: f32,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            delta: 0.0,
            frames: 0,
            window_start: now,
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// Mark a frame. Returns seconds since the previous one.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta = (now - self.last).as_secs_f32();
        self.last = now;
        self.frames += 1;
        self.window_frames += 1;

        let window = now - self.window_start;
        if window >= Duration::from_secs(1) {
            self.fps = self.window_frames as f32 / window.as_secs_f32();
            self.window_start = now;
            self.window_frames = 0;
        }
        self.delta
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Seconds since the clock was created.
    pub fn time(&self) -> f32 {
        (self.last - self.start).as_secs_f32()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the scenes and drives the frame loop.
#[derive(Debug)]
pub struct Engine {
    options: RunOptions,
    scenes: SceneManager,
    ticker: Ticker,
    clock: Clock,
    closed: bool,
}

impl Engine {
    pub fn new(options: RunOptions) -> Result<Self, EngineError> {
        options.validate()?;
        let ticker = Ticker::new(options.fps_limit)?;
        let root = EngineContext::new(options.display());
        Ok(Self {
            scenes: SceneManager::new(root),
            options,
            ticker,
            clock: Clock::new(),
            closed: false,
        })
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// The engine-wide context.
    pub fn context(&self) -> &EngineContext {
        self.scenes.root_context()
    }

    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    /// Change the frame rate. A zero limit is rejected and the current
    /// ticker keeps running.
    pub fn set_fps_limit(&mut self, limit: u32) -> Result<(), EngineError> {
        self.ticker = Ticker::new(limit)?;
        self.options.fps_limit = limit;
        tracing::debug!(limit, "fps limit changed");
        Ok(())
    }

    /// Keep running after close requests from now on.
    pub fn override_close_action(&mut self) {
        self.options.override_close_action = true;
    }

    /// Ask for the close sequence to run at the start of the next frame.
    /// Safe to call from any thread through [`EngineContext::close`].
    pub fn request_close(&self) {
        self.context().close.request();
    }

    /// Stop the loop after the current frame, skipping the close sequence.
    pub fn exit(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Activate `scene` and run until closed.
    ///
    /// With `no_run` set this returns as soon as the scene is active, and
    /// frames are driven by [`run_iteration`](Self::run_iteration).
    pub fn run(&mut self, scene: Box<dyn Scene>) -> Result<(), EngineError> {
        self.prepare(scene);
        if self.options.no_run {
            return Ok(());
        }

        if self.options.headless {
            self.run_headless();
            Ok(())
        } else {
            self.run_windowed()
        }
    }

    /// Install the signal handler, reset the clock and activate the first
    /// scene.
    pub fn prepare(&mut self, scene: Box<dyn Scene>) {
        let close = self.context().close.clone();
        if let Err(e) = ctrlc::set_handler(move || close.request()) {
            tracing::warn!(error = %e, "signal handler not installed");
        }

        self.clock = Clock::new();
        self.scenes.set_scene(scene, false);
    }

    fn run_headless(&mut self) {
        tracing::info!(fps = self.options.fps_limit, "running headless");
        while !self.closed {
            self.ticker.wait();
            let dt = self.clock.tick();
            self.run_iteration(dt);
        }
        tracing::info!(frames = self.clock.frames(), "engine stopped");
    }

    #[cfg(feature = "renderer")]
    fn run_windowed(&mut self) -> Result<(), EngineError> {
        crate::render::app::run_windowed(self)
    }

    #[cfg(not(feature = "renderer"))]
    fn run_windowed(&mut self) -> Result<(), EngineError> {
        Err(EngineError::RendererUnavailable)
    }

    /// Run one frame with `dt` seconds of elapsed time.
    pub fn run_iteration(&mut self, dt: f32) {
        if self.context().close.take() {
            self.close_event();
        }
        if self.closed {
            return;
        }

        self.scenes.update(dt);

        let ctx = self.context();
        ctx.input.borrow_mut().end_frame();
        if ctx.headless() {
            ctx.frame.borrow_mut().clear();
        }
    }

    /// Whether a paced frame is due at `now`. A due frame moves the ticker
    /// on to the next one.
    pub fn poll_frame(&mut self, now: Instant) -> bool {
        if self.ticker.is_due(now) {
            self.ticker.advance(now);
            true
        } else {
            false
        }
    }

    /// Time a frame on the engine clock, then run it.
    pub fn step(&mut self) {
        let dt = self.clock.tick();
        self.run_iteration(dt);
    }

    /// Tell every scene the game is closing, then stop unless the close
    /// action is overridden.
    pub fn close_event(&mut self) {
        tracing::info!("close requested");
        self.scenes.exit_all();
        if self.options.override_close_action {
            tracing::warn!("default close action overridden; the game must call exit itself");
        } else {
            self.exit();
        }
    }

    /// Record a new window size and tell the active scene.
    ///
    /// The game size follows the window unless `scale_on_resize` is set.
    pub fn resize(&mut self, width: f32, height: f32) {
        let message = {
            let mut display = self.context().display.borrow_mut();
            let message = WindowResizeMessage {
                old_width: display.window_width,
                old_height: display.window_height,
                new_width: width,
                new_height: height,
            };
            display.window_width = width;
            display.window_height = height;
            if !display.scale_on_resize {
                display.game_width = width;
                display.game_height = height;
            }
            message
        };
        tracing::debug!(width, height, "window resized");

        if let Some(ctx) = self.scenes.current_context() {
            ctx.bus.dispatch(&message);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

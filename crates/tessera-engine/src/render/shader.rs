//! Shader programs.
//!
//! A [`Shader`] turns sorted, visible render components into frame commands.
//! The render system calls [`Shader::pre`] once per run of entities sharing a
//! shader, [`Shader::draw`] per entity and [`Shader::post`] when the run ends,
//! so program switches are bounded by the number of shader runs in draw
//! order, not by the number of entities.
//!
//! Two programs are built in: [`WorldShader`] follows the camera and
//! [`HudShader`] draws in screen space.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::component::QuadBuffer;
use super::frame::{CameraView, ProgramKind, RenderCommand, RenderFrame, Uniforms, Viewport};
use super::texture::{Texture, TextureId};

static NEXT_SHADER: AtomicU64 = AtomicU64::new(1);

/// Identity of a shader; the secondary draw-order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u64);

impl ShaderId {
    pub fn next() -> Self {
        Self(NEXT_SHADER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Shader trait
// ---------------------------------------------------------------------------

/// A program that records the draws for its entities.
pub trait Shader {
    /// Set up for `viewport`. Called once before first use.
    fn initialize(&mut self, viewport: Viewport);

    /// Recompute the projection after a resize.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Bind the program and its per-frame uniforms.
    fn pre(&mut self, frame: &mut RenderFrame, camera: CameraView);

    /// Draw one quad with its top-left corner at `(x, y)`.
    fn draw(
        &mut self,
        frame: &mut RenderFrame,
        texture: &Texture,
        buffer: &QuadBuffer,
        x: f32,
        y: f32,
        rotation: f32,
    );

    /// End a run of draws.
    fn post(&mut self, frame: &mut RenderFrame);
}

/// A shared, identified shader.
///
/// Render components hold handles; clones refer to the same program.
#[derive(Clone)]
pub struct ShaderHandle {
    id: ShaderId,
    inner: Rc<RefCell<dyn Shader>>,
}

impl ShaderHandle {
    pub fn new<S: Shader + 'static>(shader: S) -> Self {
        Self {
            id: ShaderId::next(),
            inner: Rc::new(RefCell::new(shader)),
        }
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    /// Mutable access to the program.
    ///
    /// # Panics
    ///
    /// Panics if the program is already borrowed, e.g. when a shader tries to
    /// reach itself through its own handle.
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, dyn Shader + 'static> {
        self.inner.borrow_mut()
    }
}

impl PartialEq for ShaderHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for ShaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShaderHandle").field(&self.id).finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in programs
// ---------------------------------------------------------------------------

/// Shared state of the built-in programs.
#[derive(Debug)]
struct QuadProgram {
    kind: ProgramKind,
    projection: [f32; 2],
    last_texture: Option<TextureId>,
}

impl QuadProgram {
    fn new(kind: ProgramKind) -> Self {
        Self {
            kind,
            projection: [1.0, 1.0],
            last_texture: None,
        }
    }

    fn pre(&mut self, frame: &mut RenderFrame, camera: [f32; 3]) {
        frame.push(RenderCommand::UseProgram {
            program: self.kind,
            uniforms: Uniforms {
                projection: self.projection,
                camera,
            },
        });
    }

    fn draw(&mut self, frame: &mut RenderFrame, texture: &Texture, buffer: &QuadBuffer, position: [f32; 2], rotation: f32) {
        if self.last_texture != Some(texture.id()) {
            frame.push(RenderCommand::BindTexture {
                texture: texture.clone(),
            });
            self.last_texture = Some(texture.id());
        }
        frame.push(RenderCommand::DrawQuad {
            buffer: buffer.id(),
            revision: buffer.revision(),
            vertices: *buffer.vertices(),
            position,
            rotation,
        });
    }

    fn post(&mut self) {
        self.last_texture = None;
    }
}

/// World-space program: the camera position is subtracted and the result is
/// divided by the zoom.
#[derive(Debug)]
pub struct WorldShader {
    program: QuadProgram,
}

impl Default for WorldShader {
    fn default() -> Self {
        Self {
            program: QuadProgram::new(ProgramKind::World),
        }
    }
}

impl Shader for WorldShader {
    fn initialize(&mut self, viewport: Viewport) {
        self.set_viewport(viewport);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.program.projection = viewport.projection();
    }

    fn pre(&mut self, frame: &mut RenderFrame, camera: CameraView) {
        self.program.pre(frame, [camera.x, camera.y, camera.zoom]);
    }

    fn draw(
        &mut self,
        frame: &mut RenderFrame,
        texture: &Texture,
        buffer: &QuadBuffer,
        x: f32,
        y: f32,
        rotation: f32,
    ) {
        self.program.draw(frame, texture, buffer, [x, y], rotation);
    }

    fn post(&mut self, _frame: &mut RenderFrame) {
        self.program.post();
    }
}

/// Screen-space program: camera pan and zoom have no effect.
#[derive(Debug)]
pub struct HudShader {
    program: QuadProgram,
}

impl Default for HudShader {
    fn default() -> Self {
        Self {
            program: QuadProgram::new(ProgramKind::Hud),
        }
    }
}

impl Shader for HudShader {
    fn initialize(&mut self, viewport: Viewport) {
        self.set_viewport(viewport);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.program.projection = viewport.projection();
    }

    fn pre(&mut self, frame: &mut RenderFrame, _camera: CameraView) {
        self.program.pre(frame, [0.0, 0.0, 1.0]);
    }

    fn draw(
        &mut self,
        frame: &mut RenderFrame,
        texture: &Texture,
        buffer: &QuadBuffer,
        x: f32,
        y: f32,
        rotation: f32,
    ) {
        self.program.draw(frame, texture, buffer, [x, y], rotation);
    }

    fn post(&mut self, _frame: &mut RenderFrame) {
        self.program.post();
    }
}

// ---------------------------------------------------------------------------
// Shaders
// ---------------------------------------------------------------------------

/// The engine's built-in shader handles.
#[derive(Debug, Clone)]
pub struct Shaders {
    world: ShaderHandle,
    hud: ShaderHandle,
}

impl Shaders {
    /// Build and initialise both programs for `viewport`.
    pub fn new(viewport: Viewport) -> Self {
        let world = ShaderHandle::new(WorldShader::default());
        let hud = ShaderHandle::new(HudShader::default());
        world.borrow_mut().initialize(viewport);
        hud.borrow_mut().initialize(viewport);
        Self { world, hud }
    }

    /// The shader used by components that name none.
    pub fn default_shader(&self) -> &ShaderHandle {
        &self.world
    }

    pub fn world(&self) -> &ShaderHandle {
        &self.world
    }

    pub fn hud(&self) -> &ShaderHandle {
        &self.hud
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Recorded draw commands.
//!
//! Shaders do not talk to the GPU directly. They append [`RenderCommand`]s to
//! a [`RenderFrame`], which the windowed runner hands to the GPU backend once
//! per frame. Headless runs never record anything, and tests inspect the
//! command list instead of pixels.

use super::texture::Texture;
use super::vertex::{Color, SpriteVertex};

// ---------------------------------------------------------------------------
// Uniform inputs
// ---------------------------------------------------------------------------

/// Size of the area a shader projects, in game units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Half extents; dividing by these maps the viewport onto `-1..=1`.
    pub fn projection(&self) -> [f32; 2] {
        [self.width / 2.0, self.height / 2.0]
    }
}

/// Camera state as seen by shaders for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// The two programs the GPU backend knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Positions are offset by the camera and divided by its zoom.
    World,
    /// Positions map straight to the screen.
    Hud,
}

/// Per-frame uniforms uploaded when a program is bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniforms {
    /// Viewport half extents.
    pub projection: [f32; 2],
    /// Camera `[x, y, zoom]`. Ignored by the HUD program.
    pub camera: [f32; 3],
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Identity of a quad vertex buffer. Each render component owns exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u64);

impl BufferId {
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// One recorded GPU operation.
#[derive(Debug, Clone)]
pub enum RenderCommand {
    /// Clear the target to `color`.
    Clear { color: Color },
    /// Bind `program` and upload its uniforms.
    UseProgram {
        program: ProgramKind,
        uniforms: Uniforms,
    },
    /// Bind `texture` for the following draws.
    BindTexture { texture: Texture },
    /// Draw one quad at `position`.
    ///
    /// Backends cache uploaded vertices by `buffer` and re-upload only when
    /// `revision` changes.
    DrawQuad {
        buffer: BufferId,
        revision: u64,
        vertices: [SpriteVertex; 4],
        position: [f32; 2],
        rotation: f32,
    },
}

/// The command list for one frame.
#[derive(Debug, Default)]
pub struct RenderFrame {
    commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Number of `DrawQuad` commands recorded.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::DrawQuad { .. }))
            .count()
    }

    /// Take the recorded commands, leaving the frame empty.
    pub fn take(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

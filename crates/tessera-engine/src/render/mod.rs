//! Sprite rendering.
//!
//! The render pipeline is split in two halves. The portable half lives here
//! and always compiles: textures and drawables, vertex generation, the
//! [`RenderComponent`], the [`Shader`] programs and the [`RenderSystem`] that
//! sorts entities and records a [`RenderFrame`] of commands every update.
//!
//! The GPU half is feature-gated behind `renderer`. It owns the window and
//! the wgpu device and replays each recorded frame. Headless runs record
//! nothing, so they need neither.

pub mod component;
pub mod frame;
pub mod shader;
pub mod system;
pub mod texture;
pub mod vertex;

#[cfg(feature = "renderer")]
pub mod app;
#[cfg(feature = "renderer")]
pub mod gpu;

pub use component::{OrderNotifier, QuadBuffer, RenderComponent};
pub use frame::{
    BufferId, CameraView, ProgramKind, RenderCommand, RenderFrame, Uniforms, Viewport,
};
pub use shader::{HudShader, Shader, ShaderHandle, ShaderId, Shaders, WorldShader};
pub use system::{RenderEntity, RenderOrderChanged, RenderSystem, RENDER_PRIORITY};
pub use texture::{Drawable, Texture, TextureId, UvRect};
pub use vertex::{pack_tint, quad_indices, quad_vertices, Color, SpriteVertex, MAX_QUADS};

#[cfg(feature = "renderer")]
pub use gpu::GpuRenderer;

//! The render component.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::Point;

use super::frame::BufferId;
use super::shader::ShaderHandle;
use super::texture::Drawable;
use super::vertex::{pack_tint, quad_vertices, Color, SpriteVertex};

static NEXT_BUFFER: AtomicU64 = AtomicU64::new(1);

/// Callback a render system injects to hear about draw-order changes.
pub type OrderNotifier = Rc<dyn Fn()>;

// ---------------------------------------------------------------------------
// QuadBuffer
// ---------------------------------------------------------------------------

/// A component's vertices plus the revision the GPU copy must match.
#[derive(Debug, Clone)]
pub struct QuadBuffer {
    id: BufferId,
    revision: u64,
    vertices: [SpriteVertex; 4],
}

impl QuadBuffer {
    fn new(vertices: [SpriteVertex; 4]) -> Self {
        Self {
            id: BufferId(NEXT_BUFFER.fetch_add(1, Ordering::Relaxed)),
            revision: 0,
            vertices,
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Bumped every time the vertices are regenerated.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn vertices(&self) -> &[SpriteVertex; 4] {
        &self.vertices
    }
}

// ---------------------------------------------------------------------------
// RenderComponent
// ---------------------------------------------------------------------------

/// How an entity is drawn.
///
/// Drawable, scale, colour and opacity can only change through their setters,
/// each of which regenerates the vertex buffer. Shader and z-index setters
/// leave the vertices alone and notify the owning render system instead, which
/// re-sorts before the next frame.
pub struct RenderComponent {
    hidden: bool,
    opacity: f32,
    color: Color,
    scale: Point,
    shader: Option<ShaderHandle>,
    z_index: f32,
    drawable: Drawable,
    buffer: QuadBuffer,
    notifier: Option<OrderNotifier>,
}

impl RenderComponent {
    /// A visible, white, unscaled component at z-index 0 using the default
    /// shader.
    pub fn new(drawable: Drawable) -> Self {
        let mut component = Self {
            hidden: false,
            opacity: 1.0,
            color: Color::WHITE,
            scale: Point::new(1.0, 1.0),
            shader: None,
            z_index: 0.0,
            drawable,
            buffer: QuadBuffer::new([SpriteVertex::default(); 4]),
            notifier: None,
        };
        component.buffer.vertices = component.generate();
        component
    }

    /// Builder form of [`set_shader`](Self::set_shader).
    pub fn with_shader(mut self, shader: ShaderHandle) -> Self {
        self.shader = Some(shader);
        self
    }

    /// Builder form of [`set_z_index`](Self::set_z_index).
    pub fn with_z_index(mut self, z_index: f32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Builder form of [`set_scale`](Self::set_scale).
    pub fn with_scale(mut self, scale: Point) -> Self {
        self.set_scale(scale);
        self
    }

    /// Builder form of [`set_color`](Self::set_color).
    pub fn with_color(mut self, color: Color) -> Self {
        self.set_color(color);
        self
    }

    // -- vertex-affecting setters ------------------------------------------

    pub fn set_drawable(&mut self, drawable: Drawable) {
        self.drawable = drawable;
        self.regenerate();
    }

    pub fn set_scale(&mut self, scale: Point) {
        self.scale = scale;
        self.regenerate();
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.regenerate();
    }

    /// Set the opacity, clamped to `0.0..=1.0`.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.regenerate();
    }

    // -- order-affecting setters -------------------------------------------

    /// Use `shader`, or the default shader for `None`.
    pub fn set_shader(&mut self, shader: Option<ShaderHandle>) {
        self.shader = shader;
        self.notify_order_changed();
    }

    pub fn set_z_index(&mut self, z_index: f32) {
        self.z_index = z_index;
        self.notify_order_changed();
    }

    // -- plain setters ------------------------------------------------------

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    // -- accessors ----------------------------------------------------------

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn scale(&self) -> Point {
        self.scale
    }

    pub fn shader(&self) -> Option<&ShaderHandle> {
        self.shader.as_ref()
    }

    pub fn z_index(&self) -> f32 {
        self.z_index
    }

    pub fn drawable(&self) -> &Drawable {
        &self.drawable
    }

    pub fn buffer(&self) -> &QuadBuffer {
        &self.buffer
    }

    // -- render system hooks ------------------------------------------------

    pub(crate) fn set_order_notifier(&mut self, notifier: Option<OrderNotifier>) {
        self.notifier = notifier;
    }

    fn notify_order_changed(&self) {
        if let Some(notify) = &self.notifier {
            notify();
        }
    }

    fn generate(&self) -> [SpriteVertex; 4] {
        quad_vertices(
            self.drawable.width(),
            self.drawable.height(),
            [self.scale.x, self.scale.y],
            0.0,
            self.drawable.view(),
            pack_tint(self.color, self.opacity),
        )
    }

    fn regenerate(&mut self) {
        self.buffer.vertices = self.generate();
        self.buffer.revision += 1;
    }
}

impl fmt::Debug for RenderComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderComponent")
            .field("hidden", &self.hidden)
            .field("opacity", &self.opacity)
            .field("color", &self.color)
            .field("scale", &self.scale)
            .field("shader", &self.shader)
            .field("z_index", &self.z_index)
            .field("drawable", &self.drawable)
            .field("revision", &self.buffer.revision)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

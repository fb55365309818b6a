//! Sprite vertex generation.
//!
//! Every render component owns one quad: four [`SpriteVertex`]es at the local
//! origin, scaled to the drawable's size. Position on screen is applied per
//! draw by the shader, so the quad only changes when the drawable, scale,
//! colour or opacity does.
//!
//! All quads share one index buffer built by [`quad_indices`].

use serde::{Deserialize, Serialize};

/// Upper bound on quads addressable by the shared index buffer.
pub const MAX_QUADS: usize = 10_000;

/// Indices per quad (two triangles).
pub const INDICES_PER_QUAD: usize = 6;

/// Mask applied to packed tints; clears the lowest alpha bit.
const TINT_MASK: u32 = 0xfeff_ffff;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as floats in `0.0..=1.0`.
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

// ---------------------------------------------------------------------------
// SpriteVertex
// ---------------------------------------------------------------------------

/// One corner of a sprite quad, laid out for the GPU.
///
/// `tint` is packed by [`pack_tint`]; read as `unorm8x4` it yields
/// `(r, g, b, a)`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "renderer",
    derive(bytemuck_derive::Pod, bytemuck_derive::Zeroable)
)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub tint: u32,
}

/// Pack `color` with `opacity` into a single word: alpha in the high byte,
/// then blue, green, red.
///
/// The colour's own alpha channel is ignored; `opacity` (clamped to
/// `0.0..=1.0`) is the alpha.
pub fn pack_tint(color: Color, opacity: f32) -> u32 {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0) as u32;
    let packed = alpha << 24 | (color.b as u32) << 16 | (color.g as u32) << 8 | color.r as u32;
    packed & TINT_MASK
}

/// The four corners of a `width` x `height` quad at the origin, scaled by
/// `scale` and rotated by `rotation` degrees about the origin.
///
/// Vertex order is top-left, top-right, bottom-right, bottom-left, matching
/// [`quad_indices`].
pub fn quad_vertices(
    width: f32,
    height: f32,
    scale: [f32; 2],
    rotation: f32,
    view: super::UvRect,
    tint: u32,
) -> [SpriteVertex; 4] {
    let (fx2, fy2) = (width * scale[0], height * scale[1]);

    // p1 top-left, p2 bottom-left, p3 bottom-right, p4 top-right.
    let (p1, p2, p3, p4) = ([0.0, 0.0], [0.0, fy2], [fx2, fy2], [fx2, 0.0]);

    let (c1, c2, c3, c4) = if rotation != 0.0 {
        let (sin, cos) = rotation.to_radians().sin_cos();
        let rotate = |p: [f32; 2]| [cos * p[0] - sin * p[1], sin * p[0] + cos * p[1]];
        let (r1, r2, r3) = (rotate(p1), rotate(p2), rotate(p3));
        let r4 = [r1[0] + (r3[0] - r2[0]), r3[1] - (r2[1] - r1[1])];
        (r1, r2, r3, r4)
    } else {
        (p1, p2, p3, p4)
    };

    let vertex = |position: [f32; 2], u: f32, v: f32| SpriteVertex {
        position,
        uv: [u, v],
        tint,
    };
    [
        vertex(c1, view.u, view.v),
        vertex(c4, view.u2, view.v),
        vertex(c3, view.u2, view.v2),
        vertex(c2, view.u, view.v2),
    ]
}

/// Index list for `quads` quads: `j, j+1, j+2, j, j+2, j+3` with `j = 4 * quad`.
///
/// # Panics
///
/// Panics if `quads * 4` vertices do not fit in `u16` indices.
pub fn quad_indices(quads: usize) -> Vec<u16> {
    assert!(
        quads * 4 <= u16::MAX as usize + 1,
        "{quads} quads exceed the u16 index range"
    );
    let mut indices = Vec::with_capacity(quads * INDICES_PER_QUAD);
    for quad in 0..quads {
        let j = (quad * 4) as u16;
        indices.extend_from_slice(&[j, j + 1, j + 2, j, j + 2, j + 3]);
    }
    indices
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::UvRect;

    #[test]
    fn tint_byte_order_is_abgr() {
        let tint = pack_tint(Color::rgb(0x11, 0x22, 0x33), 1.0);
        // Alpha 0xff masked to 0xfe.
        assert_eq!(tint, 0xfe33_2211);
    }

    #[test]
    fn tint_uses_opacity_not_color_alpha() {
        let tint = pack_tint(Color::rgba(255, 255, 255, 0), 0.5);
        assert_eq!(tint >> 24, 127 & 0xfe);
    }

    #[test]
    fn tint_clamps_opacity() {
        assert_eq!(pack_tint(Color::BLACK, 2.0) >> 24, 0xfe);
        assert_eq!(pack_tint(Color::BLACK, -1.0) >> 24, 0);
    }

    #[test]
    fn quad_corners_follow_scale_and_view() {
        let view = UvRect {
            u: 0.1,
            v: 0.2,
            u2: 0.3,
            v2: 0.4,
        };
        let quad = quad_vertices(10.0, 20.0, [2.0, 0.5], 0.0, view, 7);

        assert_eq!(quad[0].position, [0.0, 0.0]);
        assert_eq!(quad[1].position, [20.0, 0.0]);
        assert_eq!(quad[2].position, [20.0, 10.0]);
        assert_eq!(quad[3].position, [0.0, 10.0]);

        assert_eq!(quad[0].uv, [0.1, 0.2]);
        assert_eq!(quad[1].uv, [0.3, 0.2]);
        assert_eq!(quad[2].uv, [0.3, 0.4]);
        assert_eq!(quad[3].uv, [0.1, 0.4]);

        assert!(quad.iter().all(|v| v.tint == 7));
    }

    #[test]
    fn quarter_turn_rotates_about_origin() {
        let quad = quad_vertices(10.0, 10.0, [1.0, 1.0], 90.0, UvRect::FULL, 0);
        let close = |a: [f32; 2], b: [f32; 2]| (a[0] - b[0]).abs() < 1e-4 && (a[1] - b[1]).abs() < 1e-4;

        assert!(close(quad[0].position, [0.0, 0.0]));
        assert!(close(quad[1].position, [0.0, 10.0]));
        assert!(close(quad[2].position, [-10.0, 10.0]));
        assert!(close(quad[3].position, [-10.0, 0.0]));
    }

    #[test]
    fn indices_are_arithmetic() {
        let indices = quad_indices(3);
        assert_eq!(indices.len(), 18);
        assert_eq!(&indices[..6], &[0, 1, 2, 0, 2, 3]);
        assert_eq!(&indices[12..], &[8, 9, 10, 8, 10, 11]);
    }

    #[test]
    fn max_quads_fit_in_u16() {
        let indices = quad_indices(MAX_QUADS);
        assert_eq!(indices.len(), MAX_QUADS * INDICES_PER_QUAD);
        assert_eq!(*indices.last().unwrap() as usize, MAX_QUADS * 4 - 1);
    }

    #[test]
    #[should_panic(expected = "exceed the u16 index range")]
    fn too_many_quads_panics() {
        quad_indices(20_000);
    }
}

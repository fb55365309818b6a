//! Textures and drawables.
//!
//! A [`Texture`] is a decoded RGBA image with a process-unique id; clones share
//! the pixel data, so many render components can point at one loaded image. A
//! [`Drawable`] is a texture plus the normalised UV rectangle to sample and
//! the pixel size to draw it at.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;

use super::Color;

static NEXT_TEXTURE: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Texture
// ---------------------------------------------------------------------------

/// Identity of a texture. GPU backends key their uploads by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// A shared RGBA image.
#[derive(Clone)]
pub struct Texture {
    id: TextureId,
    width: u32,
    height: u32,
    pixels: Arc<RgbaImage>,
}

impl Texture {
    /// Wrap a decoded image.
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            id: TextureId::next(),
            width: image.width(),
            height: image.height(),
            pixels: Arc::new(image),
        }
    }

    /// A `width` x `height` texture filled with `color`.
    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        let pixel = image::Rgba([color.r, color.g, color.b, color.a]);
        Self::from_image(RgbaImage::from_pixel(width, height, pixel))
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The RGBA pixel data, row-major.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// UvRect
// ---------------------------------------------------------------------------

/// A normalised texture rectangle: `(u, v)` top-left, `(u2, v2)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u: f32,
    pub v: f32,
    pub u2: f32,
    pub v2: f32,
}

impl UvRect {
    /// The whole texture.
    pub const FULL: UvRect = UvRect {
        u: 0.0,
        v: 0.0,
        u2: 1.0,
        v2: 1.0,
    };
}

// ---------------------------------------------------------------------------
// Drawable
// ---------------------------------------------------------------------------

/// What a render component draws: a texture region and its pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    texture: Texture,
    view: UvRect,
    width: f32,
    height: f32,
}

impl Drawable {
    /// The whole texture at its natural size.
    pub fn from_texture(texture: Texture) -> Self {
        let (width, height) = (texture.width() as f32, texture.height() as f32);
        Self {
            texture,
            view: UvRect::FULL,
            width,
            height,
        }
    }

    /// The `w` x `h` pixel rectangle at `(x, y)` in `texture`.
    ///
    /// Negative sizes flip the region; the drawn size is the absolute value.
    pub fn region(texture: Texture, x: f32, y: f32, w: f32, h: f32) -> Self {
        let inv_width = 1.0 / texture.width() as f32;
        let inv_height = 1.0 / texture.height() as f32;
        let view = UvRect {
            u: x * inv_width,
            v: y * inv_height,
            u2: (x + w) * inv_width,
            v2: (y + h) * inv_height,
        };
        Self {
            texture,
            view,
            width: w.abs(),
            height: h.abs(),
        }
    }

    /// Cell `index` of a sprite sheet laid out left to right, top to bottom,
    /// with cells of `cell_width` x `cell_height` pixels.
    pub fn from_sheet(sheet: Texture, cell_width: u32, cell_height: u32, index: u32) -> Self {
        let per_row = (sheet.width() / cell_width.max(1)).max(1);
        let x = (index % per_row) * cell_width;
        let y = (index / per_row) * cell_height;
        Self::region(
            sheet,
            x as f32,
            y as f32,
            cell_width as f32,
            cell_height as f32,
        )
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn view(&self) -> UvRect {
        self.view
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Texture {
        Texture::solid(64, 32, Color::WHITE)
    }

    #[test]
    fn textures_get_distinct_ids() {
        let a = Texture::solid(1, 1, Color::WHITE);
        let b = Texture::solid(1, 1, Color::WHITE);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn solid_texture_fills_pixels() {
        let t = Texture::solid(2, 3, Color::rgba(10, 20, 30, 40));
        assert_eq!((t.width(), t.height()), (2, 3));
        assert_eq!(t.pixels().get_pixel(1, 2).0, [10, 20, 30, 40]);
    }

    #[test]
    fn full_texture_drawable() {
        let d = Drawable::from_texture(sheet());
        assert_eq!(d.view(), UvRect::FULL);
        assert_eq!((d.width(), d.height()), (64.0, 32.0));
    }

    #[test]
    fn region_normalises_uvs() {
        let d = Drawable::region(sheet(), 16.0, 8.0, 16.0, 8.0);
        assert_eq!(
            d.view(),
            UvRect {
                u: 0.25,
                v: 0.25,
                u2: 0.5,
                v2: 0.5
            }
        );
        assert_eq!((d.width(), d.height()), (16.0, 8.0));
    }

    #[test]
    fn negative_region_flips_but_keeps_size() {
        let d = Drawable::region(sheet(), 32.0, 0.0, -32.0, 32.0);
        assert_eq!(d.view().u, 0.5);
        assert_eq!(d.view().u2, 0.0);
        assert_eq!(d.width(), 32.0);
    }

    #[test]
    fn sheet_cells_wrap_rows() {
        // 64 px wide sheet with 16 px cells: 4 cells per row.
        let d = Drawable::from_sheet(sheet(), 16, 16, 5);
        assert_eq!(d.view().u, 0.25);
        assert_eq!(d.view().v, 0.5);
        assert_eq!((d.width(), d.height()), (16.0, 16.0));
    }
}

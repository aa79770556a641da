//! Software canvas over a [`PixelBuffer`].
//!
//! A minimal drawing context: save/restore, translate + uniform scale,
//! rectangle and outline-shape clipping (inclusive and exclusive), solid
//! fills, and a nearest-neighbor stretch-copy for compositing one buffer
//! onto another. This is the contract both the content-draw callback and
//! the blur composite run against.
//!
//! # Design Decisions
//!
//! - **Uniform affine transform**: the pipeline only ever needs translate
//!   and uniform scale (inset shift plus 1/downscale), so the transform is
//!   `(tx, ty, scale)` with `device = t + scale * user`.
//! - **Per-pixel shape clip**: rounded exclusion windows are resolved to
//!   coverage tests instead of paths; the rectangle clip stays a plain
//!   intersection so the common case costs nothing per pixel.

use crate::buffer::PixelBuffer;
use crate::outline::ShapeGeometry;
use crate::types::{Argb, Rect};

// =============================================================================
// Paint
// =============================================================================

/// Compositing parameters applied when stretch-copying a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paint {
    /// Global opacity, 0..=255.
    pub alpha: u8,
}

impl Paint {
    pub const fn opaque() -> Self {
        Self { alpha: 255 }
    }

    pub const fn with_alpha(alpha: u8) -> Self {
        Self { alpha }
    }
}

impl Default for Paint {
    fn default() -> Self {
        Self::opaque()
    }
}

// =============================================================================
// Canvas
// =============================================================================

/// A shape clip entry, frozen together with the transform that was current
/// when it was pushed.
#[derive(Debug, Clone)]
struct ShapeClip {
    geom: ShapeGeometry,
    tx: f32,
    ty: f32,
    scale: f32,
    invert: bool,
}

impl ShapeClip {
    #[inline]
    fn passes(&self, px: i32, py: i32) -> bool {
        let ux = (px as f32 + 0.5 - self.tx) / self.scale;
        let uy = (py as f32 + 0.5 - self.ty) / self.scale;
        self.geom.contains(ux, uy) != self.invert
    }
}

#[derive(Debug, Clone)]
struct DrawState {
    tx: f32,
    ty: f32,
    scale: f32,
    /// Device-space rectangle clip.
    clip: Rect,
    /// Additional shape clips; a pixel must pass every entry.
    shapes: Vec<ShapeClip>,
}

/// Drawing context bound to one target buffer.
pub struct Canvas<'a> {
    target: &'a mut PixelBuffer,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl<'a> Canvas<'a> {
    /// Create a canvas covering the whole target buffer, identity transform.
    pub fn new(target: &'a mut PixelBuffer) -> Self {
        let clip = target.bounds();
        Self {
            target,
            state: DrawState {
                tx: 0.0,
                ty: 0.0,
                scale: 1.0,
                clip,
                shapes: Vec::new(),
            },
            stack: Vec::new(),
        }
    }

    /// Push the current transform and clip.
    pub fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    /// Pop back to the most recent [`save`]. Unbalanced restores are ignored.
    ///
    /// [`save`]: Canvas::save
    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    /// Translate subsequent drawing by (dx, dy) user units.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.state.tx += self.state.scale * dx;
        self.state.ty += self.state.scale * dy;
    }

    /// Scale subsequent drawing uniformly.
    pub fn scale(&mut self, factor: f32) {
        self.state.scale *= factor;
    }

    /// Current device translation.
    pub fn translation(&self) -> (f32, f32) {
        (self.state.tx, self.state.ty)
    }

    /// Current device scale factor.
    pub fn scale_factor(&self) -> f32 {
        self.state.scale
    }

    /// Intersect the clip with a user-space rectangle.
    pub fn clip_rect(&mut self, rect: Rect) {
        let device = self.map_rect(rect);
        self.state.clip = self.state.clip.intersect(&device);
    }

    /// Intersect the clip with resolved shape geometry (`invert: false`)
    /// or with its complement (`invert: true`).
    pub fn clip_shape(&mut self, geom: ShapeGeometry, invert: bool) {
        // A non-inverted rectangle is just a rectangle clip; keep the
        // per-pixel shape list for rounded or excluded geometry only.
        if !invert && let ShapeGeometry::Rect(r) = geom {
            let device = self.map_rect(r);
            self.state.clip = self.state.clip.intersect(&device);
            return;
        }
        self.state.shapes.push(ShapeClip {
            geom,
            tx: self.state.tx,
            ty: self.state.ty,
            scale: self.state.scale,
            invert,
        });
    }

    /// Map a user-space rectangle to device pixels.
    fn map_rect(&self, rect: Rect) -> Rect {
        let s = self.state.scale;
        Rect {
            left: (self.state.tx + s * rect.left as f32).round() as i32,
            top: (self.state.ty + s * rect.top as f32).round() as i32,
            right: (self.state.tx + s * rect.right as f32).round() as i32,
            bottom: (self.state.ty + s * rect.bottom as f32).round() as i32,
        }
    }

    #[inline]
    fn shapes_pass(&self, px: i32, py: i32) -> bool {
        self.state.shapes.iter().all(|s| s.passes(px, py))
    }

    /// Fill a user-space rectangle with a color, src-over blended.
    pub fn fill_rect(&mut self, rect: Rect, color: Argb) {
        if color.is_transparent() {
            return;
        }
        let area = self.map_rect(rect).intersect(&self.state.clip);
        for py in area.top..area.bottom {
            for px in area.left..area.right {
                if self.shapes_pass(px, py) {
                    let dst = self.target.pixel(px, py);
                    self.target.set_pixel(px, py, blend(color, dst));
                }
            }
        }
    }

    /// Stretch-copy `src_rect` pixels of `src` onto the user-space
    /// `dst_rect`, nearest-neighbor sampled, with the paint's global alpha.
    pub fn draw_buffer(&mut self, src: &PixelBuffer, src_rect: Rect, dst_rect: Rect, paint: Paint) {
        if paint.alpha == 0 || src_rect.is_empty() || dst_rect.is_empty() {
            return;
        }
        let device = self.map_rect(dst_rect);
        if device.is_empty() {
            return;
        }
        let area = device.intersect(&self.state.clip);
        let sx_step = src_rect.width() as f32 / device.width() as f32;
        let sy_step = src_rect.height() as f32 / device.height() as f32;

        for py in area.top..area.bottom {
            let v = (py - device.top) as f32 + 0.5;
            let sy = (src_rect.top + (v * sy_step) as i32).min(src_rect.bottom - 1);
            for px in area.left..area.right {
                if !self.shapes_pass(px, py) {
                    continue;
                }
                let u = (px - device.left) as f32 + 0.5;
                let sx = (src_rect.left + (u * sx_step) as i32).min(src_rect.right - 1);
                let sample = scale_alpha(src.pixel(sx, sy), paint.alpha);
                let dst = self.target.pixel(px, py);
                self.target.set_pixel(px, py, blend(sample, dst));
            }
        }
    }
}

// =============================================================================
// Blending
// =============================================================================

/// Scale a color's alpha channel by `alpha / 255`.
#[inline]
fn scale_alpha(c: Argb, alpha: u8) -> Argb {
    if alpha == 255 {
        return c;
    }
    let a = (c.a() as u32 * alpha as u32) / 255;
    Argb((c.0 & 0x00FF_FFFF) | (a << 24))
}

/// Porter-Duff src-over for straight-alpha packed pixels.
#[inline]
fn blend(src: Argb, dst: Argb) -> Argb {
    let sa = src.a() as u32;
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = dst.a() as u32;
    let inv = 255 - sa;
    let out_a = sa + da * inv / 255;
    if out_a == 0 {
        return Argb::TRANSPARENT;
    }
    let ch = |shift: u32| {
        let sc = (src.0 >> shift) & 0xFF;
        let dc = (dst.0 >> shift) & 0xFF;
        (sc * sa + dc * da * inv / 255) / out_a
    };
    Argb((out_a << 24) | (ch(16) << 16) | (ch(8) << 8) | ch(0))
}

// =============================================================================
// Tests
// =============================================================================

//! Outline shapes for clipping overlays.
//!
//! An [`OutlineShape`] describes the footprint of a post-effect: a plain
//! rectangle, a uniformly rounded rectangle, or a per-corner rounded
//! rectangle. The shape is stateless with respect to the overlay - it is
//! handed a bounding box every time - but rounded variants memoize the
//! geometry resolved for the last-seen bounds so unchanged frames don't
//! regenerate it.
//!
//! Degenerate all-zero radii normalize to [`OutlineShape::Rect`], which
//! clips through the cheaper rectangle path.

use std::cell::RefCell;

use crate::canvas::Canvas;
use crate::error::BlurError;
use crate::types::Rect;

// =============================================================================
// OutlineShape
// =============================================================================

/// The clip geometry of an overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum OutlineShape {
    /// Plain axis-aligned rectangle.
    Rect,
    /// Rounded rectangle, uniform or per-corner.
    Round(RoundRect),
}

impl OutlineShape {
    /// Rounded rectangle with one radius for every corner.
    /// Radius 0 normalizes to [`OutlineShape::Rect`].
    pub fn round_rect(radius: f32) -> Result<Self, BlurError> {
        Self::round_rect_xy(radius, radius)
    }

    /// Rounded rectangle with separate x/y corner radii.
    pub fn round_rect_xy(rx: f32, ry: f32) -> Result<Self, BlurError> {
        check_radius(rx)?;
        check_radius(ry)?;
        if rx == 0.0 && ry == 0.0 {
            return Ok(OutlineShape::Rect);
        }
        Ok(OutlineShape::Round(RoundRect::new(rx, ry, None)))
    }

    /// Rounded rectangle with per-corner radii:
    /// `[tl_x, tl_y, tr_x, tr_y, br_x, br_y, bl_x, bl_y]`.
    ///
    /// All-zero radii normalize to [`OutlineShape::Rect`]; uniform radii
    /// collapse to the cheaper two-radius form.
    pub fn round_rect_corners(radii: [f32; 8]) -> Result<Self, BlurError> {
        let mut zero = true;
        for r in radii {
            check_radius(r)?;
            zero = zero && r == 0.0;
        }
        if zero {
            return Ok(OutlineShape::Rect);
        }
        let uniform = radii[0] == radii[2]
            && radii[2] == radii[4]
            && radii[4] == radii[6]
            && radii[1] == radii[3]
            && radii[3] == radii[5]
            && radii[5] == radii[7];
        if uniform {
            Ok(OutlineShape::Round(RoundRect::new(radii[0], radii[1], None)))
        } else {
            Ok(OutlineShape::Round(RoundRect::new(
                f32::NAN,
                f32::NAN,
                Some(radii),
            )))
        }
    }

    /// Restrict subsequent painting on `canvas` to this shape placed in
    /// `bounds` (user space).
    pub fn clip_to(&self, canvas: &mut Canvas<'_>, bounds: Rect) {
        match self {
            OutlineShape::Rect => canvas.clip_rect(bounds),
            OutlineShape::Round(rr) => canvas.clip_shape(rr.geometry(bounds), false),
        }
    }

    /// Restrict subsequent painting on `canvas` to the complement of this
    /// shape placed in `bounds` (user space).
    pub fn clip_exclude(&self, canvas: &mut Canvas<'_>, bounds: Rect) {
        canvas.clip_shape(self.geometry(bounds), true);
    }

    /// A geometry summary for shadow/elevation systems, with an opacity
    /// hint taken from the destination's alpha.
    pub fn describe(&self, bounds: Rect, alpha: f32) -> OutlineDescription {
        let corner_radii = match self {
            OutlineShape::Rect => [0.0; 8],
            OutlineShape::Round(rr) => rr.corner_radii(),
        };
        OutlineDescription {
            bounds,
            corner_radii,
            alpha,
        }
    }

    /// Resolve this shape into testable geometry for the given bounds.
    pub(crate) fn geometry(&self, bounds: Rect) -> ShapeGeometry {
        match self {
            OutlineShape::Rect => ShapeGeometry::Rect(bounds),
            OutlineShape::Round(rr) => rr.geometry(bounds),
        }
    }
}

fn check_radius(r: f32) -> Result<(), BlurError> {
    if r.is_finite() && r >= 0.0 {
        Ok(())
    } else {
        Err(BlurError::InvalidOutline(r))
    }
}

/// Geometry summary produced by [`OutlineShape::describe`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineDescription {
    pub bounds: Rect,
    /// Per-corner radii, `[tl_x, tl_y, tr_x, tr_y, br_x, br_y, bl_x, bl_y]`.
    pub corner_radii: [f32; 8],
    /// Opacity hint in [0, 1], derived from the destination background.
    pub alpha: f32,
}

// =============================================================================
// RoundRect
// =============================================================================

/// Rounded-rectangle variant. Memoizes the geometry generated for the
/// last-seen bounds; bounds inequality invalidates the memo.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundRect {
    rx: f32,
    ry: f32,
    /// Per-corner radii when corners differ; `None` means uniform rx/ry.
    radii: Option<[f32; 8]>,
    cache: RefCell<Option<(Rect, RoundedGeometry)>>,
}

impl RoundRect {
    fn new(rx: f32, ry: f32, radii: Option<[f32; 8]>) -> Self {
        Self {
            rx,
            ry,
            radii,
            cache: RefCell::new(None),
        }
    }

    fn corner_radii(&self) -> [f32; 8] {
        match self.radii {
            Some(r) => r,
            None => [
                self.rx, self.ry, self.rx, self.ry, self.rx, self.ry, self.rx, self.ry,
            ],
        }
    }

    fn geometry(&self, bounds: Rect) -> ShapeGeometry {
        let mut cache = self.cache.borrow_mut();
        if let Some((cached_bounds, geom)) = cache.as_ref()
            && *cached_bounds == bounds
        {
            return ShapeGeometry::Rounded(*geom);
        }
        let geom = RoundedGeometry::resolve(bounds, self.corner_radii());
        *cache = Some((bounds, geom));
        ShapeGeometry::Rounded(geom)
    }
}

// =============================================================================
// Resolved geometry
// =============================================================================

/// Shape geometry resolved against concrete bounds, ready for per-pixel
/// coverage tests on a canvas.
#[derive(Debug, Clone, Copy)]
pub enum ShapeGeometry {
    Rect(Rect),
    Rounded(RoundedGeometry),
}

impl ShapeGeometry {
    /// Point-in-shape test in the shape's own (user) coordinate space.
    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        match self {
            ShapeGeometry::Rect(r) => {
                x >= r.left as f32 && x < r.right as f32 && y >= r.top as f32 && y < r.bottom as f32
            }
            ShapeGeometry::Rounded(g) => g.contains(x, y),
        }
    }
}

/// A rounded rectangle with per-corner elliptical radii, clamped to the
/// half-extents of its bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedGeometry {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    /// Clamped corner radii, `[tl, tr, br, bl]`, each `[rx, ry]`.
    corners: [[f32; 2]; 4],
}

impl RoundedGeometry {
    fn resolve(bounds: Rect, radii: [f32; 8]) -> Self {
        let half_w = bounds.width() as f32 / 2.0;
        let half_h = bounds.height() as f32 / 2.0;
        let corner = |i: usize| [radii[2 * i].min(half_w), radii[2 * i + 1].min(half_h)];
        Self {
            left: bounds.left as f32,
            top: bounds.top as f32,
            right: bounds.right as f32,
            bottom: bounds.bottom as f32,
            corners: [corner(0), corner(1), corner(2), corner(3)],
        }
    }

    fn contains(&self, x: f32, y: f32) -> bool {
        if x < self.left || x >= self.right || y < self.top || y >= self.bottom {
            return false;
        }
        // Corner ellipse test only when the point falls inside a corner box.
        let [tl, tr, br, bl] = self.corners;
        if x < self.left + tl[0] && y < self.top + tl[1] {
            return ellipse(x, y, self.left + tl[0], self.top + tl[1], tl);
        }
        if x > self.right - tr[0] && y < self.top + tr[1] {
            return ellipse(x, y, self.right - tr[0], self.top + tr[1], tr);
        }
        if x > self.right - br[0] && y > self.bottom - br[1] {
            return ellipse(x, y, self.right - br[0], self.bottom - br[1], br);
        }
        if x < self.left + bl[0] && y > self.bottom - bl[1] {
            return ellipse(x, y, self.left + bl[0], self.bottom - bl[1], bl);
        }
        true
    }
}

#[inline]
fn ellipse(x: f32, y: f32, cx: f32, cy: f32, r: [f32; 2]) -> bool {
    if r[0] <= 0.0 || r[1] <= 0.0 {
        return true; // degenerate corner, square
    }
    let dx = (x - cx) / r[0];
    let dy = (y - cy) / r[1];
    dx * dx + dy * dy <= 1.0
}

// =============================================================================
// Tests
// =============================================================================

//! Blur overlay bound to one rendering surface.
//!
//! [`BlurOverlay`] orchestrates the frame cache, the outline shape, and
//! the damage graph into a paintable overlay. The host drives its numeric
//! parameters (radius, source offset, opacity) from animation or layout
//! code; the overlay translates each change into the minimum amount of
//! repaint work.
//!
//! # The usefulness gate
//!
//! The overlay paints - and excludes its footprint from the source's own
//! paint - only while it is *useful*: non-empty bounds, a source offset
//! inside the surface, radius > 0, opacity > 0, and no active skip-effect
//! signal. Every setter that can flip the gate requests a source repaint
//! when clip-out is enabled, because the surface's excluded region just
//! changed.

use std::cell::Cell;
use std::rc::Rc;

use crate::canvas::{Canvas, Paint};
use crate::effect::PostEffect;
use crate::error::BlurError;
use crate::outline::{OutlineDescription, OutlineShape};
use crate::surface::SourceHandle;
use crate::types::{Damage, Rect};

use super::dynamic::{BackgroundFill, DynamicBlur};

/// A live blur of the content behind a region of one surface.
pub struct BlurOverlay {
    source: SourceHandle,
    blur: DynamicBlur,
    outline: OutlineShape,
    clip_out: bool,
    paint: Paint,
    src_offset_x: i32,
    src_offset_y: i32,
    bounds: Rect,
    /// External "skip visual effects" signal (power save, reduced motion).
    skip_effect: Option<Box<dyn Fn() -> bool>>,
    /// Last polled skip value; polling happens on every usefulness check.
    skip_blur: Cell<bool>,
    /// Set when this overlay needs repainting; the host polls and clears.
    repaint_requested: Cell<bool>,
}

impl BlurOverlay {
    /// Create an overlay over `source`.
    ///
    /// Scroll capability is taken from the source here, once; a source
    /// that cannot report it is a configuration error. Defaults:
    /// rectangular outline, clip-out enabled, fully opaque, no
    /// skip-effect signal.
    pub fn new(source: SourceHandle, radius: i32, downscale: i32) -> Result<Self, BlurError> {
        let scroll = source.scroll_axes().ok_or(BlurError::MissingScrollAxes)?;
        let blur = DynamicBlur::new(radius, downscale, scroll)?;
        Ok(Self {
            source,
            blur,
            outline: OutlineShape::Rect,
            clip_out: true,
            paint: Paint::opaque(),
            src_offset_x: 0,
            src_offset_y: 0,
            bounds: Rect::EMPTY,
            skip_effect: None,
            skip_blur: Cell::new(false),
            repaint_requested: Cell::new(false),
        })
    }

    /// Replace the default rectangular outline.
    pub fn with_outline(mut self, outline: OutlineShape) -> Self {
        self.outline = outline;
        self
    }

    /// Disable excluding the overlay's footprint from the source paint.
    pub fn with_clip_out(mut self, clip_out: bool) -> Self {
        self.clip_out = clip_out;
        self
    }

    /// Install a skip-effect predicate, polled on every usefulness check.
    pub fn with_skip_effect(mut self, skip: impl Fn() -> bool + 'static) -> Self {
        self.skip_blur.set(skip());
        self.skip_effect = Some(Box::new(skip));
        self
    }

    // =========================================================================
    // Host-driven parameters
    // =========================================================================

    #[inline]
    pub fn radius(&self) -> i32 {
        self.blur.radius()
    }

    /// Set the blur radius. Marks the cache dirty only when the scaled
    /// radius actually changes (a small change can vanish in downscaling).
    pub fn set_radius(&mut self, radius: i32) -> Result<(), BlurError> {
        if self.blur.radius() == radius {
            return Ok(());
        }
        let before = self.is_useful();
        self.blur.set_radius(radius)?;
        if self.clip_out && before != self.update_useful() {
            // Appeared or disappeared: start or stop clipping the source.
            self.source.request_redraw();
        }
        if self.blur.is_dirty() {
            self.invalidate_self();
        }
        Ok(())
    }

    #[inline]
    pub fn src_offset_x(&self) -> i32 {
        self.src_offset_x
    }

    /// Move the crop window horizontally in source space. Always
    /// invalidates the cache: the offset feeds the captured content, not
    /// just compositing.
    pub fn set_src_offset_x(&mut self, value: i32) {
        if self.src_offset_x != value {
            self.src_offset_x = value;
            self.blur.invalidate();
            self.geometry_changed();
        }
    }

    #[inline]
    pub fn src_offset_y(&self) -> i32 {
        self.src_offset_y
    }

    /// Move the crop window vertically in source space.
    pub fn set_src_offset_y(&mut self, value: i32) {
        if self.src_offset_y != value {
            self.src_offset_y = value;
            self.blur.invalidate();
            self.geometry_changed();
        }
    }

    #[inline]
    pub fn alpha(&self) -> u8 {
        self.paint.alpha
    }

    /// Set composite opacity.
    pub fn set_alpha(&mut self, alpha: u8) {
        if self.paint.alpha != alpha {
            let before = self.is_useful();
            self.paint.alpha = alpha;
            if self.clip_out && before != self.update_useful() {
                self.source.request_redraw();
            }
            self.invalidate_self();
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Set the destination rectangle. Growth beyond the previously blurred
    /// size triggers a repaint (the cache re-blurs on the next draw);
    /// shrinking composites from the existing cache.
    pub fn set_bounds(&mut self, bounds: Rect) {
        let old = self.bounds;
        let before = self.is_useful();
        let changed = old != bounds;
        self.bounds = bounds;
        let after = self.update_useful();
        if self.clip_out && (before != after || (after && changed)) {
            self.source.request_redraw();
        }
        if bounds.width() > old.width() || bounds.height() > old.height() {
            self.invalidate_self();
        }
    }

    /// Replace the outline shape.
    pub fn set_outline(&mut self, outline: OutlineShape) {
        self.outline = outline;
        self.geometry_changed();
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Geometry summary for shadow/elevation systems. The opacity hint
    /// follows the source background's alpha.
    pub fn describe_outline(&self) -> OutlineDescription {
        let alpha = match self.source.background() {
            BackgroundFill::Solid(c) => c.a() as f32 / 255.0,
            _ => 0.0,
        };
        self.outline.describe(self.bounds, alpha)
    }

    /// Whether the overlay's output is fully opaque (the source reports a
    /// fully opaque background color).
    pub fn is_opaque(&self) -> bool {
        self.source.background().is_opaque_color()
    }

    /// The usefulness gate as of the last poll of the skip signal.
    pub fn is_useful(&self) -> bool {
        !self.skip_blur.get()
            && !self.bounds.is_empty()
            && self.src_offset_x < self.source.width()
            && self.src_offset_y < self.source.height()
            && self.blur.radius() > 0
            && self.paint.alpha > 0
    }

    /// Take and clear the pending repaint request for this overlay.
    /// Hosts poll this after mutating parameters.
    pub fn take_repaint_request(&self) -> bool {
        self.repaint_requested.replace(false)
    }

    // =========================================================================
    // Painting
    // =========================================================================

    /// Paint the blurred overlay onto `canvas`. No-op while not useful;
    /// a cache miss degrades to painting nothing, never to an error.
    pub fn draw(&mut self, canvas: &mut Canvas<'_>) {
        if !self.update_useful() {
            return;
        }
        let bounds = self.bounds;
        canvas.save();
        self.outline.clip_to(canvas, bounds);
        let background = self.source.background();
        let paint = self.paint;
        let (ox, oy) = (self.src_offset_x, self.src_offset_y);
        let source = Rc::clone(&self.source);
        self.blur.draw(
            canvas,
            bounds.left,
            bounds.top,
            bounds.width(),
            bounds.height(),
            background,
            paint,
            |c| {
                c.translate(-(ox as f32), -(oy as f32));
                source.draw_fully(c);
                true
            },
        );
        canvas.restore();
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Request that the host repaint this overlay.
    fn invalidate_self(&self) {
        self.repaint_requested.set(true);
    }

    /// Re-poll the skip signal, then evaluate the gate.
    fn update_useful(&self) -> bool {
        if let Some(skip) = &self.skip_effect {
            let now = skip();
            if self.skip_blur.get() != now {
                self.skip_blur.set(now);
                // The source's excluded region follows the gate; repaint.
                self.invalidate_self();
            }
        }
        self.is_useful()
    }

    /// Offset or outline changed while clip-out may be active.
    fn geometry_changed(&self) {
        let before = self.is_useful();
        let after = self.update_useful();
        // useful -> useless: stop clipping the source.
        // useful -> useful: the excluded geometry moved.
        // useless -> useful: start clipping.
        if self.clip_out && (before || after) {
            self.source.request_redraw();
        }
        self.invalidate_self();
    }
}

impl PostEffect for BlurOverlay {
    fn is_dirty(&self) -> bool {
        self.blur.is_dirty()
    }

    fn on_invalidated(&mut self, damage: Damage) -> bool {
        let absorbed = match damage {
            Damage::Whole => true,
            Damage::Region(region) => region.intersects(&self.bounds),
        };
        if absorbed {
            self.blur.invalidate();
            self.invalidate_self();
        }
        absorbed
    }

    fn clip_exclude(&self, canvas: &mut Canvas<'_>) {
        if !(self.clip_out && self.update_useful()) {
            return;
        }
        // The exclusion lives in *source* space: offset plus destination
        // size, independent of where the destination rectangle sits.
        let rect = Rect::from_size(
            self.src_offset_x,
            self.src_offset_y,
            self.bounds.width(),
            self.bounds.height(),
        );
        self.outline.clip_exclude(canvas, rect);
    }
}

// =============================================================================
// Numeric property descriptors
// =============================================================================

/// A named numeric property of an overlay, for binding to whatever
/// animation or tween facility the host offers.
pub struct IntProperty {
    pub name: &'static str,
    pub get: fn(&BlurOverlay) -> i32,
    pub set: fn(&mut BlurOverlay, i32) -> Result<(), BlurError>,
}

pub const RADIUS: IntProperty = IntProperty {
    name: "radius",
    get: |o| o.radius(),
    set: |o, v| o.set_radius(v),
};

pub const SRC_OFFSET_X: IntProperty = IntProperty {
    name: "srcOffsetX",
    get: |o| o.src_offset_x(),
    set: |o, v| {
        o.set_src_offset_x(v);
        Ok(())
    },
};

pub const SRC_OFFSET_Y: IntProperty = IntProperty {
    name: "srcOffsetY",
    get: |o| o.src_offset_y(),
    set: |o, v| {
        o.set_src_offset_y(v);
        Ok(())
    },
};

pub const ALPHA: IntProperty = IntProperty {
    name: "alpha",
    get: |o| o.alpha() as i32,
    set: |o, v| {
        o.set_alpha(v.clamp(0, 255) as u8);
        Ok(())
    },
};

// =============================================================================
// Tests
// =============================================================================

//! Frame cache for a dynamically re-blurred region.
//!
//! [`DynamicBlur`] owns the downsampled pixel buffer a blur runs over and
//! decides when the cached result is stale. A re-blur only happens on a
//! `draw()` call whose cache is dirty or whose requested area outgrew the
//! cached one; everything else is a pure stretch-composite of the cached
//! buffer. Repeated invalidations between frames therefore collapse into a
//! single recompute.
//!
//! # The inset
//!
//! When the content behind the overlay can scroll, the visible crop window
//! moves between frames. An extra margin of `scaled_radius` pixels is
//! rendered and blurred on each scrollable axis so the kernel samples real
//! content past the crop edge instead of a clamped border - otherwise a
//! seam appears the moment the offset changes.

use std::time::Instant;

use crate::buffer::PixelBuffer;
use crate::canvas::{Canvas, Paint};
use crate::error::BlurError;
use crate::surface::ScrollAxes;
use crate::types::{Argb, Rect};

use super::stack::StackBlur;

// =============================================================================
// BackgroundFill
// =============================================================================

/// How to prepare the blur buffer's background before the content callback
/// paints into it.
///
/// This replaces the source's "solid color" report: the three cases are
/// explicit instead of overloading a color value as a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundFill {
    /// Erase to fully transparent; content may leave translucent pixels.
    Transparent,
    /// Erase to a solid color first.
    Solid(Argb),
    /// The content callback guarantees full-surface coverage; skip the
    /// erase entirely.
    CoversFully,
}

impl BackgroundFill {
    /// The opaque blur path applies only when the erased background is a
    /// fully opaque color; everything else needs the alpha-aware variant.
    #[inline]
    pub fn is_opaque_color(self) -> bool {
        matches!(self, BackgroundFill::Solid(c) if c.is_opaque())
    }
}

/// Which blur variant a re-blur selected. Kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurVariant {
    Rgb,
    Argb,
}

// =============================================================================
// DynamicBlur
// =============================================================================

/// Blur frame cache: staleness tracking, buffer reuse, and composite.
#[derive(Debug)]
pub struct DynamicBlur {
    blur: StackBlur,
    radius: i32,
    scaled_radius: i32,
    downscale: i32,
    scroll: ScrollAxes,

    blurred_width: i32,
    blurred_height: i32,
    buffer: PixelBuffer,
    dirty: bool,
    /// Whether the last re-blur produced a paintable result.
    drawn: bool,
    last_variant: Option<BlurVariant>,
}

impl DynamicBlur {
    /// Create a cache.
    ///
    /// `downscale` divides both buffer axes before blurring (>= 1);
    /// `scroll` names the axes on which the content can move under the
    /// overlay, which reserves the seam-avoiding inset.
    pub fn new(radius: i32, downscale: i32, scroll: ScrollAxes) -> Result<Self, BlurError> {
        if downscale <= 0 {
            return Err(BlurError::InvalidDownscale(downscale));
        }
        let mut cache = Self {
            blur: StackBlur::new(),
            radius: 0,
            // Sentinel distinct from every reachable value, so the first
            // set_radius always recomputes and marks dirty.
            scaled_radius: -1,
            downscale,
            scroll,
            blurred_width: 0,
            blurred_height: 0,
            buffer: PixelBuffer::new(),
            dirty: true,
            drawn: false,
            last_variant: None,
        };
        cache.set_radius(radius)?;
        Ok(cache)
    }

    /// Current blur radius in caller units.
    #[inline]
    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Blur radius after downscaling. Never rounds a non-zero radius down
    /// to zero: `max(radius / downscale, signum(radius))`.
    #[inline]
    pub fn scaled_radius(&self) -> i32 {
        self.scaled_radius
    }

    /// Update the radius. Marks the cache dirty only when the *scaled*
    /// radius actually changes.
    pub fn set_radius(&mut self, radius: i32) -> Result<(), BlurError> {
        if radius < 0 {
            return Err(BlurError::InvalidRadius(radius));
        }
        let scaled = (radius / self.downscale).max(radius.signum());
        if self.scaled_radius != scaled {
            self.scaled_radius = scaled;
            self.dirty = true;
        }
        self.radius = radius;
        Ok(())
    }

    /// Mark the cached image stale. Used when content, offset, or geometry
    /// change without the radius changing.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Which variant the most recent re-blur ran, if any.
    #[inline]
    pub fn last_variant(&self) -> Option<BlurVariant> {
        self.last_variant
    }

    /// Paint the blurred region onto `on` at
    /// `(dst_left, dst_top) .. +(blur_width, blur_height)`.
    ///
    /// Re-blurs first if the cache is dirty or the request outgrew the
    /// cached size. `draw_content` paints the true content into the cache's
    /// buffer under a scoped clip/translate/scale; it returns whether it
    /// painted anything. `background` decides the erase and the blur
    /// variant; `paint` applies opacity at composite time.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        on: &mut Canvas<'_>,
        dst_left: i32,
        dst_top: i32,
        blur_width: i32,
        blur_height: i32,
        background: BackgroundFill,
        paint: Paint,
        draw_content: impl FnMut(&mut Canvas<'_>) -> bool,
    ) {
        if self.dirty || self.blurred_width < blur_width || self.blurred_height < blur_height {
            self.blurred_width = blur_width;
            self.blurred_height = blur_height;
            self.reblur(blur_width, blur_height, background, draw_content);
        }
        if self.drawn {
            let inset_h = self.inset(ScrollAxes::HORIZONTAL);
            let inset_v = self.inset(ScrollAxes::VERTICAL);
            let src = Rect::new(
                inset_h,
                inset_v,
                inset_h + blur_width / self.downscale,
                inset_v + blur_height / self.downscale,
            );
            let dst = Rect::new(dst_left, dst_top, dst_left + blur_width, dst_top + blur_height);
            on.draw_buffer(&self.buffer, src, dst, paint);
        }
    }

    #[inline]
    fn inset(&self, axis: ScrollAxes) -> i32 {
        if self.scroll.contains(axis) {
            self.scaled_radius
        } else {
            0
        }
    }

    fn reblur(
        &mut self,
        width: i32,
        height: i32,
        background: BackgroundFill,
        mut draw_content: impl FnMut(&mut Canvas<'_>) -> bool,
    ) {
        self.dirty = false;
        if self.scaled_radius == 0 {
            // Radius rounds to invisible after downscale: nothing to paint.
            self.drawn = false;
            return;
        }

        let inset_h = self.inset(ScrollAxes::HORIZONTAL);
        let inset_v = self.inset(ScrollAxes::VERTICAL);
        let scaled_w = inset_h + width / self.downscale + inset_h;
        let scaled_h = inset_v + height / self.downscale + inset_v;

        self.buffer.ensure(scaled_w, scaled_h);
        match background {
            BackgroundFill::Transparent => self.buffer.fill(Argb::TRANSPARENT),
            BackgroundFill::Solid(color) => self.buffer.fill(color),
            BackgroundFill::CoversFully => {}
        }

        let mut canvas = Canvas::new(&mut self.buffer);
        canvas.save();
        // The buffer left from a previous frame can be bigger; the clip
        // keeps the callback from painting beyond this frame's area.
        canvas.clip_rect(Rect::new(0, 0, scaled_w, scaled_h));
        canvas.translate(inset_h as f32, inset_v as f32);
        canvas.scale(1.0 / self.downscale as f32);
        self.drawn = draw_content(&mut canvas);
        canvas.restore();
        drop(canvas);

        if self.drawn {
            let started = Instant::now();
            let variant = if background.is_opaque_color() {
                self.blur.blur_rgb(&mut self.buffer, self.scaled_radius);
                BlurVariant::Rgb
            } else {
                self.blur.blur_argb(&mut self.buffer, self.scaled_radius);
                BlurVariant::Argb
            };
            self.last_variant = Some(variant);
            log::trace!(
                "re-blurred {}x{} r{} ({:?}) in {:?}",
                scaled_w,
                scaled_h,
                self.scaled_radius,
                variant,
                started.elapsed()
            );
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(radius: i32, downscale: i32, scroll: ScrollAxes) -> DynamicBlur {
        DynamicBlur::new(radius, downscale, scroll).unwrap()
    }

    /// Run one draw() against a scratch destination, counting callback
    /// invocations; content fills everything with opaque gray.
    fn draw_once(cache: &mut DynamicBlur, background: BackgroundFill) -> u32 {
        let mut dst = PixelBuffer::with_size(64, 64);
        let mut canvas = Canvas::new(&mut dst);
        let mut calls = 0;
        cache.draw(&mut canvas, 0, 0, 40, 40, background, Paint::opaque(), |c| {
            calls += 1;
            c.fill_rect(Rect::new(-100, -100, 200, 200), Argb::rgb(128, 128, 128));
            true
        });
        calls
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        assert_eq!(
            DynamicBlur::new(5, 0, ScrollAxes::empty()).unwrap_err(),
            BlurError::InvalidDownscale(0)
        );
        assert_eq!(
            DynamicBlur::new(-1, 2, ScrollAxes::empty()).unwrap_err(),
            BlurError::InvalidRadius(-1)
        );
        let mut c = cache(5, 2, ScrollAxes::empty());
        assert_eq!(c.set_radius(-7), Err(BlurError::InvalidRadius(-7)));
    }

    #[test]
    fn test_scaled_radius_formula() {
        // r = 0 => 0
        assert_eq!(cache(0, 5, ScrollAxes::empty()).scaled_radius(), 0);
        // r = 1, d = 5: integer division would give 0, sign keeps it at 1.
        assert_eq!(cache(1, 5, ScrollAxes::empty()).scaled_radius(), 1);
        assert_eq!(cache(20, 2, ScrollAxes::empty()).scaled_radius(), 10);
        assert_eq!(cache(7, 3, ScrollAxes::empty()).scaled_radius(), 2);
    }

    #[test]
    fn test_scaled_radius_change_marks_dirty() {
        let mut c = cache(20, 2, ScrollAxes::empty());
        draw_once(&mut c, BackgroundFill::Transparent);
        assert!(!c.is_dirty());

        // 21 / 2 == 10 == 20 / 2: scaled radius unchanged, still clean.
        c.set_radius(21).unwrap();
        assert!(!c.is_dirty());

        c.set_radius(30).unwrap();
        assert!(c.is_dirty());
    }

    #[test]
    fn test_draw_is_idempotent_until_invalidated() {
        let mut c = cache(20, 2, ScrollAxes::empty());
        let first = draw_once(&mut c, BackgroundFill::Transparent);
        assert_eq!(first, 1);
        // Same geometry, no invalidation: pure composite, no callback.
        let second = draw_once(&mut c, BackgroundFill::Transparent);
        assert_eq!(second, 0);

        c.invalidate();
        assert_eq!(draw_once(&mut c, BackgroundFill::Transparent), 1);
    }

    #[test]
    fn test_growth_reblurs_shrink_does_not() {
        let mut c = cache(20, 2, ScrollAxes::empty());
        let mut dst = PixelBuffer::with_size(128, 128);

        let mut calls = 0;
        let mut run = |c: &mut DynamicBlur, w: i32, h: i32, calls: &mut u32| {
            let mut canvas = Canvas::new(&mut dst);
            c.draw(
                &mut canvas,
                0,
                0,
                w,
                h,
                BackgroundFill::Transparent,
                Paint::opaque(),
                |cv| {
                    *calls += 1;
                    cv.fill_rect(Rect::new(0, 0, 500, 500), Argb::WHITE);
                    true
                },
            );
        };

        run(&mut c, 40, 40, &mut calls);
        assert_eq!(calls, 1);
        // Shrinking: cached image still covers it.
        run(&mut c, 20, 20, &mut calls);
        assert_eq!(calls, 1);
        // Growing past the cached size: re-blur without explicit invalidate.
        run(&mut c, 60, 60, &mut calls);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_zero_scaled_radius_paints_nothing() {
        let mut c = cache(0, 2, ScrollAxes::empty());
        let mut dst = PixelBuffer::with_size(64, 64);
        dst.fill(Argb::rgb(9, 9, 9));
        let mut canvas = Canvas::new(&mut dst);
        let mut called = false;
        c.draw(
            &mut canvas,
            0,
            0,
            40,
            40,
            BackgroundFill::Transparent,
            Paint::opaque(),
            |_| {
                called = true;
                true
            },
        );
        drop(canvas);
        assert!(!called);
        assert!(dst.pixels().iter().all(|&p| p == Argb::rgb(9, 9, 9).0));
    }

    #[test]
    fn test_callback_declining_paints_nothing() {
        let mut c = cache(20, 2, ScrollAxes::empty());
        let mut dst = PixelBuffer::with_size(64, 64);
        dst.fill(Argb::TRANSPARENT);
        let mut canvas = Canvas::new(&mut dst);
        c.draw(
            &mut canvas,
            0,
            0,
            40,
            40,
            BackgroundFill::Transparent,
            Paint::opaque(),
            |_| false,
        );
        drop(canvas);
        assert!(dst.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn test_blur_variant_follows_background() {
        let mut c = cache(20, 2, ScrollAxes::empty());
        draw_once(&mut c, BackgroundFill::Solid(Argb::WHITE));
        assert_eq!(c.last_variant(), Some(BlurVariant::Rgb));

        c.invalidate();
        draw_once(&mut c, BackgroundFill::Transparent);
        assert_eq!(c.last_variant(), Some(BlurVariant::Argb));

        // Full coverage skips the erase but still takes the alpha-aware
        // path (the background was not an erased opaque color).
        c.invalidate();
        draw_once(&mut c, BackgroundFill::CoversFully);
        assert_eq!(c.last_variant(), Some(BlurVariant::Argb));
    }

    #[test]
    fn test_scrollable_axis_reserves_inset() {
        // radius 20, downscale 2 => scaled radius 10. With horizontal
        // scroll the buffer is 10 + w/2 + 10 wide but only h/2 tall.
        let mut c = cache(20, 2, ScrollAxes::HORIZONTAL);
        draw_once(&mut c, BackgroundFill::Transparent);
        assert_eq!(c.buffer.width(), 10 + 20 + 10);
        assert_eq!(c.buffer.height(), 20);
    }

    #[test]
    fn test_buffer_reused_across_reblurs() {
        let mut c = cache(20, 2, ScrollAxes::empty());
        draw_once(&mut c, BackgroundFill::Transparent);
        let allocs = c.buffer.allocation_count();
        c.invalidate();
        draw_once(&mut c, BackgroundFill::Transparent);
        assert_eq!(c.buffer.allocation_count(), allocs);
    }

    #[test]
    fn test_composite_respects_destination_offset() {
        let mut c = cache(4, 1, ScrollAxes::empty());
        let mut dst = PixelBuffer::with_size(32, 32);
        dst.fill(Argb::TRANSPARENT);
        let mut canvas = Canvas::new(&mut dst);
        c.draw(
            &mut canvas,
            8,
            8,
            16,
            16,
            BackgroundFill::Solid(Argb::WHITE),
            Paint::opaque(),
            |cv| {
                cv.fill_rect(Rect::new(0, 0, 16, 16), Argb::WHITE);
                true
            },
        );
        drop(canvas);
        // Inside the destination rect: opaque white; outside: untouched.
        assert_eq!(dst.pixel(9, 9), Argb::WHITE);
        assert_eq!(dst.pixel(23, 23), Argb::WHITE);
        assert_eq!(dst.pixel(7, 7), Argb::TRANSPARENT);
        assert_eq!(dst.pixel(24, 24), Argb::TRANSPARENT);
    }
}

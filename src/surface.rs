//! Collaborator contracts for the host rendering surface.
//!
//! The surface itself (a scrollable list, a compositor layer, ...) lives
//! outside this crate. An overlay only needs the narrow [`BlurSource`]
//! view of it: a background-fill report, a way to paint the *full* content
//! into a caller-provided canvas, a repaint request hook, pixel extents,
//! and the scroll capability that decides where seam insets are reserved.

use std::rc::Rc;

use bitflags::bitflags;

use crate::blur::BackgroundFill;
use crate::canvas::Canvas;
use crate::types::Argb;

bitflags! {
    /// Axes on which content can move beneath an overlay.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScrollAxes: u8 {
        const HORIZONTAL = 1 << 0;
        const VERTICAL = 1 << 1;
    }
}

/// The surface a blur overlay samples from. Consumed as `Rc<dyn BlurSource>`;
/// the surface outlives or co-terminates with its overlays.
pub trait BlurSource {
    /// The background-fill policy for the surface's visible area. Drives
    /// both the erase before the content callback and the blur-variant
    /// choice.
    fn background(&self) -> BackgroundFill;

    /// Paint all content, ignoring any exclusion regions, into `canvas`.
    /// This is the capture path: the overlay needs the true content even
    /// under the area it will cover.
    fn draw_fully(&self, canvas: &mut Canvas<'_>);

    /// Ask the host to repaint the surface. Must only *schedule* a paint,
    /// never paint synchronously - this can be called from inside setters.
    fn request_redraw(&self);

    /// Current content width in pixels.
    fn width(&self) -> i32;

    /// Current content height in pixels.
    fn height(&self) -> i32;

    /// Scroll capability, queried once at overlay construction.
    /// `None` means the surface cannot say yet, which is a configuration
    /// error for the overlay.
    fn scroll_axes(&self) -> Option<ScrollAxes>;
}

/// Convenience alias for the shared source handle overlays hold.
pub type SourceHandle = Rc<dyn BlurSource>;

/// Normalize a caller-configured solid background color into a fill
/// policy: only a fully opaque color counts as solid; anything translucent
/// degrades to a transparent erase.
pub fn normalize_solid_color(color: Argb) -> BackgroundFill {
    if color.is_opaque() {
        BackgroundFill::Solid(color)
    } else {
        BackgroundFill::Transparent
    }
}

// =============================================================================
// Tests
// =============================================================================

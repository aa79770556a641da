//! Core types for liveblur.
//!
//! These types define the foundation that everything builds on:
//! packed ARGB colors, integer pixel rectangles, and damage notifications
//! flowing from a surface to its post-effects.

// =============================================================================
// Color
// =============================================================================

/// Packed ARGB color with 8-bit channels, `0xAARRGGBB`.
///
/// Using a single `u32` for exact comparison and cheap bulk storage -
/// pixel buffers are `Vec<u32>` and the blur operates on raw words.
/// Alpha 255 = fully opaque, 0 = fully transparent. Straight (not
/// premultiplied) alpha everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Argb(pub u32);

impl Argb {
    /// Create a color from individual channels.
    pub const fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_argb(255, r, g, b)
    }

    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self(0);

    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Alpha channel.
    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel.
    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel.
    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel.
    #[inline]
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    /// Check if the color is fully opaque.
    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.a() == 255
    }

    /// Check if the color is fully transparent.
    #[inline]
    pub const fn is_transparent(self) -> bool {
        self.a() == 0
    }
}

// =============================================================================
// Rect
// =============================================================================

/// An axis-aligned integer pixel rectangle, left/top inclusive,
/// right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// An empty rectangle at the origin.
    pub const EMPTY: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from origin and size.
    pub const fn from_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    #[inline]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// A rectangle with no area (degenerate or inverted).
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    /// Intersection of two rectangles; empty if they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if r.is_empty() { Rect::EMPTY } else { r }
    }

    /// Whether two rectangles overlap with non-zero area.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// This rectangle shifted by (dx, dy).
    pub const fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

// =============================================================================
// Damage
// =============================================================================

/// An invalidation notification delivered to post-effects attached to a
/// surface.
///
/// Damage is intentionally coarse: a single rectangle in surface
/// coordinates, or a whole-surface signal when the damaged region is
/// unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Damage {
    /// The entire surface may have changed.
    Whole,
    /// Only this region (in surface pixel coordinates) may have changed.
    Region(Rect),
}

// =============================================================================
// Tests
// =============================================================================

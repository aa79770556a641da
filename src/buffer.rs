//! Reusable ARGB pixel buffer.
//!
//! The buffer separates *capacity* (allocated words) from *logical size*
//! (the width x height currently in use). Shrinking or growing within
//! capacity is a cheap reconfigure; only growth beyond capacity reallocates.
//! This is what lets a blur cache resize its working buffer every time the
//! overlay bounds change without churning the allocator.
//!
//! # Design Decisions
//!
//! - **Flat storage**: `Vec<u32>` with row-major indexing, one `0xAARRGGBB`
//!   word per pixel, stride == logical width.
//! - **Allocation probe**: the buffer counts allocations so reuse behavior
//!   is observable in tests and diagnostics.

use crate::types::{Argb, Rect};

/// An owned, resizable 2D ARGB pixel buffer with reuse semantics.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    width: i32,
    height: i32,
    data: Vec<u32>,
    allocations: u32,
}

impl PixelBuffer {
    /// Create an empty buffer. No memory is allocated until [`ensure`].
    ///
    /// [`ensure`]: PixelBuffer::ensure
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
            allocations: 0,
        }
    }

    /// Create a buffer with the given logical size, allocated up front.
    pub fn with_size(width: i32, height: i32) -> Self {
        let mut buf = Self::new();
        buf.ensure(width, height);
        buf
    }

    /// Set the logical size to exactly (width, height), reusing the current
    /// allocation when its capacity covers the new pixel count and
    /// reallocating otherwise. Pixel contents are unspecified afterwards;
    /// callers erase or fully repaint.
    pub fn ensure(&mut self, width: i32, height: i32) {
        debug_assert!(width >= 0 && height >= 0);
        let needed = (width.max(0) as usize) * (height.max(0) as usize);
        if needed > self.data.len() {
            log::debug!(
                "pixel buffer realloc: {}x{} ({} words) exceeds capacity {}",
                width,
                height,
                needed,
                self.data.len()
            );
            self.data = vec![0; needed];
            self.allocations += 1;
        }
        self.width = width.max(0);
        self.height = height.max(0);
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// The full logical area as a rectangle at the origin.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Number of allocations performed so far. Reconfigures within capacity
    /// do not count.
    #[inline]
    pub fn allocation_count(&self) -> u32 {
        self.allocations
    }

    /// Fill every logical pixel with one color.
    pub fn fill(&mut self, color: Argb) {
        let n = (self.width as usize) * (self.height as usize);
        self.data[..n].fill(color.0);
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// Read one pixel. Out-of-bounds reads return transparent.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Argb {
        if self.in_bounds(x, y) {
            Argb(self.data[(y * self.width + x) as usize])
        } else {
            Argb::TRANSPARENT
        }
    }

    /// Write one pixel. Out-of-bounds writes are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Argb) {
        if self.in_bounds(x, y) {
            self.data[(y * self.width + x) as usize] = color.0;
        }
    }

    /// The logical pixels as a flat row-major slice.
    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.data[..(self.width as usize) * (self.height as usize)]
    }

    /// The logical pixels as a mutable flat row-major slice.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        let n = (self.width as usize) * (self.height as usize);
        &mut self.data[..n]
    }
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

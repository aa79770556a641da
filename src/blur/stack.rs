//! Stack blur.
//!
//! A two-pass (horizontal then vertical) sliding-window box blur with
//! triangular weights, updated in O(1) per pixel: per output pixel the
//! window sum is adjusted by an incoming and an outgoing partial sum, so
//! the total cost is O(width * height) independent of the radius.
//!
//! Algorithm by Mario Klingemann (Stack Blur), here ported to packed
//! `0xAARRGGBB` buffers with two variants:
//!
//! - [`StackBlur::blur_rgb`] blurs the color channels only and preserves
//!   each pixel's alpha; correct when every pixel is fully opaque.
//! - [`StackBlur::blur_argb`] premultiplies, blurs all four channels, and
//!   un-premultiplies, avoiding edge darkening where alpha varies.
//!
//! Not thread-safe: the instance reuses scratch buffers across calls.

use crate::buffer::PixelBuffer;

/// Stack-blur executor with reusable scratch.
///
/// Scratch grows to the largest image seen and is reused afterwards;
/// [`trim_memory`] drops it.
///
/// [`trim_memory`]: StackBlur::trim_memory
#[derive(Debug, Default)]
pub struct StackBlur {
    /// Intermediate plane holding the horizontal pass result.
    plane: Vec<u32>,
    /// Memoized clamped window-edge indices, one per column/row.
    vmin: Vec<i32>,
    /// The sliding kernel stack, `2 * radius + 1` entries.
    stack: Vec<u32>,
}

/// Window sums can reach `255 * (radius + 1)^2`; clamp so they fit `i32`.
const MAX_RADIUS: i32 = 2896;

impl StackBlur {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release all scratch memory. The next blur re-grows it.
    pub fn trim_memory(&mut self) {
        self.plane = Vec::new();
        self.vmin = Vec::new();
        self.stack = Vec::new();
    }

    fn prepare(&mut self, w: i32, h: i32, div: i32) {
        let wh = (w as usize) * (h as usize);
        if self.plane.len() < wh {
            self.plane = vec![0; wh];
        }
        let edge = w.max(h) as usize;
        if self.vmin.len() < edge {
            self.vmin = vec![0; edge];
        }
        if self.stack.len() < div as usize {
            self.stack = vec![0; div as usize];
        }
    }

    /// Blur the RGB channels in place, leaving per-pixel alpha untouched.
    /// Assumes fully opaque content. Radius <= 0 is a no-op.
    pub fn blur_rgb(&mut self, buffer: &mut PixelBuffer, radius: i32) {
        let w = buffer.width();
        let h = buffer.height();
        if radius <= 0 || w <= 0 || h <= 0 {
            return;
        }
        let radius = radius.min(MAX_RADIUS);
        let div = radius + radius + 1;
        self.prepare(w, h, div);
        let pix = buffer.pixels_mut();
        let plane = &mut self.plane;
        let vmin = &mut self.vmin;
        let stack = &mut self.stack;

        let wm = w - 1;
        let hm = h - 1;
        let r1 = radius + 1;
        let mut divsum = (div + 1) >> 1;
        divsum *= divsum;

        // Horizontal pass: pix -> plane.
        let mut yw: i32 = 0;
        for y in 0..h {
            let (mut rin, mut gin, mut bin) = (0i32, 0i32, 0i32);
            let (mut rout, mut gout, mut bout) = (0i32, 0i32, 0i32);
            let (mut rsum, mut gsum, mut bsum) = (0i32, 0i32, 0i32);
            for i in -radius..=radius {
                let p = pix[(yw + i.max(0).min(wm)) as usize];
                stack[(i + radius) as usize] = p;
                let (r, g, b) = rgb(p);
                let rbs = r1 - i.abs();
                rsum += r * rbs;
                gsum += g * rbs;
                bsum += b * rbs;
                if i > 0 {
                    rin += r;
                    gin += g;
                    bin += b;
                } else {
                    rout += r;
                    gout += g;
                    bout += b;
                }
            }
            let mut ptr = radius;
            let mut yi = yw;
            for x in 0..w {
                plane[yi as usize] = (((rsum / divsum) as u32) << 16)
                    | (((gsum / divsum) as u32) << 8)
                    | ((bsum / divsum) as u32);

                rsum -= rout;
                gsum -= gout;
                bsum -= bout;

                let start = ((ptr - radius + div) % div) as usize;
                let (r, g, b) = rgb(stack[start]);
                rout -= r;
                gout -= g;
                bout -= b;

                if y == 0 {
                    vmin[x as usize] = (x + radius + 1).min(wm);
                }
                let p = pix[(yw + vmin[x as usize]) as usize];
                stack[start] = p;
                let (r, g, b) = rgb(p);
                rin += r;
                gin += g;
                bin += b;

                rsum += rin;
                gsum += gin;
                bsum += bin;

                ptr = (ptr + 1) % div;
                let (r, g, b) = rgb(stack[ptr as usize]);
                rout += r;
                gout += g;
                bout += b;
                rin -= r;
                gin -= g;
                bin -= b;

                yi += 1;
            }
            yw += w;
        }

        // Vertical pass: plane -> pix, preserving the alpha channel.
        for x in 0..w {
            let (mut rin, mut gin, mut bin) = (0i32, 0i32, 0i32);
            let (mut rout, mut gout, mut bout) = (0i32, 0i32, 0i32);
            let (mut rsum, mut gsum, mut bsum) = (0i32, 0i32, 0i32);
            let mut yp = -radius * w;
            for i in -radius..=radius {
                let yi = yp.max(0) + x;
                let c = plane[yi as usize];
                stack[(i + radius) as usize] = c;
                let (r, g, b) = rgb(c);
                let rbs = r1 - i.abs();
                rsum += r * rbs;
                gsum += g * rbs;
                bsum += b * rbs;
                if i > 0 {
                    rin += r;
                    gin += g;
                    bin += b;
                } else {
                    rout += r;
                    gout += g;
                    bout += b;
                }
                if i < hm {
                    yp += w;
                }
            }
            let mut yi = x;
            let mut ptr = radius;
            for y in 0..h {
                pix[yi as usize] = (pix[yi as usize] & 0xFF00_0000)
                    | (((rsum / divsum) as u32) << 16)
                    | (((gsum / divsum) as u32) << 8)
                    | ((bsum / divsum) as u32);

                rsum -= rout;
                gsum -= gout;
                bsum -= bout;

                let start = ((ptr - radius + div) % div) as usize;
                let (r, g, b) = rgb(stack[start]);
                rout -= r;
                gout -= g;
                bout -= b;

                if x == 0 {
                    vmin[y as usize] = (y + r1).min(hm) * w;
                }
                let c = plane[(x + vmin[y as usize]) as usize];
                stack[start] = c;
                let (r, g, b) = rgb(c);
                rin += r;
                gin += g;
                bin += b;

                rsum += rin;
                gsum += gin;
                bsum += bin;

                ptr = (ptr + 1) % div;
                let (r, g, b) = rgb(stack[ptr as usize]);
                rout += r;
                gout += g;
                bout += b;
                rin -= r;
                gin -= g;
                bin -= b;

                yi += w;
            }
        }
    }

    /// Blur all four channels in place, alpha-aware: straight-alpha input
    /// is premultiplied, blurred, and un-premultiplied so transparent
    /// neighborhoods don't darken edges. Radius <= 0 is a no-op.
    pub fn blur_argb(&mut self, buffer: &mut PixelBuffer, radius: i32) {
        let w = buffer.width();
        let h = buffer.height();
        if radius <= 0 || w <= 0 || h <= 0 {
            return;
        }
        let radius = radius.min(MAX_RADIUS);
        let div = radius + radius + 1;
        self.prepare(w, h, div);
        let pix = buffer.pixels_mut();
        premultiply(pix);
        let plane = &mut self.plane;
        let vmin = &mut self.vmin;
        let stack = &mut self.stack;

        let wm = w - 1;
        let hm = h - 1;
        let r1 = radius + 1;
        let mut divsum = (div + 1) >> 1;
        divsum *= divsum;

        // Horizontal pass: pix -> plane.
        let mut yw: i32 = 0;
        for y in 0..h {
            let (mut ain, mut rin, mut gin, mut bin) = (0i32, 0i32, 0i32, 0i32);
            let (mut aout, mut rout, mut gout, mut bout) = (0i32, 0i32, 0i32, 0i32);
            let (mut asum, mut rsum, mut gsum, mut bsum) = (0i32, 0i32, 0i32, 0i32);
            for i in -radius..=radius {
                let p = pix[(yw + i.max(0).min(wm)) as usize];
                stack[(i + radius) as usize] = p;
                let (a, r, g, b) = argb(p);
                let rbs = r1 - i.abs();
                asum += a * rbs;
                rsum += r * rbs;
                gsum += g * rbs;
                bsum += b * rbs;
                if i > 0 {
                    ain += a;
                    rin += r;
                    gin += g;
                    bin += b;
                } else {
                    aout += a;
                    rout += r;
                    gout += g;
                    bout += b;
                }
            }
            let mut ptr = radius;
            let mut yi = yw;
            for x in 0..w {
                plane[yi as usize] = (((asum / divsum) as u32) << 24)
                    | (((rsum / divsum) as u32) << 16)
                    | (((gsum / divsum) as u32) << 8)
                    | ((bsum / divsum) as u32);

                asum -= aout;
                rsum -= rout;
                gsum -= gout;
                bsum -= bout;

                let start = ((ptr - radius + div) % div) as usize;
                let (a, r, g, b) = argb(stack[start]);
                aout -= a;
                rout -= r;
                gout -= g;
                bout -= b;

                if y == 0 {
                    vmin[x as usize] = (x + radius + 1).min(wm);
                }
                let p = pix[(yw + vmin[x as usize]) as usize];
                stack[start] = p;
                let (a, r, g, b) = argb(p);
                ain += a;
                rin += r;
                gin += g;
                bin += b;

                asum += ain;
                rsum += rin;
                gsum += gin;
                bsum += bin;

                ptr = (ptr + 1) % div;
                let (a, r, g, b) = argb(stack[ptr as usize]);
                aout += a;
                rout += r;
                gout += g;
                bout += b;
                ain -= a;
                rin -= r;
                gin -= g;
                bin -= b;

                yi += 1;
            }
            yw += w;
        }

        // Vertical pass: plane -> pix.
        for x in 0..w {
            let (mut ain, mut rin, mut gin, mut bin) = (0i32, 0i32, 0i32, 0i32);
            let (mut aout, mut rout, mut gout, mut bout) = (0i32, 0i32, 0i32, 0i32);
            let (mut asum, mut rsum, mut gsum, mut bsum) = (0i32, 0i32, 0i32, 0i32);
            let mut yp = -radius * w;
            for i in -radius..=radius {
                let yi = yp.max(0) + x;
                let c = plane[yi as usize];
                stack[(i + radius) as usize] = c;
                let (a, r, g, b) = argb(c);
                let rbs = r1 - i.abs();
                asum += a * rbs;
                rsum += r * rbs;
                gsum += g * rbs;
                bsum += b * rbs;
                if i > 0 {
                    ain += a;
                    rin += r;
                    gin += g;
                    bin += b;
                } else {
                    aout += a;
                    rout += r;
                    gout += g;
                    bout += b;
                }
                if i < hm {
                    yp += w;
                }
            }
            let mut yi = x;
            let mut ptr = radius;
            for y in 0..h {
                pix[yi as usize] = (((asum / divsum) as u32) << 24)
                    | (((rsum / divsum) as u32) << 16)
                    | (((gsum / divsum) as u32) << 8)
                    | ((bsum / divsum) as u32);

                asum -= aout;
                rsum -= rout;
                gsum -= gout;
                bsum -= bout;

                let start = ((ptr - radius + div) % div) as usize;
                let (a, r, g, b) = argb(stack[start]);
                aout -= a;
                rout -= r;
                gout -= g;
                bout -= b;

                if x == 0 {
                    vmin[y as usize] = (y + r1).min(hm) * w;
                }
                let c = plane[(x + vmin[y as usize]) as usize];
                stack[start] = c;
                let (a, r, g, b) = argb(c);
                ain += a;
                rin += r;
                gin += g;
                bin += b;

                asum += ain;
                rsum += rin;
                gsum += gin;
                bsum += bin;

                ptr = (ptr + 1) % div;
                let (a, r, g, b) = argb(stack[ptr as usize]);
                aout += a;
                rout += r;
                gout += g;
                bout += b;
                ain -= a;
                rin -= r;
                gin -= g;
                bin -= b;

                yi += w;
            }
        }

        let pix = buffer.pixels_mut();
        unpremultiply(pix);
    }
}

#[inline]
fn rgb(p: u32) -> (i32, i32, i32) {
    (
        ((p >> 16) & 0xFF) as i32,
        ((p >> 8) & 0xFF) as i32,
        (p & 0xFF) as i32,
    )
}

#[inline]
fn argb(p: u32) -> (i32, i32, i32, i32) {
    (
        ((p >> 24) & 0xFF) as i32,
        ((p >> 16) & 0xFF) as i32,
        ((p >> 8) & 0xFF) as i32,
        (p & 0xFF) as i32,
    )
}

fn premultiply(pix: &mut [u32]) {
    for p in pix.iter_mut() {
        let a = (*p >> 24) & 0xFF;
        if a == 255 {
            continue;
        }
        if a == 0 {
            *p = 0;
            continue;
        }
        let r = ((*p >> 16) & 0xFF) * a / 255;
        let g = ((*p >> 8) & 0xFF) * a / 255;
        let b = (*p & 0xFF) * a / 255;
        *p = (a << 24) | (r << 16) | (g << 8) | b;
    }
}

fn unpremultiply(pix: &mut [u32]) {
    for p in pix.iter_mut() {
        let a = (*p >> 24) & 0xFF;
        if a == 255 {
            continue;
        }
        if a == 0 {
            *p = 0;
            continue;
        }
        let r = (((*p >> 16) & 0xFF) * 255 / a).min(255);
        let g = (((*p >> 8) & 0xFF) * 255 / a).min(255);
        let b = ((*p & 0xFF) * 255 / a).min(255);
        *p = (a << 24) | (r << 16) | (g << 8) | b;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Argb;

    fn solid(w: i32, h: i32, c: Argb) -> PixelBuffer {
        let mut buf = PixelBuffer::with_size(w, h);
        buf.fill(c);
        buf
    }

    #[test]
    fn test_zero_radius_is_noop() {
        let mut blur = StackBlur::new();
        let mut buf = solid(4, 4, Argb::rgb(1, 2, 3));
        let before = buf.pixels().to_vec();
        blur.blur_rgb(&mut buf, 0);
        blur.blur_argb(&mut buf, 0);
        blur.blur_rgb(&mut buf, -3);
        assert_eq!(buf.pixels(), &before[..]);
    }

    #[test]
    fn test_uniform_image_is_fixed_point() {
        let mut blur = StackBlur::new();
        let c = Argb::rgb(40, 90, 200);
        let mut buf = solid(16, 12, c);
        blur.blur_rgb(&mut buf, 4);
        assert!(buf.pixels().iter().all(|&p| p == c.0));

        let mut buf = solid(16, 12, c);
        blur.blur_argb(&mut buf, 4);
        assert!(buf.pixels().iter().all(|&p| p == c.0));
    }

    #[test]
    fn test_impulse_response_is_symmetric() {
        let mut blur = StackBlur::new();
        let mut buf = solid(9, 1, Argb::rgb(0, 0, 0));
        buf.set_pixel(4, 0, Argb::WHITE);
        blur.blur_rgb(&mut buf, 2);
        for d in 1..=4 {
            assert_eq!(
                buf.pixel(4 - d, 0),
                buf.pixel(4 + d, 0),
                "asymmetric at distance {d}"
            );
        }
        // Center keeps the most energy, falling off outwards.
        assert!(buf.pixel(4, 0).r() > buf.pixel(3, 0).r());
        assert!(buf.pixel(3, 0).r() > buf.pixel(2, 0).r());
    }

    #[test]
    fn test_blur_rgb_preserves_alpha() {
        let mut blur = StackBlur::new();
        let mut buf = solid(5, 5, Argb::rgb(100, 100, 100));
        buf.set_pixel(2, 2, Argb::from_argb(7, 255, 255, 255));
        blur.blur_rgb(&mut buf, 2);
        assert_eq!(buf.pixel(2, 2).a(), 7);
        assert_eq!(buf.pixel(0, 0).a(), 255);
    }

    #[test]
    fn test_blur_argb_avoids_edge_darkening() {
        // Opaque red next to fully transparent pixels: after an alpha-aware
        // blur, partially transparent edge pixels must stay red, not darken
        // toward black.
        let mut blur = StackBlur::new();
        let mut buf = PixelBuffer::with_size(12, 1);
        buf.fill(Argb::TRANSPARENT);
        for x in 0..6 {
            buf.set_pixel(x, 0, Argb::rgb(255, 0, 0));
        }
        blur.blur_argb(&mut buf, 3);
        for x in 0..12 {
            let p = buf.pixel(x, 0);
            if p.a() > 8 {
                assert!(p.r() >= 248, "darkened edge at x={x}: {:08x}", p.0);
            }
        }
    }

    #[test]
    fn test_blur_argb_spreads_alpha() {
        let mut blur = StackBlur::new();
        let mut buf = PixelBuffer::with_size(9, 1);
        buf.fill(Argb::TRANSPARENT);
        buf.set_pixel(4, 0, Argb::WHITE);
        blur.blur_argb(&mut buf, 2);
        assert!(buf.pixel(3, 0).a() > 0);
        assert!(buf.pixel(5, 0).a() > 0);
        assert!(buf.pixel(4, 0).a() < 255);
    }

    #[test]
    fn test_repeat_blur_is_safe() {
        let mut blur = StackBlur::new();
        let c = Argb::rgb(10, 20, 30);
        let mut buf = solid(8, 8, c);
        blur.blur_rgb(&mut buf, 3);
        blur.blur_rgb(&mut buf, 3);
        assert!(buf.pixels().iter().all(|&p| p == c.0));
    }

    #[test]
    fn test_scratch_reuse_and_trim() {
        let mut blur = StackBlur::new();
        let mut buf = solid(32, 32, Argb::WHITE);
        blur.blur_rgb(&mut buf, 2);
        assert!(blur.plane.len() >= 32 * 32);
        blur.trim_memory();
        assert!(blur.plane.is_empty());
        // Still works after trimming.
        blur.blur_rgb(&mut buf, 2);
        assert!(buf.pixels().iter().all(|&p| p == Argb::WHITE.0));
    }
}

//! # liveblur
//!
//! Live blur-behind overlays for software-rendered surfaces.
//!
//! An overlay continuously shows a blurred copy of the content *behind* a
//! region of its host surface: the content is captured downscaled, blurred
//! with a stack blur, cached, and stretch-composited back - and the cache
//! is recomputed only when something it depends on actually changed.
//!
//! ## Architecture
//!
//! ```text
//! BlurSource ── draw_fully ──▶ DynamicBlur ── StackBlur ──▶ cached buffer
//!     ▲                            ▲                            │
//!     │ clip_exclude          invalidate                  stretch-composite
//!     │                            │                            ▼
//! EffectTree ◀── on_invalidated ── BlurOverlay ── draw ──▶ host Canvas
//! ```
//!
//! Three pieces cooperate:
//!
//! - [`blur::DynamicBlur`] - the frame cache: staleness tracking, scaled
//!   radius, scroll-axis insets, buffer reuse
//! - [`blur::BlurOverlay`] - one blur region bound to a [`surface::BlurSource`]:
//!   host-driven parameters, the usefulness gate, outline clipping
//! - [`effect::EffectTree`] - the surface-side damage graph that routes
//!   invalidations to overlays and excludes their footprints from the
//!   source's own paint
//!
//! Everything is single-threaded; overlays are shared between the host and
//! the surface's tree as `Rc<RefCell<_>>` handles.
//!
//! ## Modules
//!
//! - [`types`] - packed ARGB color, integer rectangles, damage regions
//! - [`buffer`] - reusable pixel buffer with capacity-preserving resize
//! - [`canvas`] - minimal software canvas (transform, clips, blending)
//! - [`blur`] - stack blur, frame cache, overlay
//! - [`outline`] - rectangular and rounded-rectangle overlay outlines
//! - [`effect`] - post-effect trait and damage-propagation tree
//! - [`surface`] - the contract a host surface implements

pub mod blur;
pub mod buffer;
pub mod canvas;
pub mod effect;
pub mod error;
pub mod outline;
pub mod surface;
pub mod types;

pub use blur::{BackgroundFill, BlurOverlay, DynamicBlur, StackBlur};
pub use buffer::PixelBuffer;
pub use canvas::{Canvas, Paint};
pub use effect::{EffectHandle, EffectTree, PostEffect};
pub use error::BlurError;
pub use outline::{OutlineDescription, OutlineShape};
pub use surface::{BlurSource, ScrollAxes, SourceHandle};
pub use types::{Argb, Damage, Rect};

//! Blur pipeline: the stack-blur algorithm, the frame cache that decides
//! when to re-run it, and the overlay that binds both to a surface.

mod dynamic;
mod overlay;
mod stack;

pub use dynamic::{BackgroundFill, BlurVariant, DynamicBlur};
pub use overlay::{ALPHA, BlurOverlay, IntProperty, RADIUS, SRC_OFFSET_X, SRC_OFFSET_Y};
pub use stack::StackBlur;

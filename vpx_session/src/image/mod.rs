//! Image buffers and pixel-format conversion.

mod buffer;
pub mod converters;
pub mod format;

pub use buffer::{Image, Rect};
pub use format::{ImageFormat, PackedLayout};

//! Pixel formats understood by the image buffer and converters.

use std::fmt;

/// Byte positions of the color channels inside one packed pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedLayout {
    pub bytes_per_pixel: usize,
    pub red: usize,
    pub green: usize,
    pub blue: usize,
    pub alpha: Option<usize>,
}

/// Color format of an [`Image`](super::Image).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Packed R, G, B; 24 bits per pixel
    Rgb24,
    /// Packed B, G, R; 24 bits per pixel
    Bgr24,
    /// Packed R, G, B, A; 32 bits per pixel
    Rgba32,
    /// Packed B, G, R, A; 32 bits per pixel
    Bgra32,
    /// Planar Y, U, V with 2x2 chroma subsampling
    I420,
    /// Planar Y, V, U with 2x2 chroma subsampling
    Yv12,
    /// Planar Y, U, V with horizontal chroma subsampling
    I422,
    /// Planar Y, U, V without chroma subsampling
    I444,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 8] = [
        ImageFormat::Rgb24,
        ImageFormat::Bgr24,
        ImageFormat::Rgba32,
        ImageFormat::Bgra32,
        ImageFormat::I420,
        ImageFormat::Yv12,
        ImageFormat::I422,
        ImageFormat::I444,
    ];

    /// Average storage cost of one pixel, chroma included.
    pub fn bits_per_pixel(&self) -> u32 {
        match self {
            ImageFormat::Rgb24 | ImageFormat::Bgr24 | ImageFormat::I444 => 24,
            ImageFormat::Rgba32 | ImageFormat::Bgra32 => 32,
            ImageFormat::I420 | ImageFormat::Yv12 => 12,
            ImageFormat::I422 => 16,
        }
    }

    pub fn is_planar(&self) -> bool {
        self.packed_layout().is_none()
    }

    pub fn plane_count(&self) -> usize {
        if self.is_planar() { 3 } else { 1 }
    }

    /// Horizontal and vertical chroma subsampling as bit shifts.
    pub fn chroma_shift(&self) -> (u32, u32) {
        match self {
            ImageFormat::I420 | ImageFormat::Yv12 => (1, 1),
            ImageFormat::I422 => (1, 0),
            _ => (0, 0),
        }
    }

    /// V plane stored before U.
    pub fn uv_flipped(&self) -> bool {
        *self == ImageFormat::Yv12
    }

    pub fn packed_layout(&self) -> Option<PackedLayout> {
        let layout = |bytes_per_pixel, red, green, blue, alpha| PackedLayout {
            bytes_per_pixel,
            red,
            green,
            blue,
            alpha,
        };
        match self {
            ImageFormat::Rgb24 => Some(layout(3, 0, 1, 2, None)),
            ImageFormat::Bgr24 => Some(layout(3, 2, 1, 0, None)),
            ImageFormat::Rgba32 => Some(layout(4, 0, 1, 2, Some(3))),
            ImageFormat::Bgra32 => Some(layout(4, 2, 1, 0, Some(3))),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Rgb24 => "RGB24",
            ImageFormat::Bgr24 => "BGR24",
            ImageFormat::Rgba32 => "RGBA32",
            ImageFormat::Bgra32 => "BGRA32",
            ImageFormat::I420 => "I420",
            ImageFormat::Yv12 => "YV12",
            ImageFormat::I422 => "I422",
            ImageFormat::I444 => "I444",
        };
        f.write_str(name)
    }
}

//! Owned or borrowed pixel buffers.

use super::converters;
use super::format::ImageFormat;
use crate::error::{Result, Status, VpxError};
use std::borrow::Cow;
use std::fmt;

/// Rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the last column; `None` if that overflows.
    pub fn right(&self) -> Option<u32> {
        self.x.checked_add(self.width)
    }

    /// One past the last row; `None` if that overflows.
    pub fn bottom(&self) -> Option<u32> {
        self.y.checked_add(self.height)
    }
}

enum Storage<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a mut [u8]),
    Released,
}

/// Memory layout derived from (format, width, height, alignment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    stored_width: u32,
    stored_height: u32,
    stride: [usize; 3],
    plane_base: [usize; 3],
    plane_len: [usize; 3],
    len: usize,
}

fn invalid(detail: String) -> VpxError {
    VpxError::engine(Status::InvalidParam, detail)
}

fn round_up(value: u64, unit: u64) -> u64 {
    value.div_ceil(unit) * unit
}

fn compute_layout(format: ImageFormat, width: u32, height: u32, align: u32) -> Result<Layout> {
    if width == 0 || height == 0 {
        return Err(invalid(format!("image geometry {}x{} is empty", width, height)));
    }
    let align = align.max(1);
    if !align.is_power_of_two() {
        return Err(invalid(format!("alignment {} is not a power of two", align)));
    }

    let (xs, ys) = format.chroma_shift();
    let stored_width = round_up(width as u64, 1 << xs);
    let stored_height = round_up(height as u64, 1 << ys);
    let bps = format.bits_per_pixel() as u64;

    let row = if format.is_planar() {
        stored_width
    } else {
        bps * stored_width / 8
    };
    let stride = round_up(row, align as u64);
    let len = if format.is_planar() {
        stored_height * stride * bps / 8
    } else {
        stored_height * stride
    };

    let to_usize = |v: u64| usize::try_from(v).map_err(|_| VpxError::from(Status::MemError));
    let len = to_usize(len)?;
    let stride = to_usize(stride)?;
    let luma_len = stride * stored_height as usize;

    let (stride, plane_base, plane_len) = if format.is_planar() {
        let chroma_stride = stride >> xs;
        let chroma_len = chroma_stride * (stored_height as usize >> ys);
        let (u_base, v_base) = if format.uv_flipped() {
            (luma_len + chroma_len, luma_len)
        } else {
            (luma_len, luma_len + chroma_len)
        };
        (
            [stride, chroma_stride, chroma_stride],
            [0, u_base, v_base],
            [luma_len, chroma_len, chroma_len],
        )
    } else {
        ([stride, 0, 0], [0, 0, 0], [len, 0, 0])
    };

    Ok(Layout {
        // Both fit: they are at most one subsampling unit above a u32.
        stored_width: u32::try_from(stored_width).map_err(|_| invalid("width overflow".into()))?,
        stored_height: u32::try_from(stored_height)
            .map_err(|_| invalid("height overflow".into()))?,
        stride,
        plane_base,
        plane_len,
        len,
    })
}

/// A rectangular pixel buffer in one [`ImageFormat`].
///
/// The buffer either owns its memory ([`Image::alloc`]) or borrows memory
/// supplied by the caller ([`Image::wrap`]); a borrowed image never frees
/// the caller's memory. Stored geometry is the allocated size, display
/// geometry the valid region inside it.
pub struct Image<'a> {
    format: ImageFormat,
    layout: Layout,
    display: Rect,
    align: u32,
    storage: Storage<'a>,
}

impl Image<'static> {
    /// Allocates a zeroed image.
    ///
    /// # Arguments
    ///
    /// * `format` - Pixel format
    /// * `width` - Display width in pixels
    /// * `height` - Display height in pixels
    /// * `align` - Row alignment in bytes; 0 is treated as 1
    ///
    /// # Errors
    ///
    /// `InvalidParam` for an empty geometry or an alignment that is not a
    /// power of two; `MemError` when the size does not fit in memory.
    pub fn alloc(format: ImageFormat, width: u32, height: u32, align: u32) -> Result<Self> {
        let layout = compute_layout(format, width, height, align)?;
        Ok(Image {
            format,
            layout,
            display: Rect::new(0, 0, width, height),
            align: align.max(1),
            storage: Storage::Owned(vec![0; layout.len]),
        })
    }
}

impl<'a> Image<'a> {
    /// Binds an image to caller memory without copying.
    ///
    /// # Errors
    ///
    /// [`VpxError::BufferSize`] when `buffer` is shorter than
    /// [`Image::required_len`] for the same arguments.
    pub fn wrap(
        format: ImageFormat,
        width: u32,
        height: u32,
        align: u32,
        buffer: &'a mut [u8],
    ) -> Result<Self> {
        let layout = compute_layout(format, width, height, align)?;
        if buffer.len() < layout.len {
            return Err(VpxError::BufferSize {
                required: layout.len,
                actual: buffer.len(),
            });
        }
        Ok(Image {
            format,
            layout,
            display: Rect::new(0, 0, width, height),
            align: align.max(1),
            storage: Storage::Borrowed(buffer),
        })
    }

    /// Minimum byte length of an image with this geometry.
    pub fn required_len(format: ImageFormat, width: u32, height: u32, align: u32) -> Result<usize> {
        compute_layout(format, width, height, align).map(|layout| layout.len)
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Width rounded up to whole chroma samples.
    pub fn stored_width(&self) -> u32 {
        self.layout.stored_width
    }

    /// Height rounded up to whole chroma samples.
    pub fn stored_height(&self) -> u32 {
        self.layout.stored_height
    }

    /// Display width.
    pub fn width(&self) -> u32 {
        self.display.width
    }

    /// Display height.
    pub fn height(&self) -> u32 {
        self.display.height
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.format.bits_per_pixel()
    }

    pub fn align(&self) -> u32 {
        self.align
    }

    pub fn display_rect(&self) -> Rect {
        self.display
    }

    /// Row stride of `plane` in bytes; 0 for planes the format lacks.
    pub fn stride(&self, plane: usize) -> usize {
        self.layout.stride.get(plane).copied().unwrap_or(0)
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    pub fn is_freed(&self) -> bool {
        matches!(self.storage, Storage::Released)
    }

    /// Restricts the display region to `rect` within the stored geometry.
    ///
    /// The origin must sit on a chroma sample.
    ///
    /// # Errors
    ///
    /// `InvalidParam` for an empty rect, one reaching past the stored
    /// geometry (overflowing bounds included) or a misaligned origin.
    pub fn set_display_rect(&mut self, rect: Rect) -> Result<()> {
        let (xs, ys) = self.format.chroma_shift();
        if rect.width == 0
            || rect.height == 0
            || rect.right().is_none_or(|right| right > self.layout.stored_width)
            || rect.bottom().is_none_or(|bottom| bottom > self.layout.stored_height)
        {
            return Err(invalid(format!(
                "display rect {:?} outside stored geometry {}x{}",
                rect, self.layout.stored_width, self.layout.stored_height
            )));
        }
        if rect.x % (1 << xs) != 0 || rect.y % (1 << ys) != 0 {
            return Err(invalid(format!(
                "display origin ({}, {}) is not chroma aligned",
                rect.x, rect.y
            )));
        }
        self.display = rect;
        Ok(())
    }

    fn bytes(&self) -> &[u8] {
        match self.storage {
            Storage::Owned(ref buf) => &buf[..self.layout.len],
            Storage::Borrowed(ref buf) => &buf[..self.layout.len],
            Storage::Released => &[],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        let len = self.layout.len;
        match self.storage {
            Storage::Owned(ref mut buf) => &mut buf[..len],
            Storage::Borrowed(ref mut buf) => &mut buf[..len],
            Storage::Released => &mut [],
        }
    }

    /// The whole image region, plane 0 first. Empty after [`Image::free`].
    pub fn data(&self) -> &[u8] {
        self.bytes()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.bytes_mut()
    }

    /// Offset of the first display sample of `plane`.
    fn plane_offset(&self, plane: usize) -> usize {
        let Rect { x, y, .. } = self.display;
        let stride = self.layout.stride[plane];
        let base = self.layout.plane_base[plane];
        match self.format.packed_layout() {
            Some(packed) => base + x as usize * packed.bytes_per_pixel + y as usize * stride,
            None if plane == 0 => base + x as usize + y as usize * stride,
            None => {
                let (xs, ys) = self.format.chroma_shift();
                base + (x >> xs) as usize + (y >> ys) as usize * stride
            }
        }
    }

    fn plane_range(&self, plane: usize) -> Option<(usize, usize)> {
        if plane >= self.format.plane_count() || self.is_freed() {
            return None;
        }
        let end = self.layout.plane_base[plane] + self.layout.plane_len[plane];
        Some((self.plane_offset(plane), end))
    }

    /// One plane, starting at its first display sample. Planes are indexed
    /// Y, U, V for planar formats whatever their memory order.
    pub fn plane(&self, plane: usize) -> &[u8] {
        match self.plane_range(plane) {
            Some((start, end)) => &self.bytes()[start..end],
            None => &[],
        }
    }

    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] {
        match self.plane_range(plane) {
            Some((start, end)) => &mut self.bytes_mut()[start..end],
            None => &mut [],
        }
    }

    /// Display rows of `plane`.
    pub(crate) fn plane_rows(&self, plane: usize) -> usize {
        let (_, ys) = self.format.chroma_shift();
        if plane == 0 {
            self.display.height as usize
        } else {
            self.display.height.div_ceil(1 << ys) as usize
        }
    }

    /// Bytes of display data in one row of `plane`.
    pub(crate) fn row_bytes(&self, plane: usize) -> usize {
        let (xs, _) = self.format.chroma_shift();
        match self.format.packed_layout() {
            Some(packed) => self.display.width as usize * packed.bytes_per_pixel,
            None if plane == 0 => self.display.width as usize,
            None => self.display.width.div_ceil(1 << xs) as usize,
        }
    }

    pub(crate) fn row(&self, plane: usize, row: usize) -> &[u8] {
        let start = self.plane_offset(plane) + row * self.layout.stride[plane];
        let len = self.row_bytes(plane);
        &self.bytes()[start..start + len]
    }

    pub(crate) fn row_mut(&mut self, plane: usize, row: usize) -> &mut [u8] {
        let start = self.plane_offset(plane) + row * self.layout.stride[plane];
        let len = self.row_bytes(plane);
        &mut self.bytes_mut()[start..start + len]
    }

    /// Reverses the order of the display rows on every plane.
    pub fn flip(&mut self) {
        if self.is_freed() {
            return;
        }
        for plane in 0..self.format.plane_count() {
            let rows = self.plane_rows(plane);
            let len = self.row_bytes(plane);
            let offset = self.plane_offset(plane);
            let stride = self.layout.stride[plane];
            let bytes = self.bytes_mut();
            for top in 0..rows / 2 {
                let bottom = rows - 1 - top;
                let (upper, lower) = bytes.split_at_mut(offset + bottom * stride);
                let start = offset + top * stride;
                upper[start..start + len].swap_with_slice(&mut lower[..len]);
            }
        }
    }

    /// Zeroes the buffer.
    pub fn clear(&mut self) {
        self.bytes_mut().fill(0);
    }

    /// Releases owned memory or detaches borrowed memory. Further calls do
    /// nothing.
    pub fn free(&mut self) {
        self.storage = Storage::Released;
    }

    /// Returns `self` when it already has `format`, otherwise a newly
    /// allocated converted copy.
    pub fn convert_to_format(&self, format: ImageFormat) -> Result<Cow<'_, Image<'a>>> {
        if format == self.format {
            return Ok(Cow::Borrowed(self));
        }
        let mut destination = Image::alloc(format, self.width(), self.height(), self.align)?;
        self.convert_into(&mut destination)?;
        Ok(Cow::Owned(destination))
    }

    /// Converts into `destination`, which must have the same display
    /// geometry. The source is never modified.
    pub fn convert_into(&self, destination: &mut Image<'_>) -> Result<()> {
        if self.is_freed() || destination.is_freed() {
            return Err(invalid("image has been freed".to_string()));
        }
        if self.width() != destination.width() || self.height() != destination.height() {
            return Err(invalid(format!(
                "cannot convert {}x{} into {}x{}",
                self.width(),
                self.height(),
                destination.width(),
                destination.height()
            )));
        }
        converters::convert(self, destination);
        Ok(())
    }

    /// Detaches from caller memory by copying it if needed.
    pub fn into_owned(self) -> Image<'static> {
        let storage = match self.storage {
            Storage::Owned(buf) => Storage::Owned(buf),
            Storage::Borrowed(buf) => Storage::Owned(buf[..self.layout.len].to_vec()),
            Storage::Released => Storage::Released,
        };
        Image {
            format: self.format,
            layout: self.layout,
            display: self.display,
            align: self.align,
            storage,
        }
    }
}

/// Cloning always yields an owned image.
impl Clone for Image<'_> {
    fn clone(&self) -> Self {
        let storage = match self.storage {
            Storage::Released => Storage::Released,
            _ => Storage::Owned(self.bytes().to_vec()),
        };
        Image {
            format: self.format,
            layout: self.layout,
            display: self.display,
            align: self.align,
            storage,
        }
    }
}

impl fmt::Debug for Image<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ownership = match self.storage {
            Storage::Owned(_) => "owned",
            Storage::Borrowed(_) => "borrowed",
            Storage::Released => "freed",
        };
        f.debug_struct("Image")
            .field("format", &self.format)
            .field("stored", &(self.layout.stored_width, self.layout.stored_height))
            .field("display", &self.display)
            .field("len", &self.layout.len)
            .field("storage", &ownership)
            .finish()
    }
}

//! Packed RGB-family conversion
//!
//! Channel shuffling between RGB24, BGR24, RGBA32 and BGRA32 rows.

use crate::image::buffer::Image;
use crate::image::format::PackedLayout;

/// Alpha written when the source has none.
const OPAQUE: u8 = 255;

pub(crate) fn convert_packed(
    src: &Image<'_>,
    src_layout: PackedLayout,
    dst: &mut Image<'_>,
    dst_layout: PackedLayout,
) {
    let swap_only = src_layout.bytes_per_pixel == 3
        && dst_layout.bytes_per_pixel == 3
        && src_layout.red == dst_layout.blue;

    for row in 0..src.plane_rows(0) {
        let src_row = src.row(0, row);
        let dst_row = dst.row_mut(0, row);
        if swap_only {
            swap_red_blue(src_row, dst_row);
        } else {
            shuffle_row(src_row, src_layout, dst_row, dst_layout);
        }
    }
}

/// Reads the (r, g, b) triple of pixel `x` in a packed row.
#[inline]
pub(crate) fn read_rgb(row: &[u8], layout: PackedLayout, x: usize) -> [u8; 3] {
    let px = &row[x * layout.bytes_per_pixel..];
    [px[layout.red], px[layout.green], px[layout.blue]]
}

/// Writes an opaque pixel `x` into a packed row.
#[inline]
pub(crate) fn write_rgb(row: &mut [u8], layout: PackedLayout, x: usize, rgb: [u8; 3]) {
    let px = &mut row[x * layout.bytes_per_pixel..];
    px[layout.red] = rgb[0];
    px[layout.green] = rgb[1];
    px[layout.blue] = rgb[2];
    if let Some(alpha) = layout.alpha {
        px[alpha] = OPAQUE;
    }
}

fn shuffle_row(src: &[u8], src_layout: PackedLayout, dst: &mut [u8], dst_layout: PackedLayout) {
    let pixels = src.len() / src_layout.bytes_per_pixel;
    for x in 0..pixels {
        write_rgb(dst, dst_layout, x, read_rgb(src, src_layout, x));
        if let (Some(from), Some(to)) = (src_layout.alpha, dst_layout.alpha) {
            dst[x * dst_layout.bytes_per_pixel + to] = src[x * src_layout.bytes_per_pixel + from];
        }
    }
}

/// Swaps the first and third byte of every 3-byte pixel.
///
/// Works on 4 pixels (12 bytes) at a time, then finishes the remainder.
pub(crate) fn swap_red_blue(src: &[u8], dst: &mut [u8]) {
    const CHUNK_SIZE: usize = 12;
    const PIXEL_SIZE: usize = 3;

    let mut src_chunks = src.chunks_exact(CHUNK_SIZE);
    let mut dst_chunks = dst.chunks_exact_mut(CHUNK_SIZE);
    for (s, d) in (&mut src_chunks).zip(&mut dst_chunks) {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
        d[3] = s[5];
        d[4] = s[4];
        d[5] = s[3];
        d[6] = s[8];
        d[7] = s[7];
        d[8] = s[6];
        d[9] = s[11];
        d[10] = s[10];
        d[11] = s[9];
    }

    let src_rest = src_chunks.remainder();
    let dst_rest = dst_chunks.into_remainder();
    for (s, d) in src_rest
        .chunks_exact(PIXEL_SIZE)
        .zip(dst_rest.chunks_exact_mut(PIXEL_SIZE))
    {
        d[0] = s[2];
        d[1] = s[1];
        d[2] = s[0];
    }
}

//! Pixel format converters
//!
//! Dispatches a conversion between two images of equal display geometry to
//! the packed (RGB family) or planar (YUV family) routines.

pub mod rgb_converter;
pub mod yuv_converter;

use super::buffer::Image;

pub(crate) fn convert(src: &Image<'_>, dst: &mut Image<'_>) {
    let (from, to) = (src.format(), dst.format());
    match (from.packed_layout(), to.packed_layout()) {
        _ if from == to => copy_planes(src, dst),
        (Some(src_layout), Some(dst_layout)) => {
            rgb_converter::convert_packed(src, src_layout, dst, dst_layout)
        }
        (Some(src_layout), None) => yuv_converter::packed_to_planar(src, src_layout, dst),
        (None, Some(dst_layout)) => yuv_converter::planar_to_packed(src, dst, dst_layout),
        (None, None) => yuv_converter::planar_to_planar(src, dst),
    }
}

/// Row-by-row copy between images of the same format.
fn copy_planes(src: &Image<'_>, dst: &mut Image<'_>) {
    for plane in 0..src.format().plane_count() {
        for row in 0..src.plane_rows(plane) {
            dst.row_mut(plane, row).copy_from_slice(src.row(plane, row));
        }
    }
}

//! Planar YUV conversion
//!
//! BT.601 limited-range integer transforms between packed RGB rows and
//! planar Y/U/V images, plus chroma resampling between planar layouts.

use super::rgb_converter::{read_rgb, write_rgb};
use crate::image::buffer::Image;
use crate::image::format::PackedLayout;

const Y_PLANE: usize = 0;
const U_PLANE: usize = 1;
const V_PLANE: usize = 2;

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Luma of one RGB sample.
#[inline]
pub fn rgb_to_y(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(i32::from);
    clamp_u8(((66 * r + 129 * g + 25 * b + 128) >> 8) + 16)
}

/// Chroma (U, V) of one RGB sample.
#[inline]
pub fn rgb_to_uv(rgb: [u8; 3]) -> (u8, u8) {
    let [r, g, b] = rgb.map(i32::from);
    let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
    let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
    (clamp_u8(u), clamp_u8(v))
}

#[inline]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;
    [
        clamp_u8((298 * c + 409 * e + 128) >> 8),
        clamp_u8((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp_u8((298 * c + 516 * d + 128) >> 8),
    ]
}

/// Packed RGB → planar YUV. Chroma is the average color of the block of
/// luma samples each chroma sample covers.
pub(crate) fn packed_to_planar(src: &Image<'_>, layout: PackedLayout, dst: &mut Image<'_>) {
    let width = src.width() as usize;
    let height = src.height() as usize;

    for y in 0..height {
        let src_row = src.row(0, y);
        let dst_row = dst.row_mut(Y_PLANE, y);
        for (x, out) in dst_row.iter_mut().enumerate().take(width) {
            *out = rgb_to_y(read_rgb(src_row, layout, x));
        }
    }

    let (xs, ys) = dst.format().chroma_shift();
    let chroma_cols = dst.row_bytes(U_PLANE);
    let mut u_row = vec![0u8; chroma_cols];
    let mut v_row = vec![0u8; chroma_cols];

    for cy in 0..dst.plane_rows(U_PLANE) {
        let rows = (cy << ys)..((cy + 1) << ys).min(height);
        for cx in 0..chroma_cols {
            let cols = (cx << xs)..((cx + 1) << xs).min(width);
            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for y in rows.clone() {
                let src_row = src.row(0, y);
                for x in cols.clone() {
                    let rgb = read_rgb(src_row, layout, x);
                    for (acc, c) in sum.iter_mut().zip(rgb) {
                        *acc += u32::from(c);
                    }
                    count += 1;
                }
            }
            let avg = sum.map(|s| ((s + count / 2) / count) as u8);
            (u_row[cx], v_row[cx]) = rgb_to_uv(avg);
        }
        dst.row_mut(U_PLANE, cy).copy_from_slice(&u_row);
        dst.row_mut(V_PLANE, cy).copy_from_slice(&v_row);
    }
}

/// Planar YUV → packed RGB, chroma sampled at the covering position.
pub(crate) fn planar_to_packed(src: &Image<'_>, dst: &mut Image<'_>, layout: PackedLayout) {
    let (xs, ys) = src.format().chroma_shift();
    let width = src.width() as usize;

    for y in 0..src.height() as usize {
        let luma = src.row(Y_PLANE, y);
        let u = src.row(U_PLANE, y >> ys);
        let v = src.row(V_PLANE, y >> ys);
        let dst_row = dst.row_mut(0, y);
        for x in 0..width {
            let rgb = yuv_to_rgb(luma[x], u[x >> xs], v[x >> xs]);
            write_rgb(dst_row, layout, x, rgb);
        }
    }
}

/// Planar → planar with a different chroma layout or plane order.
pub(crate) fn planar_to_planar(src: &Image<'_>, dst: &mut Image<'_>) {
    for y in 0..src.plane_rows(Y_PLANE) {
        dst.row_mut(Y_PLANE, y).copy_from_slice(src.row(Y_PLANE, y));
    }

    let (sxs, sys) = src.format().chroma_shift();
    let (dxs, dys) = dst.format().chroma_shift();
    let src_rows = src.plane_rows(U_PLANE);
    let src_cols = src.row_bytes(U_PLANE);

    for plane in [U_PLANE, V_PLANE] {
        for cy in 0..dst.plane_rows(plane) {
            let sy = ((cy << dys) >> sys).min(src_rows - 1);
            let src_row = src.row(plane, sy);
            let dst_row = dst.row_mut(plane, cy);
            for (cx, out) in dst_row.iter_mut().enumerate() {
                let sx = ((cx << dxs) >> sxs).min(src_cols - 1);
                *out = src_row[sx];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageFormat;

    fn solid(format: ImageFormat, width: u32, height: u32, pixel: &[u8]) -> Image<'static> {
        let mut img = Image::alloc(format, width, height, 1).unwrap();
        for chunk in img.data_mut().chunks_exact_mut(pixel.len()) {
            chunk.copy_from_slice(pixel);
        }
        img
    }

    #[test]
    fn test_reference_colors() {
        assert_eq!(rgb_to_y([0, 0, 0]), 16);
        assert_eq!(rgb_to_y([255, 255, 255]), 235);
        assert_eq!(rgb_to_uv([0, 0, 0]), (128, 128));
        assert_eq!(yuv_to_rgb(16, 128, 128), [0, 0, 0]);
        assert_eq!(yuv_to_rgb(235, 128, 128), [255, 255, 255]);
    }

    #[test]
    fn test_rgb_round_trip_is_close() {
        let colors = [[200, 150, 100], [10, 240, 30], [128, 128, 128], [255, 0, 0]];
        for rgb in colors {
            let (u, v) = rgb_to_uv(rgb);
            let back = yuv_to_rgb(rgb_to_y(rgb), u, v);
            for (a, b) in rgb.iter().zip(back) {
                assert!((i32::from(*a) - i32::from(b)).abs() <= 3, "{:?} -> {:?}", rgb, back);
            }
        }
    }

    #[test]
    fn test_rgb_to_i420_solid_frame() {
        let src = solid(ImageFormat::Rgb24, 4, 4, &[255, 255, 255]);
        let yuv = src.convert_to_format(ImageFormat::I420).unwrap();

        assert!(yuv.plane(0).iter().all(|&y| y == 235));
        assert!(yuv.plane(1).iter().all(|&u| u == 128));
        assert!(yuv.plane(2).iter().all(|&v| v == 128));
    }

    #[test]
    fn test_odd_geometry_chroma_average() {
        // 3x1: the last chroma sample only covers one pixel
        let mut src = Image::alloc(ImageFormat::Rgb24, 3, 1, 1).unwrap();
        src.data_mut()
            .copy_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0, 255]);
        let yuv = src.convert_to_format(ImageFormat::I420).unwrap();

        assert_eq!(yuv.row(U_PLANE, 0).len(), 2);
        assert_eq!(yuv.row(U_PLANE, 0)[0], 128);
        assert_eq!(yuv.row(U_PLANE, 0)[1], rgb_to_uv([0, 0, 255]).0);
    }

    #[test]
    fn test_i420_to_bgr_solid_frame() {
        let mut src = Image::alloc(ImageFormat::I420, 2, 2, 1).unwrap();
        src.data_mut().copy_from_slice(&[235, 235, 235, 235, 128, 128]);
        let bgr = src.convert_to_format(ImageFormat::Bgr24).unwrap();

        assert!(bgr.data().iter().all(|&c| c == 255));
    }

    #[test]
    fn test_i420_to_yv12_swaps_planes() {
        let mut src = Image::alloc(ImageFormat::I420, 2, 2, 1).unwrap();
        src.data_mut().copy_from_slice(&[1, 2, 3, 4, 50, 60]);
        let yv12 = src.convert_to_format(ImageFormat::Yv12).unwrap();

        assert_eq!(yv12.data(), &[1, 2, 3, 4, 60, 50]);
        assert_eq!(yv12.plane(1), &[50]);
    }

    #[test]
    fn test_i420_to_i444_upsamples_chroma() {
        let mut src = Image::alloc(ImageFormat::I420, 2, 2, 1).unwrap();
        src.data_mut().copy_from_slice(&[1, 2, 3, 4, 50, 60]);
        let i444 = src.convert_to_format(ImageFormat::I444).unwrap();

        assert_eq!(i444.plane(1), &[50, 50, 50, 50]);
        assert_eq!(i444.plane(2), &[60, 60, 60, 60]);
    }
}

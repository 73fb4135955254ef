//! Stride-aware byte transforms between planar pixel layouts.
//!
//! The kernels know nothing about displays or threads. Callers guarantee the
//! buffers cover `stride * (rows - 1) + row_bytes` bytes; a violated contract
//! panics on the slice bound instead of touching foreign memory.

/// Read-only view of one plane.
#[derive(Debug, Clone, Copy)]
pub struct PlaneRef<'a> {
    pub data: &'a [u8],
    pub stride: usize,
}

/// Writable view of one plane.
#[derive(Debug)]
pub struct PlaneMut<'a> {
    pub data: &'a mut [u8],
    pub stride: usize,
}

impl<'a> PlaneRef<'a> {
    pub fn new(data: &'a [u8], stride: usize) -> Self {
        Self { data, stride }
    }
}

impl<'a> PlaneMut<'a> {
    pub fn new(data: &'a mut [u8], stride: usize) -> Self {
        Self { data, stride }
    }
}

/// Copy `width` bytes of each of `height` rows, advancing each side by its own
/// stride.
pub fn copy_plane(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    width: usize,
    height: usize,
) {
    if width == 0 || height == 0 {
        return;
    }
    for (dst_row, src_row) in dst
        .chunks_mut(dst_stride)
        .zip(src.chunks(src_stride))
        .take(height)
    {
        dst_row[..width].copy_from_slice(&src_row[..width]);
    }
}

/// De-interleave a semi-planar chroma plane: for every sample `x` of a row,
/// `dst_u[x] = src[2x]` and `dst_v[x] = src[2x + 1]`.
///
/// `width` counts chroma samples, not bytes.
#[allow(clippy::too_many_arguments)]
pub fn split_interleaved_chroma(
    dst_u: &mut [u8],
    dst_u_stride: usize,
    dst_v: &mut [u8],
    dst_v_stride: usize,
    src: &[u8],
    src_stride: usize,
    width: usize,
    height: usize,
) {
    if width == 0 || height == 0 {
        return;
    }
    let rows = dst_u
        .chunks_mut(dst_u_stride)
        .zip(dst_v.chunks_mut(dst_v_stride))
        .zip(src.chunks(src_stride))
        .take(height);
    for ((u_row, v_row), src_row) in rows {
        let pairs = src_row[..width * 2].chunks_exact(2);
        for ((u, v), pair) in u_row[..width].iter_mut().zip(&mut v_row[..width]).zip(pairs) {
            *u = pair[0];
            *v = pair[1];
        }
    }
}

/// Fully planar 4:2:0: luma and both half-resolution chroma planes are copied
/// straight across, `src[i]` into `dst[i]`.
pub fn convert_yuv420_planar(
    dst: [PlaneMut<'_>; 3],
    src: [PlaneRef<'_>; 3],
    width: usize,
    height: usize,
) {
    let [dst_y, dst_1, dst_2] = dst;
    let [src_y, src_1, src_2] = src;
    let (chroma_width, chroma_height) = (width / 2, height / 2);

    copy_plane(dst_y.data, dst_y.stride, src_y.data, src_y.stride, width, height);
    copy_plane(
        dst_1.data,
        dst_1.stride,
        src_1.data,
        src_1.stride,
        chroma_width,
        chroma_height,
    );
    copy_plane(
        dst_2.data,
        dst_2.stride,
        src_2.data,
        src_2.stride,
        chroma_width,
        chroma_height,
    );
}

/// Semi-planar 4:2:0: luma is copied, the interleaved chroma plane is split
/// with its even bytes landing in `dst[2]` and its odd bytes in `dst[1]`.
///
/// NV12 and NV21 share this kernel; the caller picks the variant by swapping
/// `dst[1]` and `dst[2]`.
pub fn convert_semi_planar_420(
    dst: [PlaneMut<'_>; 3],
    src: [PlaneRef<'_>; 2],
    width: usize,
    height: usize,
) {
    let [dst_y, dst_1, dst_2] = dst;
    let [src_y, src_uv] = src;

    copy_plane(dst_y.data, dst_y.stride, src_y.data, src_y.stride, width, height);
    split_interleaved_chroma(
        dst_2.data,
        dst_2.stride,
        dst_1.data,
        dst_1.stride,
        src_uv.data,
        src_uv.stride,
        width / 2,
        height / 2,
    );
}

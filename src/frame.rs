use crate::Error;
use smallvec::SmallVec;
use std::time::Duration;

/// Pixel layouts a decoder may hand to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum PixelFormat {
    /// No format; frames carrying it are never valid.
    #[default]
    Invalid,
    /// Planar 4:2:0, planes ordered Y, U, V.
    Yuv420p,
    /// Planar 4:2:0, planes ordered Y, V, U.
    Yv12,
    /// Luma plane plus one interleaved U/V plane.
    Nv12,
    /// Luma plane plus one interleaved V/U plane.
    Nv21,
    /// Packed 4:2:2, Y0 U Y1 V.
    Yuyv,
    /// Packed 4:2:2, U Y0 V Y1.
    Uyvy,
    /// Packed 32-bit RGB.
    Rgb32,
}

impl PixelFormat {
    /// Number of planes a frame of this format carries.
    pub fn plane_count(&self) -> usize {
        match self {
            PixelFormat::Invalid => 0,
            PixelFormat::Yuv420p | PixelFormat::Yv12 => 3,
            PixelFormat::Nv12 | PixelFormat::Nv21 => 2,
            PixelFormat::Yuyv | PixelFormat::Uyvy | PixelFormat::Rgb32 => 1,
        }
    }

    /// Whether the overlay converter handles this format. Frames in other
    /// formats are stored but never reach the overlay image.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            PixelFormat::Yuv420p | PixelFormat::Yv12 | PixelFormat::Nv12 | PixelFormat::Nv21
        )
    }

    /// Logical `(row_bytes, rows)` of `plane` for a `width`x`height` frame.
    ///
    /// Chroma dimensions truncate: an odd frame loses its last chroma row and
    /// column.
    pub fn plane_extent(&self, plane: usize, width: u32, height: u32) -> (usize, usize) {
        let (w, h) = (width as usize, height as usize);
        match (self, plane) {
            (PixelFormat::Yuv420p | PixelFormat::Yv12, 0) => (w, h),
            (PixelFormat::Yuv420p | PixelFormat::Yv12, _) => (w / 2, h / 2),
            (PixelFormat::Nv12 | PixelFormat::Nv21, 0) => (w, h),
            // two bytes per chroma sample pair
            (PixelFormat::Nv12 | PixelFormat::Nv21, _) => ((w / 2) * 2, h / 2),
            (PixelFormat::Yuyv | PixelFormat::Uyvy, _) => (w * 2, h),
            (PixelFormat::Rgb32, _) => (w * 4, h),
            (PixelFormat::Invalid, _) => (0, 0),
        }
    }
}

/// A single plane of pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    /// Raw bytes, `stride` bytes per row.
    pub data: Vec<u8>,
    /// Bytes per row, including any decoder padding.
    pub stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, stride: usize) -> Self {
        Self { data, stride }
    }
}

/// A decoded frame handed over by the decode pipeline.
///
/// Construction checks that every plane is large enough for its logical
/// extent, so the copy kernels can index without further bounds checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoFrame {
    format: PixelFormat,
    width: u32,
    height: u32,
    planes: SmallVec<[Plane; 3]>,
    pts: Option<Duration>,
}

impl VideoFrame {
    pub fn new(
        format: PixelFormat,
        width: u32,
        height: u32,
        planes: impl IntoIterator<Item = Plane>,
    ) -> Result<Self, Error> {
        if format == PixelFormat::Invalid {
            return Err(Error::InvalidFrame("pixel format is not set"));
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidFrame("frame has zero area"));
        }
        let planes: SmallVec<[Plane; 3]> = planes.into_iter().collect();
        if planes.len() != format.plane_count() {
            return Err(Error::InvalidFrame("plane count does not match pixel format"));
        }
        for (i, plane) in planes.iter().enumerate() {
            let (row_bytes, rows) = format.plane_extent(i, width, height);
            if plane.stride < row_bytes {
                return Err(Error::InvalidFrame("plane stride is narrower than a row"));
            }
            let needed = match rows {
                0 => 0,
                rows => plane.stride * (rows - 1) + row_bytes,
            };
            if plane.data.len() < needed {
                return Err(Error::InvalidFrame("plane is shorter than its extent"));
            }
        }

        Ok(Self {
            format,
            width,
            height,
            planes,
            pts: None,
        })
    }

    /// Attach a presentation timestamp.
    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pts(&self) -> Option<Duration> {
        self.pts
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    /// A frame is valid once it went through [`VideoFrame::new`].
    pub fn is_valid(&self) -> bool {
        self.format != PixelFormat::Invalid && self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_is_invalid() {
        let frame = VideoFrame::default();
        assert!(!frame.is_valid());
        assert_eq!(frame.plane_count(), 0);
    }

    #[test]
    fn accepts_padded_planes() {
        let frame = VideoFrame::new(
            PixelFormat::Yuv420p,
            4,
            2,
            [
                Plane::new(vec![0; 8 + 4], 8),
                Plane::new(vec![0; 2], 4),
                Plane::new(vec![0; 2], 4),
            ],
        )
        .unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.plane(1).unwrap().stride, 4);
    }

    #[test]
    fn rejects_short_plane() {
        let err = VideoFrame::new(
            PixelFormat::Nv12,
            4,
            4,
            [Plane::new(vec![0; 16], 4), Plane::new(vec![0; 7], 4)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidFrame(_)));
    }

    #[test]
    fn rejects_narrow_stride() {
        let err = VideoFrame::new(PixelFormat::Rgb32, 4, 1, [Plane::new(vec![0; 16], 8)]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_wrong_plane_count() {
        let err = VideoFrame::new(PixelFormat::Yv12, 2, 2, [Plane::new(vec![0; 4], 2)]);
        assert!(err.is_err());
    }

    #[test]
    fn odd_chroma_extent_truncates() {
        assert_eq!(PixelFormat::Yuv420p.plane_extent(1, 5, 3), (2, 1));
        assert_eq!(PixelFormat::Nv21.plane_extent(1, 5, 3), (4, 1));
    }

    #[test]
    fn packed_formats_are_not_converted() {
        assert!(PixelFormat::Nv12.is_supported());
        assert!(PixelFormat::Yv12.is_supported());
        assert!(!PixelFormat::Yuyv.is_supported());
        assert!(!PixelFormat::Invalid.is_supported());
    }
}

//! The seam between the renderer and the display server.

use crate::Error;
use crate::geometry::{Rect, Size};
use crate::kernels::{PlaneMut, PlaneRef};

/// Native handle of the window the overlay is presented into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Drawable(pub u64);

/// Background colour as `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0x000000);

    pub fn rgb(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }
}

/// Device-native layouts an overlay image can be allocated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceFormat {
    /// Planar 4:2:0 stored Y, V, U: the plane at offset 1 holds V and the
    /// plane at offset 2 holds U.
    Yv12,
}

impl SurfaceFormat {
    /// Physical plane index for each destination slot handed to the copy
    /// kernels: luma, then the plane stored at offset 2, then offset 1.
    pub const fn plane_order(&self) -> [usize; 3] {
        match self {
            SurfaceFormat::Yv12 => YV12_PLANE_ORDER,
        }
    }

    /// Minimum `(row_bytes, rows)` of physical plane `plane` for an image of
    /// `size`. Chroma rounds up so odd sizes keep their last sample.
    pub fn plane_extent(&self, plane: usize, size: Size) -> (usize, usize) {
        let (w, h) = (size.width as usize, size.height as usize);
        match (self, plane) {
            (SurfaceFormat::Yv12, 0) => (w, h),
            (SurfaceFormat::Yv12, _) => (w.div_ceil(2), h.div_ceil(2)),
        }
    }
}

/// YV12 keeps its chroma planes swapped relative to Y-U-V ordering, so the
/// kernels' second destination plane (U for planar sources) lives at
/// physical index 2 and the third at index 1.
pub const YV12_PLANE_ORDER: [usize; 3] = [0, 2, 1];

/// How an image reaches the display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transfer {
    /// Hand the shared segment to the server without waiting for completion.
    SharedMemory,
    /// Copy the pixels over the connection synchronously.
    Copy,
}

/// Where an [`OverlayImage`]'s pixels live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Memory {
    Shared,
    Standard,
}

/// A device-native image with per-plane offsets and pitches.
#[derive(Debug)]
pub struct OverlayImage {
    format: SurfaceFormat,
    width: u32,
    height: u32,
    offsets: [usize; 3],
    pitches: [usize; 3],
    data: Vec<u8>,
    memory: Memory,
}

impl OverlayImage {
    /// Build an image over `data`. Offsets must be ascending, and each plane
    /// must hold its rows at its pitch before the next plane begins.
    pub fn new(
        format: SurfaceFormat,
        size: Size,
        offsets: [usize; 3],
        pitches: [usize; 3],
        data: Vec<u8>,
        memory: Memory,
    ) -> Result<Self, Error> {
        if size.is_empty() {
            return Err(Error::Allocation {
                width: size.width,
                height: size.height,
            });
        }
        let invalid = Error::Allocation {
            width: size.width,
            height: size.height,
        };
        let ascending = offsets[0] <= offsets[1] && offsets[1] <= offsets[2];
        if !ascending || offsets[2] > data.len() {
            return Err(invalid);
        }
        for plane in 0..3 {
            let end = offsets.get(plane + 1).copied().unwrap_or(data.len());
            let available = end - offsets[plane];
            let (row_bytes, rows) = format.plane_extent(plane, size);
            let pitch = pitches[plane];
            let needed = pitch
                .checked_mul(rows - 1)
                .and_then(|bytes| bytes.checked_add(row_bytes));
            if pitch < row_bytes || needed.is_none_or(|needed| needed > available) {
                log::debug!(
                    "plane {plane} of a {}x{} image: pitch {pitch}, {available} bytes",
                    size.width,
                    size.height
                );
                return Err(invalid);
            }
        }
        Ok(Self {
            format,
            width: size.width,
            height: size.height,
            offsets,
            pitches,
            data,
            memory,
        })
    }

    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn offsets(&self) -> [usize; 3] {
        self.offsets
    }

    pub fn pitches(&self) -> [usize; 3] {
        self.pitches
    }

    pub fn memory(&self) -> Memory {
        self.memory
    }

    pub fn is_shared(&self) -> bool {
        self.memory == Memory::Shared
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Physical plane `index`, from its offset up to the next plane.
    pub fn plane(&self, index: usize) -> PlaneRef<'_> {
        let end = self
            .offsets
            .get(index + 1)
            .copied()
            .unwrap_or(self.data.len());
        PlaneRef::new(&self.data[self.offsets[index]..end], self.pitches[index])
    }

    /// All three physical planes as disjoint writable views.
    pub fn planes_mut(&mut self) -> [PlaneMut<'_>; 3] {
        let [o0, o1, o2] = self.offsets;
        let [p0, p1, p2] = self.pitches;
        let (head, plane2) = self.data.split_at_mut(o2);
        let (head, plane1) = head.split_at_mut(o1);
        let plane0 = &mut head[o0..];
        [
            PlaneMut::new(plane0, p0),
            PlaneMut::new(plane1, p1),
            PlaneMut::new(plane2, p2),
        ]
    }

    /// Planes in the order the copy kernels expect for this surface format,
    /// see [`SurfaceFormat::plane_order`].
    pub fn destination_planes(&mut self) -> [PlaneMut<'_>; 3] {
        let order = self.format.plane_order();
        arrange(self.planes_mut(), order)
    }
}

/// Permute `items` so that slot `k` holds the item originally at `order[k]`.
fn arrange<T>(mut items: [T; 3], order: [usize; 3]) -> [T; 3] {
    let mut held = [0, 1, 2];
    for (slot, wanted) in order.into_iter().enumerate() {
        if let Some(found) = (slot..3).find(|&j| held[j] == wanted) {
            items.swap(slot, found);
            held.swap(slot, found);
        }
    }
    items
}

/// One adjustable property reported by the overlay device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub min: i32,
    pub max: i32,
    pub settable: bool,
}

impl AttributeDescriptor {
    pub fn settable(name: impl Into<String>, min: i32, max: i32) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            settable: true,
        }
    }
}

/// A connection to a display server capable of presenting overlay images.
///
/// Every call may fail; callers degrade instead of retrying.
pub trait DisplayConnection: Send + Sync {
    /// Whether shared-memory images can be created at all.
    fn supports_shm(&self) -> bool;

    /// Allocate an image of `size` in `format`.
    fn create_image(
        &self,
        format: SurfaceFormat,
        size: Size,
        memory: Memory,
    ) -> Result<OverlayImage, Error>;

    /// Descriptors of the adjustable attributes of the overlay port.
    fn query_attributes(&self) -> Result<Vec<AttributeDescriptor>, Error>;

    /// Write an already device-scaled attribute value.
    fn set_attribute(&self, name: &str, value: i32) -> Result<(), Error>;

    fn fill_rectangle(&self, drawable: Drawable, rect: Rect, color: Color) -> Result<(), Error>;

    /// Present the `roi` of `image` scaled into `dst`.
    fn put_image(
        &self,
        drawable: Drawable,
        image: &OverlayImage,
        roi: Rect,
        dst: Rect,
        transfer: Transfer,
    ) -> Result<(), Error>;

    /// Re-acquire the overlay device after the window was hidden or
    /// restacked. Must be idempotent.
    fn validate(&self) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> OverlayImage {
        // 4x2 YV12, luma pitch 4, chroma pitch 2
        let data = (0..12u8).collect();
        OverlayImage::new(
            SurfaceFormat::Yv12,
            Size::new(4, 2),
            [0, 8, 10],
            [4, 2, 2],
            data,
            Memory::Standard,
        )
        .unwrap()
    }

    #[test]
    fn yv12_order_swaps_chroma() {
        assert_eq!(SurfaceFormat::Yv12.plane_order(), [0, 2, 1]);
    }

    #[test]
    fn planes_split_at_offsets() {
        let mut image = image();
        assert_eq!(image.plane(1).data, &[8, 9]);
        assert_eq!(image.plane(2).data, &[10, 11]);

        let [y, v, u] = image.planes_mut();
        assert_eq!(y.data.len(), 8);
        v.data[0] = 0xF0;
        u.data[1] = 0x0F;
        assert_eq!(image.data()[8], 0xF0);
        assert_eq!(image.data()[11], 0x0F);
    }

    #[test]
    fn rejects_offsets_past_buffer() {
        let err = OverlayImage::new(
            SurfaceFormat::Yv12,
            Size::new(4, 2),
            [0, 8, 20],
            [4, 2, 2],
            vec![0; 12],
            Memory::Shared,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_pitch_narrower_than_row() {
        let err = OverlayImage::new(
            SurfaceFormat::Yv12,
            Size::new(4, 2),
            [0, 4, 6],
            [2, 1, 1],
            vec![0; 7],
            Memory::Standard,
        );
        assert!(matches!(err, Err(Error::Allocation { width: 4, height: 2 })));
    }

    #[test]
    fn rejects_zero_pitch() {
        let err = OverlayImage::new(
            SurfaceFormat::Yv12,
            Size::new(1, 1),
            [0, 1, 2],
            [0, 1, 1],
            vec![0; 3],
            Memory::Standard,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_plane_shorter_than_its_rows() {
        // luma needs 4 * 1 + 4 = 8 bytes before the first chroma plane
        let err = OverlayImage::new(
            SurfaceFormat::Yv12,
            Size::new(4, 2),
            [0, 6, 8],
            [4, 2, 2],
            vec![0; 10],
            Memory::Standard,
        );
        assert!(err.is_err());
    }

    #[test]
    fn odd_sizes_need_rounded_up_chroma() {
        assert_eq!(SurfaceFormat::Yv12.plane_extent(1, Size::new(5, 3)), (3, 2));
        // 5x3 with chroma pitch 2 cannot hold 3 chroma samples per row
        let err = OverlayImage::new(
            SurfaceFormat::Yv12,
            Size::new(5, 3),
            [0, 15, 19],
            [5, 2, 2],
            vec![0; 23],
            Memory::Standard,
        );
        assert!(err.is_err());
    }

    #[test]
    fn destination_planes_follow_plane_order() {
        let mut image = image();
        let [y, first, second] = image.destination_planes();
        assert_eq!(y.data.len(), 8);
        // first destination slot is the plane stored at offset 2
        assert_eq!(first.data, &[10, 11]);
        assert_eq!(second.data, &[8, 9]);
    }

    #[test]
    fn arrange_applies_any_permutation() {
        assert_eq!(arrange(['a', 'b', 'c'], [2, 0, 1]), ['c', 'a', 'b']);
        assert_eq!(arrange(['a', 'b', 'c'], [0, 1, 2]), ['a', 'b', 'c']);
    }

    #[test]
    fn color_channels() {
        assert_eq!(Color(0x102030).rgb(), [0x10, 0x20, 0x30]);
    }
}

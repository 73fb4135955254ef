//! An in-memory display server.
//!
//! Images live in process memory, the drawable is an RGBA framebuffer, and
//! every request is recorded so the presentation path can be inspected
//! without a real overlay device. Failures can be injected per request kind.

use crate::Error;
use crate::display::{
    AttributeDescriptor, Color, DisplayConnection, Drawable, Memory, OverlayImage,
    SurfaceFormat, Transfer,
};
use crate::geometry::{Rect, Size};
use parking_lot::Mutex;
use std::path::Path;
use yuv::{YuvPlanarImage, YuvRange, YuvStandardMatrix, yuv420_to_rgba};

/// Row pitches are padded to this many bytes, like real overlay adaptors do.
const PITCH_ALIGN: usize = 8;

fn align(value: usize) -> usize {
    value.div_ceil(PITCH_ALIGN) * PITCH_ALIGN
}

/// Counters over the requests a [`SoftwareDisplay`] served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayStats {
    pub images_created: u64,
    pub validations: u64,
    pub fills: u64,
    pub shm_puts: u64,
    pub copy_puts: u64,
}

/// One recorded `put_image` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blit {
    pub image_size: Size,
    pub roi: Rect,
    pub dst: Rect,
    pub transfer: Transfer,
}

#[derive(Debug)]
struct Inner {
    size: Size,
    framebuffer: Vec<u8>,
    connected: bool,
    shm_supported: bool,
    fail_allocations: bool,
    fail_shm_allocations: bool,
    attributes: Option<Vec<AttributeDescriptor>>,
    attribute_writes: Vec<(String, i32)>,
    fills: Vec<(Rect, Color)>,
    blits: Vec<Blit>,
    stats: DisplayStats,
}

/// A display server with a single window, kept entirely in memory.
#[derive(Debug)]
pub struct SoftwareDisplay {
    drawable: Drawable,
    inner: Mutex<Inner>,
}

impl SoftwareDisplay {
    /// Handle of the only window this display serves.
    pub const DRAWABLE: Drawable = Drawable(1);

    pub fn new(size: Size) -> Self {
        Self {
            drawable: Self::DRAWABLE,
            inner: Mutex::new(Inner {
                size,
                framebuffer: vec![0; size.width as usize * size.height as usize * 4],
                connected: true,
                shm_supported: true,
                fail_allocations: false,
                fail_shm_allocations: false,
                attributes: Some(vec![
                    AttributeDescriptor::settable("XV_BRIGHTNESS", -1000, 1000),
                    AttributeDescriptor::settable("XV_CONTRAST", -1000, 1000),
                    AttributeDescriptor::settable("XV_HUE", -1000, 1000),
                    AttributeDescriptor::settable("XV_SATURATION", -1000, 1000),
                ]),
                attribute_writes: Vec::new(),
                fills: Vec::new(),
                blits: Vec::new(),
                stats: DisplayStats::default(),
            }),
        }
    }

    /// Whether shared-memory images can be created.
    pub fn with_shm(self, supported: bool) -> Self {
        self.inner.lock().shm_supported = supported;
        self
    }

    pub fn drawable(&self) -> Drawable {
        self.drawable
    }

    pub fn size(&self) -> Size {
        self.inner.lock().size
    }

    /// Resize the window; its contents are cleared to black.
    pub fn resize(&self, size: Size) {
        let mut inner = self.inner.lock();
        inner.size = size;
        inner.framebuffer = vec![0; size.width as usize * size.height as usize * 4];
    }

    pub fn fail_allocations(&self, fail: bool) {
        self.inner.lock().fail_allocations = fail;
    }

    pub fn fail_shm_allocations(&self, fail: bool) {
        self.inner.lock().fail_shm_allocations = fail;
    }

    /// Drop the connection: every request fails until [`Self::reconnect`].
    pub fn disconnect(&self) {
        self.inner.lock().connected = false;
    }

    pub fn reconnect(&self) {
        self.inner.lock().connected = true;
    }

    /// Replace the attribute descriptors the port reports.
    pub fn set_attributes(&self, attributes: Vec<AttributeDescriptor>) {
        self.inner.lock().attributes = Some(attributes);
    }

    /// Make attribute introspection fail.
    pub fn disable_attribute_queries(&self) {
        self.inner.lock().attributes = None;
    }

    pub fn attribute_writes(&self) -> Vec<(String, i32)> {
        self.inner.lock().attribute_writes.clone()
    }

    pub fn fills(&self) -> Vec<(Rect, Color)> {
        self.inner.lock().fills.clone()
    }

    pub fn blits(&self) -> Vec<Blit> {
        self.inner.lock().blits.clone()
    }

    pub fn stats(&self) -> DisplayStats {
        self.inner.lock().stats
    }

    /// Forget recorded fills and blits.
    pub fn clear_log(&self) {
        let mut inner = self.inner.lock();
        inner.fills.clear();
        inner.blits.clear();
    }

    /// RGBA value of the window pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let inner = self.inner.lock();
        if x >= inner.size.width || y >= inner.size.height {
            return None;
        }
        let i = (y as usize * inner.size.width as usize + x as usize) * 4;
        let px = &inner.framebuffer[i..i + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copy of the window contents, RGBA, tightly packed.
    pub fn framebuffer(&self) -> Vec<u8> {
        self.inner.lock().framebuffer.clone()
    }

    /// Write the window contents to a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let inner = self.inner.lock();
        image::save_buffer(
            path,
            &inner.framebuffer,
            inner.size.width,
            inner.size.height,
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }

    fn check(&self, inner: &Inner, drawable: Drawable) -> Result<(), Error> {
        if !inner.connected {
            return Err(Error::ConnectionLost);
        }
        if drawable != self.drawable {
            return Err(Error::UnknownDrawable(drawable));
        }
        Ok(())
    }
}

/// Convert a YV12 image to tightly packed RGBA.
fn image_to_rgba(image: &OverlayImage) -> Result<Vec<u8>, Error> {
    let (width, height) = (image.width(), image.height());
    // physical plane 1 holds V, plane 2 holds U
    let (y, v, u) = (image.plane(0), image.plane(1), image.plane(2));
    let planar = YuvPlanarImage {
        y_plane: y.data,
        y_stride: y.stride as u32,
        u_plane: u.data,
        u_stride: u.stride as u32,
        v_plane: v.data,
        v_stride: v.stride as u32,
        width,
        height,
    };

    let mut rgba = vec![0u8; width as usize * height as usize * 4];
    yuv420_to_rgba(
        &planar,
        &mut rgba,
        width * 4,
        YuvRange::Limited,
        YuvStandardMatrix::Bt601,
    )
    .map_err(|err| Error::Conversion(format!("{err:?}")))?;
    Ok(rgba)
}

impl DisplayConnection for SoftwareDisplay {
    fn supports_shm(&self) -> bool {
        self.inner.lock().shm_supported
    }

    fn create_image(
        &self,
        format: SurfaceFormat,
        size: Size,
        memory: Memory,
    ) -> Result<OverlayImage, Error> {
        let mut inner = self.inner.lock();
        if !inner.connected {
            return Err(Error::ConnectionLost);
        }
        if inner.fail_allocations {
            return Err(Error::Allocation {
                width: size.width,
                height: size.height,
            });
        }
        if memory == Memory::Shared && (!inner.shm_supported || inner.fail_shm_allocations) {
            return Err(Error::SharedMemoryUnavailable);
        }

        let SurfaceFormat::Yv12 = format;
        let (width, height) = (size.width as usize, size.height as usize);
        let (chroma_width, chroma_height) = (width.div_ceil(2), height.div_ceil(2));
        let luma_pitch = align(width);
        let chroma_pitch = align(chroma_width);
        let offsets = [
            0,
            luma_pitch * height,
            luma_pitch * height + chroma_pitch * chroma_height,
        ];
        let len = offsets[2] + chroma_pitch * chroma_height;

        let image = OverlayImage::new(
            format,
            size,
            offsets,
            [luma_pitch, chroma_pitch, chroma_pitch],
            vec![0; len],
            memory,
        )?;
        inner.stats.images_created += 1;
        Ok(image)
    }

    fn query_attributes(&self) -> Result<Vec<AttributeDescriptor>, Error> {
        let inner = self.inner.lock();
        if !inner.connected {
            return Err(Error::ConnectionLost);
        }
        inner.attributes.clone().ok_or(Error::AttributesUnsupported)
    }

    fn set_attribute(&self, name: &str, value: i32) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        if !inner.connected {
            return Err(Error::ConnectionLost);
        }
        inner.attribute_writes.push((name.to_string(), value));
        Ok(())
    }

    fn fill_rectangle(&self, drawable: Drawable, rect: Rect, color: Color) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        self.check(&inner, drawable)?;
        inner.fills.push((rect, color));
        inner.stats.fills += 1;

        let window = Rect::from_size(inner.size);
        let area = rect.intersect(&window);
        let [r, g, b] = color.rgb();
        let stride = inner.size.width as usize * 4;
        for y in area.y..area.bottom() {
            let row = y as usize * stride;
            for x in area.x..area.right() {
                let i = row + x as usize * 4;
                inner.framebuffer[i..i + 4].copy_from_slice(&[r, g, b, 0xFF]);
            }
        }
        Ok(())
    }

    fn put_image(
        &self,
        drawable: Drawable,
        image: &OverlayImage,
        roi: Rect,
        dst: Rect,
        transfer: Transfer,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        self.check(&inner, drawable)?;
        if transfer == Transfer::SharedMemory && !image.is_shared() {
            return Err(Error::SharedMemoryUnavailable);
        }
        inner.blits.push(Blit {
            image_size: image.size(),
            roi,
            dst,
            transfer,
        });
        match transfer {
            Transfer::SharedMemory => inner.stats.shm_puts += 1,
            Transfer::Copy => inner.stats.copy_puts += 1,
        }

        let roi = roi.intersect(&Rect::from_size(image.size()));
        if roi.is_empty() || dst.is_empty() {
            return Ok(());
        }
        let rgba = image_to_rgba(image)?;
        let src_stride = image.width() as usize * 4;

        // nearest-neighbour scale of roi into dst, clipped to the window
        let window = Rect::from_size(inner.size);
        let visible = dst.intersect(&window);
        let dst_stride = inner.size.width as usize * 4;
        for y in visible.y..visible.bottom() {
            let sy = roi.y as i64 + (y - dst.y) as i64 * roi.height as i64 / dst.height as i64;
            for x in visible.x..visible.right() {
                let sx = roi.x as i64 + (x - dst.x) as i64 * roi.width as i64 / dst.width as i64;
                let s = sy as usize * src_stride + sx as usize * 4;
                let d = y as usize * dst_stride + x as usize * 4;
                inner.framebuffer[d..d + 4].copy_from_slice(&rgba[s..s + 4]);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        inner.stats.validations += 1;
        if inner.connected {
            Ok(())
        } else {
            Err(Error::ConnectionLost)
        }
    }
}

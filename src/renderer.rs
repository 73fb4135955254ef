use crate::attributes::{Attribute, SurfaceAttributeController};
use crate::display::{Color, DisplayConnection, Drawable, OverlayImage, SurfaceFormat, Transfer};
use crate::frame::{PixelFormat, Plane, VideoFrame};
use crate::geometry::{ContentFit, Rect, Size, margins, output_rect};
use crate::host::RenderHost;
use crate::kernels::{PlaneRef, convert_semi_planar_420, convert_yuv420_planar};
use crate::surface::{DeviceState, OverlaySurfaceManager, PreparedSurface};
use parking_lot::Mutex;
use std::sync::Arc;

/// Renderer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererConfig {
    background: Color,
    content_fit: ContentFit,
    prefer_shm: bool,
    region_of_interest: Option<Rect>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            content_fit: ContentFit::Contain,
            prefer_shm: true,
            region_of_interest: None,
        }
    }
}

impl RendererConfig {
    /// Set the colour of the letterbox/pillarbox margins.
    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Set the content fit mode.
    pub fn content_fit(mut self, fit: ContentFit) -> Self {
        self.content_fit = fit;
        self
    }

    /// Prefer shared-memory images when the display offers them.
    pub fn prefer_shm(mut self, prefer: bool) -> Self {
        self.prefer_shm = prefer;
        self
    }

    /// Only present this part of each frame.
    pub fn region_of_interest(mut self, roi: Option<Rect>) -> Self {
        self.region_of_interest = roi;
        self
    }
}

/// The live frame and the image it was converted into. Guarded together.
#[derive(Debug)]
struct Live {
    image: Option<OverlayImage>,
    frame: VideoFrame,
}

/// Geometry and flags touched by host events.
#[derive(Debug)]
struct RenderState {
    drawable_size: Size,
    source_size: Size,
    content_fit: ContentFit,
    roi: Option<Rect>,
    out_rect: Rect,
    update_background: bool,
}

impl RenderState {
    fn recompute_out_rect(&mut self) {
        let source = real_roi(self.roi, self.source_size).size();
        self.out_rect = output_rect(source, self.drawable_size, self.content_fit);
    }

    /// An empty source size means no valid frame is live yet; the whole
    /// drawable is then background.
    fn needs_background(&self) -> bool {
        if !self.update_background || self.drawable_size.is_empty() {
            return false;
        }
        self.source_size.is_empty() || self.out_rect != Rect::from_size(self.drawable_size)
    }
}

/// The part of a `surface`-sized image that is presented: `roi` clipped to
/// the image, or the whole image when no usable `roi` is set.
pub fn real_roi(roi: Option<Rect>, surface: Size) -> Rect {
    let full = Rect::from_size(surface);
    match roi.map(|roi| roi.intersect(&full)) {
        Some(roi) if !roi.is_empty() => roi,
        _ => full,
    }
}

/// Whether frames of `format` are converted into the overlay.
pub fn is_supported(format: PixelFormat) -> bool {
    format.is_supported()
}

/// Presents decoded frames through an overlay image.
///
/// `receive_frame` may run on a decode thread while the host drives
/// `on_resize`/`on_show`/`on_hide`/`on_paint_requested` from its UI thread.
/// The live frame and the image pixels share one lock, held while a frame is
/// stored and converted and while the image is blitted, so a paint never
/// reads a half-written image. Surface allocation and device validation run
/// under a separate lock that paints never take.
pub struct FrameRenderer {
    display: Arc<dyn DisplayConnection>,
    host: Arc<dyn RenderHost>,
    attributes: SurfaceAttributeController,
    background: Color,
    surfaces: Mutex<OverlaySurfaceManager>,
    live: Mutex<Live>,
    state: Mutex<RenderState>,
}

impl FrameRenderer {
    pub fn new(
        display: Arc<dyn DisplayConnection>,
        host: Arc<dyn RenderHost>,
        config: RendererConfig,
    ) -> Self {
        let surfaces =
            OverlaySurfaceManager::new(display.clone(), SurfaceFormat::Yv12, config.prefer_shm);
        Self {
            attributes: SurfaceAttributeController::new(display.clone()),
            display,
            host,
            background: config.background,
            surfaces: Mutex::new(surfaces),
            live: Mutex::new(Live {
                image: None,
                frame: VideoFrame::default(),
            }),
            state: Mutex::new(RenderState {
                drawable_size: Size::default(),
                source_size: Size::default(),
                content_fit: config.content_fit,
                roi: config.region_of_interest,
                out_rect: Rect::default(),
                update_background: true,
            }),
        }
    }

    /// Make `frame` the live frame and convert it into the overlay image.
    ///
    /// Returns `false` only when no image of the frame's size could be
    /// prepared; the next frame retries. Frames in formats the converter does
    /// not handle are stored but leave the image untouched.
    pub fn receive_frame(&self, frame: VideoFrame) -> bool {
        if !frame.is_valid() {
            log::debug!("ignoring invalid frame");
            return false;
        }
        let size = Size::new(frame.width(), frame.height());

        {
            // deliveries are serialized here; display round trips happen
            // before the live lock is taken
            let mut surfaces = self.surfaces.lock();
            let fresh = match surfaces.prepare_surface(size) {
                PreparedSurface::Current => None,
                PreparedSurface::Allocated(image) => Some(image),
                PreparedSurface::Failed => {
                    self.live.lock().image = None;
                    return false;
                }
            };

            let mut live = self.live.lock();
            if let Some(image) = fresh {
                live.image = Some(image);
            }
            live.frame = frame;
            let Live { image, frame } = &mut *live;
            if let Some(image) = image {
                convert_frame(frame, image);
            }
        }

        {
            let mut state = self.state.lock();
            if state.source_size != size {
                state.source_size = size;
                state.update_background = true;
                state.recompute_out_rect();
            }
        }

        self.host.request_repaint();
        true
    }

    /// The host window was resized.
    pub fn on_resize(&self, size: Size) {
        {
            let mut state = self.state.lock();
            state.drawable_size = size;
            state.update_background = true;
            state.recompute_out_rect();
        }
        self.host.request_repaint();
    }

    /// The host window became visible again. Overlay resources may have been
    /// lost while hidden, so the device is re-validated.
    pub fn on_show(&self) {
        self.state.lock().update_background = true;
        self.surfaces.lock().prepare_device_resource();
        self.host.request_repaint();
    }

    /// The host window was hidden or is being restacked.
    pub fn on_hide(&self) {
        self.surfaces.lock().invalidate();
    }

    /// Paint: margins first when they need it, then the frame.
    pub fn on_paint_requested(&self) {
        let drawable = self.host.drawable();
        let (draw_background, out_rect, roi, drawable_size) = {
            let mut state = self.state.lock();
            let draw_background = state.needs_background();
            if draw_background {
                state.update_background = false;
            }
            (draw_background, state.out_rect, state.roi, state.drawable_size)
        };

        let live = self.live.lock();
        if draw_background {
            self.draw_background(drawable, &live.frame, out_rect, drawable_size);
        }
        if let Some(image) = live.image.as_ref() {
            self.draw_frame(drawable, image, real_roi(roi, image.size()), out_rect);
        }
    }

    fn draw_background(&self, drawable: Drawable, frame: &VideoFrame, out: Rect, size: Size) {
        let regions = if frame.is_valid() {
            margins(out, size)
        } else {
            std::iter::once(Rect::from_size(size)).collect()
        };
        for region in regions {
            if let Err(err) = self.display.fill_rectangle(drawable, region, self.background) {
                log::warn!("failed to fill background {region:?}: {err}");
            }
        }
    }

    fn draw_frame(&self, drawable: Drawable, image: &OverlayImage, roi: Rect, out: Rect) {
        let transfer = if image.is_shared() {
            Transfer::SharedMemory
        } else {
            Transfer::Copy
        };
        if let Err(err) = self.display.put_image(drawable, image, roi, out, transfer) {
            log::warn!("failed to present overlay image: {err}");
        }
    }

    /// Change how the frame is fitted into the window.
    pub fn set_content_fit(&self, fit: ContentFit) {
        {
            let mut state = self.state.lock();
            state.content_fit = fit;
            state.update_background = true;
            state.recompute_out_rect();
        }
        self.host.request_repaint();
    }

    /// Present only `roi` of each frame, or the whole frame for `None`.
    pub fn set_region_of_interest(&self, roi: Option<Rect>) {
        {
            let mut state = self.state.lock();
            state.roi = roi;
            state.update_background = true;
            state.recompute_out_rect();
        }
        self.host.request_repaint();
    }

    /// Rescale `value` (`[-100, 100]`) into the device range of attribute
    /// `name` and apply it.
    pub fn set_normalized_attribute(&self, name: &str, value: i32) -> bool {
        self.attributes.set_normalized_attribute(name, value)
    }

    /// Brightness in `[-1, 1]`.
    pub fn set_brightness(&self, brightness: f64) -> bool {
        self.attributes.set(Attribute::Brightness, (brightness * 100.0) as i32)
    }

    /// Contrast in `[-1, 1]`.
    pub fn set_contrast(&self, contrast: f64) -> bool {
        self.attributes.set(Attribute::Contrast, (contrast * 100.0) as i32)
    }

    /// Hue in `[-1, 1]`.
    pub fn set_hue(&self, hue: f64) -> bool {
        self.attributes.set(Attribute::Hue, (hue * 100.0) as i32)
    }

    /// Saturation in `[-1, 1]`.
    pub fn set_saturation(&self, saturation: f64) -> bool {
        self.attributes.set(Attribute::Saturation, (saturation * 100.0) as i32)
    }

    /// Whether frames of `format` are converted into the overlay.
    pub fn is_supported(&self, format: PixelFormat) -> bool {
        is_supported(format)
    }

    /// Destination rectangle of the frame inside the window.
    pub fn out_rect(&self) -> Rect {
        self.state.lock().out_rect
    }

    /// Whether the next paint fills the margins.
    pub fn needs_background(&self) -> bool {
        self.state.lock().needs_background()
    }

    pub fn drawable_size(&self) -> Size {
        self.state.lock().drawable_size
    }

    /// A copy of the live frame.
    pub fn live_frame(&self) -> VideoFrame {
        self.live.lock().frame.clone()
    }

    pub fn device_state(&self) -> DeviceState {
        self.surfaces.lock().state()
    }

    pub fn surface_allocations(&self) -> u64 {
        self.surfaces.lock().allocation_count()
    }

    /// Run `f` on the overlay image while holding the frame lock.
    pub fn with_surface<R>(&self, f: impl FnOnce(Option<&OverlayImage>) -> R) -> R {
        let live = self.live.lock();
        f(live.image.as_ref())
    }
}

impl std::fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("background", &self.background)
            .field("surfaces", &*self.surfaces.lock())
            .field("live", &*self.live.lock())
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

fn plane(plane: &Plane) -> PlaneRef<'_> {
    PlaneRef::new(&plane.data, plane.stride)
}

/// Convert `frame` into `image`. Returns whether the format was handled.
fn convert_frame(frame: &VideoFrame, image: &mut OverlayImage) -> bool {
    let (width, height) = (frame.width() as usize, frame.height() as usize);
    let mut dst = image.destination_planes();

    match (frame.format(), frame.planes()) {
        (PixelFormat::Yuv420p | PixelFormat::Yv12, [y, first, second]) => {
            convert_yuv420_planar(dst, [plane(y), plane(first), plane(second)], width, height);
        }
        (PixelFormat::Nv12, [y, uv]) => {
            dst.swap(1, 2);
            convert_semi_planar_420(dst, [plane(y), plane(uv)], width, height);
        }
        (PixelFormat::Nv21, [y, vu]) => {
            convert_semi_planar_420(dst, [plane(y), plane(vu)], width, height);
        }
        (format, _) => {
            log::warn!("pixel format {format:?} is not converted by the overlay renderer");
            return false;
        }
    }
    true
}

use crate::display::{DisplayConnection, Memory, OverlayImage, SurfaceFormat};
use crate::geometry::Size;
use std::sync::Arc;

/// Lifecycle of the overlay device as seen through host visibility events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    /// Never validated.
    #[default]
    Uninitialized,
    /// Validated and usable.
    Ready,
    /// The window was hidden or restacked; must be re-validated before use.
    Invalidated,
}

/// Outcome of [`OverlaySurfaceManager::prepare_surface`].
#[derive(Debug)]
pub enum PreparedSurface {
    /// The current image already has the requested size.
    Current,
    /// A new image that replaces the current one.
    Allocated(OverlayImage),
    /// No image of the requested size could be allocated. The current image
    /// is released and must not be written to.
    Failed,
}

impl PreparedSurface {
    /// Whether a usable image of the requested size exists after the call.
    pub fn is_ready(&self) -> bool {
        !matches!(self, PreparedSurface::Failed)
    }
}

/// Decides when the overlay image is (re)allocated and tracks the device
/// state.
///
/// The pixels of the current image are held by the caller, so frames can be
/// converted and blitted under the caller's own lock while allocations and
/// device round trips happen here.
pub struct OverlaySurfaceManager {
    display: Arc<dyn DisplayConnection>,
    format: SurfaceFormat,
    prefer_shm: bool,
    surface: Option<Size>,
    state: DeviceState,
    allocations: u64,
}

impl OverlaySurfaceManager {
    pub fn new(display: Arc<dyn DisplayConnection>, format: SurfaceFormat, prefer_shm: bool) -> Self {
        Self {
            display,
            format,
            prefer_shm,
            surface: None,
            state: DeviceState::Uninitialized,
            allocations: 0,
        }
    }

    /// Make sure an image of `size` exists, allocating a replacement when the
    /// current one has another size. A failed allocation leaves no current
    /// image.
    pub fn prepare_surface(&mut self, size: Size) -> PreparedSurface {
        if self.surface == Some(size) {
            return PreparedSurface::Current;
        }
        self.release();

        if self.state != DeviceState::Ready && !self.prepare_device_resource() {
            return PreparedSurface::Failed;
        }

        let image = if self.prefer_shm && self.display.supports_shm() {
            self.display
                .create_image(self.format, size, Memory::Shared)
                .or_else(|err| {
                    log::debug!("shared memory image unavailable ({err}), using a standard image");
                    self.display.create_image(self.format, size, Memory::Standard)
                })
        } else {
            self.display.create_image(self.format, size, Memory::Standard)
        };

        match image {
            Ok(image) => {
                log::debug!(
                    "allocated {}x{} {:?} overlay image ({:?})",
                    size.width,
                    size.height,
                    self.format,
                    image.memory()
                );
                self.allocations += 1;
                self.surface = Some(size);
                PreparedSurface::Allocated(image)
            }
            Err(err) => {
                log::warn!(
                    "failed to prepare {}x{} overlay image: {err}",
                    size.width,
                    size.height
                );
                PreparedSurface::Failed
            }
        }
    }

    /// Re-acquire the overlay device. Safe to call in any state.
    pub fn prepare_device_resource(&mut self) -> bool {
        match self.display.validate() {
            Ok(()) => {
                if self.state != DeviceState::Ready {
                    log::debug!("overlay device {:?} -> Ready", self.state);
                }
                self.state = DeviceState::Ready;
                true
            }
            Err(err) => {
                log::warn!("failed to prepare overlay device: {err}");
                if self.state == DeviceState::Ready {
                    self.state = DeviceState::Invalidated;
                }
                false
            }
        }
    }

    /// Mark the device as needing re-validation; the image is kept.
    pub fn invalidate(&mut self) {
        if self.state == DeviceState::Ready {
            log::debug!("overlay device Ready -> Invalidated");
            self.state = DeviceState::Invalidated;
        }
    }

    /// Forget the current image; the next `prepare_surface` allocates.
    pub fn release(&mut self) {
        if let Some(size) = self.surface.take() {
            log::trace!("released {}x{} overlay image", size.width, size.height);
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    /// Size of the current image, if any.
    pub fn surface_size(&self) -> Option<Size> {
        self.surface
    }

    /// How many images were successfully allocated so far.
    pub fn allocation_count(&self) -> u64 {
        self.allocations
    }
}

impl std::fmt::Debug for OverlaySurfaceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlaySurfaceManager")
            .field("format", &self.format)
            .field("prefer_shm", &self.prefer_shm)
            .field("surface", &self.surface)
            .field("state", &self.state)
            .field("allocations", &self.allocations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwareDisplay;

    fn manager(display: &Arc<SoftwareDisplay>, prefer_shm: bool) -> OverlaySurfaceManager {
        OverlaySurfaceManager::new(display.clone(), SurfaceFormat::Yv12, prefer_shm)
    }

    fn allocated(prepared: PreparedSurface) -> OverlayImage {
        match prepared {
            PreparedSurface::Allocated(image) => image,
            other => panic!("expected a new image, got {other:?}"),
        }
    }

    #[test]
    fn same_size_is_not_reallocated() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(64, 64)));
        let mut surfaces = manager(&display, true);

        assert!(matches!(
            surfaces.prepare_surface(Size::new(16, 8)),
            PreparedSurface::Allocated(_)
        ));
        assert!(matches!(
            surfaces.prepare_surface(Size::new(16, 8)),
            PreparedSurface::Current
        ));
        assert_eq!(surfaces.allocation_count(), 1);
        assert_eq!(display.stats().images_created, 1);
        assert_eq!(surfaces.state(), DeviceState::Ready);
    }

    #[test]
    fn new_size_reallocates() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(64, 64)));
        let mut surfaces = manager(&display, true);

        assert!(surfaces.prepare_surface(Size::new(16, 8)).is_ready());
        let image = allocated(surfaces.prepare_surface(Size::new(32, 8)));
        assert_eq!(image.size(), Size::new(32, 8));
        assert_eq!(surfaces.allocation_count(), 2);
        assert_eq!(surfaces.surface_size(), Some(Size::new(32, 8)));
    }

    #[test]
    fn prefers_shared_memory() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(64, 64)));
        let mut surfaces = manager(&display, true);
        assert!(allocated(surfaces.prepare_surface(Size::new(8, 8))).is_shared());

        let mut surfaces = manager(&display, false);
        assert!(!allocated(surfaces.prepare_surface(Size::new(8, 8))).is_shared());
    }

    #[test]
    fn falls_back_when_shared_memory_fails() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(64, 64)));
        display.fail_shm_allocations(true);
        let mut surfaces = manager(&display, true);

        let image = allocated(surfaces.prepare_surface(Size::new(8, 8)));
        assert_eq!(image.memory(), Memory::Standard);
    }

    #[test]
    fn failed_allocation_leaves_no_surface() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(64, 64)));
        let mut surfaces = manager(&display, true);
        assert!(surfaces.prepare_surface(Size::new(8, 8)).is_ready());

        display.fail_allocations(true);
        assert!(!surfaces.prepare_surface(Size::new(16, 16)).is_ready());
        assert_eq!(surfaces.surface_size(), None);

        // the old size is gone too, so asking for it allocates again
        display.fail_allocations(false);
        assert!(matches!(
            surfaces.prepare_surface(Size::new(8, 8)),
            PreparedSurface::Allocated(_)
        ));
    }

    #[test]
    fn device_state_machine() {
        let display = Arc::new(SoftwareDisplay::new(Size::new(64, 64)));
        let mut surfaces = manager(&display, true);
        assert_eq!(surfaces.state(), DeviceState::Uninitialized);

        // invalidating an uninitialized device is a no-op
        surfaces.invalidate();
        assert_eq!(surfaces.state(), DeviceState::Uninitialized);

        assert!(surfaces.prepare_device_resource());
        assert!(surfaces.prepare_device_resource());
        assert_eq!(surfaces.state(), DeviceState::Ready);

        surfaces.invalidate();
        assert_eq!(surfaces.state(), DeviceState::Invalidated);

        display.disconnect();
        assert!(!surfaces.prepare_device_resource());
        assert_eq!(surfaces.state(), DeviceState::Invalidated);

        display.reconnect();
        assert!(surfaces.prepare_device_resource());
        assert_eq!(surfaces.state(), DeviceState::Ready);
    }
}

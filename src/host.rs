use crate::display::Drawable;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// The windowing layer hosting a renderer.
///
/// The host delivers resize/show/paint notifications to the renderer and
/// gets called back for repaints and for the native drawable handle.
pub trait RenderHost: Send + Sync {
    /// Schedule a paint. Requests made before the paint runs collapse into
    /// one.
    fn request_repaint(&self);

    /// Native handle of the window being painted.
    fn drawable(&self) -> Drawable;
}

/// A host whose event loop polls for pending repaints.
#[derive(Debug)]
pub struct PollingHost {
    drawable: Drawable,
    repaint: AtomicBool,
    requests: AtomicU64,
}

impl PollingHost {
    pub fn new(drawable: Drawable) -> Self {
        Self {
            drawable,
            repaint: AtomicBool::new(false),
            requests: AtomicU64::new(0),
        }
    }

    /// Consume the pending repaint, if any.
    pub fn take_repaint_request(&self) -> bool {
        self.repaint.swap(false, Ordering::SeqCst)
    }

    /// Total number of repaint requests, coalesced or not.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl RenderHost for PollingHost {
    fn request_repaint(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.repaint.store(true, Ordering::SeqCst);
    }

    fn drawable(&self) -> Drawable {
        self.drawable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repaint_requests_coalesce() {
        let host = PollingHost::new(Drawable(7));
        assert!(!host.take_repaint_request());

        host.request_repaint();
        host.request_repaint();
        host.request_repaint();
        assert!(host.take_repaint_request());
        assert!(!host.take_repaint_request());
        assert_eq!(host.request_count(), 3);
        assert_eq!(host.drawable(), Drawable(7));
    }
}

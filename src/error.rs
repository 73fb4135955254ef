#[cfg(feature = "gstreamer")]
use gstreamer as gst;

/// Errors raised by the display connection and the frame plumbing.
///
/// The pipeline entry points (`receive_frame`, `prepare_surface`,
/// `set_normalized_attribute`) never surface these directly; they log them and
/// report a plain failure so a single bad frame never takes playback down.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),
    #[error("failed to allocate a {width}x{height} overlay image")]
    Allocation { width: u32, height: u32 },
    #[error("shared memory transport is unavailable")]
    SharedMemoryUnavailable,
    #[error("connection to the display device was lost")]
    ConnectionLost,
    #[error("the display device does not support attribute introspection")]
    AttributesUnsupported,
    #[error("unknown drawable {0:?}")]
    UnknownDrawable(crate::display::Drawable),
    #[error("pixel conversion failed: {0}")]
    Conversion(String),
    #[error("failed to encode snapshot")]
    Image(#[from] image::ImageError),
    #[cfg(feature = "gstreamer")]
    #[error("{0}")]
    Glib(#[from] glib::Error),
    #[cfg(feature = "gstreamer")]
    #[error("{0}")]
    Bool(#[from] glib::BoolError),
    #[cfg(feature = "gstreamer")]
    #[error("failed to change pipeline state")]
    StateChange(#[from] gst::StateChangeError),
    #[cfg(feature = "gstreamer")]
    #[error("failed to cast gstreamer element")]
    Cast,
    #[cfg(feature = "gstreamer")]
    #[error("failed to read negotiated caps")]
    Caps,
    #[cfg(feature = "gstreamer")]
    #[error("invalid framerate: {0}")]
    Framerate(f64),
}

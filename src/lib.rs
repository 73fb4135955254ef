//! # Overlay Video Renderer
//!
//! The presentation path of a video player: decoded frames are converted
//! into a device-native overlay image and blitted into a host window.
//!
//! ## Features
//!
//! - Stride-aware plane copy kernels for YUV420P, YV12, NV12 and NV21
//! - Overlay image lifecycle with shared-memory preference and fallback
//! - Aspect-correct output placement with letterbox/pillarbox fills
//! - Normalized brightness/contrast/hue/saturation controls
//! - An in-memory display server for tests and headless rendering
//! - An optional GStreamer frame source (`gstreamer` feature)
//!
//! ## Example
//!
//! ```rust
//! use overlay_video_renderer::{
//!     FrameRenderer, PixelFormat, Plane, PollingHost, RendererConfig, Size, SoftwareDisplay,
//!     VideoFrame,
//! };
//! use std::sync::Arc;
//!
//! let display = Arc::new(SoftwareDisplay::new(Size::new(320, 180)));
//! let host = Arc::new(PollingHost::new(display.drawable()));
//! let renderer = FrameRenderer::new(display.clone(), host.clone(), RendererConfig::default());
//! renderer.on_resize(display.size());
//!
//! let frame = VideoFrame::new(
//!     PixelFormat::Nv12,
//!     16,
//!     8,
//!     [Plane::new(vec![128; 16 * 8], 16), Plane::new(vec![128; 16 * 4], 16)],
//! )
//! .unwrap();
//! assert!(renderer.receive_frame(frame));
//!
//! if host.take_repaint_request() {
//!     renderer.on_paint_requested();
//! }
//! ```

mod error;

pub mod attributes;
pub mod display;
pub mod frame;
pub mod geometry;
pub mod host;
pub mod kernels;
pub mod osd;
pub mod renderer;
pub mod software;
pub mod surface;

#[cfg(feature = "gstreamer")]
mod source;

pub use attributes::{Attribute, SurfaceAttributeController};
pub use display::{
    AttributeDescriptor, Color, DisplayConnection, Drawable, Memory, OverlayImage, SurfaceFormat,
    Transfer,
};
pub use error::Error;
pub use frame::{PixelFormat, Plane, VideoFrame};
pub use geometry::{ContentFit, Rect, Size};
pub use host::{PollingHost, RenderHost};
pub use osd::{Osd, PlaybackStatistics, ShowType};
pub use renderer::{FrameRenderer, RendererConfig};
pub use software::SoftwareDisplay;
pub use surface::{DeviceState, OverlaySurfaceManager, PreparedSurface};

#[cfg(feature = "gstreamer")]
pub use source::FrameSource;
#[cfg(feature = "gstreamer")]
pub use url::Url;
#[cfg(feature = "gstreamer")]
pub use gstreamer as gst;

use crate::Error;
use crate::frame::{PixelFormat, Plane, VideoFrame};
use crate::osd::PlaybackStatistics;
use gstreamer as gst;
use gstreamer_app as gst_app;
use gstreamer_app::prelude::*;
use gstreamer_video as gst_video;
use gstreamer_video::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Decodes a media URI and pushes every decoded frame to a sink callback,
/// typically [`FrameRenderer::receive_frame`](crate::FrameRenderer::receive_frame).
///
/// Frames are delivered from a worker thread. The appsink drops frames the
/// worker could not pick up in time, so the sink always sees the latest one.
#[derive(Debug)]
pub struct FrameSource {
    pipeline: gst::Pipeline,
    alive: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,

    width: u32,
    height: u32,
    framerate: f64,
    duration: Option<Duration>,
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        if let Err(err) = self.pipeline.set_state(gst::State::Null) {
            log::warn!("failed to stop pipeline: {err}");
        }

        self.alive.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.join() {
                match err.downcast_ref::<String>() {
                    Some(e) => log::error!("Frame source thread panicked: {e}"),
                    None => log::error!("Frame source thread panicked with unknown reason"),
                }
            }
        }
    }
}

impl FrameSource {
    /// Decode `uri` and hand each frame to `sink`.
    pub fn new<F>(uri: &url::Url, sink: F) -> Result<Self, Error>
    where
        F: FnMut(VideoFrame) + Send + 'static,
    {
        gst::init()?;

        let pipeline = format!(
            "playbin uri=\"{}\" video-sink=\"videoconvert ! appsink name=overlay_sink drop=true max-buffers=1\"",
            uri.as_str()
        );
        let pipeline = gst::parse::launch(pipeline.as_ref())?
            .downcast::<gst::Pipeline>()
            .map_err(|_| Error::Cast)?;

        let video_sink: gst::Element = pipeline.property("video-sink");
        let pad = video_sink.pads().first().cloned().ok_or(Error::Cast)?;
        let pad = pad
            .dynamic_cast::<gst::GhostPad>()
            .map_err(|_| Error::Cast)?;
        let bin = pad
            .parent_element()
            .ok_or(Error::Cast)?
            .downcast::<gst::Bin>()
            .map_err(|_| Error::Cast)?;
        let video_sink = bin
            .by_name("overlay_sink")
            .ok_or(Error::Cast)?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| Error::Cast)?;

        // only layouts the overlay converter handles
        let caps = gst_video::VideoCapsBuilder::new()
            .format_list([
                gst_video::VideoFormat::I420,
                gst_video::VideoFormat::Yv12,
                gst_video::VideoFormat::Nv12,
                gst_video::VideoFormat::Nv21,
            ])
            .build();
        video_sink.set_caps(Some(&caps));

        Self::from_gst_pipeline(pipeline, video_sink, sink)
    }

    /// Drive an existing pipeline whose frames arrive at `video_sink`.
    pub fn from_gst_pipeline<F>(
        pipeline: gst::Pipeline,
        video_sink: gst_app::AppSink,
        mut sink: F,
    ) -> Result<Self, Error>
    where
        F: FnMut(VideoFrame) + Send + 'static,
    {
        gst::init()?;

        macro_rules! cleanup {
            ($expr:expr) => {
                $expr.map_err(|e| {
                    let _ = pipeline.set_state(gst::State::Null);
                    e
                })
            };
        }

        let pad = cleanup!(video_sink.static_pad("sink").ok_or(Error::Caps))?;

        cleanup!(pipeline.set_state(gst::State::Playing))?;
        cleanup!(pipeline.state(gst::ClockTime::from_seconds(5)).0)?;

        let caps = cleanup!(pad.current_caps().ok_or(Error::Caps))?;
        let info = cleanup!(gst_video::VideoInfo::from_caps(&caps).map_err(|_| Error::Caps))?;
        let fps = info.fps();
        let framerate = fps.numer() as f64 / fps.denom() as f64;
        if framerate.is_nan() || framerate.is_infinite() || framerate < 0.0 {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(Error::Framerate(framerate));
        }

        let duration = pipeline
            .query_duration::<gst::ClockTime>()
            .map(|duration| Duration::from_nanos(duration.nseconds()));

        let alive = Arc::new(AtomicBool::new(true));
        let alive_ref = Arc::clone(&alive);

        let worker = std::thread::spawn(move || {
            while alive_ref.load(Ordering::Acquire) {
                let Some(sample) = video_sink.try_pull_sample(gst::ClockTime::from_mseconds(16))
                else {
                    if video_sink.is_eos() {
                        std::thread::sleep(Duration::from_millis(16));
                    }
                    continue;
                };
                match frame_from_sample(&sample) {
                    Ok(frame) => sink(frame),
                    Err(err) => log::warn!("dropping undecodable sample: {err}"),
                }
            }
        });

        Ok(Self {
            pipeline,
            alive,
            worker: Some(worker),
            width: info.width(),
            height: info.height(),
            framerate,
            duration,
        })
    }

    /// Negotiated `(width, height)` of the video.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Frames per second; `0.0` for variable-rate streams.
    pub fn framerate(&self) -> f64 {
        self.framerate
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Current playback position.
    pub fn position(&self) -> Duration {
        Duration::from_nanos(
            self.pipeline
                .query_position::<gst::ClockTime>()
                .map_or(0, |pos| pos.nseconds()),
        )
    }

    /// Position and duration for the on-screen display.
    pub fn statistics(&self) -> PlaybackStatistics {
        PlaybackStatistics {
            current_time: self.position(),
            duration: self.duration,
        }
    }

    pub fn set_paused(&self, paused: bool) -> Result<(), Error> {
        self.pipeline.set_state(if paused {
            gst::State::Paused
        } else {
            gst::State::Playing
        })?;
        Ok(())
    }

    pub fn paused(&self) -> bool {
        self.pipeline.state(gst::ClockTime::ZERO).1 == gst::State::Paused
    }

    /// Get the underlying GStreamer pipeline.
    pub fn pipeline(&self) -> gst::Pipeline {
        self.pipeline.clone()
    }
}

fn pixel_format(format: gst_video::VideoFormat) -> Option<PixelFormat> {
    match format {
        gst_video::VideoFormat::I420 => Some(PixelFormat::Yuv420p),
        gst_video::VideoFormat::Yv12 => Some(PixelFormat::Yv12),
        gst_video::VideoFormat::Nv12 => Some(PixelFormat::Nv12),
        gst_video::VideoFormat::Nv21 => Some(PixelFormat::Nv21),
        _ => None,
    }
}

/// Copy a sample's planes, stride and all, into an owned frame.
fn frame_from_sample(sample: &gst::Sample) -> Result<VideoFrame, Error> {
    let caps = sample.caps().ok_or(Error::Caps)?;
    let info = gst_video::VideoInfo::from_caps(caps).map_err(|_| Error::Caps)?;
    let buffer = sample.buffer().ok_or(Error::Caps)?;
    let video = gst_video::VideoFrameRef::from_buffer_ref_readable(buffer, &info)?;
    let format = pixel_format(video.format()).ok_or(Error::Caps)?;

    let strides = video.plane_stride();
    let planes = (0..video.n_planes())
        .map(|i| -> Result<Plane, Error> {
            let data = video.plane_data(i)?;
            Ok(Plane::new(data.to_vec(), strides[i as usize] as usize))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let frame = VideoFrame::new(format, video.width(), video.height(), planes)?;
    Ok(match buffer.pts() {
        Some(pts) => frame.with_pts(Duration::from_nanos(pts.nseconds())),
        None => frame,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiated_formats_map_to_pixel_formats() {
        assert_eq!(pixel_format(gst_video::VideoFormat::I420), Some(PixelFormat::Yuv420p));
        assert_eq!(pixel_format(gst_video::VideoFormat::Yv12), Some(PixelFormat::Yv12));
        assert_eq!(pixel_format(gst_video::VideoFormat::Nv12), Some(PixelFormat::Nv12));
        assert_eq!(pixel_format(gst_video::VideoFormat::Nv21), Some(PixelFormat::Nv21));
        assert_eq!(pixel_format(gst_video::VideoFormat::Rgba), None);
    }

    #[test]
    fn sample_planes_keep_their_strides() {
        gst::init().unwrap();
        let info = gst_video::VideoInfo::builder(gst_video::VideoFormat::Nv12, 4, 2)
            .build()
            .unwrap();
        let mut buffer = gst::Buffer::with_size(info.size()).unwrap();
        {
            let buffer = buffer.get_mut().unwrap();
            buffer.set_pts(gst::ClockTime::from_mseconds(40));
            let mut map = buffer.map_writable().unwrap();
            map.as_mut_slice().fill(7);
        }
        let caps = info.to_caps().unwrap();
        let sample = gst::Sample::builder().buffer(&buffer).caps(&caps).build();

        let frame = frame_from_sample(&sample).unwrap();
        assert_eq!(frame.format(), PixelFormat::Nv12);
        assert_eq!((frame.width(), frame.height()), (4, 2));
        assert_eq!(frame.planes().len(), 2);
        assert_eq!(frame.plane(0).unwrap().stride, info.stride()[0] as usize);
        assert_eq!(frame.pts(), Some(Duration::from_millis(40)));
    }
}

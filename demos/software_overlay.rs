use overlay_video_renderer::{
    Color, FrameRenderer, Osd, PixelFormat, Plane, PlaybackStatistics, PollingHost,
    RendererConfig, Size, SoftwareDisplay, VideoFrame,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const FRAME_COUNT: u32 = 90;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// A moving diagonal gradient; even frames NV12, odd frames I420.
fn test_frame(index: u32, width: u32, height: u32) -> VideoFrame {
    let (w, h) = (width as usize, height as usize);
    let luma = (0..h)
        .flat_map(|y| (0..w).map(move |x| ((x + y + index as usize * 4) % 220 + 16) as u8))
        .collect();
    let (cw, ch) = (w / 2, h / 2);
    let u = (index * 3 % 256) as u8;
    let v = 255 - u;

    let planes = if index % 2 == 0 {
        let uv = std::iter::repeat([u, v]).take(cw * ch).flatten().collect();
        vec![Plane::new(luma, w), Plane::new(uv, cw * 2)]
    } else {
        vec![
            Plane::new(luma, w),
            Plane::new(vec![u; cw * ch], cw),
            Plane::new(vec![v; cw * ch], cw),
        ]
    };
    let format = if index % 2 == 0 {
        PixelFormat::Nv12
    } else {
        PixelFormat::Yuv420p
    };

    VideoFrame::new(format, width, height, planes)
        .expect("valid test frame")
        .with_pts(FRAME_INTERVAL * index)
}

fn main() {
    env_logger::init();

    let window = Size::new(640, 480);
    let display = Arc::new(SoftwareDisplay::new(window));
    let host = Arc::new(PollingHost::new(display.drawable()));
    let renderer = Arc::new(FrameRenderer::new(
        display.clone(),
        host.clone(),
        RendererConfig::default().background(Color(0x202020)),
    ));
    renderer.on_resize(window);
    renderer.on_show();
    renderer.set_brightness(0.1);

    let decoder = {
        let renderer = Arc::clone(&renderer);
        std::thread::spawn(move || {
            for index in 0..FRAME_COUNT {
                if !renderer.receive_frame(test_frame(index, 320, 180)) {
                    log::warn!("frame {index} dropped");
                }
                std::thread::sleep(FRAME_INTERVAL);
            }
        })
    };

    let mut osd = Osd::new();
    let total = FRAME_INTERVAL * FRAME_COUNT;
    let mut resized = false;
    while !decoder.is_finished() {
        if host.take_repaint_request() {
            renderer.on_paint_requested();

            let stats = PlaybackStatistics {
                current_time: renderer.live_frame().pts().unwrap_or_default(),
                duration: Some(total),
            };
            log::info!("{}", osd.text(&stats));
        }

        if !resized && renderer.live_frame().pts() >= Some(total / 2) {
            let size = Size::new(800, 400);
            display.resize(size);
            renderer.on_resize(size);
            osd.use_next_show_type();
            resized = true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    decoder.join().expect("decoder thread panicked");
    if host.take_repaint_request() {
        renderer.on_paint_requested();
    }

    let stats = display.stats();
    println!(
        "{} paints, {} background fills, {} images created",
        stats.shm_puts + stats.copy_puts,
        stats.fills,
        stats.images_created
    );

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("software_overlay.png"));
    display.save_png(&path).expect("failed to save frame");
    println!("last frame written to {}", path.display());
}

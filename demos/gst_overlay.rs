use overlay_video_renderer::{
    FrameRenderer, FrameSource, Osd, PollingHost, RendererConfig, Size, SoftwareDisplay, Url,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    env_logger::init();

    let arg = std::env::args()
        .nth(1)
        .expect("usage: gst_overlay <uri or path>");
    let uri = Url::parse(&arg)
        .or_else(|_| {
            let path = std::fs::canonicalize(PathBuf::from(&arg)).map_err(|_| ())?;
            Url::from_file_path(path)
        })
        .expect("invalid uri or path");

    let window = Size::new(1280, 720);
    let display = Arc::new(SoftwareDisplay::new(window));
    let host = Arc::new(PollingHost::new(display.drawable()));
    let renderer = Arc::new(FrameRenderer::new(
        display.clone(),
        host.clone(),
        RendererConfig::default(),
    ));
    renderer.on_resize(window);

    let sink = Arc::clone(&renderer);
    let source = FrameSource::new(&uri, move |frame| {
        sink.receive_frame(frame);
    })
    .expect("failed to open video");

    let (width, height) = source.size();
    log::info!("{width}x{height} @ {:.2} fps", source.framerate());

    let osd = Osd::new();
    let mut last_report = Duration::ZERO;
    loop {
        if host.take_repaint_request() {
            renderer.on_paint_requested();
        }

        let stats = source.statistics();
        if stats.current_time >= last_report + Duration::from_secs(1) {
            last_report = stats.current_time;
            log::info!("{}", osd.text(&stats));
        }
        if stats.duration.is_some_and(|d| stats.current_time >= d) {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    drop(source);
    let path = std::env::temp_dir().join("gst_overlay.png");
    display.save_png(&path).expect("failed to save frame");
    println!("last frame written to {}", path.display());
}

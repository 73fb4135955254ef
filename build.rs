fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // only the GStreamer frame source links against the framework
    let gstreamer = std::env::var_os("CARGO_FEATURE_GSTREAMER").is_some();
    if gstreamer && cfg!(target_os = "macos") {
        // Add the GStreamer framework directory to the library search path
        println!("cargo:rustc-link-search=framework=/Library/Frameworks");

        // Add an rpath to the GStreamer framework directory
        println!(
            "cargo:rustc-link-arg=-Wl,-rpath,/Library/Frameworks/GStreamer.framework/Versions/1.0/lib"
        );
    }
}

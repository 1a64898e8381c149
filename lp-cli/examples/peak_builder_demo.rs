use image::{DynamicImage, GrayImage, Luma, Rgba};
use imageproc::drawing::draw_hollow_circle_mut;
use lp_cli::{to_luma, Image, PeakConfig, PeakDetectorBuilder};
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🎯 Local-Peak DetectorBuilder Demo");
    println!("===================================\n");

    // Image from the command line, or a synthetic one
    let source = match std::env::args().nth(1) {
        Some(path) => image::open(&path).map_err(|e| format!("Failed to open {}: {}", path, e))?,
        None => DynamicImage::ImageLuma8(synthetic_image(512, 384)),
    };
    let img = to_luma(&source);
    println!("📷 Processing image: {}x{}", img.width(), img.height());

    println!("\n🚀 Demo 1: Paper preset");
    run_detection_demo(PeakDetectorBuilder::new().preset_paper(), &source, &img, "paper")?;

    println!("\n✨ Demo 2: Preset for this image size");
    run_detection_demo(
        PeakDetectorBuilder::new().preset_for_image(img.width(), img.height()),
        &source,
        &img,
        "by_size",
    )?;

    println!("\n⚙️  Demo 3: Custom configuration");
    run_detection_demo(
        PeakDetectorBuilder::new()
            .window_sizes([24, 48])
            .unique_peaks(true)
            .sort_by_response(true),
        &source,
        &img,
        "custom",
    )?;

    println!("\n💾 Demo 4: Configuration round trip");
    let cfg = PeakConfig::medium_image_preset().with_metadata("Medium", "Windows for 1-3 MP images");
    let toml = cfg.to_toml()?;
    println!("{}", toml);
    let restored = PeakConfig::from_toml(&toml)?;
    println!("Restored: {}", restored.summary());

    println!("\n🎉 Done. Check the generated images: peaks_*.png");
    Ok(())
}

fn run_detection_demo(
    builder: PeakDetectorBuilder,
    source: &DynamicImage,
    img: &Image,
    label: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Configuration: {}", builder.summary());
    let detector = builder.build()?;

    let t0 = Instant::now();
    let keypoints = detector.detect(img);
    let elapsed = t0.elapsed();
    println!("Detected {} keypoints in {:.2?}", keypoints.len(), elapsed);

    let mut output = source.to_rgba8();
    for kp in &keypoints {
        let radius = (kp.window_size as i32 / 8).max(2);
        draw_hollow_circle_mut(&mut output, (kp.x as i32, kp.y as i32), radius, Rgba([255, 0, 0, 255]));
    }

    let out_path = format!("peaks_{}.png", label);
    output.save(&out_path)?;
    println!("Saved {}", out_path);
    Ok(())
}

fn synthetic_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let fx = x as f32 / 23.0;
        let fy = y as f32 / 17.0;
        let v = 128.0 + 60.0 * fx.sin() * fy.cos() + 40.0 * ((fx + fy) * 0.7).sin();
        Luma([v.clamp(0.0, 255.0) as u8])
    })
}

#[allow(dead_code)]
#[path = "../src/markers.rs"]
mod markers;
#[allow(dead_code)]
#[path = "../src/pipeline/overlay.rs"]
mod overlay;
#[allow(dead_code)]
#[path = "../src/types.rs"]
mod types;

use anyhow::{Context, Result, anyhow};
use image::RgbImage;
use markers::MarkerTracker;
use std::path::PathBuf;
use types::Frame;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let input_image = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demo/markers.png"));
    let output_image = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("demo/markers_annotated.png"));

    let mut frame = load_frame(&input_image).context("failed to read input image")?;

    let scan = MarkerTracker::default()
        .scan(&frame)
        .with_context(|| format!("failed to scan {}", input_image.display()))?;

    println!(
        "Found {} marker blobs in {}",
        scan.centroids.len(),
        input_image.display()
    );
    match &scan.pair {
        Some(pair) => println!(
            "chest at ({}, {}), abdomen at ({}, {})",
            pair.chest.x, pair.chest.y, pair.abdomen.x, pair.abdomen.y
        ),
        None => println!("{}", types::BreathingPattern::MarkersNotFound.display_name()),
    }

    overlay::draw_markers(
        &mut frame.rgb,
        frame.width,
        frame.height,
        scan.pair.as_ref(),
        &scan.centroids,
    );

    let output = RgbImage::from_raw(frame.width, frame.height, frame.rgb)
        .ok_or_else(|| anyhow!("failed to build image buffer"))?;
    output
        .save(&output_image)
        .with_context(|| format!("failed to save {}", output_image.display()))?;
    println!("Wrote {}", output_image.display());

    Ok(())
}

fn load_frame(path: &PathBuf) -> Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    Ok(Frame::new(image.into_raw(), width, height))
}

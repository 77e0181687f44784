use clap::Parser;
use image::{GrayImage, Luma};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

/// Renders a synthetic cloud field and a horizontally shifted copy,
/// named with nanosecond timestamps one second apart so the capture
/// loader picks them up as a pair.
#[derive(Parser)]
#[command(version, about, author)]
struct PairGenCli {
    /// output directory
    #[arg(default_value = "data")]
    out_dir: String,

    #[arg(long, default_value_t = 1000)]
    width: u32,

    #[arg(long, default_value_t = 750)]
    height: u32,

    /// horizontal feature shift between the two frames, in pixels
    #[arg(long, default_value_t = 12.0)]
    shift: f32,

    /// number of gaussian cloud blobs
    #[arg(long, default_value_t = 60)]
    blobs: usize,

    #[arg(long, default_value_t = 7)]
    seed: u64,
}

struct Blob {
    cx: f32,
    cy: f32,
    sigma: f32,
    amplitude: f32,
}

fn cloud_field(blobs: &[Blob], x: f32, y: f32) -> f32 {
    let mut v = 0.15f32;
    for b in blobs {
        let dx = x - b.cx;
        let dy = y - b.cy;
        let d2 = dx * dx + dy * dy;
        if d2 > 9.0 * b.sigma * b.sigma {
            continue;
        }
        v += b.amplitude * (-d2 / (2.0 * b.sigma * b.sigma)).exp();
    }
    v.clamp(0.0, 1.0)
}

fn render(blobs: &[Blob], width: u32, height: u32, shift: f32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let v = cloud_field(blobs, x as f32 - shift, y as f32);
        Luma([(v * 255.0).round() as u8])
    })
}

fn main() {
    env_logger::init();
    let cli = PairGenCli::parse();
    std::fs::create_dir_all(&cli.out_dir).expect("failed to create output directory");

    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
    let blobs: Vec<Blob> = (0..cli.blobs)
        .map(|_| Blob {
            cx: rng.random_range(0.0..cli.width as f32),
            cy: rng.random_range(0.0..cli.height as f32),
            sigma: rng.random_range(4.0..25.0),
            amplitude: rng.random_range(0.2..0.7),
        })
        .collect();

    let frame0 = render(&blobs, cli.width, cli.height, 0.0);
    let frame1 = render(&blobs, cli.width, cli.height, cli.shift);

    let path0 = Path::new(&cli.out_dir).join("1000000000.png");
    let path1 = Path::new(&cli.out_dir).join("2000000000.png");
    frame0.save(&path0).expect("failed to save first frame");
    frame1.save(&path1).expect("failed to save second frame");
    println!(
        "wrote {:?} and {:?} with a {} px shift",
        path0, path1, cli.shift
    );
}

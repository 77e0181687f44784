use std::path::{Path, PathBuf};

use glob::glob;
use image::ImageReader;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use thiserror::Error;

use crate::pyramid::GrayFrame;

/// Mean luminance below which a frame counts as a night-side capture.
const BLACK_FRAME_MEAN: f32 = 10.0 / 255.0;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("capture directory {0} does not exist")]
    MissingDirectory(String),
    #[error("no usable images found under {0}")]
    NoImages(String),
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// One decoded capture with its filename-derived timestamp.
pub struct CapturedFrame {
    pub time_ns: i64,
    pub path: PathBuf,
    pub frame: GrayFrame,
}

/// Parses the timestamp from a file path.
///
/// Assumes the filename (without extension) is a timestamp in nanoseconds.
fn path_to_timestamp(path: &Path) -> i64 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        for ext in &[".png", ".jpg", ".jpeg"] {
            if p.as_os_str().to_string_lossy().ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

pub fn is_black_frame(frame: &GrayFrame) -> bool {
    frame.mean() < BLACK_FRAME_MEAN
}

pub fn load_frame(path: &Path) -> Result<GrayFrame, LoadError> {
    let img = ImageReader::open(path)?.decode()?;
    Ok(GrayFrame::from_dynamic(&img))
}

/// Loads a capture folder into timestamp-ordered frames.
///
/// Globs recursively, keeps supported extensions, decodes in parallel and
/// drops night-side frames. Errors when the directory is missing or nothing
/// usable remains.
pub fn load_capture_folder(root_folder: &str) -> Result<Vec<CapturedFrame>, LoadError> {
    if !Path::new(root_folder).is_dir() {
        return Err(LoadError::MissingDirectory(root_folder.to_string()));
    }
    log::trace!("loading captures from {}", root_folder);
    let img_paths = glob(format!("{}/**/*", root_folder).as_str())?;
    let mut sorted_path: Vec<PathBuf> = img_paths.into_iter().filter_map(img_filter).collect();
    sorted_path.sort();

    let mut frames: Vec<CapturedFrame> = sorted_path
        .par_iter()
        .progress_count(sorted_path.len() as u64)
        .map(|path| -> Result<CapturedFrame, LoadError> {
            let frame = load_frame(path)?;
            Ok(CapturedFrame {
                time_ns: path_to_timestamp(path),
                path: path.clone(),
                frame,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    frames.retain(|f| {
        let keep = !is_black_frame(&f.frame);
        if !keep {
            log::debug!("dropping night-side frame {:?}", f.path);
        }
        keep
    });
    if frames.is_empty() {
        return Err(LoadError::NoImages(root_folder.to_string()));
    }
    frames.sort_by_key(|f| f.time_ns);
    Ok(frames)
}

/// Loads exactly one image pair from two paths.
pub fn load_pair(path1: &str, path2: &str) -> Result<(GrayFrame, GrayFrame), LoadError> {
    Ok((
        load_frame(Path::new(path1))?,
        load_frame(Path::new(path2))?,
    ))
}

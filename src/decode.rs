//! Pluggable media decoding.
//!
//! The cache only needs a fallible "file on disk to decoded pixels" step; the
//! default decoder is built on the `image` crate with EXIF orientation
//! correction for stills and frame-by-frame decoding for GIF animations.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, RgbaImage};
use tracing::debug;

use crate::media::{AnimatedFrame, AnimatedImage, DecodedMedia, Location};

/// Fallible load step consumed by the cache. Implementations decide how
/// pixels come to be; the cache never inspects the mechanism.
pub trait MediaDecoder: Send + Sync {
    fn decode(&self, location: &Location) -> Result<DecodedMedia>;
}

/// Default decoder built on the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct ImageDecoder {
    target: Option<(u32, u32)>,
}

impl ImageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cover-fit decoded stills to exactly `width` x `height`, typically the
    /// display resolution.
    pub fn with_target(width: u32, height: u32) -> Self {
        Self {
            target: Some((width, height)),
        }
    }
}

impl MediaDecoder for ImageDecoder {
    fn decode(&self, location: &Location) -> Result<DecodedMedia> {
        let path = location.path();
        let is_gif = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gif"));
        if is_gif {
            decode_animation(&path).map(|anim| DecodedMedia::Animated(Arc::new(anim)))
        } else {
            decode_still(&path, self.target).map(|img| DecodedMedia::Still(Arc::new(img)))
        }
    }
}

fn decode_still(path: &Path, target: Option<(u32, u32)>) -> Result<RgbaImage> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("decoding {}", path.display()))?;
    let mut img = img.to_rgba8();
    img = apply_orientation(img, read_orientation(path).unwrap_or(1));
    if let Some((width, height)) = target {
        img = fit_cover(&img, width, height);
    }
    Ok(img)
}

fn decode_animation(path: &Path) -> Result<AnimatedImage> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let decoder = GifDecoder::new(BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))?;
    let mut frames = Vec::new();
    for frame in decoder.into_frames() {
        let frame = frame.with_context(|| format!("decoding frame of {}", path.display()))?;
        let delay = Duration::from(frame.delay());
        frames.push(AnimatedFrame {
            image: frame.into_buffer(),
            delay,
        });
    }
    ensure!(!frames.is_empty(), "animation has no frames: {}", path.display());
    Ok(AnimatedImage { frames })
}

// Maps the common EXIF orientations; unsupported values fall through as-is.
fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    use image::imageops;
    match orientation {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    }
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)? as u16;
    debug!(orientation = value, path = %path.display(), "exif orientation");
    Some(value)
}

/// Scale proportionally so the image covers `width` x `height`, then
/// center-crop to the exact size.
pub fn fit_cover(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (iw, ih) = img.dimensions();
    if iw == 0 || ih == 0 || width == 0 || height == 0 {
        return RgbaImage::new(width, height);
    }
    let scale = (width as f32 / iw as f32).max(height as f32 / ih as f32);
    let sw = ((iw as f32 * scale).round() as u32).max(width);
    let sh = ((ih as f32 * scale).round() as u32).max(height);
    let scaled = image::imageops::resize(img, sw, sh, FilterType::Triangle);
    let x = (sw - width) / 2;
    let y = (sh - height) / 2;
    image::imageops::crop_imm(&scaled, x, y, width, height).to_image()
}

//! Album art reduced to a dithered 1-bit thumbnail.

use image::imageops::{self, BiLevel, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use super::command::{CommandRunner, QueryError};

/// Thumbnail edge in pixels.
pub const ART_SIZE: u32 = 32;

/// Fraction of pixels clipped at each end of the histogram.
const AUTOCONTRAST_CUTOFF: f32 = 0.02;
const CONTRAST: f32 = 1.5;
const BLUR_SIGMA: f32 = 1.5;
/// Upper bound for one remote art download, in seconds.
const FETCH_TIMEOUT_SECS: &str = "2";

/// A square 1-bit image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub size: u32,
    pub pixels: Vec<bool>,
}

/// Turn art into a `size`×`size` dithered thumbnail: grayscale,
/// oversample 2×, stretch and boost contrast, blur, downsample, then
/// Floyd–Steinberg to one bit.
pub fn process_art(img: &DynamicImage, size: u32) -> Thumbnail {
    let gray = img.to_luma8();
    let over = imageops::resize(&gray, size * 2, size * 2, FilterType::Lanczos3);
    let over = enhance_contrast(&autocontrast(&over, AUTOCONTRAST_CUTOFF), CONTRAST);
    let over = imageops::blur(&over, BLUR_SIGMA);
    let mut small = imageops::resize(&over, size, size, FilterType::Lanczos3);
    imageops::dither(&mut small, &BiLevel);

    Thumbnail {
        size,
        pixels: small.pixels().map(|p| p[0] > 127).collect(),
    }
}

/// Stretch the histogram so the darkest/brightest `cutoff` fraction
/// maps to black/white.
fn autocontrast(img: &GrayImage, cutoff: f32) -> GrayImage {
    let mut histogram = [0u32; 256];
    for p in img.pixels() {
        histogram[usize::from(p[0])] += 1;
    }
    let clip = (img.pixels().len() as f32 * cutoff) as u32;

    let mut lo = 0usize;
    let mut seen = 0;
    while lo < 255 && seen + histogram[lo] <= clip {
        seen += histogram[lo];
        lo += 1;
    }
    let mut hi = 255usize;
    seen = 0;
    while hi > 0 && seen + histogram[hi] <= clip {
        seen += histogram[hi];
        hi -= 1;
    }
    if hi <= lo {
        return img.clone();
    }

    let scale = 255.0 / (hi - lo) as f32;
    let mut out = img.clone();
    for p in out.pixels_mut() {
        let v = (f32::from(p[0]) - lo as f32) * scale;
        *p = Luma([v.round().clamp(0.0, 255.0) as u8]);
    }
    out
}

/// Push values away from the mean by `factor`.
fn enhance_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let count = img.pixels().len().max(1) as f32;
    let mean = img.pixels().map(|p| f32::from(p[0])).sum::<f32>() / count;
    let mut out = img.clone();
    for p in out.pixels_mut() {
        let v = mean + (f32::from(p[0]) - mean) * factor;
        *p = Luma([v.round().clamp(0.0, 255.0) as u8]);
    }
    out
}

/// Decode `%XX` escapes in a `file://` URL path.
fn percent_decode(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Local path for a `file://` URL.
pub fn file_url_path(url: &str) -> Option<String> {
    let rest = url.strip_prefix("file://")?;
    // Drop an optional host part ("file://localhost/...").
    let path = &rest[rest.find('/')?..];
    Some(percent_decode(path))
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Single-entry cache keyed by URL. Both outcomes are kept so a broken
/// file or a dead link is not fetched again every frame.
///
/// `file://` art is read from disk; `http(s)://` art is downloaded
/// with `curl`.
#[derive(Debug)]
pub struct ArtCache {
    runner: CommandRunner,
    entry: Option<(String, Option<Thumbnail>)>,
}

impl ArtCache {
    pub fn new(runner: CommandRunner) -> Self {
        Self {
            runner,
            entry: None,
        }
    }

    pub fn get(&mut self, url: &str) -> Option<&Thumbnail> {
        let runner = self.runner.clone();
        self.get_with(url, |url| {
            load_thumbnail(url, |remote| {
                runner.run_bytes("curl", &["-s", "--max-time", FETCH_TIMEOUT_SECS, remote])
            })
        })
    }

    fn get_with<F>(&mut self, url: &str, load: F) -> Option<&Thumbnail>
    where
        F: FnOnce(&str) -> Result<Thumbnail, QueryError>,
    {
        if url.is_empty() {
            return None;
        }
        let hit = matches!(&self.entry, Some((cached, _)) if cached == url);
        if !hit {
            let art = match load(url) {
                Ok(art) => Some(art),
                Err(e) => {
                    debug!("album art unavailable for {url}: {e}");
                    None
                }
            };
            self.entry = Some((url.to_owned(), art));
        }
        self.entry.as_ref().and_then(|(_, art)| art.as_ref())
    }
}

fn load_thumbnail<F>(url: &str, fetch: F) -> Result<Thumbnail, QueryError>
where
    F: FnOnce(&str) -> Result<Vec<u8>, QueryError>,
{
    let img = if let Some(path) = file_url_path(url) {
        image::open(path)?
    } else if is_remote(url) {
        let bytes = fetch(url)?;
        if bytes.is_empty() {
            return Err(QueryError::Unavailable("empty art download"));
        }
        image::load_from_memory(&bytes)?
    } else {
        return Err(QueryError::Unavailable("unsupported art URL scheme"));
    };
    Ok(process_art(&img, ART_SIZE))
}

// ── Tests ────────────────────────────────────────────────────────

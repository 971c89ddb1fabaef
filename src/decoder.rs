/*
 *  decoder.rs
 *
 *  oled-gif - animated panels over HID
 *  (c) 2020-26 Stuart Hunter
 *
 *  Animated image decoding, panel normalisation and the decode cache
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use image::codecs::gif::GifDecoder;
use image::imageops::{self, BiLevel, FilterType};
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use log::{debug, info, warn};
use mini_moka::sync::Cache;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::constants::{PANEL_HEIGHT, PANEL_WIDTH};
use crate::display::error::PanelError;
use crate::frame::{Frame, FrameSequence};

/// Anything that can turn a file into panel-ready frames
///
/// The cache is generic over this so tests can count or fake decodes.
pub trait FrameSource: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Vec<Frame>, PanelError>;
}

/// Decoder for GIFs (every sub-frame) and still images (one frame)
#[derive(Debug, Clone, Copy)]
pub struct GifFileDecoder {
    width: u32,
    height: u32,
}

impl Default for GifFileDecoder {
    fn default() -> Self {
        Self { width: PANEL_WIDTH, height: PANEL_HEIGHT }
    }
}

impl GifFileDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten, resize and dither one RGBA frame down to the panel.
    ///
    /// Transparency is composited over opaque black, the result is
    /// Lanczos-resized to panel size and reduced to 1 bit with
    /// Floyd-Steinberg error diffusion.
    pub fn normalize(&self, rgba: &RgbaImage) -> Frame {
        let mut flat = RgbaImage::from_pixel(rgba.width(), rgba.height(), Rgba([0, 0, 0, 255]));
        imageops::overlay(&mut flat, rgba, 0, 0);

        let resized = imageops::resize(&flat, self.width, self.height, FilterType::Lanczos3);
        let mut luma = DynamicImage::ImageRgba8(resized).into_luma8();
        imageops::dither(&mut luma, &BiLevel);
        Frame::from_luma(&luma)
    }
}

impl FrameSource for GifFileDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<Frame>, PanelError> {
        let reader = ImageReader::open(path)
            .map_err(|e| PanelError::decode(path, e))?
            .with_guessed_format()
            .map_err(|e| PanelError::decode(path, e))?;

        let frames: Vec<Frame> = if reader.format() == Some(ImageFormat::Gif) {
            let decoder = GifDecoder::new(reader.into_inner()).map_err(|e| PanelError::decode(path, e))?;
            decoder
                .into_frames()
                .collect_frames()
                .map_err(|e| PanelError::decode(path, e))?
                .iter()
                .map(|frame| self.normalize(frame.buffer()))
                .collect()
        } else {
            let still = reader.decode().map_err(|e| PanelError::decode(path, e))?;
            vec![self.normalize(&still.to_rgba8())]
        };

        debug!("Decoded {} frame(s) from {}", frames.len(), path.display());
        Ok(frames)
    }
}

/// Decoded sequences keyed by source path
///
/// A hit never touches the filesystem. Failed or empty decodes are not
/// stored, so a file that was locked or half-written can be retried later.
/// Nothing is evicted on its own; `evict` and `clear` exist for long
/// sessions that walk through many files.
pub struct FrameCache {
    source: Box<dyn FrameSource>,
    entries: Cache<PathBuf, Arc<FrameSequence>>,
}

impl FrameCache {
    pub fn new(source: impl FrameSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            entries: Cache::builder().build(),
        }
    }

    /// Frames for `path`, decoding on a miss.
    pub fn load(&self, path: &Path) -> Result<Arc<FrameSequence>, PanelError> {
        let key = path.to_path_buf();
        if let Some(sequence) = self.entries.get(&key) {
            debug!("Cache hit for {}", path.display());
            return Ok(sequence);
        }

        let frames = match self.source.decode(path) {
            Ok(frames) if frames.is_empty() => {
                return Err(PanelError::decode(path, "no usable frames"));
            }
            Ok(frames) => frames,
            Err(e) => {
                warn!("Error processing {}: {}", path.display(), e);
                return Err(e);
            }
        };

        let sequence = Arc::new(FrameSequence::new(path, frames));
        info!("Cached {} frame(s) for {}", sequence.len(), path.display());
        self.entries.insert(key, Arc::clone(&sequence));
        Ok(sequence)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(&path.to_path_buf())
    }

    /// Drop one entry; the next load decodes again.
    pub fn evict(&self, path: &Path) {
        self.entries.invalidate(&path.to_path_buf());
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new(GifFileDecoder::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake source yielding `frames` blank frames and counting calls
    struct Counting {
        calls: Arc<AtomicUsize>,
        frames: usize,
    }

    impl FrameSource for Counting {
        fn decode(&self, _path: &Path) -> Result<Vec<Frame>, PanelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Frame::blank(); self.frames])
        }
    }

    fn counting(frames: usize) -> (FrameCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = FrameCache::new(Counting { calls: Arc::clone(&calls), frames });
        (cache, calls)
    }

    #[test]
    fn test_second_load_is_a_hit() {
        let (cache, calls) = counting(3);
        let a = cache.load(Path::new("a.gif")).unwrap();
        let b = cache.load(Path::new("a.gif")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.len(), 3);
        assert_eq!(b.path(), Path::new("a.gif"));
    }

    #[test]
    fn test_distinct_paths_decode_separately() {
        let (cache, calls) = counting(1);
        cache.load(Path::new("a.gif")).unwrap();
        cache.load(Path::new("b.gif")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.contains(Path::new("a.gif")));
        assert!(cache.contains(Path::new("b.gif")));
    }

    #[test]
    fn test_empty_decode_is_not_cached() {
        let (cache, calls) = counting(0);
        assert!(matches!(cache.load(Path::new("e.gif")), Err(PanelError::Decode { .. })));
        assert!(cache.load(Path::new("e.gif")).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!cache.contains(Path::new("e.gif")));
    }

    #[test]
    fn test_evict_forces_redecode() {
        let (cache, calls) = counting(1);
        cache.load(Path::new("a.gif")).unwrap();
        cache.evict(Path::new("a.gif"));
        cache.load(Path::new("a.gif")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_forces_redecode() {
        let (cache, calls) = counting(1);
        cache.load(Path::new("a.gif")).unwrap();
        cache.clear();
        cache.load(Path::new("a.gif")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let cache = FrameCache::default();
        let err = cache.load(Path::new("/nonexistent/none.gif")).unwrap_err();
        assert!(matches!(err, PanelError::Decode { .. }));
    }

    #[test]
    fn test_normalize_flattens_transparency_to_black() {
        let decoder = GifFileDecoder::new();
        let clear = RgbaImage::from_pixel(16, 8, Rgba([255, 255, 255, 0]));
        assert_eq!(decoder.normalize(&clear).count_on(), 0);

        let white = RgbaImage::from_pixel(16, 8, Rgba([255, 255, 255, 255]));
        let frame = decoder.normalize(&white);
        assert!(frame.is_panel_sized());
        assert_eq!(frame.count_on(), (PANEL_WIDTH * PANEL_HEIGHT) as usize);
    }

    #[test]
    fn test_normalize_dithers_mid_grey() {
        let decoder = GifFileDecoder::new();
        let grey = RgbaImage::from_pixel(128, 64, Rgba([128, 128, 128, 255]));
        let lit = decoder.normalize(&grey).count_on();
        let total = (PANEL_WIDTH * PANEL_HEIGHT) as usize;
        // error diffusion keeps roughly half the pixels lit, a threshold would not
        assert!(lit > total / 3 && lit < total * 2 / 3, "lit = {}", lit);
    }
}

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::DiplomaError;

/// Background rasters per level, loaded once and only read afterwards.
#[derive(Debug, Default)]
pub struct AssetCache {
    backgrounds: BTreeMap<String, DynamicImage>,
}

impl AssetCache {
    /// Load every level's background, downscaling wider images to `max_width`
    pub fn preload(levels: &BTreeMap<String, impl AsRef<Path>>, max_width: Option<u32>) -> Result<Self> {
        let total = levels.len();
        let mut cache = Self::default();
        for (i, (level, path)) in levels.iter().enumerate() {
            let path = path.as_ref();
            log::info!("Loading backgrounds ({}/{}): {} from {:?}", i + 1, total, level, path);
            let image = load_background(path)
                .with_context(|| format!("Failed to load background for level '{}'", level))?;
            cache.insert(level.clone(), image, max_width);
        }
        Ok(cache)
    }

    pub fn insert(&mut self, level: impl Into<String>, image: DynamicImage, max_width: Option<u32>) {
        let image = match max_width {
            Some(max) if image.width() > max => downscale(&image, max),
            _ => image,
        };
        self.backgrounds.insert(level.into(), image);
    }

    pub fn get(&self, level: &str) -> Result<&DynamicImage, DiplomaError> {
        self.backgrounds
            .get(level)
            .ok_or_else(|| DiplomaError::UnknownLevel(level.to_string()))
    }

    pub fn levels(&self) -> impl Iterator<Item = &str> {
        self.backgrounds.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.backgrounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backgrounds.is_empty()
    }
}

fn load_background(path: &Path) -> Result<DynamicImage> {
    let image = ImageReader::open(path)
        .with_context(|| format!("Failed to open {:?}", path))?
        .with_guessed_format()
        .with_context(|| format!("Failed to read {:?}", path))?
        .decode()
        .with_context(|| format!("Failed to decode {:?}", path))?;
    log::debug!("{:?} is {}x{}", path, image.width(), image.height());
    Ok(image)
}

/// Resize to `max_width` keeping the aspect ratio
fn downscale(image: &DynamicImage, max_width: u32) -> DynamicImage {
    let height = ((image.height() as u64 * max_width as u64) / image.width() as u64).max(1) as u32;
    log::info!(
        "Downscaling background {}x{} to {}x{}",
        image.width(),
        image.height(),
        max_width,
        height
    );
    image.resize_exact(max_width, height, FilterType::Lanczos3)
}

use anyhow::{Context, Result};
use fontdb::{Database, Family, Query};
use image::GrayImage;
use rusttype::{point, Font, Scale};
use std::fs;
use std::path::Path;
use ttf_parser::Face;

use crate::config::FontSettings;
use crate::error::DiplomaError;
use crate::fit::{TextMeasure, Typeface};

/// The script typeface the name is drawn with.
///
/// Sizes passed in are em sizes in pixels, the way a canvas `font`
/// string reads; they are converted to rusttype's ascent-to-descent scale.
pub struct NameFont {
    family: String,
    data: Vec<u8>,
    index: u32,
    font: Font<'static>,
    em_to_scale: f32,
}

impl NameFont {
    /// Parse font bytes, `index` selecting a face inside a collection
    pub fn from_bytes(data: Vec<u8>, index: u32, fallback_family: &str) -> Result<Self> {
        let (family, em_to_scale) = {
            let face = Face::parse(&data, index)
                .with_context(|| format!("Failed to parse font '{}'", fallback_family))?;
            let family = family_name(&face).unwrap_or_else(|| fallback_family.to_string());
            let height = (face.ascender() as f32 - face.descender() as f32).max(1.0);
            (family, height / face.units_per_em() as f32)
        };

        let font = Font::try_from_vec_and_index(data.clone(), index)
            .with_context(|| format!("rusttype cannot load font '{}'", family))?;

        Ok(Self { family, data, index, font, em_to_scale })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .with_context(|| format!("Failed to read font file: {:?}", path))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("custom font");
        Self::from_bytes(data, 0, stem)
    }

    fn scale(&self, size: f32) -> Scale {
        Scale::uniform(size * self.em_to_scale)
    }
}

impl TextMeasure for NameFont {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        self.font
            .layout(text, self.scale(size), point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0)
    }
}

impl Typeface for NameFont {
    fn family(&self) -> &str {
        &self.family
    }

    /// In order of first appearance
    fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let Ok(face) = Face::parse(&self.data, self.index) else {
            return text.chars().filter(|c| !c.is_whitespace()).collect();
        };
        let mut missing: Vec<char> = Vec::new();
        for c in text.chars() {
            if !c.is_whitespace() && face.glyph_index(c).is_none() && !missing.contains(&c) {
                missing.push(c);
            }
        }
        missing
    }

    fn vertical_metrics(&self, size: f32) -> (f32, f32) {
        let v_metrics = self.font.v_metrics(self.scale(size));
        (v_metrics.ascent, v_metrics.descent)
    }

    fn draw_mask(&self, mask: &mut GrayImage, text: &str, size: f32, x: f32, baseline: f32) {
        let (width, height) = mask.dimensions();
        for glyph in self.font.layout(text, self.scale(size), point(x, baseline)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, v| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                if px < 0 || py < 0 || px as u32 >= width || py as u32 >= height {
                    return;
                }
                let coverage = (v * 255.0).round() as u8;
                let pixel = mask.get_pixel_mut(px as u32, py as u32);
                pixel.0[0] = pixel.0[0].max(coverage);
            });
        }
    }
}

fn family_name(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == ttf_parser::name_id::FAMILY)
        .find_map(|name| name.to_string())
}

/// Resolve the name font: an explicit file first, then the configured
/// families, then generic cursive, serif and sans-serif faces.
pub fn load_name_font(settings: &FontSettings, override_path: Option<&Path>) -> Result<NameFont> {
    if let Some(path) = override_path.or(settings.path.as_deref()) {
        let font = NameFont::from_file(path)?;
        log::info!("Using font '{}' from {:?}", font.family(), path);
        return Ok(font);
    }

    let mut db = Database::new();
    db.load_system_fonts();
    log::debug!("font database holds {} faces", db.len());

    let mut candidates: Vec<(String, Family)> = settings
        .families
        .iter()
        .map(|name| (name.clone(), Family::Name(name.as_str())))
        .collect();
    candidates.push(("cursive".to_string(), Family::Cursive));
    candidates.push(("serif".to_string(), Family::Serif));
    candidates.push(("sans-serif".to_string(), Family::SansSerif));

    for (label, family) in &candidates {
        let query = Query {
            families: std::slice::from_ref(family),
            ..Default::default()
        };
        let Some(id) = db.query(&query) else {
            continue;
        };
        let Some((data, index)) = db.with_face_data(id, |data, index| (data.to_vec(), index)) else {
            continue;
        };
        match NameFont::from_bytes(data, index, label) {
            Ok(font) => {
                log::info!("Using system font '{}' for {}", font.family(), label);
                return Ok(font);
            }
            Err(e) => log::warn!("Skipping font for {}: {:#}", label, e),
        }
    }

    let tried: Vec<String> = candidates.into_iter().map(|(label, _)| label).collect();
    Err(DiplomaError::NoFont(tried.join(", ")).into())
}

/// First sans-serif or serif face installed on this machine, if any
#[cfg(test)]
pub(crate) fn system_face() -> Option<NameFont> {
    let mut db = Database::new();
    db.load_system_fonts();
    [Family::SansSerif, Family::Serif].iter().find_map(|family| {
        let query = Query {
            families: std::slice::from_ref(family),
            ..Default::default()
        };
        let id = db.query(&query)?;
        let (data, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
        NameFont::from_bytes(data, index, "system").ok()
    })
}

//! Font-fit search and name placement.
//!
//! Export and preview both go through [`NameLayout::fit`] at the
//! background's native size, so they always agree on the font size.

use image::GrayImage;

use crate::config::LayoutSettings;

/// Name length bands (inclusive upper bound in characters, size factor)
const LENGTH_BANDS: [(usize, f32); 3] = [(20, 1.0), (30, 0.85), (40, 0.70)];
const LONG_NAME_FACTOR: f32 = 0.55;

pub trait TextMeasure {
    /// Advance width of `text` at `size` pixels, kerning included
    fn text_width(&self, text: &str, size: f32) -> f32;
}

/// A typeface that can also rasterize, as used by compositing.
pub trait Typeface: TextMeasure {
    fn family(&self) -> &str;

    /// Characters of `text` this face cannot draw
    fn missing_glyphs(&self, _text: &str) -> Vec<char> {
        Vec::new()
    }

    /// (ascent, descent) at `size`; descent is negative
    fn vertical_metrics(&self, size: f32) -> (f32, f32);

    /// Accumulate glyph coverage for `text` into `mask`, starting the pen
    /// at `x` on the `baseline` row
    fn draw_mask(&self, mask: &mut GrayImage, text: &str, size: f32, x: f32, baseline: f32);
}

/// Size factor for a name of `len` characters
pub fn band_factor(len: usize) -> f32 {
    LENGTH_BANDS
        .iter()
        .find(|(max_len, _)| len <= *max_len)
        .map(|(_, factor)| *factor)
        .unwrap_or(LONG_NAME_FACTOR)
}

/// Largest integer size in `min_size..=max_size` whose width fits
/// `available`, or `min_size` when none does.
pub fn fit_font_size<M: TextMeasure + ?Sized>(
    text: &str,
    available: f32,
    max_size: u32,
    min_size: u32,
    measure: &M,
) -> u32 {
    let min_size = min_size.min(max_size);
    let mut size = max_size;
    while size > min_size {
        if measure.text_width(text, size as f32) <= available {
            return size;
        }
        size -= 1;
    }
    min_size
}

/// Where and how large the name is drawn on a background.
#[derive(Debug, Clone, PartialEq)]
pub struct NameLayout {
    pub font_size: u32,
    pub text_width: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub underline_y: f32,
}

impl NameLayout {
    pub fn fit<M: TextMeasure + ?Sized>(
        name: &str,
        width: u32,
        height: u32,
        settings: &LayoutSettings,
        measure: &M,
    ) -> Self {
        let width_f = width as f32;
        let len = name.chars().count();

        let max_size = ((width_f * settings.base_size_ratio * band_factor(len)).floor() as u32).max(1);
        let min_size = ((width_f * settings.min_size_ratio).floor() as u32).max(1);
        let available = width_f * settings.name_width_ratio;

        let font_size = fit_font_size(name, available, max_size, min_size, measure);
        let center_y = height as f32 * settings.vertical_ratio;

        log::debug!(
            "fitted {:?} at {}px (max {}, min {}, available {:.0}px)",
            name,
            font_size,
            max_size,
            min_size,
            available
        );

        Self {
            font_size,
            text_width: measure.text_width(name, font_size as f32),
            center_x: width_f / 2.0,
            center_y,
            underline_y: center_y + font_size as f32 * settings.underline_offset_ratio,
        }
    }

    /// The same layout in a canvas scaled by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            font_size: self.font_size,
            text_width: self.text_width * factor,
            center_x: self.center_x * factor,
            center_y: self.center_y * factor,
            underline_y: self.underline_y * factor,
        }
    }

    /// Left edge of the text
    pub fn left(&self) -> f32 {
        self.center_x - self.text_width / 2.0
    }
}

/// Fixed-advance typeface for tests; every glyph is a solid box.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use image::Luma;

    pub struct BoxFace {
        /// Advance per character as a fraction of the size
        pub advance: f32,
        /// Characters reported as having no glyph
        pub missing: Vec<char>,
    }

    impl Default for BoxFace {
        fn default() -> Self {
            Self { advance: 0.5, missing: Vec::new() }
        }
    }

    impl TextMeasure for BoxFace {
        fn text_width(&self, text: &str, size: f32) -> f32 {
            text.chars().count() as f32 * size * self.advance
        }
    }

    impl Typeface for BoxFace {
        fn family(&self) -> &str {
            "Box"
        }

        fn missing_glyphs(&self, text: &str) -> Vec<char> {
            self.missing.iter().copied().filter(|c| text.contains(*c)).collect()
        }

        fn vertical_metrics(&self, size: f32) -> (f32, f32) {
            (size * 0.8, -size * 0.2)
        }

        fn draw_mask(&self, mask: &mut GrayImage, text: &str, size: f32, x: f32, baseline: f32) {
            let advance = size * self.advance;
            let top = (baseline - size * 0.7).round() as i64;
            let bottom = baseline.round() as i64;
            for (i, c) in text.chars().enumerate() {
                if c.is_whitespace() {
                    continue;
                }
                let left = (x + i as f32 * advance + advance * 0.1).round() as i64;
                let right = (x + (i as f32 + 1.0) * advance - advance * 0.1).round() as i64;
                for py in top.max(0)..bottom.min(mask.height() as i64) {
                    for px in left.max(0)..right.min(mask.width() as i64) {
                        mask.put_pixel(px as u32, py as u32, Luma([255]));
                    }
                }
            }
        }
    }
}

//! Configuration loading and parsing.
//!
//! This module handles:
//! - Loading and parsing settings.json (levels, font, text, layout, page, output)
//! - Loading the roster CSV used by batch mode
//! - Unit conversion for physical dimensions (mm, cm, in, pt)
//! - Colour parsing for `#rrggbb` strings

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::DiplomaError;

const POINTS_PER_INCH: f64 = 72.0;
const MM_PER_INCH: f64 = 25.4;

/// Dimension value that can be specified as:
/// - A number (interpreted as points)
/// - A string with unit: e.g., "5 mm", "1 cm", "0.25 in", "12pt"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension(pub f64);

impl Dimension {
    pub fn from_mm(mm: f64) -> Self {
        Dimension(mm * POINTS_PER_INCH / MM_PER_INCH)
    }

    /// Convert to points (internal PDF unit)
    pub fn as_points(&self) -> f64 {
        self.0
    }

    pub fn as_mm(&self) -> f64 {
        self.0 * MM_PER_INCH / POINTS_PER_INCH
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let split = value
            .find(|c: char| c.is_whitespace() || c.is_ascii_alphabetic())
            .unwrap_or(value.len());
        let (num_str, unit) = value.split_at(split);
        let num: f64 = num_str
            .trim()
            .parse()
            .map_err(|_| format!("invalid number in dimension: {}", num_str.trim()))?;

        let points = match unit.trim().to_lowercase().as_str() {
            "" | "pt" | "point" | "points" => num,
            "mm" => num * POINTS_PER_INCH / MM_PER_INCH,
            "cm" => num * POINTS_PER_INCH * 10.0 / MM_PER_INCH,
            "in" | "inch" | "inches" => num * POINTS_PER_INCH,
            other => {
                return Err(format!(
                    "unknown unit '{}'. Supported: mm, cm, in, pt",
                    other
                ));
            }
        };
        Ok(Dimension(points))
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DimensionVisitor;

        impl serde::de::Visitor<'_> for DimensionVisitor {
            type Value = Dimension;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number or a string with unit (e.g., \"5 mm\", \"1 cm\", \"1 in\")")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(DimensionVisitor)
    }
}

/// An opaque RGB colour written as `#rrggbb` in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color(pub [u8; 3]);

impl TryFrom<String> for Color {
    type Error = DiplomaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Color {
    type Err = DiplomaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(DiplomaError::InvalidColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| DiplomaError::InvalidColor(s.to_string()))
        };
        Ok(Color([channel(0)?, channel(2)?, channel(4)?]))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FontSettings {
    /// Font file to use instead of a system lookup
    pub path: Option<PathBuf>,
    /// Family names tried in order through the system font database
    pub families: Vec<String>,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            path: None,
            families: vec!["Great Vibes".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ShadowSettings {
    pub opacity: f32,
    /// Blur radius in pixels, applied as a Gaussian with sigma = blur / 2
    pub blur: f32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            opacity: 0.1,
            blur: 2.0,
            offset_x: 1,
            offset_y: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TextSettings {
    pub color: Color,
    /// Shown in the preview while no name is entered
    pub placeholder: String,
    /// Longest accepted name, in characters
    pub max_length: usize,
    pub underline_thickness: u32,
    pub shadow: ShadowSettings,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            color: Color([0x2c, 0x52, 0x82]),
            placeholder: "Nombre del Alumno".to_string(),
            max_length: 60,
            underline_thickness: 1,
            shadow: ShadowSettings::default(),
        }
    }
}

/// Name placement, as fractions of the background's width and height.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LayoutSettings {
    pub vertical_ratio: f32,
    pub base_size_ratio: f32,
    pub min_size_ratio: f32,
    pub name_width_ratio: f32,
    pub underline_offset_ratio: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            vertical_ratio: 0.60,
            base_size_ratio: 0.045,
            min_size_ratio: 0.018,
            name_width_ratio: 0.70,
            underline_offset_ratio: 0.4,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    Letter,
    A4,
    Legal,
}

impl PageFormat {
    /// Portrait (width, height)
    pub fn portrait_size(&self) -> (Dimension, Dimension) {
        match self {
            PageFormat::Letter => (Dimension(612.0), Dimension(792.0)),
            PageFormat::A4 => (Dimension::from_mm(210.0), Dimension::from_mm(297.0)),
            PageFormat::Legal => (Dimension(612.0), Dimension(1008.0)),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PageSettings {
    pub format: PageFormat,
    pub orientation: Orientation,
    /// Gap kept between the image and the page edge on the constraining axis
    pub margin: Dimension,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            format: PageFormat::Letter,
            orientation: Orientation::Landscape,
            margin: Dimension::from_mm(5.0),
        }
    }
}

impl PageSettings {
    /// Page (width, height) in points after applying the orientation
    pub fn size_points(&self) -> (f64, f64) {
        let (w, h) = self.format.portrait_size();
        let (w, h) = (w.as_points(), h.as_points());
        match self.orientation {
            Orientation::Landscape => (w.max(h), w.min(h)),
            Orientation::Portrait => (w.min(h), w.max(h)),
        }
    }

    /// The margin must leave a printable area on both axes
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.size_points();
        let margin = self.margin.as_points();
        if margin < 0.0 {
            bail!("page margin cannot be negative ({:.1} mm)", self.margin.as_mm());
        }
        if 2.0 * margin >= width.min(height) {
            bail!(
                "page margin of {:.1} mm leaves no room on a {:.1} x {:.1} mm page",
                self.margin.as_mm(),
                Dimension(width).as_mm(),
                Dimension(height).as_mm()
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    /// DCTDecode, smaller files
    #[default]
    Jpeg,
    /// Raw RGB with FlateDecode, lossless
    Flate,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputSettings {
    pub encoding: ImageEncoding,
    pub jpeg_quality: u8,
    /// Backgrounds wider than this are downscaled once at load time
    pub max_width: Option<u32>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            encoding: ImageEncoding::Jpeg,
            jpeg_quality: 92,
            max_width: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Level id to background image file
    pub levels: BTreeMap<String, PathBuf>,
    pub default_level: Option<String>,
    pub font: FontSettings,
    pub text: TextSettings,
    pub layout: LayoutSettings,
    pub page: PageSettings,
    pub output: OutputSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let levels = ["kinder", "primaria", "secundaria"]
            .iter()
            .map(|id| (id.to_string(), PathBuf::from(format!("backgrounds/{}.png", id))))
            .collect();
        Self {
            levels,
            default_level: Some("primaria".to_string()),
            font: FontSettings::default(),
            text: TextSettings::default(),
            layout: LayoutSettings::default(),
            page: PageSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

impl Settings {
    /// Make relative level and font paths relative to `base_dir`
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        for path in self.levels.values_mut() {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
        if let Some(font) = self.font.path.as_mut() {
            if font.is_relative() {
                *font = base_dir.join(&*font);
            }
        }
    }

    /// The configured default level, or the first level id
    pub fn default_level(&self) -> Result<String> {
        match &self.default_level {
            Some(level) if self.levels.contains_key(level) => Ok(level.clone()),
            Some(level) => Err(DiplomaError::UnknownLevel(level.clone()).into()),
            None => self
                .levels
                .keys()
                .next()
                .cloned()
                .context("settings define no diploma levels"),
        }
    }

    pub fn level_ids(&self) -> Vec<String> {
        self.levels.keys().cloned().collect()
    }
}

/// One roster line for batch mode
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RosterEntry {
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
}

/// Helper function to open a file with consistent error context
fn open_file_with_context(path: &Path, description: &str) -> Result<File> {
    File::open(path)
        .with_context(|| format!("Failed to open {} at {:?}", description, path))
}

/// Load settings.json and resolve its relative paths against its directory
pub fn load_settings(path: &Path) -> Result<Settings> {
    let file = open_file_with_context(path, "settings.json")?;
    let reader = BufReader::new(file);
    let mut settings: Settings = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {:?}", path))?;
    settings
        .page
        .validate()
        .with_context(|| format!("Invalid page settings in {:?}", path))?;
    if let Some(dir) = path.parent() {
        settings.resolve_paths(dir);
    }
    Ok(settings)
}

pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>> {
    let file = open_file_with_context(path, "roster CSV")?;
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(file);

    let mut entries = Vec::new();
    for (index, result) in rdr.deserialize::<RosterEntry>().enumerate() {
        let mut entry =
            result.with_context(|| format!("Invalid roster row {} in {:?}", index + 1, path))?;
        if entry.level.as_deref().is_some_and(str::is_empty) {
            entry.level = None;
        }
        entries.push(entry);
    }
    Ok(entries)
}

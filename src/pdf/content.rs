//! PDF content stream generation for the diploma raster.
//!
//! This module provides:
//! - Image XObject encoding (JPEG/DCTDecode or Flate-compressed RGB)
//! - Aspect-preserving, centered placement of the image on the page
//! - PDF content stream building
//! - Text string encoding for PDF (literal ASCII or UTF-16BE)

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage, RgbaImage};
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat};
use std::io::Write;

use crate::config::{ImageEncoding, OutputSettings};

/// Where the image lands on the page, in points from the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fill the page minus `margin` on the constraining axis, keep the
/// image's aspect ratio and center what is left over.
pub fn fit_image(image_width: u32, image_height: u32, page_width: f64, page_height: f64, margin: f64) -> Placement {
    let ratio = image_width as f64 / image_height.max(1) as f64;
    let page_ratio = page_width / page_height;

    let (width, height) = if ratio > page_ratio {
        let width = page_width - 2.0 * margin;
        (width, width / ratio)
    } else {
        let height = page_height - 2.0 * margin;
        (height * ratio, height)
    };

    Placement {
        x: (page_width - width) / 2.0,
        y: (page_height - height) / 2.0,
        width,
        height,
    }
}

/// Builder for generating PDF content streams and associated XObjects
pub struct ContentBuilder {
    pub content_parts: Vec<String>,
    pub xobjects: Dictionary,
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self {
            content_parts: Vec::new(),
            xobjects: Dictionary::new(),
        }
    }

    /// Paint an image XObject already added to the document
    pub fn add_image(&mut self, image_id: ObjectId, placement: &Placement) -> String {
        let name = format!("Im{}", self.xobjects.len() + 1);
        self.xobjects.set(name.clone(), Object::Reference(image_id));
        self.content_parts.push(format!(
            "q {:.4} 0 0 {:.4} {:.4} {:.4} cm /{} Do Q ",
            placement.width, placement.height, placement.x, placement.y, name
        ));
        name
    }

    /// Build the final content bytes
    pub fn build_content_bytes(&self) -> Vec<u8> {
        self.content_parts.join("").into_bytes()
    }
}

impl Default for ContentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite onto white; PDF images here carry no alpha channel
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        let over = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([over(r), over(g), over(b)])
    })
}

/// Encode the raster as an image XObject stream
pub fn image_xobject(image: &RgbaImage, output: &OutputSettings) -> Result<Stream> {
    let rgb = flatten_on_white(image);

    let mut img_dict = Dictionary::new();
    img_dict.set("Type", "XObject");
    img_dict.set("Subtype", "Image");
    img_dict.set("Width", rgb.width() as i64);
    img_dict.set("Height", rgb.height() as i64);
    img_dict.set("ColorSpace", "DeviceRGB");
    img_dict.set("BitsPerComponent", 8_i64);

    let bytes = match output.encoding {
        ImageEncoding::Jpeg => {
            let mut jpeg_bytes = Vec::new();
            JpegEncoder::new_with_quality(&mut jpeg_bytes, output.jpeg_quality.clamp(1, 100))
                .encode_image(&rgb)
                .with_context(|| "JPEG encoding of the diploma failed")?;
            img_dict.set("Filter", "DCTDecode");
            jpeg_bytes
        }
        ImageEncoding::Flate => {
            img_dict.set("Filter", "FlateDecode");
            compress_data(rgb.as_raw())?
        }
    };

    Ok(Stream::new(img_dict, bytes).with_compression(false))
}

/// Encode a PDF text string: literal for ASCII, UTF-16BE with BOM otherwise
pub fn pdf_text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::String(s.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut utf16be = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        utf16be.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(utf16be, StringFormat::Hexadecimal)
}

/// Compress data using zlib/flate2
pub fn compress_data(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

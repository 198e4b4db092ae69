use anyhow::{Context, Result};
use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::content::{fit_image, image_xobject, pdf_text_string, ContentBuilder};
use super::resources::page_resources;
use crate::config::{OutputSettings, PageSettings};

const PRODUCER: &str = concat!("diploma_print ", env!("CARGO_PKG_VERSION"));

/// Add the single page showing the diploma raster
fn create_diploma_page(
    doc: &mut Document,
    pages_id: ObjectId,
    image: &RgbaImage,
    page: &PageSettings,
    output: &OutputSettings,
) -> Result<ObjectId> {
    page.validate()?;
    let (page_width, page_height) = page.size_points();

    let image_id = doc.add_object(image_xobject(image, output)?);
    let placement = fit_image(
        image.width(),
        image.height(),
        page_width,
        page_height,
        page.margin.as_points(),
    );
    log::debug!(
        "placing {}x{} raster at {:.1},{:.1} size {:.1}x{:.1}pt ({:.0}mm margin)",
        image.width(),
        image.height(),
        placement.x,
        placement.y,
        placement.width,
        placement.height,
        page.margin.as_mm()
    );

    let mut builder = ContentBuilder::new();
    builder.add_image(image_id, &placement);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), builder.build_content_bytes()));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", "Page");
    page_dict.set("Parent", Object::Reference(pages_id));
    page_dict.set(
        "MediaBox",
        vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(page_width as f32),
            Object::Real(page_height as f32),
        ],
    );
    page_dict.set("Resources", Object::Dictionary(page_resources(&builder.xobjects)));
    page_dict.set("Contents", Object::Reference(content_id));

    Ok(doc.add_object(Object::Dictionary(page_dict)))
}

/// Create a one-page PDF holding the diploma for `name`
pub fn create_diploma_pdf(
    image: &RgbaImage,
    name: &str,
    page: &PageSettings,
    output: &OutputSettings,
) -> Result<Document> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let page_id = create_diploma_page(&mut doc, pages_id, image, page, output)?;

    let mut pages = Dictionary::new();
    pages.set("Type", "Pages");
    pages.set("Kids", vec![Object::Reference(page_id)]);
    pages.set("Count", 1_i64);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", "Catalog");
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));

    let mut info = Dictionary::new();
    info.set("Title", pdf_text_string(&format!("Diploma - {}", name)));
    info.set("Producer", pdf_text_string(PRODUCER));
    let info_id = doc.add_object(Object::Dictionary(info));

    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.set("Info", Object::Reference(info_id));
    doc.compress();

    Ok(doc)
}

/// Serialize the document fully in memory
pub fn pdf_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .with_context(|| "Failed to serialize PDF")?;
    Ok(buf)
}

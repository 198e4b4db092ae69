//! Single-page PDF output for a rendered diploma.

mod content;
mod document;
mod resources;

pub use document::{create_diploma_pdf, pdf_bytes};

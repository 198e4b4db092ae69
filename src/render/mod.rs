//! Raster side of the diploma: fonts, background cache and compositing.

mod assets;
mod compose;
mod font;

pub use assets::AssetCache;
pub use compose::{compose_diploma, render_preview};
pub use font::{load_name_font, NameFont};

//! Diploma compositing: name, drop shadow and underline over a background.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};

use crate::config::{LayoutSettings, TextSettings};
use crate::fit::{NameLayout, Typeface};
use crate::form::FormState;

const PLACEHOLDER_OPACITY: f32 = 0.5;
const SHADOW_COLOR: [u8; 3] = [0, 0, 0];

/// Draw `name` onto a copy of `background` at its native size.
pub fn compose_diploma<F: Typeface + ?Sized>(
    background: &DynamicImage,
    name: &str,
    text: &TextSettings,
    layout: &LayoutSettings,
    face: &F,
) -> (RgbaImage, NameLayout) {
    let mut canvas = background.to_rgba8();
    let name_layout = NameLayout::fit(name, canvas.width(), canvas.height(), layout, face);
    draw_name(&mut canvas, name, &name_layout, 1.0, text, 1.0, face);
    (canvas, name_layout)
}

/// Render the form's overlay onto a background scaled to `preview_width`.
///
/// The returned layout is the one computed at native size, i.e. exactly
/// what an export of the same name would use.
pub fn render_preview<F: Typeface + ?Sized>(
    background: &DynamicImage,
    form: &FormState,
    text: &TextSettings,
    layout: &LayoutSettings,
    face: &F,
    preview_width: u32,
) -> (RgbaImage, NameLayout) {
    let overlay = form.overlay(&text.placeholder);
    let name_layout = NameLayout::fit(&overlay.text, background.width(), background.height(), layout, face);

    let preview_width = preview_width.clamp(1, background.width().max(1));
    let factor = preview_width as f32 / background.width().max(1) as f32;
    let mut canvas = if preview_width == background.width() {
        background.to_rgba8()
    } else {
        let height = ((background.height() as f32 * factor).round() as u32).max(1);
        background
            .resize_exact(preview_width, height, FilterType::Triangle)
            .to_rgba8()
    };

    let opacity = if overlay.is_placeholder { PLACEHOLDER_OPACITY } else { 1.0 };
    draw_name(&mut canvas, &overlay.text, &name_layout.scaled(factor), factor, text, opacity, face);
    (canvas, name_layout)
}

/// Draw text, shadow and underline for a layout already in canvas
/// coordinates; `scale` converts the layout's font size to canvas pixels.
fn draw_name<F: Typeface + ?Sized>(
    canvas: &mut RgbaImage,
    name: &str,
    layout: &NameLayout,
    scale: f32,
    style: &TextSettings,
    opacity: f32,
    face: &F,
) {
    let size = layout.font_size as f32 * scale;
    let (ascent, descent) = face.vertical_metrics(size);
    // canvas "middle" baseline: the em box is centred on center_y
    let baseline = layout.center_y + (ascent + descent) / 2.0;
    let left = layout.left();
    let right = left + layout.text_width;

    let shadow = &style.shadow;
    let blur = shadow.blur * scale;
    let pad = (blur * 1.5).ceil() as i64 + 2;
    let x0 = left.floor() as i64 - pad;
    let y0 = (baseline - ascent).floor() as i64 - pad;
    let x1 = right.ceil() as i64 + pad;
    let y1 = (baseline - descent).ceil() as i64 + pad;

    let mut mask = GrayImage::new((x1 - x0).max(1) as u32, (y1 - y0).max(1) as u32);
    face.draw_mask(&mut mask, name, size, left - x0 as f32, baseline - y0 as f32);

    if shadow.opacity > 0.0 {
        let blurred = if blur > 0.0 { imageops::blur(&mask, blur / 2.0) } else { mask.clone() };
        let dx = (shadow.offset_x as f32 * scale).round() as i64;
        let dy = (shadow.offset_y as f32 * scale).round() as i64;
        blend_mask(canvas, &blurred, x0 + dx, y0 + dy, SHADOW_COLOR, shadow.opacity * opacity);
    }
    blend_mask(canvas, &mask, x0, y0, style.color.0, opacity);

    let thickness = ((style.underline_thickness as f32 * scale).round() as u32).max(1);
    let top = (layout.underline_y - thickness as f32 / 2.0).round() as i64;
    fill_rect(canvas, left.round() as i64, top, right.round() as i64, top + thickness as i64, style.color.0, opacity);
}

fn blend_pixel(dst: &mut Rgba<u8>, color: [u8; 3], alpha: f32) {
    let inv = 1.0 - alpha;
    for (channel, value) in dst.0.iter_mut().zip(color) {
        *channel = (value as f32 * alpha + *channel as f32 * inv).round() as u8;
    }
    dst.0[3] = (255.0 * alpha + dst.0[3] as f32 * inv).round() as u8;
}

/// Blend `color` through a coverage mask placed at (`x`, `y`)
fn blend_mask(canvas: &mut RgbaImage, mask: &GrayImage, x: i64, y: i64, color: [u8; 3], opacity: f32) {
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    for (mx, my, coverage) in mask.enumerate_pixels() {
        if coverage.0[0] == 0 {
            continue;
        }
        let (px, py) = (x + mx as i64, y + my as i64);
        if px < 0 || py < 0 || px >= width || py >= height {
            continue;
        }
        let alpha = coverage.0[0] as f32 / 255.0 * opacity;
        blend_pixel(canvas.get_pixel_mut(px as u32, py as u32), color, alpha);
    }
}

fn fill_rect(canvas: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: [u8; 3], opacity: f32) {
    let x0 = x0.clamp(0, canvas.width() as i64) as u32;
    let x1 = x1.clamp(0, canvas.width() as i64) as u32;
    let y0 = y0.clamp(0, canvas.height() as i64) as u32;
    let y1 = y1.clamp(0, canvas.height() as i64) as u32;
    for py in y0..y1 {
        for px in x0..x1 {
            blend_pixel(canvas.get_pixel_mut(px, py), color, opacity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::testing::BoxFace;
    use image::{Rgb, RgbImage};

    const PAPER: [u8; 3] = [250, 245, 230];
    const INK: [u8; 4] = [0x2c, 0x52, 0x82, 255];

    fn paper(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(PAPER)))
    }

    fn compose(name: &str) -> (RgbaImage, NameLayout) {
        compose_diploma(&paper(2000, 1000), name, &TextSettings::default(), &LayoutSettings::default(), &BoxFace::default())
    }

    #[test]
    fn test_keeps_background_size() {
        let (canvas, _) = compose("Ana");
        assert_eq!(canvas.dimensions(), (2000, 1000));
    }

    #[test]
    fn test_name_is_centred_at_sixty_percent() {
        let (canvas, layout) = compose("Ana");
        assert_eq!(layout.font_size, 90);
        // baseline 600 + (72 - 18) / 2 = 627, first box spans x 937..973, y 564..627
        assert_eq!(canvas.get_pixel(950, 600).0, INK);
        assert_eq!(canvas.get_pixel(1000, 600).0, INK);
        // gap between the first and second box
        assert_ne!(canvas.get_pixel(976, 600).0, INK);
    }

    #[test]
    fn test_underline_spans_text_width() {
        let (canvas, layout) = compose("Ana");
        assert_eq!(layout.underline_y, 636.0);
        assert_eq!(canvas.get_pixel(934, 636).0, INK);
        assert_eq!(canvas.get_pixel(1066, 636).0, INK);
        assert_eq!(canvas.get_pixel(920, 636).0, [PAPER[0], PAPER[1], PAPER[2], 255]);
        assert_eq!(canvas.get_pixel(1080, 636).0, [PAPER[0], PAPER[1], PAPER[2], 255]);
    }

    #[test]
    fn test_soft_shadow_below_text() {
        let (canvas, _) = compose("Ana");
        let shaded = canvas.get_pixel(950, 627).0;
        assert!(shaded[0] < PAPER[0], "{:?}", shaded);
        assert!(shaded[0] > 200, "{:?}", shaded);
    }

    #[test]
    fn test_background_outside_name_untouched() {
        let (canvas, _) = compose("Ana");
        assert_eq!(canvas.get_pixel(10, 10).0, [PAPER[0], PAPER[1], PAPER[2], 255]);
        assert_eq!(canvas.get_pixel(1000, 300).0, [PAPER[0], PAPER[1], PAPER[2], 255]);
    }

    #[test]
    fn test_preview_and_export_agree_on_layout() {
        let background = paper(2000, 1000);
        let text = TextSettings::default();
        let layout = LayoutSettings::default();
        let face = BoxFace::default();

        for name in ["Ana", "María Fernanda de los Ángeles", "Maximiliano Alejandro Hernández de la Concepción"] {
            let mut form = FormState::new("primaria", 60);
            form.set_input(name);
            let (_, export_layout) = compose_diploma(&background, form.name(), &text, &layout, &face);
            for width in [400, 777, 2000] {
                let (_, preview_layout) = render_preview(&background, &form, &text, &layout, &face, width);
                assert_eq!(preview_layout, export_layout, "{} at {}", name, width);
            }
        }
    }

    #[test]
    fn test_preview_and_export_agree_with_system_font() {
        let Some(face) = crate::render::font::system_face() else {
            eprintln!("no system font installed, skipping");
            return;
        };
        let background = paper(1650, 1275);
        let text = TextSettings::default();
        let layout = LayoutSettings::default();

        for name in ["José Ángel Pérez", "Maximiliano Alejandro Hernández de la Concepción"] {
            let mut form = FormState::new("primaria", 60);
            form.set_input(name);
            let (canvas, export_layout) = compose_diploma(&background, form.name(), &text, &layout, &face);
            let (_, preview_layout) = render_preview(&background, &form, &text, &layout, &face, 600);
            assert_eq!(preview_layout, export_layout, "{}", name);
            assert!(export_layout.text_width <= 1650.0 * layout.name_width_ratio + 0.5);

            let inked = canvas.pixels().filter(|p| p.0 != [PAPER[0], PAPER[1], PAPER[2], 255]).count();
            assert!(inked > 0, "{} left the background untouched", name);
        }
    }

    #[test]
    fn test_preview_scales_canvas() {
        let form = FormState::new("primaria", 60);
        let (canvas, _) = render_preview(
            &paper(2000, 1000),
            &form,
            &TextSettings::default(),
            &LayoutSettings::default(),
            &BoxFace::default(),
            500,
        );
        assert_eq!(canvas.dimensions(), (500, 250));
    }

    #[test]
    fn test_preview_placeholder_is_dimmed() {
        let form = FormState::new("primaria", 60);
        let (canvas, layout) = render_preview(
            &paper(2000, 1000),
            &form,
            &TextSettings::default(),
            &LayoutSettings::default(),
            &BoxFace::default(),
            2000,
        );
        // "Nombre del Alumno" (17 chars) at 90px starts at 1000 - 382.5
        assert_eq!(layout.font_size, 90);
        let pixel = canvas.get_pixel(630, 600).0;
        assert!(pixel[0] > INK[0] + 40 && pixel[0] < PAPER[0] - 40, "{:?}", pixel);
    }
}

use image::{Rgb, RgbImage};
use std::fs;

const WIDTH: u32 = 3300;
const HEIGHT: u32 = 2550;
const PAPER: Rgb<u8> = Rgb([252, 248, 236]);

/// Plain diploma backgrounds for trying the tool out: paper colour, a
/// double border in the level's colour and a rule where the name goes.
fn main() -> anyhow::Result<()> {
    let levels = [
        ("kinder", Rgb([214, 96, 77])),
        ("primaria", Rgb([44, 82, 130])),
        ("secundaria", Rgb([39, 103, 73])),
    ];

    fs::create_dir_all("backgrounds")?;
    for (level, color) in levels {
        let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, PAPER);
        frame(&mut image, 90, 24, color);
        frame(&mut image, 150, 6, color);

        // thin guide rule under the name line at 60% height
        let y = HEIGHT * 60 / 100 + 80;
        fill(&mut image, WIDTH / 4, y, WIDTH * 3 / 4, y + 3, color);

        let path = format!("backgrounds/{}.png", level);
        image.save(&path)?;
        println!("Created {}", path);
    }
    Ok(())
}

fn frame(image: &mut RgbImage, inset: u32, thickness: u32, color: Rgb<u8>) {
    let (w, h) = image.dimensions();
    fill(image, inset, inset, w - inset, inset + thickness, color);
    fill(image, inset, h - inset - thickness, w - inset, h - inset, color);
    fill(image, inset, inset, inset + thickness, h - inset, color);
    fill(image, w - inset - thickness, inset, w - inset, h - inset, color);
}

fn fill(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..y1 {
        for x in x0..x1 {
            image.put_pixel(x, y, color);
        }
    }
}

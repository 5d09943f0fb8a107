//! Counts the elapsed seconds on a seven-segment display, and serves the
//! mirrored frames over HTTP.
//!
//! ```sh
//! cargo run --example clock -- [settings.json]
//! curl -o frame.png http://127.0.0.1:8080/
//! ```

extern crate env_logger;
extern crate image;
#[macro_use]
extern crate log;
extern crate sprite_mirror;

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};

use sprite_mirror::math::Vector2;
use sprite_mirror::prelude::*;

const GLYPH_WIDTH: u32 = 8;
const GLYPH_HEIGHT: u32 = 14;

// Segments as (x0, y0, x1, y1) within a glyph: a, b, c, d, e, f, g.
const SEGMENTS: [(u32, u32, u32, u32); 7] = [
    (1, 0, 7, 2),
    (6, 1, 8, 7),
    (6, 7, 8, 13),
    (1, 12, 7, 14),
    (0, 7, 2, 13),
    (0, 1, 2, 7),
    (1, 6, 7, 8),
];

// Lit segments of each digit, bit 0 is segment a.
const DIGITS: [u8; 10] = [
    0b011_1111, 0b000_0110, 0b101_1011, 0b100_1111, 0b110_0110, 0b110_1101, 0b111_1101,
    0b000_0111, 0b111_1111, 0b110_1111,
];

/// Builds an atlas of the ten digits, side by side.
fn atlas() -> RgbaImage {
    let ink = Rgba([32, 32, 32, 255]);
    let mut image = RgbaImage::new(GLYPH_WIDTH * 10, GLYPH_HEIGHT);

    for (digit, mask) in DIGITS.iter().enumerate() {
        let dx = digit as u32 * GLYPH_WIDTH;
        for (i, &(x0, y0, x1, y1)) in SEGMENTS.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }

            for y in y0..y1 {
                for x in x0..x1 {
                    image.put_pixel(dx + x, y, ink);
                }
            }
        }
    }

    image
}

fn glyph(digit: i32) -> Rect {
    let x = digit * GLYPH_WIDTH as i32;
    Rect::from_corners(x, 0, x + GLYPH_WIDTH as i32, GLYPH_HEIGHT as i32)
}

fn settings() -> Result<Settings> {
    match std::env::args().nth(1) {
        Some(path) => Settings::from_json(&fs::read_to_string(path)?),
        None => Ok(Settings::default()),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let settings = settings()?;
    let dimensions = settings.mirror.dimensions;

    let mut scene = Scene::new();
    let mut mirror = MirrorEngine::new(HeadlessEngine::new(), &settings.mirror)?;
    let texture = mirror.load_texture(&atlas())?;

    // Two digits, scaled to fill most of the frame.
    let w = dimensions.x as f32 / 2.5;
    let h = w * GLYPH_HEIGHT as f32 / GLYPH_WIDTH as f32;
    let origin = Vector2::new(
        (dimensions.x as f32 - 2.0 * w) / 3.0,
        (dimensions.y as f32 - h) / 2.0,
    );

    let root = scene.create();
    mirror.register(&mut scene, root)?;
    mirror.set_transform(root, Affine::translate(origin.x, origin.y))?;

    for &(place, divisor) in &[(0, 10), (1, 1)] {
        let node = scene.create();
        scene.append_child(root, node)?;
        scene.set_arranger(node, move |e: &mut dyn Engine, n: NodeHandle, t: Time| -> Result<()> {
            let digit = t.seconds() / divisor % 10;
            e.set_sub_tex(n, SubTex::new(texture, glyph(digit)))
        })?;

        mirror.register(&mut scene, node)?;
        let x = place as f32 * (w + origin.x);
        mirror.set_transform(node, Affine::translate(x, 0.0) * Affine::scale(w, h))?;
    }

    let server = SnapshotServer::bind(&settings.server, mirror.snapshot())?;
    info!("Serving the clock on http://{}/", server.local_addr());

    let config = DisplayConfig {
        dimensions: Vector2::new(dimensions.x as f32, dimensions.y as f32),
        pixels_per_pt: 1.0,
    };

    let start = Instant::now();
    let interval = Duration::from_millis(1000 / Time::FRAMES_PER_SECOND as u64);
    loop {
        let now = Instant::now();
        mirror.render(&mut scene, root, Time::from_elapsed(start.elapsed()), &config)?;

        if let Some(rest) = interval.checked_sub(now.elapsed()) {
            thread::sleep(rest);
        }
    }
}

//! Avatar and cover rendering.
//!
//! Deterministic gradient JPEGs: the avatar color is picked from a fixed
//! palette by profile name, the cover uses a fixed dark tone. VK only needs
//! valid image bytes here; the visual identity is intentionally simple.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use crate::error::ContentError;
use crate::profile::Profile;

const AVATAR_WIDTH: u32 = 200;
const AVATAR_HEIGHT: u32 = 200;
const COVER_WIDTH: u32 = 1200;
const COVER_HEIGHT: u32 = 300;
const JPEG_QUALITY: u8 = 90;

/// Avatar base colors, one picked per profile.
const AVATAR_PALETTE: [[u8; 3]; 4] = [
    [0x4a, 0x90, 0xe2], // blue
    [0x50, 0xb8, 0x8a], // green
    [0x9b, 0x6b, 0xd3], // violet
    [0xe2, 0x7d, 0x60], // terracotta
];

const COVER_BASE: [u8; 3] = [0x2c, 0x3e, 0x50];

/// Renders the 200×200 community avatar as JPEG bytes.
pub fn generate_avatar(profile: &Profile) -> Result<Vec<u8>, ContentError> {
    let base = AVATAR_PALETTE[palette_index(&profile.name)];
    let img = render_gradient(AVATAR_WIDTH, AVATAR_HEIGHT, base);
    encode_jpeg(&img)
}

/// Renders the 1200×300 community cover as JPEG bytes.
pub fn generate_cover(_profile: &Profile) -> Result<Vec<u8>, ContentError> {
    let img = render_gradient(COVER_WIDTH, COVER_HEIGHT, COVER_BASE);
    encode_jpeg(&img)
}

fn palette_index(name: &str) -> usize {
    let sum: usize = name.bytes().map(usize::from).sum();
    sum % AVATAR_PALETTE.len()
}

/// Vertical gradient from `base` down to a 30%-darkened tone.
fn render_gradient(width: u32, height: u32, base: [u8; 3]) -> RgbImage {
    let dark = darken(base, 0.3);
    RgbImage::from_fn(width, height, |_x, y| {
        let t = y as f32 / height.max(1) as f32;
        Rgb([
            lerp(base[0], dark[0], t),
            lerp(base[1], dark[1], t),
            lerp(base[2], dark[2], t),
        ])
    })
}

fn darken(color: [u8; 3], factor: f32) -> [u8; 3] {
    let scale = 1.0 - factor;
    [
        (color[0] as f32 * scale) as u8,
        (color[1] as f32 * scale) as u8,
        (color[2] as f32 * scale) as u8,
    ]
}

fn lerp(from: u8, to: u8, t: f32) -> u8 {
    (from as f32 + (to as f32 - from as f32) * t) as u8
}

fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>, ContentError> {
    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder.encode_image(img)?;
    Ok(out.into_inner())
}

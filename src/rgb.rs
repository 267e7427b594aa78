//! Tile codec for the RGB layers (normal and smudge).
//!
//! Each draw tile stores two packed 5-6-5 anchor colors and sixteen 2 bit
//! palette indices. See [crate::color::rgb_ramp] for the ramp convention.

use crate::color;
use crate::layer::{BoundingBox, LayerHeader, RgbLayer};
use crate::reader::SldReader;
use crate::runmask::{RunCursor, RunMaskBuilder};
use crate::writer::SldWriter;
use crate::{Result, SldError};
use image::{Rgba, RgbaImage};
use std::io::Cursor;

/// Alpha applied to decoded normal layer pixels.
pub(crate) const NORMAL_ALPHA: u8 = 224;
/// Alpha applied to decoded smudge layer pixels.
pub(crate) const SMUDGE_ALPHA: u8 = 255;

pub(crate) fn decode(
    data: &[u8],
    width: u32,
    height: u32,
    inherited: Option<BoundingBox>,
    previous: Option<&RgbaImage>,
    alpha: u8,
) -> Result<RgbLayer> {
    let mut reader = SldReader::new(data);
    let header = LayerHeader::parse(&mut reader, inherited)?;
    let grid = header.bounds.grid(width, height)?;
    let previous = resolve_previous(&header, previous, width, height)?;

    let mut image = RgbaImage::new(width, height);
    let mut runs = RunCursor::new(&header.runs);
    for y in (grid.y0..grid.y1).step_by(4) {
        for x in (grid.x0..grid.x1).step_by(4) {
            if runs.next_draw()? {
                decode_tile(&mut reader, &mut image, x, y, alpha)?;
            } else if let Some(previous) = previous {
                copy_tile(&mut image, previous, x, y);
            }
        }
    }
    Ok(RgbLayer {
        image,
        bounds: header.bounds,
    })
}

fn resolve_previous<'a>(
    header: &LayerHeader,
    previous: Option<&'a RgbaImage>,
    width: u32,
    height: u32,
) -> Result<Option<&'a RgbaImage>> {
    if !header.copy_previous() {
        return Ok(None);
    }
    let image = previous.ok_or_else(|| {
        SldError::MissingReference(
            "Layer reuses previous-frame pixels, but no previous frame carries this layer"
                .to_owned(),
        )
    })?;
    if image.dimensions() != (width, height) {
        return Err(SldError::InvalidInput(format!(
            "Previous frame is {}x{}, expected {}x{}",
            image.width(),
            image.height(),
            width,
            height
        )));
    }
    Ok(Some(image))
}

fn decode_tile(
    reader: &mut SldReader<Cursor<&[u8]>>,
    image: &mut RgbaImage,
    x: u32,
    y: u32,
    alpha: u8,
) -> Result<()> {
    let value0 = reader.word()?;
    let value1 = reader.word()?;
    let indices = reader.dword()?;
    let ramp = color::rgb_ramp(value0, value1);
    for m in 0..4_u32 {
        for n in 0..4_u32 {
            let i = m * 4 + n;
            if let Some([r, g, b]) = ramp[(indices >> (i * 2) & 0x3) as usize] {
                image.put_pixel(x + n, y + m, Rgba([r, g, b, alpha]));
            }
        }
    }
    Ok(())
}

fn copy_tile(image: &mut RgbaImage, previous: &RgbaImage, x: u32, y: u32) {
    for m in 0..4 {
        for n in 0..4 {
            image.put_pixel(x + n, y + m, *previous.get_pixel(x + n, y + m));
        }
    }
}

pub(crate) fn encode(layer: &RgbLayer, with_bounds: bool) -> Result<Vec<u8>> {
    let grid = layer
        .bounds
        .grid(layer.image.width(), layer.image.height())?;
    let mut mask = RunMaskBuilder::new();
    let mut tiles = SldWriter::new();
    for y in (grid.y0..grid.y1).step_by(4) {
        for x in (grid.x0..grid.x1).step_by(4) {
            let colors = tile_colors(&layer.image, x, y);
            let is_empty = colors.iter().all(|c| c.is_none());
            if !is_empty {
                for &word in &encode_tile(&colors) {
                    tiles.word(word);
                }
            }
            mask.push(is_empty);
        }
    }
    let runs = mask.finish();
    let bounds = if with_bounds {
        Some(layer.bounds)
    } else {
        None
    };
    let mut writer = SldWriter::new();
    LayerHeader::write(&mut writer, bounds, 0, &runs)?;
    writer.bytes(&tiles.into_bytes());
    Ok(writer.into_bytes())
}

fn tile_colors(image: &RgbaImage, x: u32, y: u32) -> [Option<[u8; 3]>; 16] {
    let mut colors = [None; 16];
    for m in 0..4_u32 {
        for n in 0..4_u32 {
            let Rgba([r, g, b, a]) = *image.get_pixel(x + n, y + m);
            if a != 0 {
                colors[(m * 4 + n) as usize] = Some([r, g, b]);
            }
        }
    }
    colors
}

// Quantizes one non-empty tile: anchors are the darkest and brightest
// opaque pixels, swapped so that the numeric order of their packed forms
// encodes whether the tile needs the transparent ramp slot.
fn encode_tile(colors: &[Option<[u8; 3]>; 16]) -> [u16; 4] {
    let mut contains_empty = colors.iter().any(|c| c.is_none());
    let mut min_luma = f64::INFINITY;
    let mut max_luma = f64::NEG_INFINITY;
    let mut c0 = [0_u8; 3];
    let mut c1 = [0_u8; 3];
    for color in colors.iter().flatten() {
        let luma = color::luma(*color);
        if luma < min_luma {
            min_luma = luma;
            c0 = *color;
        }
        if luma > max_luma {
            max_luma = luma;
            c1 = *color;
        }
    }

    let mut value0 = color::pack_color16(c0);
    let mut value1 = color::pack_color16(c1);
    if value1 == value0 {
        contains_empty = true;
    }
    if (value1 >= value0) != contains_empty {
        std::mem::swap(&mut c0, &mut c1);
        std::mem::swap(&mut value0, &mut value1);
    }

    let mut palette: Vec<[u8; 3]> = Vec::with_capacity(4);
    palette.push(c0);
    if value1 != value0 {
        palette.push(c1);
        if contains_empty {
            palette.push(color::mix_rgb(c0, c1, 0.5));
        } else {
            palette.push(color::mix_rgb(c0, c1, 1.0 / 3.0));
            palette.push(color::mix_rgb(c0, c1, 2.0 / 3.0));
        }
    }

    let mut ids = [0_u8; 16];
    for (i, color) in colors.iter().enumerate() {
        ids[i] = match color {
            None => 3,
            Some(color) => nearest(&palette, *color),
        };
    }
    let mut low = 0_u16;
    let mut high = 0_u16;
    for i in 0..8 {
        low |= u16::from(ids[i]) << (i * 2);
        high |= u16::from(ids[i + 8]) << (i * 2);
    }
    [value0, value1, low, high]
}

fn nearest(palette: &[[u8; 3]], color: [u8; 3]) -> u8 {
    let mut best = 0;
    let mut best_distance = i32::MAX;
    for (i, entry) in palette.iter().enumerate() {
        let dr = i32::from(entry[0]) - i32::from(color[0]);
        let dg = i32::from(entry[1]) - i32::from(color[1]);
        let db = i32::from(entry[2]) - i32::from(color[2]);
        let distance = dr * dr + dg * dg + db * db;
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best as u8
}

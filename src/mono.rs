//! Tile codec for the single-channel layers (shadow and player tint).
//!
//! Each draw tile stores two anchor intensities and sixteen 3 bit palette
//! indices packed into a 48 bit little-endian stream. See
//! [crate::color::mono_ramp] for the ramp convention.

use crate::color;
use crate::layer::{BoundingBox, LayerHeader, MonoLayer};
use crate::reader::SldReader;
use crate::runmask::{RunCursor, RunMaskBuilder};
use crate::writer::SldWriter;
use crate::{Result, SldError};
use image::{GrayImage, Luma};
use std::io::Cursor;

// Ramp-position to wire-index permutations. Entry 0 of a ramp is the
// first anchor and entry 1 the second; interpolated stops start at 2.
const RAMP_ORDER_FULL: [u8; 8] = [0, 2, 3, 4, 5, 6, 7, 1];
const RAMP_ORDER_EXTREME: [u8; 8] = [0, 2, 3, 4, 5, 1, 6, 7];

pub(crate) fn decode(
    data: &[u8],
    width: u32,
    height: u32,
    inherited: Option<BoundingBox>,
    previous: Option<&GrayImage>,
    zero_transparent: bool,
) -> Result<MonoLayer> {
    let mut reader = SldReader::new(data);
    let header = LayerHeader::parse(&mut reader, inherited)?;
    let grid = header.bounds.grid(width, height)?;
    let previous = resolve_previous(&header, previous, width, height)?;

    let mut image = GrayImage::new(width, height);
    let mut runs = RunCursor::new(&header.runs);
    for y in (grid.y0..grid.y1).step_by(4) {
        for x in (grid.x0..grid.x1).step_by(4) {
            if runs.next_draw()? {
                decode_tile(&mut reader, &mut image, x, y, zero_transparent)?;
            } else if let Some(previous) = previous {
                copy_tile(&mut image, previous, x, y);
            }
        }
    }
    Ok(MonoLayer {
        image,
        bounds: header.bounds,
    })
}

fn resolve_previous<'a>(
    header: &LayerHeader,
    previous: Option<&'a GrayImage>,
    width: u32,
    height: u32,
) -> Result<Option<&'a GrayImage>> {
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
    image: &mut GrayImage,
    x: u32,
    y: u32,
    zero_transparent: bool,
) -> Result<()> {
    let b0 = reader.byte()?;
    let b1 = reader.byte()?;
    let mut packed = [0_u8; 8];
    reader.read_exact(&mut packed[..6])?;
    let bits = u64::from_le_bytes(packed);
    let ramp = color::mono_ramp(b0, b1);
    for m in 0..4_u32 {
        for n in 0..4_u32 {
            let i = m * 4 + n;
            match ramp[(bits >> (3 * i) & 0x7) as usize] {
                Some(v) => image.put_pixel(x + n, y + m, Luma([v])),
                // The shadow layer zeroes transparent hits; the player
                // layer leaves the pixel untouched.
                None => {
                    if zero_transparent {
                        image.put_pixel(x + n, y + m, Luma([0]));
                    }
                }
            }
        }
    }
    Ok(())
}

fn copy_tile(image: &mut GrayImage, previous: &GrayImage, x: u32, y: u32) {
    for m in 0..4 {
        for n in 0..4 {
            image.put_pixel(x + n, y + m, *previous.get_pixel(x + n, y + m));
        }
    }
}

pub(crate) fn encode(layer: &MonoLayer, with_bounds: bool) -> Result<Vec<u8>> {
    let grid = layer
        .bounds
        .grid(layer.image.width(), layer.image.height())?;
    let mut mask = RunMaskBuilder::new();
    let mut tiles = SldWriter::new();
    for y in (grid.y0..grid.y1).step_by(4) {
        for x in (grid.x0..grid.x1).step_by(4) {
            let values = tile_values(&layer.image, x, y);
            let is_empty = values.iter().all(|&v| v == 0);
            if !is_empty {
                let (anchors, indices) = encode_tile(&values);
                tiles.bytes(&anchors);
                tiles.bytes(&indices);
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
    LayerHeader::write(&mut writer, bounds, 1, &runs)?;
    writer.bytes(&tiles.into_bytes());
    Ok(writer.into_bytes())
}

fn tile_values(image: &GrayImage, x: u32, y: u32) -> [u8; 16] {
    let mut values = [0_u8; 16];
    for m in 0..4_u32 {
        for n in 0..4_u32 {
            values[(m * 4 + n) as usize] = image.get_pixel(x + n, y + m).0[0];
        }
    }
    values
}

// Quantizes one non-empty tile. A tile holding an exact 0 or 255 uses the
// ramp with the transparent and full-intensity slots; its anchors span
// the remaining intensities. Otherwise the anchors are the plain min and
// max, swapped so the packed pair reads high before low.
fn encode_tile(values: &[u8; 16]) -> ([u8; 2], [u8; 6]) {
    let contains_extreme = values.iter().any(|&v| v == 0 || v == 255);
    let mut ids = [0_u8; 16];
    let (b0, b1) = if contains_extreme {
        let mut low = i32::from(u8::MAX);
        let mut high = 0_i32;
        for &v in values {
            let v = i32::from(v);
            if v > 0 && v < low {
                low = v;
            }
            if v < 255 && v > high {
                high = v;
            }
        }
        if high == 0 {
            // Nothing between the extremes; both anchors collapse.
            low = 0;
        }
        let mut span = high - low;
        if span == 0 {
            span = 1;
        }
        for (i, &v) in values.iter().enumerate() {
            ids[i] = match v {
                0 => 6,
                255 => 7,
                _ => {
                    let pos = (f64::from(i32::from(v) - low) * 5.0 / f64::from(span)).round();
                    RAMP_ORDER_EXTREME[pos as usize]
                }
            };
        }
        (low as u8, high as u8)
    } else {
        let mut low = i32::from(u8::MAX);
        let mut high = 0_i32;
        for &v in values {
            let v = i32::from(v);
            if v < low {
                low = v;
            }
            if v > high {
                high = v;
            }
        }
        // The full ramp runs from bright to dark.
        let (start, end) = (high, low);
        let mut span = end - start;
        if span == 0 {
            span = 1;
        }
        for (i, &v) in values.iter().enumerate() {
            let pos = (f64::from(i32::from(v) - start) * 7.0 / f64::from(span)).round();
            ids[i] = RAMP_ORDER_FULL[pos as usize];
        }
        (start as u8, end as u8)
    };
    ([b0, b1], pack_indices(&ids))
}

fn pack_indices(ids: &[u8; 16]) -> [u8; 6] {
    let mut bits = 0_u64;
    for (i, &id) in ids.iter().enumerate() {
        bits |= u64::from(id) << (3 * i);
    }
    let bytes = bits.to_le_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]]
}

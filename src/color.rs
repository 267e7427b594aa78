//! Color conversions and palette-ramp construction shared by the RGB and
//! mono tile codecs.
//!
//! A tile stores two anchor values and derives the rest of its palette by
//! linear interpolation. Anchors are kept as f64 while building a ramp:
//! interpolated entries take the floor of the exact blend, anchors round
//! to the nearest 8 bit value when stored, matching the reference files
//! bit for bit.

/// Expands a packed 5-6-5 color to full-range channels.
pub(crate) fn unpack_color16(value: u16) -> [f64; 3] {
    [
        ((value >> 11) & 0x1f) as f64 * 255.0 / 31.0,
        ((value >> 5) & 0x3f) as f64 * 255.0 / 63.0,
        (value & 0x1f) as f64 * 255.0 / 31.0,
    ]
}

/// Quantizes an 8 bit color to packed 5-6-5, rounding each channel to the
/// nearest representable value. Exact ties cannot occur (255 is coprime
/// to the scaled numerators), so integer arithmetic is exact.
pub(crate) fn pack_color16(color: [u8; 3]) -> u16 {
    let r = (u32::from(color[0]) * 31 + 127) / 255;
    let g = (u32::from(color[1]) * 63 + 127) / 255;
    let b = (u32::from(color[2]) * 31 + 127) / 255;
    (r << 11 | g << 5 | b) as u16
}

/// Linear blend, floored. `t` is the weight of `v1`.
pub(crate) fn mix(v0: f64, v1: f64, t: f64) -> f64 {
    (v0 * (1.0 - t) + v1 * t).floor()
}

fn mix3(c0: [f64; 3], c1: [f64; 3], t: f64) -> [u8; 3] {
    [
        mix(c0[0], c1[0], t) as u8,
        mix(c0[1], c1[1], t) as u8,
        mix(c0[2], c1[2], t) as u8,
    ]
}

fn round3(c: [f64; 3]) -> [u8; 3] {
    [c[0].round() as u8, c[1].round() as u8, c[2].round() as u8]
}

/// Blend of two 8 bit colors, floored per channel.
pub(crate) fn mix_rgb(c0: [u8; 3], c1: [u8; 3], t: f64) -> [u8; 3] {
    mix3(widen(c0), widen(c1), t)
}

fn widen(c: [u8; 3]) -> [f64; 3] {
    [f64::from(c[0]), f64::from(c[1]), f64::from(c[2])]
}

/// Builds the 4 entry pixel ramp for an RGB tile. The numeric order of
/// the two packed anchors is the ramp-size selector: `value0 > value1`
/// yields four opaque entries, anything else three entries plus a
/// transparent slot. External tools rely on this exact convention.
pub(crate) fn rgb_ramp(value0: u16, value1: u16) -> [Option<[u8; 3]>; 4] {
    let c0 = unpack_color16(value0);
    let c1 = unpack_color16(value1);
    if value0 > value1 {
        [
            Some(round3(c0)),
            Some(round3(c1)),
            Some(mix3(c0, c1, 1.0 / 3.0)),
            Some(mix3(c0, c1, 2.0 / 3.0)),
        ]
    } else {
        [
            Some(round3(c0)),
            Some(round3(c1)),
            Some(mix3(c0, c1, 0.5)),
            None,
        ]
    }
}

/// Builds the 8 entry intensity ramp for a mono tile. `b0 > b1` selects
/// the fully interpolated ramp; otherwise entries 6 and 7 are reserved
/// for the transparent slot and full intensity.
pub(crate) fn mono_ramp(b0: u8, b1: u8) -> [Option<u8>; 8] {
    let v0 = f64::from(b0);
    let v1 = f64::from(b1);
    let stop = |t: f64| Some(mix(v0, v1, t) as u8);
    if b0 > b1 {
        [
            Some(b0),
            Some(b1),
            stop(1.0 / 7.0),
            stop(2.0 / 7.0),
            stop(3.0 / 7.0),
            stop(4.0 / 7.0),
            stop(5.0 / 7.0),
            stop(6.0 / 7.0),
        ]
    } else {
        [
            Some(b0),
            Some(b1),
            stop(1.0 / 5.0),
            stop(2.0 / 5.0),
            stop(3.0 / 5.0),
            stop(4.0 / 5.0),
            None,
            Some(255),
        ]
    }
}

/// Perceived brightness of an 8 bit color.
pub(crate) fn luma(c: [u8; 3]) -> f64 {
    0.299 * f64::from(c[0]) + 0.587 * f64::from(c[1]) + 0.114 * f64::from(c[2])
}

use crate::layer::COPY_PREVIOUS;
use crate::reader::SldReader;
use crate::runmask::{RunCursor, RunMaskBuilder};
use crate::writer::SldWriter;
use crate::{color, mask, mono, rgb};
use crate::{BoundingBox, Frame, MonoLayer, RgbLayer, SldError, SldFile};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn header_bytes(frame_count: u16) -> SldWriter {
    let mut w = SldWriter::new();
    w.bytes(b"SLDX");
    w.word(4);
    w.word(frame_count);
    w.dword(0);
    w.dword(255);
    w
}

// A sized 4x4 layer payload with a single tile. `draw` selects between
// one draw tile (solid red) and one skip tile.
fn tile_layer(flags: u8, draw: bool) -> Vec<u8> {
    let mut layer = SldWriter::new();
    layer.shorts(&[0, 0, 4, 4]);
    layer.byte(flags);
    layer.byte(1);
    layer.short(1);
    if draw {
        layer.bytes(&[0, 1]);
        layer.word(0xf800);
        layer.word(0x0000);
        layer.dword(0);
    } else {
        layer.bytes(&[1, 0]);
    }
    layer.into_bytes()
}

#[test]
fn chunk_framing_round_trips() {
    for &len in &[0_usize, 1, 3, 4, 5, 252, 253, 256] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8 + 1).collect();
        let mut writer = SldWriter::new();
        writer.chunk(&payload);
        let bytes = writer.into_bytes();
        let padded = (len + 3) / 4 * 4;
        assert_eq!(bytes.len(), 4 + padded);

        let mut reader = SldReader::new(&bytes);
        let chunk = reader.chunk().unwrap();
        assert_eq!(chunk.len(), padded);
        assert_eq!(&chunk[..len], &payload[..]);
        assert!(chunk[len..].iter().all(|&b| b == 0));
    }
}

#[test]
fn zero_length_chunk_is_rejected() {
    let bytes = [0_u8; 4];
    let mut reader = SldReader::new(&bytes);
    assert!(matches!(reader.chunk(), Err(SldError::InvalidInput(_))));
}

#[test]
fn draw_mask_covers_every_tile() {
    let mut rng = StdRng::seed_from_u64(0x51d);
    for &threshold in &[32_u8, 128, 224] {
        for _ in 0..10 {
            let tiles = 600;
            let pattern: Vec<bool> = (0..tiles).map(|_| rng.gen::<u8>() < threshold).collect();

            let mut builder = RunMaskBuilder::new();
            for &draw in &pattern {
                builder.push(!draw);
            }
            let runs = builder.finish();
            assert_eq!(runs.len() % 2, 0);
            let total: u32 = runs.iter().map(|&r| u32::from(r)).sum();
            assert_eq!(total, tiles as u32);

            let mut cursor = RunCursor::new(&runs);
            for &draw in &pattern {
                assert_eq!(cursor.next_draw().unwrap(), draw);
            }
        }
    }
}

#[test]
fn draw_mask_splits_long_runs() {
    // 300 skip tiles overflow the single-byte run length.
    let mut builder = RunMaskBuilder::new();
    for _ in 0..300 {
        builder.push(true);
    }
    builder.push(false);
    let runs = builder.finish();
    assert_eq!(runs, vec![255, 0, 45, 1]);

    let mut cursor = RunCursor::new(&runs);
    for _ in 0..300 {
        assert!(!cursor.next_draw().unwrap());
    }
    assert!(cursor.next_draw().unwrap());
    assert!(cursor.next_draw().is_err());
}

#[test]
fn rgb_tile_with_transparency_round_trips() {
    let mut image = RgbaImage::new(4, 4);
    for (i, pixel) in image.pixels_mut().enumerate() {
        *pixel = match i % 3 {
            0 => Rgba([255, 0, 0, 224]),
            1 => Rgba([0, 0, 255, 224]),
            _ => Rgba([0, 0, 0, 0]),
        };
    }
    let layer = RgbLayer::new(image.clone(), BoundingBox::full(4, 4).unwrap()).unwrap();
    let payload = rgb::encode(&layer, true).unwrap();
    let decoded = rgb::decode(&payload, 4, 4, None, None, rgb::NORMAL_ALPHA).unwrap();
    assert_eq!(decoded.image.as_raw(), image.as_raw());
}

#[test]
fn rgb_opaque_tile_keeps_its_anchor_colors() {
    // Two 5-6-5-exact colors and no transparency: the four entry ramp.
    let dark = Rgba([0, 134, 0, 224]);
    let bright = Rgba([255, 255, 255, 224]);
    let mut image = RgbaImage::new(4, 4);
    for (i, pixel) in image.pixels_mut().enumerate() {
        *pixel = if i < 8 { dark } else { bright };
    }
    let layer = RgbLayer::new(image.clone(), BoundingBox::full(4, 4).unwrap()).unwrap();
    let payload = rgb::encode(&layer, true).unwrap();

    // Opaque tiles store their anchors with the larger packed value
    // first; that ordering is what selects the four entry ramp.
    let value0 = u16::from_le_bytes([payload[14], payload[15]]);
    let value1 = u16::from_le_bytes([payload[16], payload[17]]);
    assert!(value0 > value1);

    let decoded = rgb::decode(&payload, 4, 4, None, None, rgb::NORMAL_ALPHA).unwrap();
    assert_eq!(decoded.image.as_raw(), image.as_raw());
}

#[test]
fn mono_extreme_tile_selects_the_transparent_ramp() {
    let mut image = GrayImage::new(4, 4);
    for (i, pixel) in image.pixels_mut().enumerate() {
        *pixel = Luma([[0, 64, 128, 255][i % 4]]);
    }
    let layer = MonoLayer::new(image.clone(), BoundingBox::full(4, 4).unwrap()).unwrap();
    let payload = mono::encode(&layer, true).unwrap();

    // Anchors in ascending order signal the ramp with the transparent
    // and full-intensity slots.
    assert_eq!((payload[14], payload[15]), (64, 128));

    let decoded = mono::decode(&payload, 4, 4, None, None, true).unwrap();
    assert_eq!(decoded.image.as_raw(), image.as_raw());
}

#[test]
fn mono_full_ramp_quantizes_to_nearest_stop() {
    // A 16 level gradient with no exact 0 or 255 takes the fully
    // interpolated ramp and quantizes to the nearest generated stop.
    let mut image = GrayImage::new(4, 4);
    for (i, pixel) in image.pixels_mut().enumerate() {
        *pixel = Luma([10 + 16 * i as u8]);
    }
    let layer = MonoLayer::new(image.clone(), BoundingBox::full(4, 4).unwrap()).unwrap();
    let payload = mono::encode(&layer, true).unwrap();
    assert_eq!((payload[14], payload[15]), (250, 10));

    let stops: Vec<u8> = color::mono_ramp(250, 10).iter().filter_map(|&s| s).collect();
    let decoded = mono::decode(&payload, 4, 4, None, None, true).unwrap();
    for (original, decoded) in image.pixels().zip(decoded.image.pixels()) {
        let v = i32::from(original.0[0]);
        let nearest = stops
            .iter()
            .copied()
            .min_by_key(|&s| (i32::from(s) - v).abs())
            .unwrap();
        assert!((i32::from(decoded.0[0]) - i32::from(nearest)).abs() <= 1);
    }
}

#[test]
fn opacity_mask_uses_repeat_and_literal_runs() {
    // Two fully opaque tiles in one row: a literal mask, then a repeat.
    let mut image = RgbaImage::new(8, 4);
    for pixel in image.pixels_mut() {
        *pixel = Rgba([10, 20, 30, 255]);
    }
    let layer = RgbLayer::new(image, BoundingBox::full(8, 4).unwrap()).unwrap();
    let payload = mask::encode(&layer).unwrap();
    assert_eq!(payload, vec![5, 0, 0, 0, 0x81, 0xff, 0xff, 1]);
}

#[test]
fn opacity_mask_splits_long_repeat_runs() {
    // 300 transparent tiles all repeat the row's implicit zero mask.
    let image = RgbaImage::new(1200, 4);
    let layer = RgbLayer::new(image, BoundingBox::full(1200, 4).unwrap()).unwrap();
    let payload = mask::encode(&layer).unwrap();
    assert_eq!(payload, vec![5, 0, 0, 0, 127, 127, 46]);
}

#[test]
fn copy_previous_on_first_frame_is_rejected() {
    let mut w = header_bytes(1);
    w.shorts(&[4, 4, 0, 0]);
    w.byte(0x01);
    w.byte(0);
    w.short(0);
    w.chunk(&tile_layer(COPY_PREVIOUS, false));

    let err = SldFile::read(&w.into_bytes()[..]).unwrap_err();
    assert!(matches!(err, SldError::MissingReference(_)));
}

#[test]
fn copy_previous_needs_the_layer_in_the_previous_frame() {
    // Frame 0 has only a normal layer; frame 1 asks its shadow layer to
    // copy from a shadow layer that was never decoded.
    let mut w = header_bytes(2);
    w.shorts(&[4, 4, 0, 0]);
    w.byte(0x01);
    w.byte(0);
    w.short(0);
    w.chunk(&tile_layer(0, false));

    w.shorts(&[4, 4, 0, 0]);
    w.byte(0x02);
    w.byte(0);
    w.short(1);
    w.chunk(&tile_layer(COPY_PREVIOUS, false));

    let err = SldFile::read(&w.into_bytes()[..]).unwrap_err();
    assert!(matches!(err, SldError::MissingReference(_)));
}

#[test]
fn skip_tiles_copy_the_previous_frame_when_flagged() {
    // Frame 0 draws one red tile; frame 1 skips it with the copy flag.
    let mut w = header_bytes(2);
    for id in 0..2_i16 {
        w.shorts(&[4, 4, 0, 0]);
        w.byte(0x01);
        w.byte(0);
        w.short(id);
        if id == 0 {
            w.chunk(&tile_layer(0, true));
        } else {
            w.chunk(&tile_layer(COPY_PREVIOUS, false));
        }
    }

    let file = SldFile::read(&w.into_bytes()[..]).unwrap();
    let first = file.frame(0).normal().unwrap().image();
    let second = file.frame(1).normal().unwrap().image();
    assert_eq!(*first.get_pixel(0, 0), Rgba([255, 0, 0, 224]));
    assert_eq!(first.as_raw(), second.as_raw());
}

#[test]
fn prefix_decode_stops_early() {
    let mut w = header_bytes(2);
    for id in 0..2_i16 {
        w.shorts(&[4, 4, 0, 0]);
        w.byte(0x01);
        w.byte(0);
        w.short(id);
        w.chunk(&tile_layer(0, id == 0));
    }
    let file = SldFile::read_prefix(&w.into_bytes()[..], 1).unwrap();
    assert_eq!(file.num_frames(), 1);
}

#[test]
fn white_tile_file_decodes_and_reencodes_stably() {
    let mut layer = SldWriter::new();
    layer.shorts(&[0, 0, 4, 4]);
    layer.byte(0);
    layer.byte(1);
    layer.short(1);
    layer.bytes(&[0, 1]);
    layer.word(0xffff);
    layer.word(0x0000);
    layer.dword(0);

    let mut w = SldWriter::new();
    w.bytes(b"SLDX");
    w.word(4);
    w.word(1);
    w.dword(1_048_576);
    w.dword(255);
    w.shorts(&[4, 4, 0, 0]);
    w.byte(0x01);
    w.byte(0);
    w.short(0);
    w.chunk(&layer.into_bytes());

    let file = SldFile::read(&w.into_bytes()[..]).unwrap();
    assert_eq!(file.version(), 4);
    assert_eq!(file.reserved(), 1_048_576);
    assert_eq!(file.opacity(), 255);
    assert_eq!(file.num_frames(), 1);
    let normal = file.frame(0).normal().unwrap();
    assert!(normal
        .image()
        .pixels()
        .all(|p| *p == Rgba([255, 255, 255, 224])));

    // The re-encoded container differs (it gains the derived opacity
    // mask), but a second round reproduces it byte for byte.
    let first = file.encode().unwrap();
    let again = SldFile::read(&first[..]).unwrap();
    assert_eq!(
        again.frame(0).normal().unwrap().image().as_raw(),
        normal.image().as_raw()
    );
    let second = again.encode().unwrap();
    assert_eq!(first, second);
}

#[test]
fn bad_magic_is_rejected() {
    let err = SldFile::read(&b"SLDY"[..]).unwrap_err();
    assert!(matches!(err, SldError::InvalidInput(_)));
}

#[test]
fn oversized_frame_count_is_rejected() {
    let mut w = SldWriter::new();
    w.bytes(b"SLDX");
    w.word(4);
    w.word(4096);
    let err = SldFile::read(&w.into_bytes()[..]).unwrap_err();
    assert!(matches!(err, SldError::InvalidInput(_)));
}

#[test]
fn unaligned_bounding_box_is_rejected() {
    let mut layer = SldWriter::new();
    layer.shorts(&[2, 0, 4, 4]);
    layer.byte(0);
    layer.byte(1);
    layer.short(0);

    let mut w = header_bytes(1);
    w.shorts(&[4, 4, 0, 0]);
    w.byte(0x01);
    w.byte(0);
    w.short(0);
    w.chunk(&layer.into_bytes());

    let err = SldFile::read(&w.into_bytes()[..]).unwrap_err();
    assert!(matches!(err, SldError::InvalidInput(_)));
}

#[test]
fn truncated_tile_data_is_rejected() {
    // One draw tile announced, but its record is missing.
    let mut layer = SldWriter::new();
    layer.shorts(&[0, 0, 4, 4]);
    layer.byte(0);
    layer.byte(1);
    layer.short(1);
    layer.bytes(&[0, 1]);

    let mut w = header_bytes(1);
    w.shorts(&[4, 4, 0, 0]);
    w.byte(0x01);
    w.byte(0);
    w.short(0);
    w.chunk(&layer.into_bytes());

    let err = SldFile::read(&w.into_bytes()[..]).unwrap_err();
    assert!(matches!(err, SldError::IoError(_)));
}

#[test]
fn full_sprite_round_trips_through_encode_and_decode() {
    let bounds = BoundingBox::full(8, 8).unwrap();

    // Normal: left half solid red, right half transparent.
    let mut normal_img = RgbaImage::new(8, 8);
    for (x, _, pixel) in normal_img.enumerate_pixels_mut() {
        if x < 4 {
            *pixel = Rgba([255, 0, 0, 224]);
        }
    }
    // Shadow: left half at intensity 96.
    let mut shadow_img = GrayImage::new(8, 8);
    for (x, _, pixel) in shadow_img.enumerate_pixels_mut() {
        if x < 4 {
            *pixel = Luma([96]);
        }
    }
    // Smudge: a single opaque white pixel.
    let mut smudge_img = RgbaImage::new(8, 8);
    smudge_img.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
    // Player: a single tinted pixel.
    let mut player_img = GrayImage::new(8, 8);
    player_img.put_pixel(1, 1, Luma([40]));

    let mut frame = Frame::new(8, 8);
    frame.set_anchor(3, -2);
    frame.set_always_on_top(false);
    frame.set_normal(Some(
        RgbLayer::new(normal_img.clone(), bounds).unwrap(),
    ));
    frame.set_shadow(Some(
        MonoLayer::new(shadow_img.clone(), bounds).unwrap(),
    ));
    frame.set_smudge(Some(
        RgbLayer::new(smudge_img.clone(), bounds).unwrap(),
    ));
    frame.set_player(Some(
        MonoLayer::new(player_img.clone(), bounds).unwrap(),
    ));

    let mut sprite = SldFile::new(4, 255);
    sprite.push_frame(frame);
    let bytes = sprite.encode().unwrap();

    let decoded = SldFile::read(&bytes[..]).unwrap();
    assert_eq!(decoded.num_frames(), 1);
    let frame = decoded.frame(0);
    assert_eq!(frame.anchor(), (3, -2));
    assert!(!frame.is_always_on_top());
    assert_eq!(frame.index(), 0);

    assert_eq!(frame.normal().unwrap().image().as_raw(), normal_img.as_raw());
    assert_eq!(frame.shadow().unwrap().image().as_raw(), shadow_img.as_raw());
    assert_eq!(frame.smudge().unwrap().image().as_raw(), smudge_img.as_raw());
    assert_eq!(frame.player().unwrap().image().as_raw(), player_img.as_raw());

    // The opacity mask was derived from the normal layer's alpha.
    let auxiliary = frame.auxiliary().unwrap();
    assert_eq!(auxiliary[0], 5);
}

use crate::file::{Frame, SldFile};
use crate::layer::FrameFlags;
use crate::reader::SldReader;
use crate::{mono, rgb, Result, SldError};
use log::debug;
use std::io::Read;

// Well-formed files keep the frame count in 12 bits.
const MAX_FRAMES: u16 = 4096;

pub(crate) fn read_sld<R: Read>(input: R, limit: Option<usize>) -> Result<SldFile> {
    let mut reader = SldReader::with(input);
    let mut magic = [0_u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != b"SLDX" {
        return Err(SldError::InvalidInput(format!(
            "Invalid magic number for header: {:02x?} != \"SLDX\"",
            magic
        )));
    }
    let version = reader.word()?;
    let frame_count = reader.word()?;
    if frame_count >= MAX_FRAMES {
        return Err(SldError::InvalidInput(format!(
            "Frame count out of range: {} >= {}",
            frame_count, MAX_FRAMES
        )));
    }
    let reserved = reader.dword()?;
    let opacity = reader.dword()?;
    debug!(
        "SLDX v{}: {} frames, opacity {}",
        version, frame_count, opacity
    );

    let count = match limit {
        Some(limit) => limit.min(frame_count as usize),
        None => frame_count as usize,
    };
    let mut frames: Vec<Frame> = Vec::with_capacity(count);
    for id in 0..count {
        // Frames decode strictly in order; skip tiles may borrow pixels
        // from the frame decoded just before this one.
        let frame = parse_frame(&mut reader, id, frames.last())?;
        frames.push(frame);
    }

    Ok(SldFile {
        version,
        reserved,
        opacity,
        frames,
    })
}

fn parse_frame<R: Read>(
    reader: &mut SldReader<R>,
    id: usize,
    previous: Option<&Frame>,
) -> Result<Frame> {
    let mut geometry = [0_i16; 4];
    reader.shorts(&mut geometry)?;
    let [width, height, anchor_x, anchor_y] = geometry;
    if width < 0 || height < 0 {
        return Err(SldError::InvalidInput(format!(
            "Frame {} has negative size {}x{}",
            id, width, height
        )));
    }
    let flag_bits = reader.byte()?;
    let overlay = reader.byte()?;
    let index = reader.short()?;
    let flags = FrameFlags::from_bits_truncate(flag_bits);
    debug!(
        "frame {}: {}x{} anchor ({},{}) layers {:?}",
        id, width, height, anchor_x, anchor_y, flags
    );

    let mut frame = Frame::new(width as u16, height as u16);
    frame.anchor_x = anchor_x;
    frame.anchor_y = anchor_y;
    frame.overlay = overlay;
    frame.index = index;

    let (width, height) = (width as u32, height as u32);
    if flags.contains(FrameFlags::NORMAL) {
        let data = reader.chunk()?;
        let prev = previous.and_then(|f| f.normal.as_ref()).map(|l| &l.image);
        frame.normal = Some(rgb::decode(
            &data,
            width,
            height,
            None,
            prev,
            rgb::NORMAL_ALPHA,
        )?);
    }
    if flags.contains(FrameFlags::SHADOW) {
        let data = reader.chunk()?;
        let prev = previous.and_then(|f| f.shadow.as_ref()).map(|l| &l.image);
        frame.shadow = Some(mono::decode(&data, width, height, None, prev, true)?);
    }
    if flags.contains(FrameFlags::AUXILIARY) {
        // Opaque to the decoder; kept as raw bytes.
        frame.auxiliary = Some(reader.chunk()?);
    }
    if flags.contains(FrameFlags::SMUDGE) {
        let data = reader.chunk()?;
        let bounds = frame.normal.as_ref().map(|l| l.bounds).ok_or_else(|| {
            SldError::InvalidInput("Smudge layer present without a normal layer".to_owned())
        })?;
        let prev = previous.and_then(|f| f.smudge.as_ref()).map(|l| &l.image);
        frame.smudge = Some(rgb::decode(
            &data,
            width,
            height,
            Some(bounds),
            prev,
            rgb::SMUDGE_ALPHA,
        )?);
    }
    if flags.contains(FrameFlags::PLAYER) {
        let data = reader.chunk()?;
        let bounds = frame.normal.as_ref().map(|l| l.bounds).ok_or_else(|| {
            SldError::InvalidInput("Player layer present without a normal layer".to_owned())
        })?;
        let prev = previous.and_then(|f| f.player.as_ref()).map(|l| &l.image);
        frame.player = Some(mono::decode(&data, width, height, Some(bounds), prev, false)?);
    }

    Ok(frame)
}

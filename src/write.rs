use crate::file::{Frame, SldFile};
use crate::layer::{BoundingBox, FrameFlags};
use crate::writer::SldWriter;
use crate::{mask, mono, rgb, Result, SldError};

pub(crate) fn write_sld(file: &SldFile) -> Result<Vec<u8>> {
    if file.frames.len() >= 4096 {
        return Err(SldError::CapacityExceeded(format!(
            "{} frames exceed the format limit of 4095",
            file.frames.len()
        )));
    }
    let mut writer = SldWriter::new();
    writer.bytes(b"SLDX");
    writer.word(file.version);
    writer.word(file.frames.len() as u16);
    writer.dword(file.reserved);
    writer.dword(file.opacity);
    for (id, frame) in file.frames.iter().enumerate() {
        write_frame(&mut writer, frame, id as i16)?;
    }
    Ok(writer.into_bytes())
}

// Every frame is re-quantized in full; the writer never emits the
// copy-previous flag, so frames serialize independently of each other.
fn write_frame(writer: &mut SldWriter, frame: &Frame, id: i16) -> Result<()> {
    if frame.width > i16::MAX as u16 || frame.height > i16::MAX as u16 {
        return Err(SldError::CapacityExceeded(format!(
            "Frame size {}x{} does not fit 16 bit wire fields",
            frame.width, frame.height
        )));
    }
    writer.shorts(&[
        frame.width as i16,
        frame.height as i16,
        frame.anchor_x,
        frame.anchor_y,
    ]);

    // The opacity mask is derived from the normal layer whenever one is
    // present; decoded auxiliary bytes are carried through otherwise.
    let auxiliary = match &frame.normal {
        Some(normal) => Some(mask::encode(normal)?),
        None => frame.auxiliary.clone(),
    };

    let mut flags = FrameFlags::empty();
    if frame.normal.is_some() {
        flags |= FrameFlags::NORMAL;
    }
    if frame.shadow.is_some() {
        flags |= FrameFlags::SHADOW;
    }
    if auxiliary.is_some() {
        flags |= FrameFlags::AUXILIARY;
    }
    if frame.smudge.is_some() {
        flags |= FrameFlags::SMUDGE;
    }
    if frame.player.is_some() {
        flags |= FrameFlags::PLAYER;
    }
    writer.byte(flags.bits());
    writer.byte(frame.overlay);
    writer.short(id);

    if let Some(layer) = &frame.normal {
        writer.chunk(&rgb::encode(layer, true)?);
    }
    if let Some(layer) = &frame.shadow {
        writer.chunk(&mono::encode(layer, true)?);
    }
    if let Some(payload) = &auxiliary {
        writer.chunk(payload);
    }
    if let Some(layer) = &frame.smudge {
        check_unsized_bounds(frame, layer.bounds, "Smudge")?;
        writer.chunk(&rgb::encode(layer, false)?);
    }
    if let Some(layer) = &frame.player {
        check_unsized_bounds(frame, layer.bounds, "Player")?;
        writer.chunk(&mono::encode(layer, false)?);
    }
    Ok(())
}

// Smudge and player payloads carry no bounding box of their own; the
// decoder will reuse the normal layer's, so the boxes must agree.
fn check_unsized_bounds(frame: &Frame, bounds: BoundingBox, kind: &str) -> Result<()> {
    match &frame.normal {
        None => Err(SldError::InvalidInput(format!(
            "{} layer cannot be written without a normal layer",
            kind
        ))),
        Some(normal) if normal.bounds != bounds => Err(SldError::InvalidInput(format!(
            "{} layer bounding box differs from the normal layer's",
            kind
        ))),
        Some(_) => Ok(()),
    }
}

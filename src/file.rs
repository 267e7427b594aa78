use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

use crate::layer::{MonoLayer, RgbLayer};
use crate::{parse, write, Result};

/// A parsed SLD sprite file.
#[derive(Debug)]
pub struct SldFile {
    pub(crate) version: u16,
    pub(crate) reserved: u32,
    pub(crate) opacity: u32,
    pub(crate) frames: Vec<Frame>,
}

impl SldFile {
    /// Load SLD file. Loads full file into memory.
    pub fn read_file(path: &Path) -> Result<Self> {
        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        parse::read_sld(reader, None)
    }

    /// Load an SLD file from any input that implements `std::io::Read`.
    ///
    /// You can use this to read from an in-memory file.
    pub fn read<R: Read>(input: R) -> Result<Self> {
        parse::read_sld(input, None)
    }

    /// Like [SldFile::read], but decodes at most `max_frames` frames and
    /// ignores the rest of the input. Useful for previewing long
    /// animations.
    pub fn read_prefix<R: Read>(input: R, max_frames: usize) -> Result<Self> {
        parse::read_sld(input, Some(max_frames))
    }

    /// Creates an empty file for building a sprite from scratch.
    pub fn new(version: u16, opacity: u32) -> Self {
        Self {
            version,
            reserved: 0,
            opacity,
            frames: Vec::new(),
        }
    }

    /// Format version stored in the header.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Reserved header field, preserved for round-trips.
    pub fn reserved(&self) -> u32 {
        self.reserved
    }

    /// Sets the reserved header field.
    pub fn set_reserved(&mut self, reserved: u32) {
        self.reserved = reserved;
    }

    /// Global opacity hint stored in the header.
    pub fn opacity(&self) -> u32 {
        self.opacity
    }

    /// Sets the global opacity hint.
    pub fn set_opacity(&mut self, opacity: u32) {
        self.opacity = opacity;
    }

    /// Number of decoded frames.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// A single frame.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than [SldFile::num_frames].
    pub fn frame(&self, index: usize) -> &Frame {
        &self.frames[index]
    }

    /// Mutable access to a single frame, e.g. for anchor edits.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than [SldFile::num_frames].
    pub fn frame_mut(&mut self, index: usize) -> &mut Frame {
        &mut self.frames[index]
    }

    /// All frames in playback order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Appends a frame.
    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Serializes the whole sprite to SLD container bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        write::write_sld(self)
    }

    /// Serializes the sprite to any output that implements
    /// `std::io::Write`.
    pub fn write<W: Write>(&self, mut output: W) -> Result<()> {
        let bytes = self.encode()?;
        output.write_all(&bytes)?;
        Ok(())
    }

    /// Serializes the sprite to a file.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let file = File::create(&path)?;
        self.write(file)
    }
}

/// A single animation frame and its decoded layers.
///
/// Frames are identified by their position in the file; the stored
/// [Frame::index] is advisory metadata only.
#[derive(Debug, Clone)]
pub struct Frame {
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) anchor_x: i16,
    pub(crate) anchor_y: i16,
    pub(crate) overlay: u8,
    pub(crate) index: i16,
    pub(crate) normal: Option<RgbLayer>,
    pub(crate) shadow: Option<MonoLayer>,
    pub(crate) auxiliary: Option<Vec<u8>>,
    pub(crate) smudge: Option<RgbLayer>,
    pub(crate) player: Option<MonoLayer>,
}

impl Frame {
    /// Creates an empty frame with the given canvas size.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            anchor_x: 0,
            anchor_y: 0,
            overlay: 0,
            index: 0,
            normal: None,
            shadow: None,
            auxiliary: None,
            smudge: None,
            player: None,
        }
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    /// Anchor point relative to the top-left corner.
    pub fn anchor(&self) -> (i16, i16) {
        (self.anchor_x, self.anchor_y)
    }

    /// Moves the anchor point.
    pub fn set_anchor(&mut self, x: i16, y: i16) {
        self.anchor_x = x;
        self.anchor_y = y;
    }

    /// Raw overlay byte as stored in the file.
    pub fn overlay(&self) -> u8 {
        self.overlay
    }

    /// Sets the raw overlay byte.
    pub fn set_overlay(&mut self, overlay: u8) {
        self.overlay = overlay;
    }

    /// Whether the renderer should keep this frame above other sprites.
    /// Stored inverted: bit 0x80 of the overlay byte marks a frame that
    /// is *not* always on top.
    pub fn is_always_on_top(&self) -> bool {
        self.overlay & 0x80 == 0
    }

    /// Toggles the always-on-top bit.
    pub fn set_always_on_top(&mut self, on_top: bool) {
        if on_top {
            self.overlay &= !0x80;
        } else {
            self.overlay |= 0x80;
        }
    }

    /// Advisory frame number read from the file. The writer emits frame
    /// positions instead.
    pub fn index(&self) -> i16 {
        self.index
    }

    /// The visible sprite layer.
    pub fn normal(&self) -> Option<&RgbLayer> {
        self.normal.as_ref()
    }

    /// Sets the visible sprite layer.
    ///
    /// # Panics
    ///
    /// Panics if the layer's buffer does not match the frame canvas.
    pub fn set_normal(&mut self, layer: Option<RgbLayer>) {
        self.check_canvas(layer.as_ref().map(|l| l.image.dimensions()));
        self.normal = layer;
    }

    /// The shadow intensity layer.
    pub fn shadow(&self) -> Option<&MonoLayer> {
        self.shadow.as_ref()
    }

    /// Sets the shadow layer.
    ///
    /// # Panics
    ///
    /// Panics if the layer's buffer does not match the frame canvas.
    pub fn set_shadow(&mut self, layer: Option<MonoLayer>) {
        self.check_canvas(layer.as_ref().map(|l| l.image.dimensions()));
        self.shadow = layer;
    }

    /// The auxiliary chunk's raw bytes, if the frame carries one. Never
    /// interpreted by the decoder.
    pub fn auxiliary(&self) -> Option<&[u8]> {
        self.auxiliary.as_deref()
    }

    /// Sets the auxiliary chunk bytes. Ignored on write whenever a normal
    /// layer is present, because the chunk is re-derived from its alpha
    /// channel.
    pub fn set_auxiliary(&mut self, payload: Option<Vec<u8>>) {
        self.auxiliary = payload;
    }

    /// The decal layer.
    pub fn smudge(&self) -> Option<&RgbLayer> {
        self.smudge.as_ref()
    }

    /// Sets the decal layer. It shares the normal layer's bounding box on
    /// the wire, so both boxes must agree when the frame is written.
    ///
    /// # Panics
    ///
    /// Panics if the layer's buffer does not match the frame canvas.
    pub fn set_smudge(&mut self, layer: Option<RgbLayer>) {
        self.check_canvas(layer.as_ref().map(|l| l.image.dimensions()));
        self.smudge = layer;
    }

    /// The player-tint intensity layer.
    pub fn player(&self) -> Option<&MonoLayer> {
        self.player.as_ref()
    }

    /// Sets the player-tint layer. It shares the normal layer's bounding
    /// box on the wire, so both boxes must agree when the frame is
    /// written.
    ///
    /// # Panics
    ///
    /// Panics if the layer's buffer does not match the frame canvas.
    pub fn set_player(&mut self, layer: Option<MonoLayer>) {
        self.check_canvas(layer.as_ref().map(|l| l.image.dimensions()));
        self.player = layer;
    }

    fn check_canvas(&self, dimensions: Option<(u32, u32)>) {
        if let Some((width, height)) = dimensions {
            assert_eq!(
                (width, height),
                (self.width(), self.height()),
                "Layer buffer does not match the frame canvas"
            );
        }
    }
}

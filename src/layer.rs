use crate::reader::SldReader;
use crate::writer::SldWriter;
use crate::{Result, SldError};
use bitflags::bitflags;
use image::{GrayImage, RgbaImage};
use std::io::Read;

bitflags! {
    /// Which layer chunks a frame carries, one bit per chunk in wire order.
    pub struct FrameFlags: u8 {
        /// The visible sprite layer (RGB).
        const NORMAL = 0x01;
        /// The shadow intensity layer.
        const SHADOW = 0x02;
        /// The auxiliary opacity-mask chunk, opaque to the decoder.
        const AUXILIARY = 0x04;
        /// The decal layer (RGB).
        const SMUDGE = 0x08;
        /// The player-tint intensity layer.
        const PLAYER = 0x10;
    }
}

/// Per-layer flag bit: skip tiles reuse the previous frame's pixels.
pub(crate) const COPY_PREVIOUS: u8 = 0x80;

/// The sub-rectangle of a frame's canvas covered by a layer's tile grid.
/// All four coordinates are multiples of 4; pixels outside the box are
/// implicitly blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Left edge, inclusive.
    pub x0: i16,
    /// Top edge, inclusive.
    pub y0: i16,
    /// Right edge, exclusive.
    pub x1: i16,
    /// Bottom edge, exclusive.
    pub y1: i16,
}

impl BoundingBox {
    pub(crate) fn parse<R: Read>(reader: &mut SldReader<R>) -> Result<Self> {
        let mut c = [0_i16; 4];
        reader.shorts(&mut c)?;
        Ok(BoundingBox {
            x0: c[0],
            y0: c[1],
            x1: c[2],
            y1: c[3],
        })
    }

    pub(crate) fn write(&self, writer: &mut SldWriter) {
        writer.shorts(&[self.x0, self.y0, self.x1, self.y1]);
    }

    /// A box covering a full canvas. Both dimensions must be multiples
    /// of 4 and fit the 16 bit wire fields.
    pub fn full(width: u32, height: u32) -> Result<Self> {
        if width > 32764 || height > 32764 {
            return Err(SldError::CapacityExceeded(format!(
                "Canvas {}x{} does not fit 16 bit box coordinates",
                width, height
            )));
        }
        let b = BoundingBox {
            x0: 0,
            y0: 0,
            x1: width as i16,
            y1: height as i16,
        };
        b.grid(width, height)?;
        Ok(b)
    }

    /// Width of the box in pixels.
    pub fn width(&self) -> i16 {
        self.x1 - self.x0
    }

    /// Height of the box in pixels.
    pub fn height(&self) -> i16 {
        self.y1 - self.y0
    }

    /// Validates the box against a canvas and fixes its tile grid.
    pub(crate) fn grid(&self, width: u32, height: u32) -> Result<TileGrid> {
        let edges = [self.x0, self.y0, self.x1, self.y1];
        if edges.iter().any(|&e| e < 0 || e % 4 != 0) {
            return Err(SldError::InvalidInput(format!(
                "Bounding box [{},{},{},{}] is not aligned to the 4x4 tile grid",
                self.x0, self.y0, self.x1, self.y1
            )));
        }
        if self.x1 < self.x0
            || self.y1 < self.y0
            || self.x1 as u32 > width
            || self.y1 as u32 > height
        {
            return Err(SldError::InvalidInput(format!(
                "Bounding box [{},{},{},{}] exceeds the {}x{} canvas",
                self.x0, self.y0, self.x1, self.y1, width, height
            )));
        }
        Ok(TileGrid {
            x0: self.x0 as u32,
            y0: self.y0 as u32,
            x1: self.x1 as u32,
            y1: self.y1 as u32,
        })
    }
}

/// A validated bounding box in unsigned pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TileGrid {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl TileGrid {
    pub(crate) fn columns(&self) -> u32 {
        (self.x1 - self.x0) / 4
    }

    pub(crate) fn rows(&self) -> u32 {
        (self.y1 - self.y0) / 4
    }
}

// The header shared by all tiled layer payloads: optional bounding box,
// flag byte, reserved byte, then the draw-run list. The run count field
// stores the number of byte pairs.
pub(crate) struct LayerHeader {
    pub bounds: BoundingBox,
    pub flags: u8,
    pub runs: Vec<u8>,
}

impl LayerHeader {
    /// Parses a layer-payload header. Smudge and player payloads carry no
    /// box of their own and inherit the frame's normal layer box.
    pub(crate) fn parse<R: Read>(
        reader: &mut SldReader<R>,
        inherited: Option<BoundingBox>,
    ) -> Result<Self> {
        let bounds = match inherited {
            Some(bounds) => bounds,
            None => BoundingBox::parse(reader)?,
        };
        let flags = reader.byte()?;
        let _reserved = reader.byte()?;
        let pair_count = reader.short()?;
        if pair_count < 0 {
            return Err(SldError::InvalidInput(format!(
                "Negative draw-run count: {}",
                pair_count
            )));
        }
        let mut runs = vec![0_u8; pair_count as usize * 2];
        reader.read_exact(&mut runs)?;
        Ok(LayerHeader {
            bounds,
            flags,
            runs,
        })
    }

    pub(crate) fn write(
        writer: &mut SldWriter,
        bounds: Option<BoundingBox>,
        flags: u8,
        runs: &[u8],
    ) -> Result<()> {
        if let Some(bounds) = bounds {
            bounds.write(writer);
        }
        writer.byte(flags);
        writer.byte(1);
        let pairs = runs.len() / 2;
        if pairs > i16::MAX as usize {
            return Err(SldError::CapacityExceeded(format!(
                "Draw mask with {} run pairs does not fit its 16 bit count field",
                pairs
            )));
        }
        writer.short(pairs as i16);
        writer.bytes(runs);
        Ok(())
    }

    pub(crate) fn copy_previous(&self) -> bool {
        self.flags & COPY_PREVIOUS != 0
    }
}

/// A full-canvas RGBA buffer plus the bounding box that was (or will be)
/// tile-encoded. Used for the normal and smudge layers.
#[derive(Debug, Clone)]
pub struct RgbLayer {
    pub(crate) image: RgbaImage,
    pub(crate) bounds: BoundingBox,
}

impl RgbLayer {
    /// Wraps a buffer for encoding. The box must be tile-aligned and lie
    /// within the buffer.
    pub fn new(image: RgbaImage, bounds: BoundingBox) -> Result<Self> {
        bounds.grid(image.width(), image.height())?;
        Ok(Self { image, bounds })
    }

    /// The decoded pixels. Tiles outside the bounding box are fully
    /// transparent.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// The tile-encoded sub-rectangle.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Consumes the layer, returning its pixel buffer.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// A full-canvas single-channel intensity buffer plus its bounding box.
/// Used for the shadow and player layers.
#[derive(Debug, Clone)]
pub struct MonoLayer {
    pub(crate) image: GrayImage,
    pub(crate) bounds: BoundingBox,
}

impl MonoLayer {
    /// Wraps a buffer for encoding. The box must be tile-aligned and lie
    /// within the buffer.
    pub fn new(image: GrayImage, bounds: BoundingBox) -> Result<Self> {
        bounds.grid(image.width(), image.height())?;
        Ok(Self { image, bounds })
    }

    /// The decoded intensities. Zero outside the bounding box.
    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    /// The tile-encoded sub-rectangle.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Consumes the layer, returning its intensity buffer.
    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

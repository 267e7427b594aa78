#![warn(clippy::all)]
#![warn(missing_docs)]
/*!

Utilities for loading and saving SLD sprite files. This library directly
reads and writes the binary SLD container used for multi-layer,
palette-compressed animation frames, without going through an exporter.
This should make it fast enough to load your assets when the game boots
up. You can also use it to build your own asset pipelines.

An SLD sprite is a sequence of frames. Each frame carries up to five
layers: a `normal` color layer, a `shadow` layer, a `player` tint layer,
a `smudge` decal layer, and an auxiliary opacity-mask chunk that this
library treats as opaque bytes. Color layers decode into
`image::RgbaImage` buffers, intensity layers into `image::GrayImage`
buffers.

# Basic Usage

## Load a file

The easiest way is to use [SldFile::read_file] to load a file.

```no_run
use sldfile::SldFile;
# use std::path::Path;
let sld = SldFile::read_file(Path::new("unit_idle.sld")).unwrap();

println!("Frames: {}", sld.num_frames());
println!("Opacity: {}", sld.opacity());
```

## Access decoded layers

Each [Frame] exposes its decoded layer buffers. How the layers are
composited, tinted, and laid out on screen is up to the renderer.

```
# use sldfile::{BoundingBox, Frame, RgbLayer, SldFile};
# use image::{Rgba, RgbaImage};
# fn main() -> Result<(), sldfile::SldError> {
# let mut image = RgbaImage::new(8, 8);
# image.put_pixel(2, 2, Rgba([255, 0, 0, 224]));
# let layer = RgbLayer::new(image, BoundingBox::full(8, 8)?)?;
# let mut frame = Frame::new(8, 8);
# frame.set_normal(Some(layer));
# let mut sprite = SldFile::new(4, 255);
# sprite.push_frame(frame);
# let bytes = sprite.encode()?;
let sld = SldFile::read(&bytes[..])?;
let frame = sld.frame(0);
if let Some(normal) = frame.normal() {
    println!("Size: {}x{}", normal.image().width(), normal.image().height());
}
# Ok(())
# }
```

## Build and save a sprite

Frames are assembled from full-canvas pixel buffers plus a tile-aligned
[BoundingBox] marking the region worth encoding; the codec quantizes
them into the format's 4x4 palette tiles.

```
use sldfile::{BoundingBox, Frame, RgbLayer, SldFile};
use image::{Rgba, RgbaImage};

# fn main() -> Result<(), sldfile::SldError> {
let mut image = RgbaImage::new(16, 16);
image.put_pixel(5, 5, Rgba([255, 160, 0, 224]));
let layer = RgbLayer::new(image, BoundingBox { x0: 4, y0: 4, x1: 8, y1: 8 })?;

let mut frame = Frame::new(16, 16);
frame.set_normal(Some(layer));

let mut sprite = SldFile::new(4, 255);
sprite.push_frame(frame);
let bytes = sprite.encode()?;

let reloaded = SldFile::read(&bytes[..])?;
assert_eq!(reloaded.num_frames(), 1);
# Ok(())
# }
```

*/

pub(crate) mod color;
pub(crate) mod error;
pub(crate) mod file;
pub(crate) mod layer;
pub(crate) mod mask;
pub(crate) mod mono;
pub(crate) mod parse;
pub(crate) mod reader;
pub(crate) mod rgb;
pub(crate) mod runmask;
#[cfg(test)]
mod tests;
pub(crate) mod write;
pub(crate) mod writer;

/// A specialized `Result` type for SLD coding functions.
pub type Result<T> = std::result::Result<T, SldError>;

pub use error::SldError;
pub use file::{Frame, SldFile};
pub use layer::{BoundingBox, FrameFlags, MonoLayer, RgbLayer};

//! The run-length draw mask shared by every tiled layer payload.
//!
//! A layer covers its bounding box with 4x4 tiles in row-major order. The
//! mask is a list of run lengths alternating between "skip" and "draw",
//! starting with a skip run (which may be zero length). Only draw tiles
//! carry a tile record in the payload; skip tiles are either left blank
//! or copied from the previous frame.

use crate::{Result, SldError};

/// Replays a decoded run list tile by tile.
pub(crate) struct RunCursor<'a> {
    runs: &'a [u8],
    index: usize,
    remaining: i32,
    draw: bool,
}

impl<'a> RunCursor<'a> {
    pub(crate) fn new(runs: &'a [u8]) -> Self {
        Self {
            runs,
            index: 0,
            remaining: runs.first().copied().map(i32::from).unwrap_or(0),
            draw: false,
        }
    }

    /// Advances by one tile and reports whether it carries pixel data.
    /// Runs of length zero are legal and simply flip the state twice.
    pub(crate) fn next_draw(&mut self) -> Result<bool> {
        self.remaining -= 1;
        while self.remaining < 0 {
            self.index += 1;
            let run = self.runs.get(self.index).copied().ok_or_else(|| {
                SldError::InvalidInput(
                    "Draw mask has fewer runs than the bounding box has tiles".to_owned(),
                )
            })?;
            self.draw = self.index % 2 == 1;
            self.remaining = i32::from(run) - 1;
        }
        Ok(self.draw)
    }
}

/// Accumulates the run list while the encoder classifies tiles.
///
/// Run lengths are stored in single bytes. A run longer than 255 is split
/// by a zero length run of the opposite kind so the parity convention
/// stays intact, and the finished list is padded to an even count.
pub(crate) struct RunMaskBuilder {
    runs: Vec<u8>,
    empty: bool,
    run: u8,
}

impl RunMaskBuilder {
    pub(crate) fn new() -> Self {
        Self {
            runs: Vec::new(),
            empty: true,
            run: 0,
        }
    }

    pub(crate) fn push(&mut self, is_empty: bool) {
        if is_empty == self.empty {
            if self.run < 255 {
                self.run += 1;
            } else {
                self.runs.push(self.run);
                self.runs.push(0);
                self.run = 1;
            }
        } else {
            self.runs.push(self.run);
            self.empty = !self.empty;
            self.run = 1;
        }
    }

    pub(crate) fn finish(mut self) -> Vec<u8> {
        if self.run > 0 {
            self.runs.push(self.run);
        }
        if self.runs.len() % 2 == 1 {
            self.runs.push(0);
        }
        self.runs
    }
}

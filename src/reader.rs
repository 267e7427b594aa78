use crate::{Result, SldError};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

fn to_sld(e: std::io::Error) -> SldError {
    e.into()
}

pub(crate) struct SldReader<T: Read> {
    input: T,
}

impl SldReader<Cursor<&[u8]>> {
    pub(crate) fn new(data: &[u8]) -> SldReader<Cursor<&[u8]>> {
        let input = Cursor::new(data);
        SldReader { input }
    }
}

impl<T: Read> SldReader<T> {
    pub(crate) fn with(input: T) -> Self {
        Self { input }
    }

    pub(crate) fn byte(&mut self) -> Result<u8> {
        self.input.read_u8().map_err(to_sld)
    }

    pub(crate) fn word(&mut self) -> Result<u16> {
        self.input.read_u16::<LittleEndian>().map_err(to_sld)
    }

    pub(crate) fn short(&mut self) -> Result<i16> {
        self.input.read_i16::<LittleEndian>().map_err(to_sld)
    }

    pub(crate) fn shorts(&mut self, buffer: &mut [i16]) -> Result<()> {
        self.input
            .read_i16_into::<LittleEndian>(buffer)
            .map_err(to_sld)
    }

    pub(crate) fn dword(&mut self) -> Result<u32> {
        self.input.read_u32::<LittleEndian>().map_err(to_sld)
    }

    pub(crate) fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.input.read_exact(buffer).map_err(to_sld)
    }

    /// Reads one length-framed chunk. The length field counts itself plus
    /// the payload; the stored payload is padded to a 4 byte boundary, so
    /// the number of bytes that actually follow is `((len - 1) / 4) * 4`.
    /// Callers work out the logical extent from the payload's own
    /// structure and ignore the padding.
    pub(crate) fn chunk(&mut self) -> Result<Vec<u8>> {
        let size = self.dword()?;
        if size == 0 {
            return Err(SldError::InvalidInput("Chunk with length 0".to_owned()));
        }
        let padded = ((size - 1) & !3) as usize;
        let mut data = vec![0_u8; padded];
        self.read_exact(&mut data)?;
        Ok(data)
    }
}

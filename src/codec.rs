//! Primitive bytecode encoding and decoding

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Longest varint a `u32` can produce
pub const MAX_VARINT_LEN: usize = 5;

/// Bytecode writing on top of any [`Write`] sink
pub trait WriteBytecodeExt: Write {
    /// Base-128 groups, most significant first; all but the last byte carry bit 7.
    fn write_varint(&mut self, value: u32) -> io::Result<()> {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let mut start = MAX_VARINT_LEN - 1;
        for n in 0..MAX_VARINT_LEN {
            let group = ((value >> (7 * n)) & 0x7F) as u8;
            let idx = MAX_VARINT_LEN - 1 - n;
            if group != 0 {
                start = idx;
            }
            buf[idx] = if n > 0 { group | 0x80 } else { group };
        }
        self.write_all(&buf[start..])
    }

    fn write_tag(&mut self, tag: u8) -> io::Result<()> {
        self.write_u8(tag)
    }

    /// Varint length followed by the raw bytes
    fn write_string(&mut self, bytes: &[u8]) -> io::Result<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "string longer than u32::MAX bytes")
        })?;
        self.write_varint(len)?;
        self.write_all(bytes)
    }

    fn write_float32(&mut self, value: f32) -> io::Result<()> {
        self.write_f32::<LittleEndian>(value)
    }
}

impl<W: Write + ?Sized> WriteBytecodeExt for W {}

/// Bytecode reading on top of any [`Read`] source
pub trait ReadBytecodeExt: Read {
    fn read_varint(&mut self) -> io::Result<u32> {
        let mut value: u64 = 0;
        for _ in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            value = (value << 7) | u64::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return u32::try_from(value).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "varint exceeds 32 bits")
                });
            }
        }
        Err(io::Error::new(io::ErrorKind::InvalidData, "varint longer than 5 bytes"))
    }

    fn read_tag(&mut self) -> io::Result<u8> {
        self.read_u8()
    }

    fn read_string(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_varint()?;
        let mut bytes = Vec::new();
        // the length is untrusted, so never preallocate it
        Read::take(&mut *self, u64::from(len)).read_to_end(&mut bytes)?;
        if bytes.len() != len as usize {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated string"));
        }
        Ok(bytes)
    }

    fn read_float32(&mut self) -> io::Result<f32> {
        self.read_f32::<LittleEndian>()
    }
}

impl<R: Read + ?Sized> ReadBytecodeExt for R {}

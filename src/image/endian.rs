//! Runtime-selectable endianness for image headers and tables.
//!
//! The format's byte order is a per-invocation CLI choice (`--endian
//! little|big|native`), not a compile-time constant, so header/table
//! integers go through `byteorder`'s explicit `<LittleEndian>`/`<BigEndian>`
//! calls behind a small runtime dispatch rather than a fixed-endian framing
//! crate. Attribute numeric payloads are always big-endian regardless of
//! this setting (§4.3) and are handled directly in `attributes.rs`.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// The image header/table byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Always little-endian.
    Little,
    /// Always big-endian.
    Big,
    /// Whatever the host is.
    Native,
}

impl Endian {
    /// Parse a CLI `--endian` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "little" => Some(Endian::Little),
            "big" => Some(Endian::Big),
            "native" => Some(Endian::Native),
            _ => None,
        }
    }

    /// Whether this resolves to little-endian on the current host.
    fn is_little(self) -> bool {
        match self {
            Endian::Little => true,
            Endian::Big => false,
            Endian::Native => cfg!(target_endian = "little"),
        }
    }

    /// Write a `u32` in this byte order.
    pub fn write_u32<W: Write>(self, w: &mut W, v: u32) -> io::Result<()> {
        if self.is_little() { w.write_u32::<LittleEndian>(v) } else { w.write_u32::<BigEndian>(v) }
    }

    /// Write a `u16` in this byte order.
    pub fn write_u16<W: Write>(self, w: &mut W, v: u16) -> io::Result<()> {
        if self.is_little() { w.write_u16::<LittleEndian>(v) } else { w.write_u16::<BigEndian>(v) }
    }

    /// Read a `u32` in this byte order.
    pub fn read_u32<R: Read>(self, r: &mut R) -> io::Result<u32> {
        if self.is_little() { r.read_u32::<LittleEndian>() } else { r.read_u32::<BigEndian>() }
    }

    /// Read a `u16` in this byte order.
    pub fn read_u16<R: Read>(self, r: &mut R) -> io::Result<u16> {
        if self.is_little() { r.read_u16::<LittleEndian>() } else { r.read_u16::<BigEndian>() }
    }

    /// Byte-swap a `u32` as if reinterpreted in the opposite order, used to
    /// detect a wrong-endian magic on read.
    pub fn swap_u32(v: u32) -> u32 {
        v.swap_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_and_big_round_trip() {
        for endian in [Endian::Little, Endian::Big, Endian::Native] {
            let mut buf = Vec::new();
            endian.write_u32(&mut buf, 0xCAFE_DADA).unwrap();
            let mut cursor = io::Cursor::new(buf);
            assert_eq!(endian.read_u32(&mut cursor).unwrap(), 0xCAFE_DADA);
        }
    }

    #[test]
    fn swap_detects_wrong_endian() {
        assert_eq!(Endian::swap_u32(0xCAFE_DADA), 0xDADA_FECA);
    }
}

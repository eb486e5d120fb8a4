//! RIFF chunk primitives
//!
//! Fixed-width FourCC tags and the little-endian chunk headers that frame a
//! RIFF/WAVE stream. Parsing here never consumes partial input: callers get
//! `None` back until the whole header is available.

use std::fmt;

/// Size of the top-level `RIFF....WAVE` header
pub const CHUNK_HEADER_LEN: usize = 12;

/// Size of a subchunk `id + size` header
pub const SUBCHUNK_HEADER_LEN: usize = 8;

pub const RIFF_TAG: FourCC = FourCC(*b"RIFF");
pub const WAVE_TAG: FourCC = FourCC(*b"WAVE");
pub const FMT_TAG: FourCC = FourCC(*b"fmt ");
pub const DATA_TAG: FourCC = FourCC(*b"data");

/// Four-byte chunk identifier.
///
/// Tags are compared byte for byte over all four bytes. They are not
/// null-terminated and may contain spaces (`"fmt "`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Returns true if this tag equals `tag`
    #[inline]
    pub fn matches(&self, tag: &[u8; 4]) -> bool {
        self.0 == *tag
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(value: &[u8; 4]) -> Self {
        FourCC(*value)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02X}", b)?;
            }
        }
        Ok(())
    }
}

/// Top-level chunk header (`RIFF`, size, `WAVE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkHeader {
    pub id: FourCC,
    pub size: u32,
    pub kind: FourCC,
}

impl ChunkHeader {
    /// Parse a header from the front of `buf`, or `None` if fewer than 12 bytes
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let raw = buf.get(..CHUNK_HEADER_LEN)?;
        Some(Self {
            id: read_tag(&raw[0..4]),
            size: read_le_u32(&raw[4..8]),
            kind: read_tag(&raw[8..12]),
        })
    }

    /// Whether this header opens a decodable RIFF/WAVE stream
    pub fn is_riff_wave(&self) -> bool {
        self.id == RIFF_TAG && self.kind == WAVE_TAG
    }
}

/// Subchunk header (`fmt `, `data`, or anything else)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubchunkHeader {
    pub id: FourCC,
    pub size: u32,
}

impl SubchunkHeader {
    /// Parse a header from the front of `buf`, or `None` if fewer than 8 bytes
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let raw = buf.get(..SUBCHUNK_HEADER_LEN)?;
        Some(Self {
            id: read_tag(&raw[0..4]),
            size: read_le_u32(&raw[4..8]),
        })
    }

    /// Body length including the RIFF pad byte for odd sizes
    pub fn padded_size(&self) -> u64 {
        u64::from(self.size) + u64::from(self.size & 1)
    }
}

fn read_tag(raw: &[u8]) -> FourCC {
    FourCC([raw[0], raw[1], raw[2], raw[3]])
}

pub(crate) fn read_le_u16(raw: &[u8]) -> u16 {
    u16::from_le_bytes([raw[0], raw[1]])
}

pub(crate) fn read_le_u32(raw: &[u8]) -> u32 {
    u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
}

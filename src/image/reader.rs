//! Image reader: the inverse of [`crate::image::writer::ImageWriter`].
//! Verifies magic/version/endian on open and resolves `name -> location` by
//! recomputing the same two-level hash the writer used.
//!
//! Backed by an mmap when opened from a file path (matching the grounding
//! crate's `Backend`/`MMapBackend` split for its own package reader), or by
//! an in-memory buffer for tests that build an image without touching disk.

use std::fmt;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::attributes;
use crate::error::{ImageReadError, LinkError, Result};
use crate::hash;
use crate::image::endian::Endian;
use crate::image::location::ImageLocation;
use crate::version::IMAGE_FORMAT_VERSION;

const MAGIC: u32 = 0xCAFE_DADA;
const HEADER_SIZE: usize = 4 + 2 + 2 + 4 + 4 + 4;

/// Backing storage for a reader: either an mmap or an owned buffer.
trait Backend: fmt::Debug + Send + Sync {
    fn bytes(&self) -> &[u8];
}

struct MmapBackend(Mmap);

impl fmt::Debug for MmapBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MmapBackend").field("len", &self.0.len()).finish()
    }
}

impl Backend for MmapBackend {
    fn bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug)]
struct OwnedBackend(Vec<u8>);

impl Backend for OwnedBackend {
    fn bytes(&self) -> &[u8] {
        &self.0
    }
}

/// An opened, header-validated image file.
pub struct ImageReader {
    backend: Box<dyn Backend>,
    endian: Endian,
    n: u32,
    major: u16,
    minor: u16,
    attributes_size: u32,
    strings_size: u32,
}

impl fmt::Debug for ImageReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageReader")
            .field("n", &self.n)
            .field("major", &self.major)
            .field("minor", &self.minor)
            .finish()
    }
}

impl ImageReader {
    /// Open and mmap an image file, assuming it was written with `endian`
    /// (typically the host's native order).
    #[allow(unsafe_code)]
    pub fn open(path: &Path, endian: Endian) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the file is not expected to be concurrently truncated by
        // another process for the lifetime of this mapping; the image tree
        // is a write-once artifact per the concurrency model.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_backend(Box::new(MmapBackend(mmap)), endian)
    }

    /// Wrap an in-memory image buffer, for tests and for small images
    /// materialized without a file.
    pub fn from_bytes(bytes: Vec<u8>, endian: Endian) -> Result<Self> {
        Self::from_backend(Box::new(OwnedBackend(bytes)), endian)
    }

    fn from_backend(backend: Box<dyn Backend>, endian: Endian) -> Result<Self> {
        let bytes = backend.bytes();
        if bytes.len() < HEADER_SIZE {
            return Err(ImageReadError::Malformed("file shorter than header".to_string()).into());
        }
        let mut cursor = std::io::Cursor::new(&bytes[..HEADER_SIZE]);
        let magic = endian.read_u32(&mut cursor)?;
        if magic != MAGIC {
            if Endian::swap_u32(magic) == MAGIC {
                return Err(ImageReadError::WrongEndian { expected: MAGIC, found: magic }.into());
            }
            return Err(ImageReadError::Malformed(format!("bad magic 0x{magic:08X}")).into());
        }
        let major = endian.read_u16(&mut cursor)?;
        let minor = endian.read_u16(&mut cursor)?;
        let (max_major, max_minor) = IMAGE_FORMAT_VERSION;
        if major > max_major || (major == max_major && minor > max_minor) {
            return Err(ImageReadError::WrongVersion {
                found_major: major,
                found_minor: minor,
                max_major,
                max_minor,
            }
            .into());
        }
        let n = endian.read_u32(&mut cursor)?;
        let attributes_size = endian.read_u32(&mut cursor)?;
        let strings_size = endian.read_u32(&mut cursor)?;

        let reader = ImageReader { backend, endian, n, major, minor, attributes_size, strings_size };
        reader.validate_length()?;
        Ok(reader)
    }

    fn validate_length(&self) -> Result<()> {
        if self.backend.bytes().len() < self.content_start() {
            return Err(ImageReadError::Malformed("file shorter than header+tables+blobs".to_string()).into());
        }
        Ok(())
    }

    fn redirect_start(&self) -> usize {
        HEADER_SIZE
    }

    fn offsets_start(&self) -> usize {
        self.redirect_start() + self.n as usize * 4
    }

    fn attributes_start(&self) -> usize {
        self.offsets_start() + self.n as usize * 4
    }

    fn strings_start(&self) -> usize {
        self.attributes_start() + self.attributes_size as usize
    }

    /// Offset of the content region, relative to the start of the file.
    pub fn content_start(&self) -> usize {
        self.strings_start() + self.strings_size as usize
    }

    /// Size of the redirect/offsets tables.
    pub fn table_size(&self) -> u32 {
        self.n
    }

    /// The image format version found in the header.
    pub fn format_version(&self) -> (u16, u16) {
        (self.major, self.minor)
    }

    /// The content bytes region, from `content_start()` to end of file.
    pub fn content(&self) -> &[u8] {
        &self.backend.bytes()[self.content_start()..]
    }

    fn read_redirect(&self, bucket: u32) -> Result<i32> {
        let start = self.redirect_start() + bucket as usize * 4;
        let mut cursor = std::io::Cursor::new(&self.backend.bytes()[start..start + 4]);
        Ok(self.endian.read_u32(&mut cursor)? as i32)
    }

    fn read_offset_slot(&self, slot: u32) -> Result<u32> {
        let start = self.offsets_start() + slot as usize * 4;
        let mut cursor = std::io::Cursor::new(&self.backend.bytes()[start..start + 4]);
        self.endian.read_u32(&mut cursor).map_err(LinkError::from)
    }

    fn decode_at(&self, attr_offset: u32) -> Result<ImageLocation> {
        let attr_blob = &self.backend.bytes()[self.attributes_start()..self.strings_start()];
        let strings_blob = &self.backend.bytes()[self.strings_start()..self.content_start()];
        let (location, _) = attributes::decode(attr_blob, attr_offset as usize, strings_blob)?;
        Ok(location)
    }

    /// Resolve `path` to its [`ImageLocation`], recomputing the writer's
    /// hash chain. Returns `None` if no such location exists, including the
    /// case where a hash collision lands on an unrelated entry (guarded by
    /// comparing the decoded path).
    pub fn find(&self, path: &str) -> Result<Option<ImageLocation>> {
        if self.n == 0 {
            return Ok(None);
        }
        let bucket = hash::perfect_hash(path) % self.n;
        let redirect = self.read_redirect(bucket)?;
        if redirect == 0 {
            return Ok(None);
        }
        let location = if redirect < 0 {
            let attr_offset = (-redirect - 1) as u32;
            self.decode_at(attr_offset)?
        } else {
            let slot = hash::salted_index(path, redirect as u32, self.n);
            let attr_offset = self.read_offset_slot(slot)?;
            self.decode_at(attr_offset)?
        };
        if location.full_path == path { Ok(Some(location)) } else { Ok(None) }
    }

    /// Every location in insertion order, decoded by walking the attribute
    /// blob sequentially rather than via the hash table. Used by the
    /// inspection binary and by tests asserting on total location count.
    pub fn entries(&self) -> Result<Vec<ImageLocation>> {
        let attr_blob = &self.backend.bytes()[self.attributes_start()..self.strings_start()];
        let strings_blob = &self.backend.bytes()[self.strings_start()..self.content_start()];
        let mut out = Vec::new();
        let mut pos = 0usize;
        while pos < attr_blob.len() {
            let (location, next) = attributes::decode(attr_blob, pos, strings_blob)?;
            out.push(location);
            pos = next;
        }
        Ok(out)
    }
}

//! Tagged variable-length attribute records for image locations.
//!
//! A record is a sequence of tagged fields; each tag byte packs a 5-bit
//! kind in the high bits and `length_bytes - 1` in the low 3 bits for
//! kinds carrying a numeric payload. Numeric payloads are big-endian,
//! packed to the minimum byte count that fits the value, independent of
//! the header/table endianness (attribute bytes live inside their own
//! tagged stream).

use crate::error::{LinkError, Result};
use crate::image::location::ImageLocation;
use crate::strings::StringPool;

const KIND_END: u8 = 0;
const KIND_MODULE_NAME_OFFSET: u8 = 1;
const KIND_PARENT_OFFSET: u8 = 2;
const KIND_BASE_OFFSET: u8 = 3;
const KIND_EXTENSION_OFFSET: u8 = 4;
const KIND_CONTENT_OFFSET: u8 = 5;
const KIND_COMPRESSED_SIZE: u8 = 6;
const KIND_UNCOMPRESSED_SIZE: u8 = 7;
const KIND_COMPRESSOR_ID: u8 = 8;

/// `(module, parent, base, extension)` parts of a full image path, as the
/// string pool interns them so many locations can share components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParts {
    /// Leading module qualifier, empty for bare/unqualified paths.
    pub module: String,
    /// Directory portion excluding the file name.
    pub parent: String,
    /// File name without its extension.
    pub base: String,
    /// Extension without the leading dot; empty if none.
    pub extension: String,
}

/// Split `full_path` into module/parent/base/extension. A leading `/`
/// followed by at least two segments is module-qualified
/// (`/<module>/<inner...>`); anything else (bare paths, and the
/// single-segment `/module-info.class`) has an empty module part.
pub fn split_path(full_path: &str) -> PathParts {
    let has_leading_slash = full_path.starts_with('/');
    let trimmed = full_path.strip_prefix('/').unwrap_or(full_path);
    let mut segments: Vec<&str> = trimmed.split('/').collect();

    let module = if has_leading_slash && segments.len() >= 2 {
        segments.remove(0).to_string()
    } else {
        String::new()
    };

    let filename = segments.pop().unwrap_or("");
    let parent = segments.join("/");

    let (base, extension) = match filename.rfind('.') {
        Some(idx) => (filename[..idx].to_string(), filename[idx + 1..].to_string()),
        None => (filename.to_string(), String::new()),
    };

    PathParts { module, parent, base, extension }
}

fn write_numeric(out: &mut Vec<u8>, kind: u8, value: u64) {
    if value == 0 {
        let tag = (kind << 3) | 0;
        out.push(tag);
        out.push(0);
        return;
    }
    let be = value.to_be_bytes();
    let first_nonzero = be.iter().position(|&b| b != 0).unwrap_or(7);
    let payload = &be[first_nonzero..];
    let len = payload.len();
    let tag = (kind << 3) | ((len - 1) as u8 & 0x7);
    out.push(tag);
    out.extend_from_slice(payload);
}

fn read_numeric(blob: &[u8], pos: &mut usize) -> Result<u64> {
    let tag = *blob.get(*pos).ok_or_else(|| LinkError::format("attribute stream truncated"))?;
    *pos += 1;
    let len = ((tag & 0x7) as usize) + 1;
    let bytes = blob
        .get(*pos..*pos + len)
        .ok_or_else(|| LinkError::format("attribute stream truncated"))?;
    *pos += len;
    let mut buf = [0u8; 8];
    buf[8 - len..].copy_from_slice(bytes);
    Ok(u64::from_be_bytes(buf))
}

fn kind_of(tag: u8) -> u8 {
    tag >> 3
}

/// Encode one location's attribute record, interning its path components
/// into `pool` as a side effect.
pub fn encode(location: &ImageLocation, pool: &mut StringPool) -> Vec<u8> {
    let parts = split_path(&location.full_path);
    let module_off = pool.intern(&parts.module);
    let parent_off = pool.intern(&parts.parent);
    let base_off = pool.intern(&parts.base);
    let ext_off = pool.intern(&parts.extension);

    let mut out = Vec::new();
    if module_off != 0 {
        write_numeric(&mut out, KIND_MODULE_NAME_OFFSET, module_off as u64);
    }
    if parent_off != 0 {
        write_numeric(&mut out, KIND_PARENT_OFFSET, parent_off as u64);
    }
    write_numeric(&mut out, KIND_BASE_OFFSET, base_off as u64);
    if ext_off != 0 {
        write_numeric(&mut out, KIND_EXTENSION_OFFSET, ext_off as u64);
    }
    write_numeric(&mut out, KIND_CONTENT_OFFSET, location.content_offset);
    write_numeric(&mut out, KIND_COMPRESSED_SIZE, location.compressed_size);
    write_numeric(&mut out, KIND_UNCOMPRESSED_SIZE, location.uncompressed_size);
    write_numeric(&mut out, KIND_COMPRESSOR_ID, location.compressor_id as u64);
    out.push(KIND_END << 3);
    out
}

/// Decode one attribute record starting at `start`, resolving interned
/// string offsets against `strings_blob`. Returns the decoded location's
/// full path and numeric fields, plus the offset just past the record's
/// `END` byte.
pub fn decode(blob: &[u8], start: usize, strings_blob: &[u8]) -> Result<(ImageLocation, usize)> {
    let mut pos = start;
    let mut module_off = 0u32;
    let mut parent_off = 0u32;
    let mut base_off = 0u32;
    let mut ext_off = 0u32;
    let mut content_offset = 0u64;
    let mut compressed_size = 0u64;
    let mut uncompressed_size = 0u64;
    let mut compressor_id = 0u8;

    loop {
        let tag = *blob.get(pos).ok_or_else(|| LinkError::format("attribute stream truncated"))?;
        let kind = kind_of(tag);
        if kind == KIND_END {
            pos += 1;
            break;
        }
        let value = read_numeric(blob, &mut pos)?;
        match kind {
            KIND_MODULE_NAME_OFFSET => module_off = value as u32,
            KIND_PARENT_OFFSET => parent_off = value as u32,
            KIND_BASE_OFFSET => base_off = value as u32,
            KIND_EXTENSION_OFFSET => ext_off = value as u32,
            KIND_CONTENT_OFFSET => content_offset = value,
            KIND_COMPRESSED_SIZE => compressed_size = value,
            KIND_UNCOMPRESSED_SIZE => uncompressed_size = value,
            KIND_COMPRESSOR_ID => compressor_id = value as u8,
            other => return Err(LinkError::format(format!("unknown attribute kind {other}"))),
        }
    }

    let module = crate::strings::read_at(strings_blob, module_off)?;
    let parent = crate::strings::read_at(strings_blob, parent_off)?;
    let base = crate::strings::read_at(strings_blob, base_off)?;
    let extension = crate::strings::read_at(strings_blob, ext_off)?;

    // `/<module>/<inner>` for class resources, bare for `META-INF/*`, and
    // `/`-prefixed bare for `module-info.class`. The only shape with both
    // an empty module and an empty parent is the single-segment
    // `module-info.class` case, which is the one that needs the leading
    // slash reinstated.
    let mut full_path = String::new();
    if !module.is_empty() {
        full_path.push('/');
        full_path.push_str(module);
        full_path.push('/');
    } else if parent.is_empty() {
        full_path.push('/');
    }
    if !parent.is_empty() {
        full_path.push_str(parent);
        full_path.push('/');
    }
    full_path.push_str(base);
    if !extension.is_empty() {
        full_path.push('.');
        full_path.push_str(extension);
    }

    let location = ImageLocation { full_path, content_offset, compressed_size, uncompressed_size, compressor_id };
    Ok((location, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_module_qualified_path() {
        let parts = split_path("/java.base/java/lang/Object.class");
        assert_eq!(parts.module, "java.base");
        assert_eq!(parts.parent, "java/lang");
        assert_eq!(parts.base, "Object");
        assert_eq!(parts.extension, "class");
    }

    #[test]
    fn splits_module_info_path() {
        let parts = split_path("/module-info.class");
        assert_eq!(parts.module, "");
        assert_eq!(parts.parent, "");
        assert_eq!(parts.base, "module-info");
        assert_eq!(parts.extension, "class");
    }

    #[test]
    fn splits_bare_meta_inf_path() {
        let parts = split_path("META-INF/services/java.sql.Driver");
        assert_eq!(parts.module, "");
        assert_eq!(parts.parent, "META-INF/services");
        assert_eq!(parts.base, "java.sql");
        assert_eq!(parts.extension, "Driver");
    }

    #[test]
    fn meta_inf_round_trips_without_leading_slash() {
        let mut pool = StringPool::new();
        let loc = ImageLocation {
            full_path: "META-INF/services/java.sql.Driver".to_string(),
            content_offset: 4,
            compressed_size: 0,
            uncompressed_size: 10,
            compressor_id: 0,
        };
        let record = encode(&loc, &mut pool);
        let (decoded, _) = decode(&record, 0, pool.as_bytes()).unwrap();
        assert_eq!(decoded.full_path, loc.full_path);
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut pool = StringPool::new();
        let loc = ImageLocation {
            full_path: "/java.base/java/lang/Object.class".to_string(),
            content_offset: 128,
            compressed_size: 0,
            uncompressed_size: 512,
            compressor_id: 0,
        };
        let record = encode(&loc, &mut pool);
        let (decoded, next) = decode(&record, 0, pool.as_bytes()).unwrap();
        assert_eq!(next, record.len());
        assert_eq!(decoded.full_path, loc.full_path);
        assert_eq!(decoded.content_offset, loc.content_offset);
        assert_eq!(decoded.uncompressed_size, loc.uncompressed_size);
    }
}

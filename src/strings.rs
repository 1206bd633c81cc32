//! Deduplicated string pool: `string -> offset` over a single contiguous,
//! NUL-terminated byte buffer, offset 0 reserved for the empty string.

use indexmap::IndexMap;

/// A string pool under construction by the writer.
#[derive(Debug, Default)]
pub struct StringPool {
    offsets: IndexMap<String, u32>,
    buf: Vec<u8>,
}

impl StringPool {
    /// A fresh pool with the empty string pre-interned at offset 0.
    pub fn new() -> Self {
        let mut pool = StringPool { offsets: IndexMap::new(), buf: Vec::new() };
        pool.offsets.insert(String::new(), 0);
        pool.buf.push(0);
        pool
    }

    /// Intern `s`, returning its offset. Repeated calls with the same
    /// string return the same offset without growing the buffer.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&offset) = self.offsets.get(s) {
            return offset;
        }
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self.offsets.insert(s.to_string(), offset);
        offset
    }

    /// The buffer emitted verbatim by the writer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Total size of the emitted buffer.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether only the reserved empty string has been interned.
    pub fn is_empty(&self) -> bool {
        self.buf.len() <= 1
    }

    /// Insertion-order iteration over interned strings and their offsets,
    /// for test reproducibility (§4.1: "no ordering guarantee on interned
    /// strings; deterministic iteration is provided by the insertion-order
    /// list").
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.offsets.iter().map(|(s, &o)| (s.as_str(), o))
    }
}

/// Read a NUL-terminated string out of an already-materialized string
/// blob, starting at `offset`.
pub fn read_at(blob: &[u8], offset: u32) -> crate::error::Result<&str> {
    let start = offset as usize;
    let end = blob[start..]
        .iter()
        .position(|&b| b == 0)
        .map(|p| start + p)
        .ok_or_else(|| crate::error::LinkError::format("string blob missing NUL terminator"))?;
    std::str::from_utf8(&blob[start..end])
        .map_err(|e| crate::error::LinkError::format(format!("string blob not UTF-8: {e}")))
}

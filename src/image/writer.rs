//! Image writer: header + redirect table + offset table + attribute blob +
//! string blob, followed by content bytes (§4.3, §6).

use std::collections::HashMap;
use std::io::Write;

use crate::attributes;
use crate::error::{LinkError, Result};
use crate::hash;
use crate::image::endian::Endian;
use crate::image::location::ImageLocation;
use crate::strings::StringPool;
use crate::version::IMAGE_FORMAT_VERSION;

const MAGIC: u32 = 0xCAFE_DADA;
const MAX_SALT_ATTEMPTS: u32 = 1_000_000;

struct PendingEntry {
    path: String,
    attr_offset: u32,
    initial_hash: u32,
}

/// Accumulates locations and emits the on-disk header/tables/blobs for one
/// loader partition's image file. Content bytes are written separately by
/// the caller, in the same order `add_location` was called, so that large
/// entries can stream straight from a reader to the output file without
/// passing through this writer (see the stream-materialization design
/// note).
#[derive(Debug)]
pub struct ImageWriter {
    pool: StringPool,
    attr_blob: Vec<u8>,
    entries: Vec<PendingEntry>,
}

impl Default for ImageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter {
    /// A fresh writer with no locations added yet.
    pub fn new() -> Self {
        ImageWriter { pool: StringPool::new(), attr_blob: Vec::new(), entries: Vec::new() }
    }

    /// Record one location. Path components are interned into the string
    /// pool and an attribute record is appended immediately; the two-level
    /// hash table is only built once every location has been added.
    pub fn add_location(
        &mut self,
        full_path: &str,
        content_offset: u64,
        compressed_size: u64,
        uncompressed_size: u64,
        compressor_id: u8,
    ) {
        let loc = ImageLocation {
            full_path: full_path.to_string(),
            content_offset,
            compressed_size,
            uncompressed_size,
            compressor_id,
        };
        let attr_offset = self.attr_blob.len() as u32;
        let record = attributes::encode(&loc, &mut self.pool);
        self.attr_blob.extend_from_slice(&record);
        let initial_hash = hash::perfect_hash(full_path);
        self.entries.push(PendingEntry { path: full_path.to_string(), attr_offset, initial_hash });
    }

    /// Number of locations added so far.
    pub fn location_count(&self) -> usize {
        self.entries.len()
    }

    /// Build the two-level perfect-hash table and write header, tables,
    /// attribute blob, and string blob to `out`. The caller must append
    /// content bytes immediately after, in insertion order.
    pub fn write_header_and_tables<W: Write>(&self, out: &mut W, endian: Endian) -> Result<()> {
        let (redirect, offsets, n) = self.build_tables()?;

        endian.write_u32(out, MAGIC)?;
        endian.write_u16(out, IMAGE_FORMAT_VERSION.0)?;
        endian.write_u16(out, IMAGE_FORMAT_VERSION.1)?;
        endian.write_u32(out, n)?;
        endian.write_u32(out, self.attr_blob.len() as u32)?;
        endian.write_u32(out, self.pool.len() as u32)?;
        for &slot in &redirect {
            endian.write_u32(out, slot as u32)?;
        }
        for &slot in &offsets {
            endian.write_u32(out, slot)?;
        }
        out.write_all(&self.attr_blob)?;
        out.write_all(self.pool.as_bytes())?;
        Ok(())
    }

    fn build_tables(&self) -> Result<(Vec<i32>, Vec<u32>, u32)> {
        let count = self.entries.len() as u32;
        let n = hash::next_power_of_two(count.saturating_mul(4) / 3).max(1);

        let mut buckets: HashMap<u32, Vec<usize>> = HashMap::new();
        for (idx, entry) in self.entries.iter().enumerate() {
            buckets.entry(entry.initial_hash % n).or_default().push(idx);
        }

        let mut redirect = vec![0i32; n as usize];
        let mut offsets = vec![0u32; n as usize];
        let mut occupied = vec![false; n as usize];

        // Largest buckets first: they're the hardest to place, so giving
        // them first pick of free slots minimizes retries overall.
        let mut ordered_buckets: Vec<(u32, Vec<usize>)> = buckets.into_iter().collect();
        ordered_buckets.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

        for (bucket, indices) in ordered_buckets {
            if indices.len() == 1 {
                let entry = &self.entries[indices[0]];
                redirect[bucket as usize] = -((entry.attr_offset as i32) + 1);
                continue;
            }

            let mut found = None;
            for salt in 1..=MAX_SALT_ATTEMPTS {
                let slots: Vec<usize> =
                    indices.iter().map(|&i| hash::salted_index(&self.entries[i].path, salt, n) as usize).collect();

                let mut local_seen = std::collections::HashSet::new();
                let all_free = slots.iter().all(|s| !occupied[*s] && local_seen.insert(*s));
                if all_free {
                    found = Some((salt, slots));
                    break;
                }
            }

            let (salt, slots) = found.ok_or(LinkError::HashCollisionExhausted(self.entries.len()))?;
            redirect[bucket as usize] = salt as i32;
            for (&slot, &idx) in slots.iter().zip(indices.iter()) {
                occupied[slot] = true;
                offsets[slot] = self.entries[idx].attr_offset;
            }
        }

        Ok((redirect, offsets, n))
    }
}

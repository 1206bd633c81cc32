//! `zip` / `default-compress` compressor plugin (§4.8): deflate-compresses
//! entry bytes via `flate2`, matching the grounding crate's own use of
//! `flate2` for its gzip slot operation. Skips entries where the
//! compressed form would not be smaller.

use std::collections::HashMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{LinkError, Result};
use crate::pipeline::stage::{Category, NoopStage, Plugin, Stage};
use crate::pool::ResourcePool;

/// `compressor_id` written into an [`crate::image::ImageLocation`] for
/// deflate-compressed content.
pub const COMPRESSOR_ID_DEFLATE: u8 = 1;

fn deflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish().map_err(LinkError::from)
}

struct CompressStage;

impl Stage for CompressStage {
    fn apply(&self, input: &ResourcePool) -> Result<ResourcePool> {
        let mut out = ResourcePool::new();
        for entry in input.iter() {
            let mut compressed = entry.clone();
            let packed = deflate(&entry.bytes)?;
            if packed.len() < entry.bytes.len() {
                compressed.bytes = packed;
            }
            out.add(compressed)?;
        }
        Ok(out)
    }
}

/// `zip` / `default-compress`.
pub struct DefaultCompressPlugin;

impl Plugin for DefaultCompressPlugin {
    fn name(&self) -> &'static str {
        "default-compress"
    }
    fn aliases(&self) -> &'static [&'static str] {
        &["zip"]
    }
    fn category(&self) -> Category {
        Category::Compressor
    }
    fn configure(&self, enabled: bool, _options: &HashMap<String, String>) -> Result<Box<dyn Stage>> {
        if !enabled {
            return Ok(Box::new(NoopStage));
        }
        Ok(Box::new(CompressStage))
    }
}

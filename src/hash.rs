//! Stable hashing for the image writer/reader's perfect-hash redirect
//! table. Self-contained rather than pulled from a third-party hashing
//! crate, since the two-level scheme (first-level bucket hash, then a
//! per-bucket salt reapplied through [`perturb`]) is bespoke to this image
//! format and needs to be bit-for-bit identical between writer and reader.

/// FNV-1a mixed with a seed, used both as the unsalted first-level hash
/// (`seed == 0`) and as the salted second-level probe (`seed == salt`).
pub fn perturb(path: &str, seed: u32) -> u32 {
    let mut hash: u32 = 0x811c_9dc5 ^ seed;
    for &b in path.as_bytes() {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// First-level bucket index for `path` in a table of `length` slots.
pub fn first_level_index(path: &str, length: u32) -> u32 {
    perturb(path, 0) % length
}

/// The unsalted hash used to bucket an entry before salt assignment,
/// seeded with the path's own byte length (`perfect_hash(path, length)`).
pub fn perfect_hash(path: &str) -> u32 {
    perturb(path, path.len() as u32)
}

/// Second-level slot index for `path` under `salt` in a table of `length`
/// slots.
pub fn salted_index(path: &str, salt: u32, length: u32) -> u32 {
    perturb(path, salt) % length
}

/// Smallest power of two at least `min`.
pub fn next_power_of_two(min: u32) -> u32 {
    min.max(1).next_power_of_two()
}

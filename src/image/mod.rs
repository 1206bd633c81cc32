//! Binary image container: header, perfect-hash redirect table, attribute
//! blob, string blob, and content region (§4.3, §4.4, §6).

pub mod endian;
pub mod location;
pub mod reader;
pub mod writer;

pub use endian::Endian;
pub use location::ImageLocation;
pub use reader::ImageReader;
pub use writer::ImageWriter;

//! modlink — a modular runtime image linker.
//!
//! Resolves a module dependency closure from a set of root module names and
//! packs the selected modules' resources into a memory-mappable image file,
//! with an optional staged plugin pipeline rewriting the resource stream
//! before it reaches the writer.

#![deny(unsafe_code)]
#![warn(
    missing_debug_implementations,
    unreachable_pub,
    future_incompatible,
    rust_2018_idioms,
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,
    clippy::large_enum_variant,
    clippy::too_many_arguments,
    clippy::wildcard_imports,
    clippy::enum_glob_use
)]

pub mod attributes;
pub mod builder;
pub mod cli;
pub mod default_collaborators;
pub mod error;
pub mod exit_codes;
pub mod finder;
pub mod hash;
pub mod image;
pub mod layout;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod resolver;
pub mod strings;
pub mod version;

pub use builder::{BuildReport, ImageBuilder, Loader, LoaderTable};
pub use error::{LinkError, Result};
pub use image::{Endian, ImageLocation, ImageReader, ImageWriter};
pub use model::{ModuleArtifact, ModuleDescriptor, ResourceEntry, ResourceKind};
pub use pool::ResourcePool;
pub use resolver::{resolve, ResolvedGraph};

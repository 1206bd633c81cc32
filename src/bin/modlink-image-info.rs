//! `modlink-image-info`: inspect a `.jimage` file's header and locations.

use std::process::ExitCode;

use clap::Parser;

use modlink::cli::ImageInfoArgs;
use modlink::error::{Diagnostic, LinkError};
use modlink::exit_codes::{EXIT_IO_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use modlink::image::ImageReader;

fn run() -> std::result::Result<(), (i32, LinkError)> {
    let args = ImageInfoArgs::parse();
    modlink::logging::init(0);

    let endian = args.resolved_endian().map_err(|e| (EXIT_USAGE, e))?;
    let reader = ImageReader::open(&args.image, endian).map_err(|e| (EXIT_IO_ERROR, e))?;

    let (major, minor) = reader.format_version();
    println!("image: {}", args.image.display());
    println!("format version: {major}.{minor}");
    println!("table size: {}", reader.table_size());
    println!("content start: {}", reader.content_start());

    if args.list {
        let entries = reader.entries().map_err(|e| (EXIT_IO_ERROR, e))?;
        println!("locations: {}", entries.len());
        for location in &entries {
            println!(
                "  {} offset={} csize={} usize={} compressor={}",
                location.full_path,
                location.content_offset,
                location.compressed_size,
                location.uncompressed_size,
                location.compressor_id
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(EXIT_SUCCESS as u8),
        Err((code, err)) => {
            eprintln!("{}", Diagnostic(&err));
            ExitCode::from(code as u8)
        }
    }
}

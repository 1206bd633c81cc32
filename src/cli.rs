//! `clap`-derived argument parsing for both binaries (SPEC_FULL §6).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::{LinkError, Result};
use crate::image::Endian;
use crate::pipeline::config;

/// `modlink`: assemble a runtime image from a set of modules.
#[derive(Debug, Parser)]
#[command(name = "modlink", version = crate::version::VERSION)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve and pack a runtime image.
    Link(LinkArgs),
}

/// Arguments for `modlink link`.
#[derive(Debug, Parser, Default)]
pub struct LinkArgs {
    /// Comma-separated list of module-path directories, searched in order.
    #[arg(long = "module-path", value_delimiter = ',')]
    pub module_path: Vec<PathBuf>,

    /// Comma-separated root module names.
    #[arg(long = "add-modules", value_delimiter = ',')]
    pub add_modules: Vec<String>,

    /// Output directory for the built image tree.
    #[arg(long = "output")]
    pub output: Option<PathBuf>,

    /// Flat `key=value` plugin pipeline configuration file (§6).
    #[arg(long = "plugins-configuration")]
    pub plugins_configuration: Option<PathBuf>,

    /// Header/table byte order: `little`, `big`, or `native` (default).
    #[arg(long = "endian")]
    pub endian: Option<String>,

    /// Shorthand for enabling the default compressor stage.
    #[arg(long = "compress")]
    pub compress: bool,

    /// Flat `key=value` file carrying any of the flags above; CLI flags
    /// always win over a value loaded from this file (SPEC_FULL §9).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Print a selected module's descriptor as JSON and exit without
    /// building an image (SPEC_FULL §3).
    #[arg(long = "describe-module")]
    pub describe_module: Option<String>,

    /// Increase logging verbosity; repeatable.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease logging verbosity; repeatable.
    #[arg(short = 'q', long = "quiet", action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl LinkArgs {
    /// Net verbosity delta passed to [`crate::logging::init`].
    pub fn verbosity(&self) -> i32 {
        self.verbose as i32 - self.quiet as i32
    }

    /// Parse `--endian`, defaulting to [`Endian::Native`].
    pub fn resolved_endian(&self) -> Result<Endian> {
        match &self.endian {
            None => Ok(Endian::Native),
            Some(raw) => Endian::parse(raw)
                .ok_or_else(|| LinkError::format(format!("invalid --endian value '{raw}'"))),
        }
    }

    /// Fill in any field left unset on the command line from `--config`'s
    /// flat key-value file, which CLI flags always override.
    pub fn apply_config_file(&mut self, text: &str) -> Result<()> {
        let parsed = config::parse(text)?;

        if self.module_path.is_empty() {
            if let Some(raw) = parsed.global.get("module-path") {
                self.module_path = raw.split(',').map(PathBuf::from).collect();
            }
        }
        if self.add_modules.is_empty() {
            if let Some(raw) = parsed.global.get("add-modules") {
                self.add_modules = raw.split(',').map(str::to_string).collect();
            }
        }
        if self.output.is_none() {
            self.output = parsed.global.get("output").map(PathBuf::from);
        }
        if self.plugins_configuration.is_none() {
            self.plugins_configuration = parsed.global.get("plugins-configuration").map(PathBuf::from);
        }
        if self.endian.is_none() {
            self.endian = parsed.global.get("endian").cloned();
        }
        if !self.compress {
            self.compress = parsed.global.get("compress").map(|v| v.eq_ignore_ascii_case("on")).unwrap_or(false);
        }
        Ok(())
    }

    /// Validate the flags needed to run `link` (as opposed to
    /// `--describe-module`, which only needs `module_path`).
    pub fn require_link_fields(&self) -> Result<()> {
        if self.module_path.is_empty() {
            return Err(LinkError::format("--module-path is required"));
        }
        if self.describe_module.is_none() {
            if self.add_modules.is_empty() {
                return Err(LinkError::format("--add-modules is required"));
            }
            if self.output.is_none() {
                return Err(LinkError::format("--output is required"));
            }
        }
        Ok(())
    }
}

/// Arguments for the `modlink-image-info` inspection binary.
#[derive(Debug, Parser)]
#[command(name = "modlink-image-info", version = crate::version::VERSION)]
pub struct ImageInfoArgs {
    /// Path to a `.jimage` file.
    pub image: PathBuf,

    /// Byte order the image was written with.
    #[arg(long = "endian", default_value = "native")]
    pub endian: String,

    /// List every location instead of just the header summary.
    #[arg(long = "list")]
    pub list: bool,
}

impl ImageInfoArgs {
    /// Parse `--endian`.
    pub fn resolved_endian(&self) -> Result<Endian> {
        Endian::parse(&self.endian).ok_or_else(|| LinkError::format(format!("invalid --endian value '{}'", self.endian)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_fills_unset_fields_without_overriding_flags() {
        let mut args = LinkArgs { compress: true, ..Default::default() };
        args.apply_config_file("module-path=/mp\noutput=/out\nendian=little\ncompress=on\n").unwrap();

        assert_eq!(args.module_path, vec![PathBuf::from("/mp")]);
        assert_eq!(args.output, Some(PathBuf::from("/out")));
        assert_eq!(args.endian.as_deref(), Some("little"));
        assert!(args.compress);
    }

    #[test]
    fn explicit_flags_are_not_overridden_by_config_file() {
        let mut args = LinkArgs { output: Some(PathBuf::from("/explicit")), ..Default::default() };
        args.apply_config_file("output=/from-config\n").unwrap();
        assert_eq!(args.output, Some(PathBuf::from("/explicit")));
    }

    #[test]
    fn require_link_fields_rejects_missing_module_path() {
        let args = LinkArgs::default();
        let err = args.require_link_fields().unwrap_err();
        assert!(matches!(err, LinkError::Format { .. }));
    }
}

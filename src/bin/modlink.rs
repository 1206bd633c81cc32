//! `modlink link`: resolve a module closure and pack it into a runtime image
//! (SPEC_FULL §6, §9).

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use modlink::builder::{ImageBuilder, LoaderTable};
use modlink::cli::{Cli, Command, LinkArgs};
use modlink::default_collaborators::{DirectoryArtifactOpener, JsonDescriptorParser};
use modlink::error::{Diagnostic, LinkError, Result};
use modlink::exit_codes::{self, EXIT_IO_ERROR, EXIT_PLUGIN_ERROR, EXIT_RESOLVE_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use modlink::finder::{ArtifactOpener, DirectoryFinder, ModuleFinder};
use modlink::pipeline::plugins::compact_cp::ConstantPoolCompactor;
use modlink::pipeline::plugins::strip_debug::ClassfileEditor;
use modlink::pipeline::stage::Category;
use modlink::pipeline::{config, default_registry, Pipeline};

/// Stand-in for the real class-file rewriter (§1's external collaborator):
/// leaves bytes untouched so `strip-java-debug` is a legal no-op stage
/// rather than an unimplemented one.
struct PassthroughEditor;

impl ClassfileEditor for PassthroughEditor {
    fn strip_attributes(&self, class_bytes: &[u8], _names: &[&str]) -> Result<Vec<u8>> {
        Ok(class_bytes.to_vec())
    }
}

/// Stand-in for the real constant-pool compactor: same passthrough
/// rationale as [`PassthroughEditor`].
struct PassthroughCompactor;

impl ConstantPoolCompactor for PassthroughCompactor {
    fn compact(&self, classes: &[(String, Vec<u8>)]) -> Result<(Vec<Vec<u8>>, Vec<u8>)> {
        Ok((classes.iter().map(|(_, bytes)| bytes.clone()).collect(), Vec::new()))
    }
}

fn load_pipeline_config(args: &LinkArgs) -> Result<config::PipelineConfig> {
    let mut pipeline_config = match &args.plugins_configuration {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            config::parse(&text)?
        }
        None => config::PipelineConfig::default(),
    };

    if args.compress {
        pipeline_config.stages.push(config::StageSpec {
            category: Category::Compressor,
            order: pipeline_config.stages_in(Category::Compressor).len() as u32,
            plugin_name: "default-compress".to_string(),
        });
        pipeline_config
            .plugin_options
            .entry("default-compress".to_string())
            .or_default()
            .insert("argument".to_string(), "on".to_string());
    }

    Ok(pipeline_config)
}

fn run() -> std::result::Result<(), (i32, LinkError)> {
    let cli = Cli::parse();
    let Command::Link(mut args) = cli.command;

    if let Some(config_path) = args.config.clone() {
        let text = std::fs::read_to_string(&config_path).map_err(|e| (EXIT_IO_ERROR, LinkError::from(e)))?;
        args.apply_config_file(&text).map_err(|e| (EXIT_USAGE, e))?;
    }
    args.require_link_fields().map_err(|e| (EXIT_USAGE, e))?;

    modlink::logging::init(args.verbosity());

    let opener: Arc<dyn ArtifactOpener> = Arc::new(DirectoryArtifactOpener);
    let parser = Arc::new(JsonDescriptorParser);
    let finder = DirectoryFinder::new(args.module_path.clone(), opener.clone(), parser);

    if let Some(module_name) = &args.describe_module {
        let artifact = finder
            .find(module_name)
            .map_err(|e| (EXIT_RESOLVE_ERROR, e))?
            .ok_or_else(|| {
                (EXIT_RESOLVE_ERROR, LinkError::ModuleNotFound { module: module_name.clone(), required_by: "--describe-module".to_string() })
            })?;
        let rendered = serde_json::to_string_pretty(&artifact.descriptor.to_debug_json())
            .map_err(|e| (EXIT_IO_ERROR, LinkError::format(e.to_string())))?;
        println!("{rendered}");
        return Ok(());
    }

    let endian = args.resolved_endian().map_err(|e| (EXIT_USAGE, e))?;
    let pipeline_config = load_pipeline_config(&args).map_err(|e| (EXIT_PLUGIN_ERROR, e))?;

    let registry = default_registry(Arc::new(PassthroughEditor), Arc::new(PassthroughCompactor));
    let pipeline = Pipeline::build(&registry, &pipeline_config).map_err(|e| (EXIT_PLUGIN_ERROR, e))?;

    let output = args.output.clone().expect("require_link_fields checked this");
    let builder = ImageBuilder::new(Box::new(finder), opener, pipeline, LoaderTable::new(), endian, cfg!(windows));
    let report = builder.build(&args.add_modules, &output).map_err(|e| (exit_codes::for_error(&e), e))?;

    log::info!("linked {} module(s) into {}", report.modules.len(), output.display());
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

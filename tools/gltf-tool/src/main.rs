//! gltf-tool - glTF 2.0 inspection and conversion
//!
//! Reads `.gltf` / `.glb` files through the codec and reports on or rewrites
//! them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use gltf_codec::{Document, DocumentReader, DocumentWriter, SceneBuilder, SceneFlattener};
use gltf_plugin::{
    ImportSettings, InMemoryExporters, InMemoryImporters, InMemorySettings, InMemoryTypeRegistry,
    editor_init, register_gltf_types,
};

mod report;

#[derive(Parser)]
#[command(name = "gltf-tool")]
#[command(about = "glTF 2.0 inspection and conversion tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of a glTF/GLB file
    Inspect {
        /// Input glTF/GLB file
        input: PathBuf,
    },

    /// Read and validate a glTF/GLB file, decoding every accessor
    Validate {
        /// Input glTF/GLB files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Convert between .gltf and .glb
    Convert {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output file; the extension picks the container (default: input as .glb)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rebuild through the scene tree, repacking all buffers
        #[arg(long)]
        rebuild: bool,
    },

    /// Print the node hierarchy
    Tree {
        /// Input glTF/GLB file
        input: PathBuf,
    },

    /// List the scene importers that would be registered
    Importers {
        /// TOML file with a [blend] section
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { input } => {
            let document = read(&input)?;
            report::summary(&input, &document);
        }

        Commands::Validate { inputs } => {
            let mut failed = 0;
            for input in &inputs {
                match read(input).and_then(|document| validate(&document)) {
                    Ok(()) => tracing::info!("{:?}: OK", input),
                    Err(e) => {
                        tracing::error!("{:?}: {:#}", input, e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} file(s) failed validation", failed, inputs.len());
            }
        }

        Commands::Convert {
            input,
            output,
            rebuild,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("glb"));
            anyhow::ensure!(output != input, "Output {:?} would overwrite the input", output);
            tracing::info!("Converting {:?} -> {:?}", input, output);

            let mut document = read(&input)?;
            if rebuild {
                let tree = SceneBuilder::new()
                    .build(&document)
                    .context("Failed to build scene tree")?;
                document = SceneFlattener::new()
                    .flatten(&tree)
                    .context("Failed to flatten scene tree")?;
            }
            DocumentWriter::new()
                .write_path(&document, &output)
                .with_context(|| format!("Failed to write {:?}", output))?;
            tracing::info!("Done!");
        }

        Commands::Tree { input } => {
            let document = read(&input)?;
            let tree = SceneBuilder::new()
                .build(&document)
                .context("Failed to build scene tree")?;
            report::hierarchy(&tree);
        }

        Commands::Importers { config } => {
            let import_settings = match &config {
                Some(path) => ImportSettings::load(path)
                    .with_context(|| format!("Failed to load settings: {:?}", path))?,
                None => ImportSettings::default(),
            };

            let mut types = InMemoryTypeRegistry::new();
            let mut settings = InMemorySettings::new();
            register_gltf_types(&mut types, &mut settings, true);
            import_settings.apply_to(&mut settings)?;

            let mut importers = InMemoryImporters::new();
            let mut exporters = InMemoryExporters::new();
            let status = editor_init(&settings, &mut importers, &mut exporters)?;

            tracing::info!("{} types registered", types.len());
            tracing::info!("Importers: {}", importers.names().join(", "));
            tracing::info!("Exporters: {}", exporters.names().join(", "));
            tracing::info!("Blend import: {:?}", status);
        }
    }

    Ok(())
}

fn read(input: &Path) -> Result<Document> {
    DocumentReader::new()
        .read_path(input)
        .with_context(|| format!("Failed to load glTF: {:?}", input))
}

/// Decode every accessor so range errors surface
fn validate(document: &Document) -> Result<()> {
    for index in 0..document.accessors.len() {
        document
            .read_f32(index)
            .with_context(|| format!("Accessor {} failed to decode", index))?;
    }
    SceneBuilder::new()
        .build(document)
        .context("Failed to build scene tree")?;
    Ok(())
}

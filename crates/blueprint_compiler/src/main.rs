//! # blueprint_compiler
//!
//! Compiles a JSON entity description into a binary blueprint asset that an
//! `EntityFactory` can load by name.
//!
//! ```text
//! blueprint_compiler prefabs/tree.json                 # writes prefabs/tree.bin
//! blueprint_compiler tree.json -o out/tree.bin -i BLPT
//! ```

mod compiler;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use engine_blueprint::FileIdentifier;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "blueprint_compiler",
    about = "Compile JSON entity descriptions into binary blueprints"
)]
struct Args {
    /// JSON entity description to compile
    input: PathBuf,

    /// Output path (defaults to the input path with a `.bin` extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 4-character file identifier written at the start of the output
    #[arg(short, long, default_value = "BLPT", value_parser = compiler::parse_identifier)]
    identifier: FileIdentifier,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("blueprint_compiler=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let (buffer, stats) = compiler::compile_json(&text, args.identifier)
        .with_context(|| format!("failed to compile {}", args.input.display()))?;

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("bin"));
    std::fs::write(&output, &buffer)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(
        output = %output.display(),
        identifier = %args.identifier,
        entities = stats.entities,
        components = stats.components,
        bytes = buffer.len(),
        "blueprint compiled"
    );
    Ok(())
}

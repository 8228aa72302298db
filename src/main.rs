//! axml CLI - compile XML to Android binary XML and inspect the result.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use axml::chunk::ChunkIter;
use axml::prelude::*;

/// axml - Android binary XML compiler
#[derive(Parser)]
#[command(name = "axml")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile an XML file to binary XML
    Compile {
        /// Input XML file
        #[arg(short, long, env = "AXML_INPUT")]
        input: PathBuf,

        /// Output binary XML file
        #[arg(short, long, env = "AXML_OUTPUT")]
        output: PathBuf,

        /// Extra `name = id` resource ids, overriding the framework defaults
        #[arg(short, long, env = "AXML_RESOURCE_IDS")]
        resource_ids: Option<PathBuf>,
    },

    /// List the chunks of a binary XML file
    Inspect {
        /// Input binary XML file
        #[arg(short, long, env = "AXML_INPUT")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile {
            input,
            output,
            resource_ids,
        } => {
            cmd_compile(&input, &output, resource_ids.as_deref())?;
        }
        Commands::Inspect { input } => {
            cmd_inspect(&input)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_compile(input: &Path, output: &Path, resource_ids: Option<&Path>) -> Result<()> {
    println!("Compiling: {} -> {}", input.display(), output.display());

    let mut ids = ResourceIds::android();
    if let Some(path) = resource_ids {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read resource id map {}", path.display()))?;
        let extra = ResourceIds::parse(&text).context("Failed to parse resource id map")?;
        debug!(entries = extra.len(), "loaded resource id map");
        ids.extend(extra);
    }

    let start = Instant::now();
    let xml = fs::read(input).context("Failed to read input file")?;
    let mut doc = Document::from_xml_bytes(&xml, &ids).context("Failed to parse XML")?;
    let bytes = doc.encode().context("Failed to encode binary XML")?;
    fs::write(output, &bytes).context("Failed to write output file")?;

    println!("Wrote {} bytes in {:?}", bytes.len(), start.elapsed());

    Ok(())
}

fn cmd_inspect(input: &Path) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;
    let chunks = ChunkIter::new(&data).context("Not a binary XML document")?;

    println!("Document: {} bytes", chunks.document_size());
    println!("{:>10} {:<16} {:>6} {:>10}", "offset", "type", "header", "size");

    let mut count = 0;
    for chunk in chunks {
        let chunk = chunk.context("Failed to read chunk")?;
        let kind = match chunk.kind() {
            Some(kind) => format!("{kind:?}"),
            None => format!("0x{:04x}", chunk.raw_type),
        };
        println!(
            "{:>#10x} {:<16} {:>6} {:>10}",
            chunk.offset, kind, chunk.header_size, chunk.size
        );
        count += 1;
    }

    println!("\nTotal: {} chunks", count);

    Ok(())
}

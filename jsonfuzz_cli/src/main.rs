use jsonfuzz_core::config::JsonFuzzConfig;
use jsonfuzz_core::document::{self, OutputFormat, Value};
use jsonfuzz_core::fuzzer::BatchKind;
use jsonfuzz_core::path_finder::{leaf_count, map_structure};

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// JSON document to permute, `-` for stdin. Defaults to a built-in sample.
    #[clap(short, long, value_parser)]
    input: Option<PathBuf>,
    /// Value injected at every leaf. Parsed as JSON, else used as a string.
    #[clap(long)]
    leaf_value: Option<String>,
    /// Value injected in place of every intermediate ancestor.
    #[clap(long)]
    structure_value: Option<String>,
    /// Batches to generate; repeat to select several.
    #[clap(short, long)]
    batch: Vec<BatchKind>,
    #[clap(short, long)]
    threads: Option<usize>,
    #[clap(long)]
    compact: bool,
    /// Print only the number of payloads in each batch.
    #[clap(long)]
    counts_only: bool,
    /// Log filter, e.g. `debug` or `jsonfuzz_core=trace`. Overrides RUST_LOG.
    #[clap(long)]
    log_level: Option<String>,
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(config_file: Option<PathBuf>) -> Result<JsonFuzzConfig, anyhow::Error> {
    match config_file {
        Some(config_path) => {
            info!("Loading configuration from specified path: {config_path:?}");
            JsonFuzzConfig::load_from_file(&config_path)
        }
        None => {
            // No config file specified via CLI, load default
            let default_config_path = PathBuf::from("jsonfuzz.toml");
            if default_config_path.exists() {
                info!("No config file specified via CLI, loading default: {default_config_path:?}");
                JsonFuzzConfig::load_from_file(&default_config_path)
            } else {
                info!(
                    "No config file specified and default 'jsonfuzz.toml' not found, using built-in defaults."
                );
                Ok(JsonFuzzConfig::default())
            }
        }
    }
}

fn apply_overrides(config: &mut JsonFuzzConfig, cli: Cli) {
    if let Some(input) = cli.input {
        config.input.path = Some(input);
    }
    if let Some(raw) = cli.leaf_value {
        config.payloads.leaf_value = document::parse_injection_value(&raw);
    }
    if let Some(raw) = cli.structure_value {
        config.payloads.structure_value = document::parse_injection_value(&raw);
    }
    if !cli.batch.is_empty() {
        config.fuzzer.batches = cli.batch;
    }
    if let Some(threads) = cli.threads {
        config.fuzzer.threads = threads;
    }
    if cli.compact {
        config.output.format = OutputFormat::Compact;
    }
    if cli.counts_only {
        config.output.counts_only = true;
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let mut config = load_config(cli.config_file.clone())?;
    apply_overrides(&mut config, cli);
    info!("Effective configuration: {config:?}");

    let structure = match &config.input.path {
        Some(path) => document::load_document(path)
            .with_context(|| format!("Failed to load input document {path:?}"))?,
        None => {
            info!("No input document given, using the built-in sample.");
            document::sample_document()
        }
    };
    let format = config.output.format;

    if let Some(warning) = shape_warning(&structure) {
        warn!("{warning}");
    }
    let paths = map_structure(&structure);
    println!("Total of {} parameter paths", paths.len());
    if !config.output.counts_only {
        println!("{}", document::render(&paths, format)?);
    }

    let fuzzer = config.fuzzer.build_fuzzer();
    let start_time = Instant::now();
    let mut total_payloads = 0;

    for kind in &config.fuzzer.batches {
        let generator = config.payloads.generator(*kind);
        let payloads = generator
            .generate(&fuzzer, &structure, &paths)
            .with_context(|| format!("Failed to generate {kind} payloads"))?;
        total_payloads += payloads.len();

        println!("Total of {} {} payloads", payloads.len(), batch_label(*kind));
        if !config.output.counts_only {
            println!("{}", document::render(&payloads, format)?);
        }
    }

    info!(
        "Generated {} payloads across {} batches in {:.2?}",
        total_payloads,
        config.fuzzer.batches.len(),
        start_time.elapsed()
    );
    Ok(())
}

/// Explains why a document will produce no meaningful payloads, if it won't.
fn shape_warning(structure: &Value) -> Option<&'static str> {
    if !structure.is_object() && !structure.is_array() {
        Some("Document root is a single value; there are no members to permute.")
    } else if leaf_count(structure) == 0 {
        Some("Document contains only empty containers; there are no leaves to permute.")
    } else {
        None
    }
}

fn batch_label(kind: BatchKind) -> &'static str {
    match kind {
        BatchKind::Leaf => "parameter",
        BatchKind::Structure => "structure",
        BatchKind::Missing => "missing attribute",
    }
}

//! CLI definition and command dispatch for Scenic.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to the engine.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--config`, `--trees`, `--device`)
//! 2. Environment variables (`SCENIC_CONFIG`, `SCENIC_VERBOSE`, `SCENIC_DEVICE`)
//! 3. Per-corpus `scenic.toml`, then `~/.scenic/config.yaml`
//! 4. Built-in defaults

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Mutex;

use clap::{Parser, Subcommand};

use crate::ui::{
    format::format_thousands, table, ColorMode, MessageType, Progress, ProgressMode, Style,
};

use scenic_core::{
    DevicePreference, IndexOptions, ProgressEvent, ScenicEngine, SearchOptions, SearchReport,
    DEFAULT_TOP_K, INDEX_DIR_NAME,
};
use scenic_geo::ReverseGeocoder;

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Scenic – reverse image search over geotagged photo corpora
#[derive(Parser, Debug)]
#[command(name = "scenic")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "SCENIC_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true, env = "SCENIC_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.scenic/config.yaml)
    #[arg(long, global = true, env = "SCENIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device preference for embedding inference (auto/gpu/cpu)
    #[arg(long, global = true, env = "SCENIC_DEVICE")]
    pub device: Option<String>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "SCENIC_COLOR", default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Embed every photo in a corpus and build the similarity index
    #[command(after_help = r#"EXAMPLES:
    # Index the photo corpus in the current directory
    scenic index

    # Index a specific corpus with a reproducible forest
    scenic index ~/photos --trees 32 --seed 42

    # Write artifacts somewhere other than <corpus>/.scenic
    scenic index ~/photos --index-dir /var/lib/scenic

    # Machine-readable report
    scenic index ~/photos --json
"#)]
    Index {
        /// Corpus directory: photos grouped in per-scene sub-directories
        #[arg(default_value = ".")]
        corpus: PathBuf,

        /// Where to write index artifacts (default: <CORPUS>/.scenic)
        #[arg(long)]
        index_dir: Option<PathBuf>,

        /// Number of trees in the forest (more = better recall, slower build)
        #[arg(long)]
        trees: Option<usize>,

        /// Seed for reproducible builds
        #[arg(long)]
        seed: Option<u64>,

        /// Images decoded and embedded per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Find corpus photos visually similar to a query image
    #[command(after_help = r#"EXAMPLES:
    # Search the corpus indexed in the current directory
    scenic search vacation.jpg

    # Search a specific corpus, return more results
    scenic search vacation.jpg ~/photos --top-k 10

    # Resolve hit coordinates to street addresses (network access)
    scenic search vacation.jpg --locate

    # Machine-readable output
    scenic search vacation.jpg --json | jq '.hits[0].record.path'
"#)]
    Search {
        /// Query image
        query: PathBuf,

        /// Corpus directory whose index to search
        #[arg(default_value = ".")]
        corpus: PathBuf,

        /// Index directory override (default: <CORPUS>/.scenic)
        #[arg(long)]
        index_dir: Option<PathBuf>,

        /// Maximum results to return
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Reverse-geocode hit coordinates via Nominatim (best effort)
        #[arg(long)]
        locate: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show the manifest of a built index
    #[command(after_help = r#"EXAMPLES:
    # Inspect the index of the current directory's corpus
    scenic info

    # Inspect a specific index directory
    scenic info --index-dir /var/lib/scenic

    # Machine-readable output
    scenic info --json | jq '.items'
"#)]
    Info {
        /// Corpus directory whose index to inspect
        #[arg(default_value = ".")]
        corpus: PathBuf,

        /// Index directory override (default: <CORPUS>/.scenic)
        #[arg(long)]
        index_dir: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse arguments, initialize logging and the engine, dispatch the command.
///
/// # Returns
///
/// `ExitCode::SUCCESS` on success, `ExitCode::FAILURE` on error.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    // - Always show warnings (config issues, skipped geocode lookups)
    // - Show debug info only when --verbose is set
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "scenic_core={log_level},scenic_cli={log_level},scenic_index={log_level},scenic_model={log_level},scenic_geo={log_level}"
    );
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .init();

    // Parse color mode from --color flag
    let color_mode = ColorMode::from_str(&cli.color).unwrap_or(ColorMode::Auto);
    let style = Style::new(color_mode);

    // Create engine with configuration
    // Priority: --config flag > SCENIC_CONFIG env > ~/.scenic/config.yaml
    let engine = match &cli.config {
        Some(config_path) => ScenicEngine::with_config(config_path),
        None => ScenicEngine::with_defaults(),
    };
    let mut engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            let hint = if let Some(path) = &cli.config {
                format!("Check your config at {}", path.display())
            } else {
                "Check your global config at ~/.scenic/config.yaml".to_string()
            };
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize Scenic engine",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    // Apply device override if specified via --device or SCENIC_DEVICE
    if let Some(device_str) = &cli.device {
        match DevicePreference::from_str(device_str) {
            Ok(device) => engine.set_device(device),
            Err(reason) => {
                eprintln!(
                    "{}",
                    style.error_with_context(&reason, None, Some("Valid options: auto, gpu, cpu"))
                );
                return ExitCode::FAILURE;
            }
        }
    }

    let quiet = cli.quiet;
    let result = match cli.command {
        Command::Index {
            corpus,
            index_dir,
            trees,
            seed,
            batch_size,
            json,
        } => handle_index(
            &style, &engine, corpus, index_dir, trees, seed, batch_size, json, quiet,
        ),
        Command::Search {
            query,
            corpus,
            index_dir,
            top_k,
            locate,
            json,
            pretty,
        } => handle_search(
            &style, &engine, query, corpus, index_dir, top_k, locate, json, pretty, quiet,
        ),
        Command::Info {
            corpus,
            index_dir,
            json,
        } => handle_info(&style, &engine, corpus, index_dir, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn resolve_index_dir(corpus: &PathBuf, index_dir: Option<PathBuf>) -> PathBuf {
    index_dir.unwrap_or_else(|| corpus.join(INDEX_DIR_NAME))
}

#[allow(clippy::too_many_arguments)]
fn handle_index(
    style: &Style,
    engine: &ScenicEngine,
    corpus: PathBuf,
    index_dir: Option<PathBuf>,
    trees: Option<usize>,
    seed: Option<u64>,
    batch_size: Option<usize>,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let options = IndexOptions {
        corpus,
        index_dir,
        trees,
        seed,
        batch_size,
    };

    let mode = ProgressMode::detect(quiet, json, style.color_mode());
    let progress_slot: Mutex<Option<Progress>> = Mutex::new(None);
    let callback = |event: ProgressEvent| {
        let mut slot = progress_slot.lock().unwrap_or_else(|e| e.into_inner());
        match event {
            ProgressEvent::ScanComplete { total } => {
                *slot = Some(Progress::bar(total as u64, "Embedding", mode));
            }
            ProgressEvent::Embedded { done, .. } => {
                if let Some(progress) = slot.as_ref() {
                    progress.set_position(done as u64);
                }
            }
            ProgressEvent::Building { trees } => {
                if let Some(progress) = slot.as_ref() {
                    progress.set_message(&format!("Building {trees} trees"));
                }
            }
            ProgressEvent::Saving => {
                if let Some(progress) = slot.as_ref() {
                    progress.set_message("Saving index");
                }
            }
        }
    };

    let result = engine.build_index(&options, Some(&callback));
    if let Some(progress) = progress_slot
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take()
    {
        progress.finish_and_clear();
    }
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!(
                "Indexed {} photos into {}",
                format_thousands(report.items as u64),
                style.emphasize(&report.index_dir.display().to_string())
            )
        )
    );
    println!(
        "{}",
        style.message_detail(
            "Corpus",
            &format!(
                "{} labels, {} photos with location",
                report.labels, report.with_location
            )
        )
    );
    println!(
        "{}",
        style.message_detail(
            "Index",
            &format!(
                "{}-d vectors, {} trees, {}ms",
                report.dimension, report.trees, report.elapsed_ms
            )
        )
    );
    if !quiet {
        println!();
        println!(
            "{}",
            style.message(MessageType::Hint, "Search it: scenic search <QUERY>")
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_search(
    style: &Style,
    engine: &ScenicEngine,
    query: PathBuf,
    corpus: PathBuf,
    index_dir: Option<PathBuf>,
    top_k: usize,
    locate: bool,
    json: bool,
    pretty: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let index_dir = resolve_index_dir(&corpus, index_dir);
    let options = SearchOptions::new(&query, index_dir).with_top_k(top_k);

    // Most of the wall-clock here is the one-time model load.
    let mode = ProgressMode::detect(quiet, json, style.color_mode());
    let spinner = Progress::spinner("Embedding query and searching", mode);
    let result = engine.search(&options);
    spinner.finish_and_clear();
    let report = result?;

    // Best-effort enrichment: a failed lookup is a missing address, never a
    // failed search.
    let addresses = if locate {
        Some(resolve_addresses(&report))
    } else {
        None
    };

    if json {
        let mut value = serde_json::to_value(&report)?;
        if let Some(addresses) = &addresses {
            if let Some(hits) = value.get_mut("hits").and_then(|h| h.as_array_mut()) {
                for (hit, address) in hits.iter_mut().zip(addresses) {
                    if let Some(obj) = hit.as_object_mut() {
                        obj.insert("address".to_string(), serde_json::json!(address));
                    }
                }
            }
        }
        let out = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        println!("{out}");
        return Ok(());
    }

    if report.hits.is_empty() {
        println!(
            "{}",
            style.message(MessageType::Info, "Index is empty; nothing to rank")
        );
        return Ok(());
    }

    let rows: Vec<table::SearchRow> = report
        .hits
        .iter()
        .enumerate()
        .map(|(i, hit)| table::SearchRow {
            rank: i + 1,
            distance: hit.distance,
            label: hit.record.label.clone().unwrap_or_default(),
            path: hit.record.path.clone(),
            location: hit
                .record
                .location
                .map(|l| l.to_string())
                .unwrap_or_default(),
            address: addresses
                .as_ref()
                .and_then(|a| a.get(i).cloned())
                .flatten(),
        })
        .collect();

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!(
                "{} closest of {} indexed photos for {}",
                rows.len(),
                format_thousands(report.total_items as u64),
                style.emphasize(&query.display().to_string())
            )
        )
    );
    println!("{}", table::render_search_table(&rows, locate));
    Ok(())
}

/// Resolve addresses for located hits; `None` entries for everything else.
fn resolve_addresses(report: &SearchReport) -> Vec<Option<String>> {
    let geocoder = match ReverseGeocoder::with_defaults() {
        Ok(geocoder) => geocoder,
        Err(e) => {
            tracing::warn!("Geocoder unavailable: {e}");
            return vec![None; report.hits.len()];
        }
    };

    report
        .hits
        .iter()
        .map(|hit| {
            let location = hit.record.location?;
            match geocoder.reverse(location.latitude, location.longitude) {
                Ok(address) => address,
                Err(e) => {
                    tracing::warn!(
                        "Reverse geocoding failed for {}: {e}",
                        hit.record.path
                    );
                    None
                }
            }
        })
        .collect()
}

fn handle_info(
    style: &Style,
    engine: &ScenicEngine,
    corpus: PathBuf,
    index_dir: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let index_dir = resolve_index_dir(&corpus, index_dir);
    let manifest = engine.info(&index_dir)?;

    let snapshot_bytes = std::fs::metadata(index_dir.join(scenic_core::INDEX_FILENAME))
        .ok()
        .map(|m| m.len());

    if json {
        let mut value = serde_json::to_value(&manifest)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "snapshot_bytes".to_string(),
                serde_json::json!(snapshot_bytes),
            );
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!("Index at {}", style.emphasize(&index_dir.display().to_string()))
        )
    );
    println!("{}", table::render_info_table(&manifest, snapshot_bytes));
    Ok(())
}

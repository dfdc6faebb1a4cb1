//! bigf CLI - Command-line tool for Colin McRae Rally 04 BIG archives.
//!
//! Extracts the contents of BIG files and deciphers the extracted WAV files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::{MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use bigf_archive::{output_names, payload_window, BigArchive, BigEntry, CipherKey};

/// bigf - Colin McRae Rally 04 BIG file extraction and WAV deciphering tool
#[derive(Parser)]
#[command(name = "bigf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every BIG file in a directory
    Extract {
        /// Directory containing the BIG files
        #[arg(env = "BIGF_INPUT_DIR")]
        input: PathBuf,

        /// Output directory
        #[arg(env = "BIGF_OUTPUT_DIR")]
        output: PathBuf,

        /// Do not decipher the extracted WAV files
        #[arg(long)]
        no_deciphering: bool,

        /// Cipher key file
        #[arg(short, long, env = "BIGF_WAV_KEY", default_value = "wav-key.bin")]
        key: PathBuf,

        /// Only extract entries matching this glob pattern
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List contents of a BIG archive
    List {
        /// Path to the BIG file
        archive: PathBuf,

        /// Only list entries matching this glob pattern
        #[arg(short, long)]
        filter: Option<String>,

        /// Show sizes and absolute offsets
        #[arg(short, long)]
        detailed: bool,

        /// Print header and entries as JSON
        #[arg(long, conflicts_with = "detailed")]
        json: bool,
    },

    /// Show header information for a BIG archive
    Info {
        /// Path to the BIG file
        archive: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            input,
            output,
            no_deciphering,
            key,
            filter,
        } => {
            let key = (!no_deciphering).then_some(key.as_path());
            cmd_extract(&input, &output, key, filter.as_deref())?;
        }
        Commands::List {
            archive,
            filter,
            detailed,
            json,
        } => {
            cmd_list(&archive, filter.as_deref(), detailed, json)?;
        }
        Commands::Info { archive } => {
            cmd_info(&archive)?;
        }
    }

    Ok(())
}

fn cmd_extract(input: &Path, output: &Path, key_path: Option<&Path>, filter: Option<&str>) -> Result<()> {
    // A missing key must stop the run before any archive is touched.
    let key = key_path
        .map(|path| {
            CipherKey::load(path)
                .with_context(|| format!("Failed to load cipher key {}", path.display()))
        })
        .transpose()?;
    let filter = parse_filter(filter)?;

    match &key {
        Some(key) => info!("Deciphering with a {}-byte key", key.len()),
        None => info!("Deciphering disabled"),
    }

    let archives = collect_archives(input)?;
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    info!("Extracting {} archives from {}", archives.len(), input.display());

    let pb = ProgressBar::new(archives.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let outcomes: Vec<bool> = archives
        .par_iter()
        .map(|path| {
            let display = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let result = extract_archive(path, output, key.as_ref(), filter.as_ref());
            pb.suspend(|| match &result {
                Ok(count) => info!("{display}: extracted {count} entries"),
                Err(err) => warn!("{display}: {err:#}, skipping"),
            });
            pb.inc(1);

            result.is_ok()
        })
        .collect();

    pb.finish_and_clear();

    let extracted = outcomes.iter().filter(|ok| **ok).count();
    info!(
        "Extracted {} archives in {:?} ({} skipped)",
        extracted,
        start.elapsed(),
        outcomes.len() - extracted
    );

    Ok(())
}

/// Extract one archive into `<output>/<stem>/<stem>_<entry>`.
///
/// Entries whose name already appeared earlier in the table are written as
/// `<stem>_<index>_<entry>` instead.
///
/// Every selected entry is extracted in memory before anything is written,
/// so a malformed archive leaves no files behind. If a write fails, the
/// files already written for this archive are removed again.
fn extract_archive(
    path: &Path,
    output: &Path,
    key: Option<&CipherKey>,
    filter: Option<&Pattern>,
) -> Result<usize> {
    let archive = BigArchive::open(path)?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.name().to_string());

    let payloads = match filter {
        None => archive.extract_parallel(key)?,
        Some(pattern) => archive
            .iter()
            .filter(|entry| matches_filter(pattern, entry))
            .map(|entry| archive.extract(entry, key).map(|data| (entry, data)))
            .collect::<bigf_archive::Result<Vec<_>>>()?,
    };

    let dir = output.join(&stem);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let names = output_names(archive.entries(), &stem);
    let mut written = Vec::with_capacity(payloads.len());
    for (entry, data) in &payloads {
        let output_path = dir.join(&names[entry.index()]);
        if let Err(err) = fs::write(&output_path, data) {
            for path in &written {
                let _ = fs::remove_file(path);
            }
            return Err(err).with_context(|| format!("Failed to write {}", output_path.display()));
        }
        written.push(output_path);
    }

    Ok(written.len())
}

fn cmd_list(path: &Path, filter: Option<&str>, detailed: bool, json: bool) -> Result<()> {
    let archive = BigArchive::open(path).context("Failed to open BIG archive")?;
    let filter = parse_filter(filter)?;

    let entries: Vec<&BigEntry> = archive
        .iter()
        .filter(|entry| filter.as_ref().map_or(true, |p| matches_filter(p, entry)))
        .collect();

    if json {
        let listing = serde_json::json!({
            "archive": archive.name(),
            "header": archive.header(),
            "entries": entries,
        });
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    let table_offset = u64::from(archive.header().table_offset);
    for entry in &entries {
        if detailed {
            println!(
                "{:>10} {:>#12x} {}",
                entry.payload_size(),
                table_offset + u64::from(entry.payload_offset()),
                entry.name()
            );
        } else {
            println!("{}", entry.name());
        }
    }

    println!("\nTotal: {} entries", entries.len());

    Ok(())
}

fn cmd_info(path: &Path) -> Result<()> {
    let archive = BigArchive::open(path).context("Failed to open BIG archive")?;
    let header = archive.header();

    let payload_bytes: u64 = archive
        .iter()
        .map(|entry| u64::from(entry.payload_size()))
        .sum();
    let out_of_range = archive
        .iter()
        .filter(|entry| payload_window(header, entry, archive.data().len()).is_err())
        .count();

    println!("Archive:       {}", archive.name());
    println!("Size:          {} bytes", archive.data().len());
    println!("Entries:       {}", header.entry_count);
    println!("Table offset:  {:#x}", header.table_offset);
    println!("Payload bytes: {}", payload_bytes);
    if out_of_range > 0 {
        println!("Out of range:  {} entries", out_of_range);
    }

    Ok(())
}

/// Regular files directly inside `input`, sorted by name.
fn collect_archives(input: &Path) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for entry in WalkDir::new(input).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read directory {}", input.display()))?;
        if entry.file_type().is_file() {
            archives.push(entry.into_path());
        }
    }
    Ok(archives)
}

fn parse_filter(filter: Option<&str>) -> Result<Option<Pattern>> {
    filter
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid filter pattern {p:?}")))
        .transpose()
}

/// Case-insensitive glob match on the entry name.
fn matches_filter(pattern: &Pattern, entry: &BigEntry) -> bool {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    pattern.matches_with(entry.name(), OPTIONS)
}

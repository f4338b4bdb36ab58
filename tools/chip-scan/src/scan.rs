//! Scan command - locate modules in files and directory trees

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use chip_formats::scan::{Hit, scan_buffer};
use chip_formats::{Decoder, all_decoders};

/// Files larger than this are skipped unless overridden
const DEFAULT_MAX_SIZE: u64 = 16 * 1024 * 1024;

/// Arguments for the scan command
#[derive(Args)]
pub struct ScanArgs {
    /// Files or directories to scan
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Skip files larger than this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: u64,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,
}

/// Execute the scan command
pub fn execute(args: ScanArgs) -> Result<()> {
    let decoders = all_decoders()?;
    let files = collect_files(&args.paths, args.recursive)?;
    tracing::info!(count = files.len(), "Scanning files");

    let mut total = 0;
    for path in &files {
        let Some(hits) = scan_file(&decoders, path, args.max_size)? else {
            continue;
        };
        for hit in &hits {
            println!("{}", format_hit(path, hit));
        }
        total += hits.len();
    }
    println!("{total} module(s) in {} file(s)", files.len());
    Ok(())
}

/// Expand directories into the regular files below them
///
/// Without `recursive` only the immediate children of a directory are
/// taken. Results are sorted within each directory.
pub fn collect_files(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let metadata =
            std::fs::metadata(path).with_context(|| format!("Cannot access {}", path.display()))?;
        if metadata.is_file() {
            files.push(path.clone());
            continue;
        }
        let walker = WalkDir::new(path)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(false)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.with_context(|| format!("Cannot walk {}", path.display()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

/// Scan one file; `None` when it is skipped by size
pub fn scan_file(
    decoders: &[Box<dyn Decoder>],
    path: &Path,
    max_size: u64,
) -> Result<Option<Vec<Hit>>> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("Cannot access {}", path.display()))?
        .len();
    if size > max_size {
        tracing::info!(path = %path.display(), size, "Skipping large file");
        return Ok(None);
    }
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let hits = scan_buffer(decoders, &chip_binary::Container::new(data));
    tracing::debug!(path = %path.display(), hits = hits.len(), "Scanned");
    Ok(Some(hits))
}

fn format_hit(path: &Path, hit: &Hit) -> String {
    format!(
        "{}:{:#x}\t{}\t{} bytes\tcrc {:08x}\tfixed {:08x}",
        path.display(),
        hit.offset,
        hit.description,
        hit.size,
        hit.checksum,
        hit.fixed_checksum
    )
}

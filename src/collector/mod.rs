//! Media collector.
//!
//! Populates the webroot from configured source directories: every regular
//! file with an accepted extension is hashed and materialized as
//! `<webroot>/<hex digest>`, hard-linked where the filesystem allows it and
//! copied otherwise. The presence server itself never looks at the sources;
//! it only indexes whatever ends up in the webroot.

use crate::config::CollectorConfig;
use crate::digest::Digest;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Summary of one collector run.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectStats {
    /// Candidate files with an accepted extension.
    pub seen: usize,
    pub linked: usize,
    pub copied: usize,
    /// Already present in the webroot under their digest name.
    pub skipped: usize,
}

/// Run the collector once over all configured source paths.
///
/// Per-file failures are logged and skipped; only an unusable webroot is an
/// error. The run is idempotent: files already materialized under their
/// digest name are left alone.
pub fn collect(config: &CollectorConfig, webroot: &Path) -> Result<CollectStats> {
    std::fs::create_dir_all(webroot)
        .with_context(|| format!("Failed to create webroot directory: {:?}", webroot))?;

    let mut stats = CollectStats::default();
    for source in &config.paths {
        if !source.exists() {
            warn!("Collector source path does not exist: {:?}", source);
            continue;
        }
        collect_source(config, source, webroot, &mut stats);
    }

    info!(
        "Collector run complete: {} seen, {} linked, {} copied, {} already present",
        stats.seen, stats.linked, stats.copied, stats.skipped
    );
    Ok(stats)
}

fn collect_source(
    config: &CollectorConfig,
    source: &Path,
    webroot: &Path,
    stats: &mut CollectStats,
) {
    for entry in WalkDir::new(source)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_accepted_extension(config, path) {
            continue;
        }
        stats.seen += 1;

        let digest = match Digest::of_file(path) {
            Ok(digest) => digest,
            Err(e) => {
                warn!("Failed to hash {:?}, skipping: {}", path, e);
                continue;
            }
        };

        let target = webroot.join(digest.to_hex());
        if target.exists() {
            stats.skipped += 1;
            continue;
        }

        // Hard links keep the webroot cheap; cross-device sources fall back
        // to a copy.
        match std::fs::hard_link(path, &target) {
            Ok(()) => {
                debug!("Linked {:?} -> {}", path, digest);
                stats.linked += 1;
            }
            Err(_) => match std::fs::copy(path, &target) {
                Ok(_) => {
                    debug!("Copied {:?} -> {}", path, digest);
                    stats.copied += 1;
                }
                Err(e) => {
                    warn!("Failed to materialize {:?} in webroot: {}", path, e);
                }
            },
        }
    }
}

fn has_accepted_extension(config: &CollectorConfig, path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    config
        .extensions
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(ext))
}

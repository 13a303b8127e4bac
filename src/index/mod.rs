//! In-memory content-addressed index of servable media.
//!
//! The index is a plain digest set built from one snapshot of the webroot.
//! It never stores filenames: the collector guarantees a served file's name
//! under the webroot equals its own hex digest, so presence lookups and
//! client fetches agree without a name-to-hash table.
//!
//! Snapshots are immutable. [`SharedIndex`] publishes a snapshot behind an
//! `Arc` swap so request handlers read without blocking while a rebuild
//! constructs the next snapshot off to the side.

use crate::digest::Digest;
use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// One immutable snapshot of the webroot's digests.
#[derive(Debug, Default)]
pub struct MediaIndex {
    digests: HashSet<Digest>,
}

impl MediaIndex {
    /// Build an index from the directory's direct children.
    ///
    /// Only regular files are hashed; directories and other entries are
    /// skipped silently. A file that cannot be read (permissions, deleted
    /// mid-scan) is skipped with a warning and does not abort the build.
    /// An unreadable directory is an error.
    pub fn build(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read webroot directory: {:?}", dir))?;

        let mut digests = HashSet::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry in {:?}: {}", dir, e);
                    continue;
                }
            };

            let path = entry.path();
            match entry.file_type() {
                Ok(ft) if ft.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    continue;
                }
            }

            match Digest::of_file(&path) {
                Ok(digest) => {
                    debug!("Indexed {:?} as {}", path.file_name(), digest);
                    digests.insert(digest);
                }
                Err(e) => {
                    warn!("Failed to hash {:?}, skipping: {}", path, e);
                }
            }
        }

        Ok(Self { digests })
    }

    /// Membership test for one requested digest.
    pub fn contains(&self, digest: &Digest) -> bool {
        self.digests.contains(digest)
    }

    /// Number of indexed digests.
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

impl FromIterator<Digest> for MediaIndex {
    fn from_iter<I: IntoIterator<Item = Digest>>(iter: I) -> Self {
        Self {
            digests: iter.into_iter().collect(),
        }
    }
}

/// Atomically swappable handle to the current [`MediaIndex`] snapshot.
///
/// Readers clone the inner `Arc` and keep using their snapshot for the rest
/// of the request even if a rebuild publishes a new one; a half-built index
/// is never observable.
#[derive(Clone)]
pub struct SharedIndex {
    current: Arc<RwLock<Arc<MediaIndex>>>,
}

impl SharedIndex {
    pub fn new(index: MediaIndex) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(index))),
        }
    }

    /// The snapshot to use for one request's lookups.
    pub fn snapshot(&self) -> Arc<MediaIndex> {
        self.current.read().clone()
    }

    /// Publish a fully-built snapshot, replacing the old one for all
    /// subsequent reads.
    pub fn replace(&self, index: MediaIndex) {
        *self.current.write() = Arc::new(index);
    }

    /// Rebuild from the webroot and publish on success.
    ///
    /// On failure the previous snapshot stays in effect rather than being
    /// replaced by an empty one.
    pub fn rebuild(&self, dir: &Path) -> Result<usize> {
        let index = MediaIndex::build(dir)?;
        let count = index.len();
        self.replace(index);
        Ok(count)
    }
}

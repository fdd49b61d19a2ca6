//! A process-scoped set of the dataset identifiers known to exist on disk.
//!
//! The index is rebuilt wholesale from a backing list (one identifier per
//! line) and answers membership in O(1), so the aggregator can discard
//! unknown identifiers without spawning an extraction task for them.

use crate::index::error::IndexError;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, RwLock};

struct IndexState {
    identifiers: HashSet<String>,
    source_bytes: u64,
}

/// Deduplicated set of known valid dataset identifiers.
///
/// Lifecycle: built on demand via [`ExistenceIndex::build`], rebuilt
/// wholesale when triggered again. Readers that arrive before the first
/// successful build get [`IndexError::NotReady`] and should treat every
/// identifier as unknown; they never block waiting for a build. Concurrent
/// build requests coalesce into a single in-flight build.
pub struct ExistenceIndex {
    source: PathBuf,
    state: RwLock<Option<IndexState>>,
    build_gate: Mutex<()>,
    builds_completed: AtomicU64,
}

impl ExistenceIndex {
    /// Creates an index backed by `source`, not yet built.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        ExistenceIndex {
            source: source.into(),
            state: RwLock::new(None),
            build_gate: Mutex::new(()),
            builds_completed: AtomicU64::new(0),
        }
    }

    /// (Re)builds the index from the backing file.
    ///
    /// Blank lines are discarded and surrounding whitespace is trimmed. The
    /// new set replaces the old one atomically; readers never observe a
    /// partially built index. On failure the previous index (if any) stays
    /// intact and the caller may retry.
    ///
    /// Callers that request a build while one is already in flight wait for
    /// that build and share its outcome instead of starting their own.
    pub async fn build(&self) -> Result<(), IndexError> {
        let observed = self.builds_completed.load(Ordering::Acquire);
        let _gate = self.build_gate.lock().await;
        if self.builds_completed.load(Ordering::Acquire) > observed {
            // A build finished while we were waiting for the gate.
            debug!("Coalesced index build request for {:?}", self.source);
            return Ok(());
        }

        let identifiers = Self::read_source(&self.source).await?;
        let source_bytes = fs::metadata(&self.source)
            .await
            .map_err(|e| IndexError::SourceMetadata(self.source.clone(), e))?
            .len();

        info!(
            "Built identifier index from {:?}: {} identifiers, {} source bytes",
            self.source,
            identifiers.len(),
            source_bytes
        );

        *self.state.write().await = Some(IndexState {
            identifiers,
            source_bytes,
        });
        self.builds_completed.fetch_add(1, Ordering::Release);
        Ok(())
    }

    async fn read_source(source: &Path) -> Result<HashSet<String>, IndexError> {
        let file = fs::File::open(source)
            .await
            .map_err(|e| IndexError::SourceRead(source.to_path_buf(), e))?;
        let mut lines = BufReader::new(file).lines();
        let mut identifiers = HashSet::new();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| IndexError::SourceRead(source.to_path_buf(), e))?
        {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                identifiers.insert(trimmed.to_string());
            }
        }
        if identifiers.is_empty() {
            warn!("Index backing file {:?} contained no identifiers", source);
        }
        Ok(identifiers)
    }

    /// Whether `identifier` was present in the backing list at the last
    /// successful build.
    ///
    /// # Errors
    ///
    /// [`IndexError::NotReady`] if no build has completed yet.
    pub async fn has(&self, identifier: &str) -> Result<bool, IndexError> {
        match self.state.read().await.as_ref() {
            Some(state) => Ok(state.identifiers.contains(identifier)),
            None => Err(IndexError::NotReady),
        }
    }

    /// Whether at least one build has completed successfully.
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Number of distinct identifiers in the index, if built.
    pub async fn identifier_count(&self) -> Option<usize> {
        self.state.read().await.as_ref().map(|s| s.identifiers.len())
    }

    /// Byte size of the backing file at the last successful build, for
    /// staleness diagnostics.
    pub async fn source_bytes(&self) -> Option<u64> {
        self.state.read().await.as_ref().map(|s| s.source_bytes)
    }
}

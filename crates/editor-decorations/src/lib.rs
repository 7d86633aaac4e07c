//! # Editor Decorations
//!
//! Line-anchored inline decorations, isolated per namespace.
//!
//! Each lens provider gets its own [`NamespaceId`] so that clearing one
//! provider's stale decorations never disturbs another provider's marks on
//! the same line. The [`DecorationSurface`] trait is the seam to the host
//! editing surface; [`InMemorySurface`] is the reference implementation used
//! by tests and headless embedders.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DECORATION_ID: AtomicU64 = AtomicU64::new(1);

/// Decoration ID, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecorationId(u64);

impl DecorationId {
    fn next() -> Self {
        Self(DECORATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Namespace ID, one isolation domain per provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceId(u32);

/// Lazily assigns one namespace per provider identifier.
///
/// Entries live for the process lifetime; a provider always maps to the same
/// namespace no matter how often it is looked up.
pub struct NamespaceRegistry {
    names: RwLock<HashMap<String, NamespaceId>>,
    next: AtomicU32,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self {
            names: RwLock::new(HashMap::new()),
            next: AtomicU32::new(1),
        }
    }

    /// Get the namespace for a provider, creating it on first use.
    pub fn get_or_create(&self, provider_id: &str) -> NamespaceId {
        if let Some(ns) = self.names.read().get(provider_id) {
            return *ns;
        }
        let mut names = self.names.write();
        *names
            .entry(provider_id.to_string())
            .or_insert_with(|| NamespaceId(self.next.fetch_add(1, Ordering::Relaxed)))
    }

    /// Get the namespace for a provider, if one was ever created.
    pub fn get(&self, provider_id: &str) -> Option<NamespaceId> {
        self.names.read().get(provider_id).copied()
    }

    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decoration surface errors
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecorationError {
    /// The document is not attached to the surface.
    #[error("document is not attached to the surface")]
    UnknownDocument,
    /// The target line no longer exists (the document shrank).
    #[error("decoration target line {0} no longer exists")]
    StaleLine(u32),
    /// The decoration id is no longer placed.
    #[error("decoration is no longer placed")]
    StaleDecoration,
}

/// Host editing surface seam.
///
/// All operations are scoped to a namespace; the engine never touches marks
/// outside the namespace it was handed for a provider.
pub trait DecorationSurface: Send + Sync {
    /// Place a new decoration at `line` with ordered text fragments.
    fn create(
        &self,
        ns: NamespaceId,
        document: &PathBuf,
        line: u32,
        fragments: Vec<String>,
    ) -> Result<DecorationId, DecorationError>;

    /// Move or update an existing decoration in place.
    ///
    /// Fails with [`DecorationError::StaleLine`] when the line vanished and
    /// with [`DecorationError::StaleDecoration`] when the id is gone; callers
    /// are expected to drop their reference and re-place on the next cycle.
    fn update(
        &self,
        ns: NamespaceId,
        document: &PathBuf,
        id: DecorationId,
        line: u32,
        fragments: Vec<String>,
    ) -> Result<(), DecorationError>;

    /// Remove one decoration by id. Removing an unknown id is a no-op.
    fn remove(&self, ns: NamespaceId, document: &PathBuf, id: DecorationId);

    /// Clear every decoration in the namespace anchored in `first..=last`.
    fn clear_lines(&self, ns: NamespaceId, document: &PathBuf, first: u32, last: u32);

    /// Drop all decorations for a document, across every namespace.
    fn drop_document(&self, document: &PathBuf);
}

/// A decoration as currently placed on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedDecoration {
    pub line: u32,
    pub fragments: Vec<String>,
}

#[derive(Default)]
struct DocumentState {
    line_count: u32,
    marks: HashMap<NamespaceId, HashMap<DecorationId, PlacedDecoration>>,
}

/// In-memory decoration surface.
///
/// Tracks a line count per document so stale-line failures behave like a
/// real editing surface: updates and placements beyond the current end of
/// the document fail instead of silently landing nowhere.
pub struct InMemorySurface {
    documents: RwLock<HashMap<PathBuf, DocumentState>>,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a document with its current number of lines.
    pub fn attach_document(&self, document: PathBuf, line_count: u32) {
        self.documents.write().entry(document).or_default().line_count = line_count;
    }

    /// Update a document's line count (e.g. after an edit).
    pub fn set_line_count(&self, document: &PathBuf, line_count: u32) {
        if let Some(state) = self.documents.write().get_mut(document) {
            state.line_count = line_count;
        }
    }

    /// Lines currently decorated in a namespace, ascending.
    pub fn decorated_lines(&self, ns: NamespaceId, document: &PathBuf) -> Vec<u32> {
        let documents = self.documents.read();
        let mut lines: Vec<u32> = documents
            .get(document)
            .and_then(|state| state.marks.get(&ns))
            .map(|marks| marks.values().map(|d| d.line).collect())
            .unwrap_or_default();
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    /// The decoration placed at `line` in a namespace, if any.
    pub fn decoration_at(
        &self,
        ns: NamespaceId,
        document: &PathBuf,
        line: u32,
    ) -> Option<(DecorationId, PlacedDecoration)> {
        let documents = self.documents.read();
        let marks = documents.get(document)?.marks.get(&ns)?;
        marks
            .iter()
            .find(|(_, d)| d.line == line)
            .map(|(id, d)| (*id, d.clone()))
    }
}

impl Default for InMemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DecorationSurface for InMemorySurface {
    fn create(
        &self,
        ns: NamespaceId,
        document: &PathBuf,
        line: u32,
        fragments: Vec<String>,
    ) -> Result<DecorationId, DecorationError> {
        let mut documents = self.documents.write();
        let state = documents
            .get_mut(document)
            .ok_or(DecorationError::UnknownDocument)?;
        if line >= state.line_count {
            return Err(DecorationError::StaleLine(line));
        }
        let id = DecorationId::next();
        state
            .marks
            .entry(ns)
            .or_default()
            .insert(id, PlacedDecoration { line, fragments });
        Ok(id)
    }

    fn update(
        &self,
        ns: NamespaceId,
        document: &PathBuf,
        id: DecorationId,
        line: u32,
        fragments: Vec<String>,
    ) -> Result<(), DecorationError> {
        let mut documents = self.documents.write();
        let state = documents
            .get_mut(document)
            .ok_or(DecorationError::UnknownDocument)?;
        if line >= state.line_count {
            return Err(DecorationError::StaleLine(line));
        }
        let mark = state
            .marks
            .get_mut(&ns)
            .and_then(|marks| marks.get_mut(&id))
            .ok_or(DecorationError::StaleDecoration)?;
        *mark = PlacedDecoration { line, fragments };
        Ok(())
    }

    fn remove(&self, ns: NamespaceId, document: &PathBuf, id: DecorationId) {
        if let Some(state) = self.documents.write().get_mut(document) {
            if let Some(marks) = state.marks.get_mut(&ns) {
                marks.remove(&id);
            }
        }
    }

    fn clear_lines(&self, ns: NamespaceId, document: &PathBuf, first: u32, last: u32) {
        if let Some(state) = self.documents.write().get_mut(document) {
            if let Some(marks) = state.marks.get_mut(&ns) {
                marks.retain(|_, d| d.line < first || d.line > last);
            }
        }
    }

    fn drop_document(&self, document: &PathBuf) {
        self.documents.write().remove(document);
    }
}

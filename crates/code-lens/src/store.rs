//! Lens store and mark cache

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use parking_lot::RwLock;

use editor_decorations::{DecorationId, NamespaceId};

use crate::{CodeLens, CodeLensCommand};

/// Last-received lenses, keyed by (document, provider).
///
/// A successful listing replaces the previous cycle's set wholesale; lens
/// identity is positional within one cycle and nothing survives across
/// cycles. Accessors create missing entries on demand.
pub struct LensStore {
    entries: RwLock<HashMap<PathBuf, BTreeMap<String, Vec<CodeLens>>>>,
}

impl LensStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the stored listing for (document, provider).
    pub fn save(&self, document: &PathBuf, provider_id: &str, lenses: Vec<CodeLens>) {
        self.entries
            .write()
            .entry(document.clone())
            .or_default()
            .insert(provider_id.to_string(), lenses);
    }

    /// Snapshot of one provider's lenses for a document.
    pub fn get(&self, document: &PathBuf, provider_id: &str) -> Vec<CodeLens> {
        self.entries
            .read()
            .get(document)
            .and_then(|per_provider| per_provider.get(provider_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Flattened snapshot across providers, in provider-id order.
    pub fn get_all(&self, document: &PathBuf) -> Vec<CodeLens> {
        self.entries
            .read()
            .get(document)
            .map(|per_provider| per_provider.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Lines occupied by one provider's lenses.
    pub fn lines(&self, document: &PathBuf, provider_id: &str) -> BTreeSet<u32> {
        self.entries
            .read()
            .get(document)
            .and_then(|per_provider| per_provider.get(provider_id))
            .map(|lenses| lenses.iter().map(CodeLens::line).collect())
            .unwrap_or_default()
    }

    /// Attach a resolved command to the lens at `index` of the stored
    /// listing. Returns `false` when the entry is gone (document detached),
    /// in which case the completion must become a no-op.
    pub fn attach_command(
        &self,
        document: &PathBuf,
        provider_id: &str,
        index: usize,
        command: CodeLensCommand,
    ) -> bool {
        let mut entries = self.entries.write();
        let Some(lens) = entries
            .get_mut(document)
            .and_then(|per_provider| per_provider.get_mut(provider_id))
            .and_then(|lenses| lenses.get_mut(index))
        else {
            return false;
        };
        lens.command = Some(command);
        true
    }

    /// Whether the document still has store entries.
    pub fn contains(&self, document: &PathBuf) -> bool {
        self.entries.read().contains_key(document)
    }

    pub fn drop_document(&self, document: &PathBuf) {
        self.entries.write().remove(document);
    }
}

impl Default for LensStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Rendered decoration ids, keyed by document, namespace and line.
///
/// Invariant (held on every non-edit path): a key present here corresponds
/// to a decoration currently placed in that namespace; absence means no
/// decoration is placed for that line.
pub struct MarkCache {
    entries: RwLock<HashMap<PathBuf, HashMap<NamespaceId, HashMap<u32, DecorationId>>>>,
}

impl MarkCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, document: &PathBuf, ns: NamespaceId, line: u32) -> Option<DecorationId> {
        self.entries
            .read()
            .get(document)
            .and_then(|per_ns| per_ns.get(&ns))
            .and_then(|lines| lines.get(&line))
            .copied()
    }

    pub fn insert(&self, document: &PathBuf, ns: NamespaceId, line: u32, id: DecorationId) {
        self.entries
            .write()
            .entry(document.clone())
            .or_default()
            .entry(ns)
            .or_default()
            .insert(line, id);
    }

    pub fn remove(&self, document: &PathBuf, ns: NamespaceId, line: u32) -> Option<DecorationId> {
        self.entries
            .write()
            .get_mut(document)
            .and_then(|per_ns| per_ns.get_mut(&ns))
            .and_then(|lines| lines.remove(&line))
    }

    /// Lines currently holding a decoration in a namespace.
    pub fn lines(&self, document: &PathBuf, ns: NamespaceId) -> BTreeSet<u32> {
        self.entries
            .read()
            .get(document)
            .and_then(|per_ns| per_ns.get(&ns))
            .map(|lines| lines.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Namespaces with at least one cached mark for a document.
    pub fn namespaces(&self, document: &PathBuf) -> Vec<NamespaceId> {
        self.entries
            .read()
            .get(document)
            .map(|per_ns| per_ns.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Remove and return every cached mark for a document.
    pub fn take_document(&self, document: &PathBuf) -> HashMap<NamespaceId, HashMap<u32, DecorationId>> {
        self.entries.write().remove(document).unwrap_or_default()
    }

    pub fn drop_document(&self, document: &PathBuf) {
        self.entries.write().remove(document);
    }
}

impl Default for MarkCache {
    fn default() -> Self {
        Self::new()
    }
}

//! # Code Lens
//!
//! Inline, line-anchored, lazily-resolved actionable annotations.
//!
//! Providers supply lenses per document; the service reconciles them with
//! whatever is already rendered (diff, clear, place), then resolves missing
//! lens commands asynchronously and re-renders exactly the lines whose
//! visible state must change, at the moment it must change. Lines keep their
//! previous decoration until their last pending lens has resolved, so the
//! transition from placeholder to final text never flickers.

pub mod commands;
pub mod diff;
pub mod execute;
pub mod provider;
pub mod refresh;
pub mod render;
pub mod resolve;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use editor_decorations::{DecorationSurface, NamespaceRegistry};

pub use commands::{CodeLensCommand, CommandHandler, CommandRegistry};
pub use diff::LineDiff;
pub use execute::RunOutcome;
pub use provider::{CodeLensProvider, LensPicker};
pub use store::{LensStore, MarkCache};

/// Title shown for a lens whose command has not been resolved yet.
pub const UNRESOLVED_TITLE: &str = "Unresolved lens ...";

/// Delimiter between lens titles sharing a line.
pub const TITLE_DELIMITER: &str = " | ";

/// Code lens service.
///
/// Owns the per-document lens store and mark cache and drives the refresh
/// pipeline. One service per process; documents are keyed by path.
pub struct CodeLensService {
    /// Registered providers
    providers: RwLock<Vec<Arc<dyn CodeLensProvider>>>,
    /// Last received lenses, per document and provider
    store: LensStore,
    /// Rendered decoration ids, per document, namespace and line
    marks: MarkCache,
    /// One namespace per provider
    namespaces: NamespaceRegistry,
    /// Host editing surface
    surface: Arc<dyn DecorationSurface>,
    /// Global command handlers
    commands: CommandRegistry,
    /// Ambiguity prompt for `run`
    picker: RwLock<Option<Arc<dyn LensPicker>>>,
    /// Documents with a refresh cycle outstanding
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl CodeLensService {
    pub fn new(surface: Arc<dyn DecorationSurface>) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            store: LensStore::new(),
            marks: MarkCache::new(),
            namespaces: NamespaceRegistry::new(),
            surface,
            commands: CommandRegistry::new(),
            picker: RwLock::new(None),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_picker(self, picker: Arc<dyn LensPicker>) -> Self {
        *self.picker.write() = Some(picker);
        self
    }

    /// Register a provider
    pub fn register<P: CodeLensProvider + 'static>(&self, provider: P) {
        self.providers.write().push(Arc::new(provider));
    }

    /// Register a global command handler
    pub fn register_command<H: CommandHandler + 'static>(&self, command: impl Into<String>, handler: H) {
        self.commands.register(command, handler);
    }

    /// Flattened read-only snapshot of the lenses saved for a document.
    pub fn get(&self, document: &PathBuf) -> Vec<CodeLens> {
        self.store.get_all(document)
    }

    /// Store a listing response for (document, provider), replacing the
    /// previous cycle's set.
    pub fn save(&self, document: &PathBuf, provider_id: &str, lenses: Vec<CodeLens>) {
        self.store.save(document, provider_id, lenses);
    }

    /// Remove every decoration and cache entry for a document, across all
    /// namespaces. The saved lenses stay; the next refresh re-renders.
    pub fn clear(&self, document: &PathBuf) {
        for (ns, lines) in self.marks.take_document(document) {
            for id in lines.into_values() {
                self.surface.remove(ns, document, id);
            }
        }
    }

    /// Edit notification: lines `first..=last` changed. Decorations in the
    /// range are cleared immediately in every namespace. Mark cache entries
    /// are kept; the renderer drops them when their update fails.
    pub fn on_lines_changed(&self, document: &PathBuf, first: u32, last: u32) {
        for ns in self.marks.namespaces(document) {
            self.surface.clear_lines(ns, document, first, last);
        }
    }

    /// Document close: drop the lens store and mark cache entries. The host
    /// surface removes the decorations themselves. Resolution completions
    /// arriving afterwards become no-ops.
    pub fn on_document_close(&self, document: &PathBuf) {
        self.store.drop_document(document);
        self.marks.drop_document(document);
    }

    /// Whether a refresh cycle is outstanding for the document.
    pub fn is_refreshing(&self, document: &PathBuf) -> bool {
        self.in_flight.lock().contains(document)
    }

    pub(crate) fn providers_snapshot(&self) -> Vec<Arc<dyn CodeLensProvider>> {
        self.providers.read().clone()
    }

    pub(crate) fn surface(&self) -> &dyn DecorationSurface {
        self.surface.as_ref()
    }
}

/// Code lens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeLens {
    /// Range where the lens anchors; the start line is the render line and
    /// the start column orders lenses sharing a line.
    pub range: Range,
    /// Command to execute (absent until resolved)
    pub command: Option<CodeLensCommand>,
    /// Opaque provider payload, round-tripped at resolve time
    pub data: Option<serde_json::Value>,
}

impl CodeLens {
    pub fn new(range: Range) -> Self {
        Self {
            range,
            command: None,
            data: None,
        }
    }

    pub fn with_command(mut self, command: CodeLensCommand) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Is this lens resolved?
    pub fn is_resolved(&self) -> bool {
        self.command.is_some()
    }

    /// Line this lens anchors at.
    pub fn line(&self) -> u32 {
        self.range.start.line
    }
}

/// Range in document
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start: Position { line: start_line, character: start_col },
            end: Position { line: end_line, character: end_col },
        }
    }

    pub fn line(line: u32) -> Self {
        Self::new(line, 0, line, 0)
    }

    pub fn at(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }
}

/// Position in document
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

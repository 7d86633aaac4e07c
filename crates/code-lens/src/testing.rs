//! Scripted collaborators for the engine's tests

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use editor_decorations::{
    DecorationError, DecorationId, DecorationSurface, InMemorySurface, NamespaceId,
};

use crate::{
    CodeLens, CodeLensCommand, CodeLensProvider, CommandHandler, LensPicker, Range,
};

pub(crate) fn doc() -> PathBuf {
    PathBuf::from("/tmp/main.rs")
}

type Executions = Arc<Mutex<Vec<(String, Vec<serde_json::Value>)>>>;

/// Provider with scripted listings and resolutions.
///
/// Listings are consumed in order; the last one repeats. Resolutions are
/// keyed by the lens anchor (line, column). Optional gates park the listing
/// or resolve requests until the test notifies them.
pub(crate) struct ScriptedProvider {
    id: String,
    listings: Mutex<VecDeque<Result<Vec<CodeLens>, String>>>,
    resolutions: Mutex<HashMap<(u32, u32), Result<CodeLensCommand, String>>>,
    supported: Vec<String>,
    local_handlers: HashMap<String, Arc<dyn CommandHandler>>,
    listing_gate: Option<Arc<Notify>>,
    resolve_gate: Option<Arc<Notify>>,
    listing_calls: Arc<AtomicUsize>,
    executions: Executions,
}

impl ScriptedProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            listings: Mutex::new(VecDeque::new()),
            resolutions: Mutex::new(HashMap::new()),
            supported: Vec::new(),
            local_handlers: HashMap::new(),
            listing_gate: None,
            resolve_gate: None,
            listing_calls: Arc::new(AtomicUsize::new(0)),
            executions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn listing(self, lenses: Vec<CodeLens>) -> Self {
        self.listings.lock().push_back(Ok(lenses));
        self
    }

    pub fn listing_err(self) -> Self {
        self.listings.lock().push_back(Err("listing failed".to_string()));
        self
    }

    pub fn resolution(self, line: u32, col: u32, title: &str) -> Self {
        self.resolutions
            .lock()
            .insert((line, col), Ok(CodeLensCommand::new(title, "lenskit.run")));
        self
    }

    pub fn resolution_err(self, line: u32, col: u32) -> Self {
        self.resolutions
            .lock()
            .insert((line, col), Err("resolve failed".to_string()));
        self
    }

    pub fn supports(mut self, command: &str) -> Self {
        self.supported.push(command.to_string());
        self
    }

    pub fn local_handler(mut self, command: &str, handler: Arc<dyn CommandHandler>) -> Self {
        self.local_handlers.insert(command.to_string(), handler);
        self
    }

    pub fn gate_listings(mut self, gate: Arc<Notify>) -> Self {
        self.listing_gate = Some(gate);
        self
    }

    pub fn gate_resolutions(mut self, gate: Arc<Notify>) -> Self {
        self.resolve_gate = Some(gate);
        self
    }

    pub fn listing_gate() -> Arc<Notify> {
        Arc::new(Notify::new())
    }

    pub fn resolve_gate() -> Arc<Notify> {
        Arc::new(Notify::new())
    }

    pub fn listing_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.listing_calls)
    }

    pub fn executions(&self) -> Executions {
        Arc::clone(&self.executions)
    }

    pub fn unresolved_lens(line: u32, col: u32) -> CodeLens {
        CodeLens::new(Range::at(line, col)).with_data(serde_json::json!({ "line": line }))
    }

    pub fn resolved_lens(line: u32, col: u32, title: &str) -> CodeLens {
        Self::resolved_lens_cmd(line, col, title, "lenskit.run")
    }

    pub fn resolved_lens_cmd(line: u32, col: u32, title: &str, command: &str) -> CodeLens {
        CodeLens::new(Range::at(line, col)).with_command(CodeLensCommand::new(title, command))
    }
}

#[async_trait]
impl CodeLensProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn lenses(&self, _document: &PathBuf) -> anyhow::Result<Vec<CodeLens>> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.listing_gate {
            gate.notified().await;
        }
        let next = {
            let mut listings = self.listings.lock();
            if listings.len() > 1 {
                listings.pop_front()
            } else {
                listings.front().cloned()
            }
        };
        match next {
            Some(Ok(lenses)) => Ok(lenses),
            Some(Err(message)) => anyhow::bail!(message),
            None => Ok(Vec::new()),
        }
    }

    async fn resolve(&self, lens: &CodeLens) -> anyhow::Result<CodeLensCommand> {
        if let Some(gate) = &self.resolve_gate {
            gate.notified().await;
        }
        let key = (lens.range.start.line, lens.range.start.character);
        let scripted = self.resolutions.lock().get(&key).cloned();
        match scripted {
            Some(Ok(command)) => Ok(command),
            Some(Err(message)) => anyhow::bail!(message),
            None => anyhow::bail!("no scripted resolution at {key:?}"),
        }
    }

    fn supported_commands(&self) -> Vec<String> {
        self.supported.clone()
    }

    async fn execute_command(
        &self,
        command: &str,
        arguments: Vec<serde_json::Value>,
    ) -> anyhow::Result<serde_json::Value> {
        self.executions.lock().push((command.to_string(), arguments));
        Ok(serde_json::Value::Null)
    }

    fn command_handler(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.local_handlers.get(command).cloned()
    }
}

/// Picker returning a fixed choice and recording every prompt.
pub(crate) struct ScriptedPicker {
    choice: Option<usize>,
    prompts: Mutex<Vec<Vec<String>>>,
}

impl ScriptedPicker {
    pub fn choosing(choice: Option<usize>) -> Self {
        Self {
            choice,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<Vec<String>> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LensPicker for ScriptedPicker {
    async fn choose(&self, labels: Vec<String>) -> Option<usize> {
        self.prompts.lock().push(labels);
        self.choice
    }
}

/// In-memory surface that additionally records every successful write per
/// (namespace, line), so tests can assert render counts and content history.
pub(crate) struct RecordingSurface {
    inner: InMemorySurface,
    renders: Mutex<HashMap<(NamespaceId, PathBuf, u32), Vec<Vec<String>>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            inner: InMemorySurface::new(),
            renders: Mutex::new(HashMap::new()),
        }
    }

    pub fn attach(&self, document: &PathBuf, line_count: u32) {
        self.inner.attach_document(document.clone(), line_count);
    }

    pub fn drop_doc(&self, document: &PathBuf) {
        self.inner.drop_document(document);
    }

    /// History of fragment writes at a line, oldest first.
    pub fn renders(&self, ns: NamespaceId, document: &PathBuf, line: u32) -> Vec<Vec<String>> {
        self.renders
            .lock()
            .get(&(ns, document.clone(), line))
            .cloned()
            .unwrap_or_default()
    }

    pub fn decorated_lines(&self, ns: NamespaceId, document: &PathBuf) -> Vec<u32> {
        self.inner.decorated_lines(ns, document)
    }

    pub fn decoration_id_at(&self, ns: NamespaceId, document: &PathBuf, line: u32) -> Option<DecorationId> {
        self.inner.decoration_at(ns, document, line).map(|(id, _)| id)
    }

    fn record(&self, ns: NamespaceId, document: &PathBuf, line: u32, fragments: &[String]) {
        self.renders
            .lock()
            .entry((ns, document.clone(), line))
            .or_default()
            .push(fragments.to_vec());
    }
}

impl DecorationSurface for RecordingSurface {
    fn create(
        &self,
        ns: NamespaceId,
        document: &PathBuf,
        line: u32,
        fragments: Vec<String>,
    ) -> Result<DecorationId, DecorationError> {
        let id = self.inner.create(ns, document, line, fragments.clone())?;
        self.record(ns, document, line, &fragments);
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
        self.inner.update(ns, document, id, line, fragments.clone())?;
        self.record(ns, document, line, &fragments);
        Ok(())
    }

    fn remove(&self, ns: NamespaceId, document: &PathBuf, id: DecorationId) {
        self.inner.remove(ns, document, id);
    }

    fn clear_lines(&self, ns: NamespaceId, document: &PathBuf, first: u32, last: u32) {
        self.inner.clear_lines(ns, document, first, last);
    }

    fn drop_document(&self, document: &PathBuf) {
        self.inner.drop_document(document);
    }
}

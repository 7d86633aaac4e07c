//! Provider and picker seams

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{CodeLens, CodeLensCommand, CommandHandler};

/// Code lens provider.
///
/// The transport behind a provider (stdio server, in-process scanner, ...)
/// is the provider's own business; the engine only issues the bulk listing
/// request, per-lens resolve requests and, when asked to, a generic
/// execute-command request scoped to this provider.
#[async_trait]
pub trait CodeLensProvider: Send + Sync {
    /// Provider ID; doubles as the decoration namespace key.
    fn id(&self) -> &str;

    /// List lenses for a document, ordered as the provider wants them shown.
    async fn lenses(&self, document: &PathBuf) -> anyhow::Result<Vec<CodeLens>>;

    /// Resolve the command for one lens (lazy loading).
    async fn resolve(&self, lens: &CodeLens) -> anyhow::Result<CodeLensCommand>;

    /// Command identifiers this provider accepts for generic execution.
    fn supported_commands(&self) -> Vec<String> {
        Vec::new()
    }

    /// Execute a command generically on this provider.
    async fn execute_command(
        &self,
        command: &str,
        _arguments: Vec<serde_json::Value>,
    ) -> anyhow::Result<serde_json::Value> {
        anyhow::bail!("provider {} cannot execute {command}", self.id())
    }

    /// Local handler for a command identifier, if the provider ships one.
    fn command_handler(&self, _command: &str) -> Option<Arc<dyn CommandHandler>> {
        None
    }
}

/// Interactive selection collaborator.
///
/// Asked to disambiguate when several lenses share the cursor line. `None`
/// means the user dismissed the prompt; nothing is dispatched then.
#[async_trait]
pub trait LensPicker: Send + Sync {
    async fn choose(&self, labels: Vec<String>) -> Option<usize>;
}

//! Lens commands and the global handler registry

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Code lens command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeLensCommand {
    /// Display title
    pub title: String,
    /// Command ID to execute
    pub command: String,
    /// Command arguments
    #[serde(default)]
    pub arguments: Vec<serde_json::Value>,
}

impl CodeLensCommand {
    /// Create a new command
    pub fn new(title: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            command: command.into(),
            arguments: Vec::new(),
        }
    }

    /// Add argument
    pub fn with_arg(mut self, arg: serde_json::Value) -> Self {
        self.arguments.push(arg);
        self
    }
}

/// In-process handler for a command identifier.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: &CodeLensCommand, document: &PathBuf) -> anyhow::Result<()>;
}

/// Global command handlers, keyed by identifier.
///
/// Consulted by the executor after the owning provider's local handler table
/// and before falling back to a generic execute-command request.
pub struct CommandRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler for a command identifier
    pub fn register<H: CommandHandler + 'static>(&self, command: impl Into<String>, handler: H) {
        self.handlers.write().insert(command.into(), Arc::new(handler));
    }

    /// Look up the handler for a command identifier
    pub fn get(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.read().get(command).cloned()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard lens commands
pub mod standard {
    use super::*;

    /// Show references command
    pub fn show_references(file: &str, line: u32, column: u32) -> CodeLensCommand {
        CodeLensCommand::new("references", "lenskit.showReferences")
            .with_arg(serde_json::json!({
                "file": file,
                "line": line,
                "column": column
            }))
    }

    /// Show implementations command
    pub fn show_implementations(file: &str, line: u32) -> CodeLensCommand {
        CodeLensCommand::new("implementations", "lenskit.showImplementations")
            .with_arg(serde_json::json!({
                "file": file,
                "line": line
            }))
    }

    /// Run test command
    pub fn run_test(test_name: &str, file: &str) -> CodeLensCommand {
        CodeLensCommand::new("▶ Run Test", "lenskit.runTest")
            .with_arg(serde_json::json!({
                "name": test_name,
                "file": file
            }))
    }

    /// Debug test command
    pub fn debug_test(test_name: &str, file: &str) -> CodeLensCommand {
        CodeLensCommand::new("🐛 Debug Test", "lenskit.debugTest")
            .with_arg(serde_json::json!({
                "name": test_name,
                "file": file
            }))
    }

    /// Run command
    pub fn run(file: &str) -> CodeLensCommand {
        CodeLensCommand::new("▶ Run", "lenskit.run")
            .with_arg(serde_json::json!({ "file": file }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl CommandHandler for Counting {
        async fn handle(&self, _command: &CodeLensCommand, _document: &PathBuf) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let registry = CommandRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register("lenskit.runTest", Counting(calls.clone()));

        assert!(registry.get("lenskit.debugTest").is_none());

        let handler = registry.get("lenskit.runTest").unwrap();
        let command = standard::run_test("parses_empty_input", "/tmp/parser.rs");
        handler.handle(&command, &PathBuf::from("/tmp/parser.rs")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_standard_commands_carry_arguments() {
        let command = standard::show_references("/tmp/main.rs", 12, 4);
        assert_eq!(command.command, "lenskit.showReferences");
        assert_eq!(command.arguments.len(), 1);
        assert_eq!(command.arguments[0]["line"], 12);
    }
}

//! Executor: dispatch the lens under the cursor

use std::path::PathBuf;
use std::sync::Arc;

use crate::{CodeLens, CodeLensCommand, CodeLensProvider, CodeLensService, UNRESOLVED_TITLE};

/// What `run` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No lens anchored at the cursor line.
    NothingToRun,
    /// A lens command was dispatched.
    Dispatched,
    /// The prompt was dismissed (or no picker is registered).
    Cancelled,
    /// The chosen lens has no command yet.
    Unresolved,
    /// The owning provider does not support the command.
    UnsupportedCommand,
}

impl CodeLensService {
    /// Run the lens at `cursor_line`. With several candidates the picker
    /// disambiguates; dispatch happens only on a choice.
    pub async fn run(&self, cursor_line: u32, document: &PathBuf) -> anyhow::Result<RunOutcome> {
        let mut options: Vec<(Arc<dyn CodeLensProvider>, CodeLens)> = Vec::new();
        for provider in self.providers_snapshot() {
            for lens in self.store.get(document, provider.id()) {
                if lens.line() == cursor_line {
                    options.push((Arc::clone(&provider), lens));
                }
            }
        }

        let (provider, lens) = match options.len() {
            0 => {
                tracing::info!(line = cursor_line, "no lens to run on this line");
                return Ok(RunOutcome::NothingToRun);
            }
            1 => options.remove(0),
            _ => {
                let picker = self.picker.read().clone();
                let Some(picker) = picker else {
                    tracing::info!(line = cursor_line, "multiple lenses and no picker registered");
                    return Ok(RunOutcome::Cancelled);
                };
                let labels = options.iter().map(|(p, l)| option_label(p.id(), l)).collect();
                match picker.choose(labels).await {
                    Some(choice) if choice < options.len() => options.remove(choice),
                    _ => return Ok(RunOutcome::Cancelled),
                }
            }
        };

        let Some(command) = lens.command else {
            tracing::info!(line = cursor_line, "lens is not resolved yet");
            return Ok(RunOutcome::Unresolved);
        };
        self.dispatch(provider, command, document).await
    }

    /// Dispatch order: provider-local handler, global handler, then a
    /// capability-checked generic execute-command request to the owning
    /// provider only, followed by a fresh refresh.
    async fn dispatch(
        &self,
        provider: Arc<dyn CodeLensProvider>,
        command: CodeLensCommand,
        document: &PathBuf,
    ) -> anyhow::Result<RunOutcome> {
        if let Some(handler) = provider.command_handler(&command.command) {
            handler.handle(&command, document).await?;
            return Ok(RunOutcome::Dispatched);
        }
        if let Some(handler) = self.commands.get(&command.command) {
            handler.handle(&command, document).await?;
            return Ok(RunOutcome::Dispatched);
        }
        if !provider.supported_commands().iter().any(|c| c == &command.command) {
            tracing::warn!(
                provider = provider.id(),
                command = %command.command,
                "command not supported by the owning provider"
            );
            return Ok(RunOutcome::UnsupportedCommand);
        }
        provider
            .execute_command(&command.command, command.arguments.clone())
            .await?;
        self.refresh(document).await;
        Ok(RunOutcome::Dispatched)
    }
}

fn option_label(provider_id: &str, lens: &CodeLens) -> String {
    let title = lens
        .command
        .as_ref()
        .map(|c| c.title.as_str())
        .unwrap_or(UNRESOLVED_TITLE);
    format!("{provider_id}: {title}")
}

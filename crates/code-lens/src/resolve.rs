//! Async resolution with flicker-free incremental re-rendering

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use editor_decorations::NamespaceId;

use crate::{CodeLens, CodeLensProvider, CodeLensService};

/// Per-cycle resolution bookkeeping: one global pending counter and one per
/// affected line. Created at the start of the resolve phase, dropped when the
/// cycle completes.
struct ResolveState {
    pending_total: usize,
    pending_by_line: HashMap<u32, usize>,
}

impl ResolveState {
    /// Lenses that already carry a command count as immediately complete and
    /// never enter the counters.
    fn new(lenses: &[CodeLens]) -> Self {
        let mut pending_by_line = HashMap::new();
        let mut pending_total = 0;
        for lens in lenses.iter().filter(|l| !l.is_resolved()) {
            *pending_by_line.entry(lens.line()).or_insert(0) += 1;
            pending_total += 1;
        }
        Self {
            pending_total,
            pending_by_line,
        }
    }

    /// Record one completion. Returns `true` when the line's counter just
    /// reached zero (every lens on the line is now resolved).
    fn complete(&mut self, line: u32) -> bool {
        self.pending_total = self.pending_total.saturating_sub(1);
        let remaining = self
            .pending_by_line
            .get_mut(&line)
            .map(|count| {
                *count = count.saturating_sub(1);
                *count
            })
            .unwrap_or(0);
        remaining == 0
    }

    fn is_done(&self) -> bool {
        self.pending_total == 0
    }
}

impl CodeLensService {
    /// Resolve every unresolved lens of one provider's stored listing and
    /// re-render incrementally.
    ///
    /// The flicker rule: after a completion, the line is re-rendered now only
    /// if it is in `fresh` (no prior decoration this cycle, any intermediate
    /// state is the first the user sees) or its pending counter just hit zero
    /// (the combined final state is ready). Anything else would paint a
    /// partial mix of titles and placeholders that needs repainting moments
    /// later.
    ///
    /// Returns once the global counter reaches zero; the caller releasing the
    /// in-flight flag is the completion continuation.
    pub(crate) async fn resolve_all(
        &self,
        provider: &Arc<dyn CodeLensProvider>,
        document: &PathBuf,
        ns: NamespaceId,
        fresh: &BTreeSet<u32>,
    ) {
        let lenses = self.store.get(document, provider.id());
        let mut state = ResolveState::new(&lenses);
        if state.is_done() {
            return;
        }

        let mut requests = FuturesUnordered::new();
        for (index, lens) in lenses.into_iter().enumerate() {
            if lens.is_resolved() {
                continue;
            }
            let provider = Arc::clone(provider);
            requests.push(async move {
                let line = lens.line();
                let result = provider.resolve(&lens).await;
                (index, line, result)
            });
        }

        while let Some((index, line, result)) = requests.next().await {
            let attached = match result {
                Ok(command) => self.store.attach_command(document, provider.id(), index, command),
                Err(err) => {
                    // Counted as resolved-with-no-detail: the placeholder
                    // stays and the lens is not retried this cycle.
                    tracing::warn!(provider = provider.id(), line, error = %err, "lens resolution failed");
                    self.store.contains(document)
                }
            };
            let line_done = state.complete(line);
            if attached && (fresh.contains(&line) || line_done) {
                let lenses = self.store.get(document, provider.id());
                self.display_line(&lenses, document, ns, line);
            }
        }
        debug_assert!(state.is_done());
    }
}

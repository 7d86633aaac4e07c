//! Refresh coordinator: one cycle per document, list through resolve

use std::path::PathBuf;
use std::sync::Arc;

use crate::diff::diff;
use crate::{CodeLens, CodeLensProvider, CodeLensService};

impl CodeLensService {
    /// Run one full refresh cycle for a document:
    /// list → save → diff → clear invalid → place fresh → resolve → release.
    ///
    /// At most one cycle is in flight per document; a call while one is
    /// outstanding is silently dropped (this is the debounce). The in-flight
    /// flag spans the entire resolve phase, so two cycles never race on the
    /// same mark cache entries.
    pub async fn refresh(&self, document: &PathBuf) {
        if !self.in_flight.lock().insert(document.clone()) {
            tracing::debug!(document = %document.display(), "refresh already in flight");
            return;
        }
        tracing::debug!(document = %document.display(), "refresh cycle started");

        for provider in self.providers_snapshot() {
            match provider.lenses(document).await {
                Ok(lenses) => self.reconcile(&provider, document, lenses).await,
                Err(err) => {
                    // Recoverable: this provider's prior decorations stay
                    // visible until a later cycle succeeds.
                    tracing::warn!(provider = provider.id(), error = %err, "lens listing failed");
                }
            }
        }

        self.in_flight.lock().remove(document);
        tracing::debug!(document = %document.display(), "refresh cycle released");
    }

    /// Reconcile one provider's fresh listing against what is rendered.
    async fn reconcile(
        &self,
        provider: &Arc<dyn CodeLensProvider>,
        document: &PathBuf,
        lenses: Vec<CodeLens>,
    ) {
        let ns = self.namespaces.get_or_create(provider.id());
        self.store.save(document, provider.id(), lenses);

        let cached = self.marks.lines(document, ns);
        let incoming = self.store.lines(document, provider.id());
        let diff = diff(&cached, &incoming);

        for line in &diff.invalid {
            if let Some(id) = self.marks.remove(document, ns, *line) {
                self.surface().remove(ns, document, id);
            }
        }

        // Fresh lines get their placeholder before any resolution request is
        // issued, so a resolution can never re-render a line the user has
        // not seen yet.
        let lenses = self.store.get(document, provider.id());
        self.display_lines(&lenses, document, ns, &diff.fresh);

        self.resolve_all(provider, document, ns, &diff.fresh).await;
    }
}

//! Renderer: grouped, delimited lens fragments per line

use std::collections::BTreeSet;
use std::path::PathBuf;

use editor_decorations::NamespaceId;

use crate::{CodeLens, CodeLensService, TITLE_DELIMITER, UNRESOLVED_TITLE};

/// Ordered fragment sequence for one line: lens titles sorted by ascending
/// anchor column (stable for equal columns), interleaved with the delimiter.
/// Unresolved lenses contribute the placeholder title. Empty when the line
/// has no lenses.
pub fn fragments_for_line(lenses: &[CodeLens], line: u32) -> Vec<String> {
    let mut on_line: Vec<&CodeLens> = lenses.iter().filter(|l| l.line() == line).collect();
    on_line.sort_by_key(|l| l.range.start.character);

    let mut fragments = Vec::with_capacity(on_line.len() * 2);
    for lens in on_line {
        if !fragments.is_empty() {
            fragments.push(TITLE_DELIMITER.to_string());
        }
        let title = lens
            .command
            .as_ref()
            .map(|c| c.title.as_str())
            .unwrap_or(UNRESOLVED_TITLE);
        fragments.push(title.to_string());
    }
    fragments
}

impl CodeLensService {
    /// Render every line in `lines` for one provider's lens set.
    pub(crate) fn display_lines(
        &self,
        lenses: &[CodeLens],
        document: &PathBuf,
        ns: NamespaceId,
        lines: &BTreeSet<u32>,
    ) {
        for &line in lines {
            self.display_line(lenses, document, ns, line);
        }
    }

    /// Render one line: move or update the cached decoration in place, or
    /// place a new one and record its id.
    ///
    /// An update failure means the underlying line (or the decoration) is
    /// gone; the stale cache entry is dropped and the line gets a fresh
    /// placement on the next cycle, when the diff reports it as fresh.
    pub(crate) fn display_line(&self, lenses: &[CodeLens], document: &PathBuf, ns: NamespaceId, line: u32) {
        let fragments = fragments_for_line(lenses, line);
        if fragments.is_empty() {
            return;
        }
        if let Some(id) = self.marks.get(document, ns, line) {
            if let Err(err) = self.surface().update(ns, document, id, line, fragments) {
                tracing::debug!(line, error = %err, "dropping stale mark cache entry");
                self.marks.remove(document, ns, line);
            }
            return;
        }
        match self.surface().create(ns, document, line, fragments) {
            Ok(id) => self.marks.insert(document, ns, line, id),
            Err(err) => tracing::debug!(line, error = %err, "skipped lens placement"),
        }
    }
}

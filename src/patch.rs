//! Re-injection of blank runs into rendered HTML.
//!
//! The renderer annotates its output with one comment marker per tracked
//! block, placed right after the block's closing tag. Patching replaces each
//! marker with the empty paragraphs its blank run calls for (or with nothing)
//! so the result carries no trace of the correlation scheme.

use crate::scan::BlankRun;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// The element materialized for each preserved blank line beyond the first.
pub const EMPTY_PARAGRAPH: &str = "<p></p>";

/// Correlation marker emitted after the closing tag of block `index`.
///
/// The trailing newline keeps the HTML writer's newline state unchanged, so
/// stripping markers is an exact inverse of inserting them.
pub fn block_marker(index: usize) -> String {
    format!("<!--blk:{index}-->\n")
}

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<!--blk:(\d+)-->\n").expect("marker regex is valid"))
}

/// Replaces every correlation marker in `html`, inserting `extra` empty
/// paragraphs where a [`BlankRun`] names the marker's block index.
///
/// Runs whose index matches no marker are dropped; the output is never
/// partial or garbled. With an empty run list this strips the markers and
/// nothing else.
pub fn patch_blank_runs(html: &str, runs: &[BlankRun]) -> String {
    let by_index: BTreeMap<usize, usize> = runs
        .iter()
        .map(|run| (run.block_index, run.extra))
        .collect();
    let mut matched: BTreeSet<usize> = BTreeSet::new();

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for found in marker_regex().find_iter(html) {
        out.push_str(&html[last..found.start()]);
        last = found.end();

        let marker = found.as_str();
        let digits = &marker["<!--blk:".len()..marker.len() - "-->\n".len()];
        if let Ok(index) = digits.parse::<usize>() {
            matched.insert(index);
            if let Some(&extra) = by_index.get(&index) {
                for _ in 0..extra {
                    out.push_str(EMPTY_PARAGRAPH);
                }
            }
        }
    }
    out.push_str(&html[last..]);

    for run in runs {
        if !matched.contains(&run.block_index) {
            tracing::debug!(
                block_index = run.block_index,
                extra = run.extra,
                "dropping blank run with no matching block marker"
            );
        }
    }
    out
}

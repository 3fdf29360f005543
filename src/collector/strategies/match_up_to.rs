use super::{trim_history, Observer, Proposal, SelectionContext};
use crate::collector::candidate::{Action, Candidate};
use crate::paths::{history_id, stem};
use std::path::{Path, PathBuf};

/// Adds the siblings of each picked file: every other file whose stem shares
/// the prefix up to the `match_up_to` delimiter ("Film - Part 1",
/// "Film - Part 2" with `" - "`).
pub struct MatchUpTo;

fn prefix<'a>(name: &'a str, delimiter: &str) -> Option<&'a str> {
    name.find(delimiter).map(|pos| &name[..pos])
}

impl Observer for MatchUpTo {
    fn name(&self) -> &'static str {
        "match_up_to"
    }

    fn observe(&self, ctx: &SelectionContext<'_>, proposal: &mut Proposal) {
        let Some(delimiter) = ctx.instruction.match_up_to.as_deref() else {
            return;
        };
        if delimiter.is_empty() {
            return;
        }

        let mut expanded: Vec<Candidate> = Vec::with_capacity(proposal.candidates.len());
        let mut added: Vec<PathBuf> = Vec::new();
        let already = |path: &Path, list: &[Candidate]| list.iter().any(|c| c.src == path);

        let candidates = std::mem::take(&mut proposal.candidates);
        let mut iter = candidates.into_iter().peekable();
        while let Some(candidate) = iter.next() {
            let src = candidate.src.clone();
            let copy = candidate.is_copy();
            expanded.push(candidate);

            // keep a candidate's own move right behind it
            let mut move_target = None;
            if let Some(next) = iter.peek() {
                if let Action::Move { ref to } = next.action {
                    if next.src == src {
                        move_target = Some(to.clone());
                        if let Some(mv) = iter.next() {
                            expanded.push(mv);
                        }
                    }
                }
            }

            if !copy {
                continue;
            }
            let own_stem = stem(&src);
            let Some(own_prefix) = prefix(&own_stem, delimiter) else {
                continue;
            };

            for file in ctx.files {
                if *file == src || already(file, &expanded) || added.contains(file) {
                    continue;
                }
                let file_stem = stem(file);
                if prefix(&file_stem, delimiter) != Some(own_prefix) {
                    continue;
                }
                expanded.push(Candidate::copy(ctx.index, file));
                if let Some(ref to) = move_target {
                    expanded.push(Candidate::relocate(ctx.index, file, to));
                }
                added.push(file.clone());
            }
        }

        // siblings picked later by the strategy itself are dropped as duplicates
        let mut seen: Vec<(PathBuf, bool)> = Vec::new();
        expanded.retain(|c| {
            let key = (c.src.clone(), c.is_copy());
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        proposal.candidates = expanded;

        if ctx.instruction.random && !added.is_empty() {
            let history = &mut proposal.instruction.history;
            for file in &added {
                let id = history_id(file);
                if !history.contains(&id) {
                    history.push(id);
                }
            }
            trim_history(history, ctx.instruction.max_history_length);
        }

        if !added.is_empty() {
            tracing::debug!("Added {} sibling file(s) for '{}'", added.len(), ctx.instruction.label());
        }
    }
}

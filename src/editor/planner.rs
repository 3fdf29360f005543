//! Segment boundaries for split edits.
//!
//! Generated splits divide `total + backtrack` into equal parts so the
//! remainder is spread over every segment instead of piling up at the end.
//! Each start is pulled back by the backtrack, so neighbouring segments
//! share a short lead-in. The last segment never carries a duration and runs
//! to the end of the source, absorbing any rounding drift.

use super::normalise::{source_extension, with_extension};
use crate::config::{Section, SplitEdit};
use mandolin_av::template::{padded_index, DEFAULT_SEGMENT_TEMPLATE};
use mandolin_av::TemplateVars;
use std::path::Path;
use std::time::Duration;

/// One cut before naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cut {
    pub start: Duration,
    /// `None` runs to the end of the source.
    pub duration: Option<Duration>,
}

/// A named cut of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// One-based.
    pub index: usize,
    pub start: Duration,
    pub duration: Option<Duration>,
    /// Output file name, `None` when the segment only feeds an intermediate.
    pub filename: Option<String>,
    /// Intermediate name joins can refer to.
    pub reference: Option<String>,
}

/// `ceil((total + backtrack) / (max + backtrack))`, at least one.
pub fn segment_count(total: Duration, max: Duration, backtrack: Duration) -> usize {
    let whole = (total + backtrack).as_nanos();
    let step = (max + backtrack).as_nanos();
    if step == 0 {
        return 1;
    }
    whole.div_ceil(step).max(1) as usize
}

/// Evenly sized cuts covering `total`.
///
/// ```
/// use mandolin::editor::planner::generate_cuts;
/// use std::time::Duration;
///
/// let cuts = generate_cuts(Duration::from_millis(1000), Some(Duration::from_millis(400)), None, Duration::ZERO);
/// assert_eq!(cuts.len(), 3);
/// assert_eq!(cuts[1].start.as_millis(), 333);
/// assert_eq!(cuts[2].duration, None);
/// ```
pub fn generate_cuts(
    total: Duration,
    max: Option<Duration>,
    segments: Option<usize>,
    backtrack: Duration,
) -> Vec<Cut> {
    let n = match segments {
        Some(n) => n.max(1),
        None => segment_count(total, max.unwrap_or(total), backtrack),
    };
    let whole = total + backtrack;
    let actual = Duration::from_nanos((whole.as_nanos() / n as u128) as u64);

    let mut cuts = Vec::with_capacity(n);
    let mut start = Duration::ZERO;
    for i in 0..n {
        if i > 0 {
            start = (start + actual).saturating_sub(backtrack);
        }
        let duration = (i + 1 < n).then_some(actual);
        cuts.push(Cut { start, duration });
    }
    cuts
}

/// Cuts for an explicit section list.
///
/// A section without `start` begins at `end - duration` when both are
/// given, otherwise where the previous one ended minus the backtrack.
pub fn section_cuts(sections: &[Section], backtrack: Duration) -> Vec<Cut> {
    let mut cuts = Vec::with_capacity(sections.len());
    let mut previous_end = Duration::ZERO;

    for (i, section) in sections.iter().enumerate() {
        let end = section.end.map(Duration::from);
        let length = section.duration.map(Duration::from);

        let start = match (section.start, end, length) {
            (Some(start), _, _) => start.into(),
            (None, Some(end), Some(length)) => end.saturating_sub(length),
            _ if i == 0 => previous_end,
            _ => previous_end.saturating_sub(backtrack),
        };

        let duration = length.or_else(|| end.filter(|e| *e > start).map(|e| e - start));
        previous_end = duration.map_or(start, |d| start + d);
        cuts.push(Cut { start, duration });
    }
    cuts
}

/// Name the cuts of `src`.
pub fn name_segments(split: &SplitEdit, src: &Path, cuts: &[Cut], prepend_with_digits: bool) -> Vec<Segment> {
    let ext = source_extension(src);
    let base_vars = TemplateVars::for_source(src);
    let count = cuts.len();

    cuts.iter()
        .enumerate()
        .map(|(k, cut)| {
            let index = k + 1;
            let section = split.sections.get(k);
            let padded = padded_index(index, count);

            let reference = section
                .and_then(|s| s.reference.clone())
                .or_else(|| split.reference.as_ref().map(|r| format!("{} {}", r, index)));
            let template = section
                .and_then(|s| s.filename.clone())
                .or_else(|| split.filename.clone());

            let filename = match (template, &reference) {
                (None, Some(_)) => None,
                (template, _) => {
                    let template = template.unwrap_or_else(|| DEFAULT_SEGMENT_TEMPLATE.to_string());
                    let rendered = base_vars.clone().with("i", &padded).render(&template);
                    let named = with_extension(&rendered, &ext);
                    Some(if prepend_with_digits {
                        format!("{} {}", padded, named)
                    } else {
                        named
                    })
                }
            };

            Segment {
                index,
                start: cut.start,
                duration: cut.duration,
                filename,
                reference,
            }
        })
        .collect()
}

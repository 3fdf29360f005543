//! Folding a run's outcome back into the instruction records.

use super::copy::CopyReport;
use super::strategies::Proposal;
use crate::config::Instruction;

/// New instruction records after a run.
///
/// An instruction advances to its proposal only when every one of its copy
/// candidates was delivered; otherwise its old record is kept so the same
/// files are tried again next time. `proposals` is indexed like
/// `instructions`.
pub fn commit(
    instructions: &[Instruction],
    proposals: &[Option<Proposal>],
    report: &CopyReport,
) -> Vec<Instruction> {
    instructions
        .iter()
        .enumerate()
        .map(|(i, old)| match proposals.get(i) {
            Some(Some(proposal)) => advance(old, proposal, report),
            _ => old.clone(),
        })
        .collect()
}

fn advance(old: &Instruction, proposal: &Proposal, report: &CopyReport) -> Instruction {
    let all_copied = proposal
        .candidates
        .iter()
        .filter(|c| c.is_copy())
        .all(|c| report.delivered(c));

    if !all_copied {
        tracing::warn!(
            "Not advancing '{}': some files were not copied",
            old.label()
        );
        return old.clone();
    }

    let mut record = proposal.instruction.clone();
    if let Some(last) = proposal.last_candidate() {
        record.last = Some(last.src.clone());
    }
    record.next = None;
    record
}

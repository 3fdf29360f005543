use super::{Proposal, SelectionContext, Strategy};
use crate::collector::candidate::Candidate;
use crate::config::Instruction;
use crate::paths::resolve_dest;
use rand::RngCore;

/// Deliver the first units and move them out of the source afterwards, so
/// the next run naturally picks up the following ones.
pub struct MoveWhenDone;

impl Strategy for MoveWhenDone {
    fn name(&self) -> &'static str {
        "move_when_done"
    }

    fn claims(&self, instruction: &Instruction) -> bool {
        instruction.move_to_when_done.is_some()
    }

    fn select(&self, ctx: &SelectionContext<'_>, _rng: &mut dyn RngCore) -> Option<Proposal> {
        let instruction = ctx.instruction;
        let target = resolve_dest(ctx.src_root, Some(instruction.move_to_when_done.as_deref()?));
        let picks = instruction.count().min(ctx.units.len());

        let mut record = instruction.clone();
        record.next = None;
        record.remove_initial_digits.get_or_insert(true);

        let mut proposal = Proposal::new(self.name(), record);
        for unit in &ctx.units[..picks] {
            for file in unit.files() {
                proposal.candidates.push(Candidate::copy(ctx.index, file));
                proposal
                    .candidates
                    .push(Candidate::relocate(ctx.index, file, &target));
            }
        }
        Some(proposal)
    }
}

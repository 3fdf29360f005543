use super::rotate::{spread_indices, step_indices};
use super::{Proposal, SelectionContext, Strategy};
use crate::config::Instruction;
use rand::RngCore;

/// Rotation walking from the end of the list towards the start.
pub struct Reverse;

impl Strategy for Reverse {
    fn name(&self) -> &'static str {
        "reverse"
    }

    fn claims(&self, instruction: &Instruction) -> bool {
        instruction.reverse
    }

    fn select(&self, ctx: &SelectionContext<'_>, _rng: &mut dyn RngCore) -> Option<Proposal> {
        let len = ctx.units.len();
        if len == 0 {
            return None;
        }
        let instruction = ctx.instruction;

        // one past the first pick, walking backwards
        let start = match instruction.next.as_deref().and_then(|n| ctx.position(n)) {
            Some(i) => i as isize + 1,
            None => instruction
                .last
                .as_deref()
                .and_then(|l| ctx.position(l))
                .map(|i| i as isize)
                .unwrap_or(len as isize),
        };

        let indices = match instruction.spread {
            Some(spread) => spread_indices(start, len, spread, -1.0),
            None => step_indices(start, len, instruction.how_many, -1),
        };

        let mut record = instruction.clone();
        record.next = None;
        let mut proposal = Proposal::new(self.name(), record);
        for i in indices {
            proposal.candidates.extend(ctx.copies(&ctx.units[i]));
        }
        Some(proposal)
    }
}

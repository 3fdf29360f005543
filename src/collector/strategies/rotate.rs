use super::{Proposal, SelectionContext, Strategy};
use crate::config::Instruction;
use rand::RngCore;

/// Step forward through the units from where the last run stopped.
pub struct Rotate;

impl Strategy for Rotate {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn claims(&self, _instruction: &Instruction) -> bool {
        true
    }

    fn select(&self, ctx: &SelectionContext<'_>, _rng: &mut dyn RngCore) -> Option<Proposal> {
        let len = ctx.units.len();
        if len == 0 {
            return None;
        }
        let instruction = ctx.instruction;
        let start = start_position(ctx);
        let indices = match instruction.spread {
            Some(spread) => spread_indices(start, len, spread, 1.0),
            None => step_indices(start, len, instruction.how_many, 1),
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

/// Position just before the first pick; `-1` means start at the top.
fn start_position(ctx: &SelectionContext<'_>) -> isize {
    let instruction = ctx.instruction;
    if let Some(i) = instruction.next.as_deref().and_then(|n| ctx.position(n)) {
        return i as isize - 1;
    }
    instruction
        .last
        .as_deref()
        .and_then(|l| ctx.position(l))
        .map(|i| i as isize)
        .unwrap_or(-1)
}

/// `count` consecutive indices after `start`, walking `direction` (+1/-1).
pub(super) fn step_indices(start: isize, len: usize, count: usize, direction: isize) -> Vec<usize> {
    let picks = count.min(len) as isize;
    (1..=picks)
        .map(|k| (start + direction * k).rem_euclid(len as isize) as usize)
        .collect()
}

/// `spread` indices evenly spaced over the whole list, the first one
/// right after `start`, walking `direction` (+1.0/-1.0).
pub(super) fn spread_indices(start: isize, len: usize, spread: usize, direction: f64) -> Vec<usize> {
    let picks = spread.min(len);
    if picks == 0 {
        return Vec::new();
    }
    let increment = len as f64 / picks as f64;
    let mut running = start as f64 + direction;
    let mut indices = Vec::with_capacity(picks);
    for _ in 0..picks {
        indices.push((running.round() as isize).rem_euclid(len as isize) as usize);
        running += direction * increment;
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::PathBuf;

    fn pick(instruction: &Instruction, names: &[&str]) -> Vec<String> {
        let files = files(names);
        let units = unit_list(&files);
        let ctx = context(instruction, &files, &units);
        srcs(&Rotate.select(&ctx, &mut StdRng::seed_from_u64(0)).unwrap())
    }

    #[test]
    fn test_rotation_continues_after_last() {
        let mut instruction = Instruction::new("x");
        assert_eq!(pick(&instruction, &["a", "b", "c"]), vec!["a"]);

        instruction.last = Some(PathBuf::from("/src/a"));
        assert_eq!(pick(&instruction, &["a", "b", "c"]), vec!["b"]);

        instruction.last = Some(PathBuf::from("/src/c"));
        instruction.how_many = 2;
        assert_eq!(pick(&instruction, &["a", "b", "c"]), vec!["a", "b"]);
    }

    #[test]
    fn test_next_wins_over_last() {
        let mut instruction = Instruction::new("x");
        instruction.last = Some(PathBuf::from("/src/a"));
        instruction.next = Some(PathBuf::from("/src/c"));
        assert_eq!(pick(&instruction, &["a", "b", "c"]), vec!["c"]);
    }

    #[test]
    fn test_unknown_last_starts_over() {
        let mut instruction = Instruction::new("x");
        instruction.last = Some(PathBuf::from("/src/gone"));
        assert_eq!(pick(&instruction, &["a", "b"]), vec!["a"]);
    }

    #[test]
    fn test_picks_capped_at_unit_count() {
        let mut instruction = Instruction::new("x");
        instruction.how_many = 5;
        instruction.last = Some(PathBuf::from("/src/a"));
        assert_eq!(pick(&instruction, &["a", "b"]), vec!["b", "a"]);
    }

    #[test]
    fn test_spread_is_even() {
        let mut instruction = Instruction::new("x");
        instruction.spread = Some(3);
        instruction.how_many = 1;
        let names = ["0", "1", "2", "3", "4", "5", "6", "7", "8"];
        assert_eq!(pick(&instruction, &names), vec!["0", "3", "6"]);

        instruction.last = Some(PathBuf::from("/src/6"));
        assert_eq!(pick(&instruction, &names), vec!["7", "1", "4"]);
    }

    #[test]
    fn test_record_clears_next_and_keeps_input() {
        let files = files(&["a", "b"]);
        let units = unit_list(&files);
        let mut instruction = Instruction::new("x");
        instruction.next = Some(PathBuf::from("/src/b"));
        let ctx = context(&instruction, &files, &units);

        let proposal = Rotate.select(&ctx, &mut StdRng::seed_from_u64(0)).unwrap();
        assert!(proposal.instruction.next.is_none());
        assert_eq!(instruction.next, Some(PathBuf::from("/src/b")));
    }

    #[test]
    fn test_step_and_spread_helpers() {
        assert_eq!(step_indices(-1, 3, 3, 1), vec![0, 1, 2]);
        assert_eq!(step_indices(3, 3, 2, -1), vec![2, 1]);
        assert_eq!(spread_indices(-1, 10, 4, 1.0), vec![0, 3, 5, 8]);
    }
}

use super::{Proposal, SelectionContext, Strategy};
use crate::config::Instruction;
use crate::paths::history_id;
use rand::seq::index::sample;
use rand::RngCore;
use std::collections::HashSet;

/// Uniform picks that avoid anything delivered since the history was last
/// reset.
pub struct RandomWithoutRepeat;

impl Strategy for RandomWithoutRepeat {
    fn name(&self) -> &'static str {
        "random"
    }

    fn claims(&self, instruction: &Instruction) -> bool {
        instruction.random
    }

    fn select(&self, ctx: &SelectionContext<'_>, rng: &mut dyn RngCore) -> Option<Proposal> {
        let len = ctx.units.len();
        if len == 0 {
            return None;
        }
        let instruction = ctx.instruction;
        let want = instruction.count().min(len);

        let seen: HashSet<&str> = instruction.history.iter().map(String::as_str).collect();
        let eligible: Vec<usize> = (0..len)
            .filter(|&i| !seen.contains(history_id(ctx.units[i].id()).as_str()))
            .collect();

        let mut history = instruction.history.clone();
        let picked: Vec<usize> = if eligible.len() <= want {
            // cycle complete: hand out what is left, then start a new one
            history.clear();
            let mut picked = eligible.clone();
            let rest: Vec<usize> = (0..len).filter(|i| !eligible.contains(i)).collect();
            let extra = want - picked.len();
            picked.extend(
                sample(rng, rest.len(), extra)
                    .into_iter()
                    .map(|i| rest[i]),
            );
            picked
        } else {
            sample(rng, eligible.len(), want)
                .into_iter()
                .map(|i| eligible[i])
                .collect()
        };

        history.extend(picked.iter().map(|&i| history_id(ctx.units[i].id())));
        trim_history(&mut history, instruction.max_history_length);

        let mut record = instruction.clone();
        record.history = history;
        record.next = None;
        let mut proposal = Proposal::new(self.name(), record);
        for i in picked {
            proposal.candidates.extend(ctx.copies(&ctx.units[i]));
        }
        Some(proposal)
    }
}

/// Keep the newest `max` entries; `Some(0)` keeps none.
pub fn trim_history(history: &mut Vec<String>, max: Option<usize>) {
    if let Some(max) = max {
        if history.len() > max {
            history.drain(..history.len() - max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn randomized(how_many: usize) -> Instruction {
        let mut instruction = Instruction::new("x");
        instruction.random = true;
        instruction.how_many = how_many;
        instruction
    }

    fn run_once(instruction: &Instruction, names: &[&str], rng: &mut StdRng) -> Proposal {
        let files = files(names);
        let units = unit_list(&files);
        let ctx = context(instruction, &files, &units);
        RandomWithoutRepeat.select(&ctx, rng).unwrap()
    }

    #[test]
    fn test_full_cycle_has_no_repeats() {
        let names = ["a", "b", "c", "d", "e", "f", "g"];
        let mut rng = StdRng::seed_from_u64(42);
        let mut instruction = randomized(1);
        let mut delivered = Vec::new();

        for _ in 0..names.len() {
            let proposal = run_once(&instruction, &names, &mut rng);
            delivered.extend(srcs(&proposal));
            instruction = proposal.instruction;
        }

        let unique: HashSet<_> = delivered.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert!(instruction.history.len() <= names.len());
    }

    #[test]
    fn test_reset_hands_out_remaining_first() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut instruction = randomized(2);
        instruction.history = vec!["/src/a".to_string(), "/src/b".to_string()];

        let proposal = run_once(&instruction, &["a", "b", "c"], &mut rng);
        let picked = srcs(&proposal);
        assert_eq!(picked[0], "c");
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[1], "c");
        // history restarted with this run's picks
        assert_eq!(proposal.instruction.history.len(), 2);
        assert_eq!(proposal.instruction.history[0], "/src/c");
    }

    #[test]
    fn test_history_cap() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut instruction = randomized(1);
        instruction.max_history_length = Some(2);
        instruction.history = vec!["/src/a".to_string(), "/src/b".to_string()];

        let proposal = run_once(&instruction, &["a", "b", "c", "d"], &mut rng);
        assert_eq!(proposal.instruction.history.len(), 2);
        assert_eq!(proposal.instruction.history[0], "/src/b");

        instruction.max_history_length = Some(0);
        let proposal = run_once(&instruction, &["a", "b", "c", "d"], &mut rng);
        assert!(proposal.instruction.history.is_empty());
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let names = ["a", "b", "c", "d", "e"];
        let first = run_once(&randomized(2), &names, &mut StdRng::seed_from_u64(5));
        let second = run_once(&randomized(2), &names, &mut StdRng::seed_from_u64(5));
        assert_eq!(srcs(&first), srcs(&second));
    }

    #[test]
    fn test_trim_history() {
        let mut history: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
        trim_history(&mut history, None);
        assert_eq!(history.len(), 3);
        trim_history(&mut history, Some(1));
        assert_eq!(history, vec!["3".to_string()]);
    }
}

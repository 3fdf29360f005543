//! Selection strategies and the registry that dispatches between them.
//!
//! Strategies are tried in registration order; the first one that claims an
//! instruction and returns a proposal wins, falling back to rotation. Every
//! observer then sees the winning proposal and may add to it.

mod match_up_to;
mod move_when_done;
mod random;
mod reverse;
mod rotate;

pub use match_up_to::MatchUpTo;
pub use move_when_done::MoveWhenDone;
pub use random::{trim_history, RandomWithoutRepeat};
pub use reverse::Reverse;
pub use rotate::Rotate;

use super::candidate::{Candidate, Unit};
use crate::config::Instruction;
use rand::RngCore;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Everything a strategy may look at for one instruction.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    /// Position of the instruction in the run's list.
    pub index: usize,
    pub instruction: &'a Instruction,
    /// Discovered files, in delivery order.
    pub files: &'a [PathBuf],
    pub units: &'a [Unit],
    pub src_root: &'a Path,
}

impl SelectionContext<'_> {
    /// Index of the unit holding `path`.
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.units.iter().position(|u| u.contains(path))
    }

    /// Copy candidates for every file of `unit`.
    pub fn copies(&self, unit: &Unit) -> Vec<Candidate> {
        unit.files()
            .iter()
            .map(|f| Candidate::copy(self.index, f))
            .collect()
    }
}

/// A strategy's answer: the new instruction record and what to deliver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proposal {
    pub strategy: &'static str,
    pub instruction: Instruction,
    pub candidates: Vec<Candidate>,
}

impl Proposal {
    pub fn new(strategy: &'static str, instruction: Instruction) -> Self {
        Self {
            strategy,
            instruction,
            candidates: Vec::new(),
        }
    }

    /// The candidate whose source becomes the instruction's `last`.
    pub fn last_candidate(&self) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.is_last)
    }

    /// Flag the final copy the strategy produced.
    fn mark_last(&mut self) {
        let last = self.candidates.iter().rposition(|c| c.is_copy());
        for (i, candidate) in self.candidates.iter_mut().enumerate() {
            candidate.is_last = Some(i) == last;
        }
    }

    /// Put the flag back on `src` if an observer dropped the flagged copy
    /// as a duplicate.
    fn keep_last(&mut self, src: Option<PathBuf>) {
        if self.candidates.iter().any(|c| c.is_last) {
            return;
        }
        let Some(src) = src else {
            return;
        };
        if let Some(candidate) = self
            .candidates
            .iter_mut()
            .find(|c| c.is_copy() && c.src == src)
        {
            candidate.is_last = true;
        }
    }
}

pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Whether this strategy is responsible for `instruction`.
    fn claims(&self, instruction: &Instruction) -> bool;

    /// Pick units. Must not mutate the context; the returned proposal
    /// carries the updated instruction record.
    fn select(&self, ctx: &SelectionContext<'_>, rng: &mut dyn RngCore) -> Option<Proposal>;
}

pub trait Observer {
    fn name(&self) -> &'static str;

    fn observe(&self, ctx: &SelectionContext<'_>, proposal: &mut Proposal);
}

/// Ordered strategies with a fallback, plus observers.
pub struct Registry {
    strategies: Vec<Box<dyn Strategy>>,
    fallback: Box<dyn Strategy>,
    observers: Vec<Box<dyn Observer>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Box::new(Rotate))
            .with_strategy(Box::new(MoveWhenDone))
            .with_strategy(Box::new(RandomWithoutRepeat))
            .with_strategy(Box::new(Reverse))
            .with_observer(Box::new(MatchUpTo))
    }
}

impl Registry {
    /// An empty registry that always falls back to `fallback`.
    pub fn new(fallback: Box<dyn Strategy>) -> Self {
        Self {
            strategies: Vec::new(),
            fallback,
            observers: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.fallback.name()))
            .collect()
    }

    /// Run the first claiming strategy, then every observer.
    ///
    /// `is_last` marks the strategy's own final pick; files observers add
    /// never carry it.
    pub fn select(&self, ctx: &SelectionContext<'_>, rng: &mut dyn RngCore) -> Option<Proposal> {
        if ctx.units.is_empty() {
            return None;
        }

        let mut proposal = self
            .strategies
            .iter()
            .filter(|s| s.claims(ctx.instruction))
            .find_map(|s| s.select(ctx, rng))
            .or_else(|| self.fallback.select(ctx, rng))?;

        proposal.mark_last();
        let last_src = proposal.last_candidate().map(|c| c.src.clone());
        for observer in &self.observers {
            observer.observe(ctx, &mut proposal);
        }
        proposal.keep_last(last_src);

        tracing::debug!(
            "{} picked {} candidate(s) for '{}'",
            proposal.strategy,
            proposal.candidates.len(),
            ctx.instruction.label()
        );
        Some(proposal)
    }
}

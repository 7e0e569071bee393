//! Conflict bookkeeping for the search: which module could not be
//! satisfied, how the search got there, and what constrained it.

use std::fmt;

use crate::error::ChainLink;

/// A dead end met during the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The module no candidate could be found for.
    pub module: String,
    /// Number of modules already chosen when the conflict was met.
    pub depth: usize,
    /// Requirement path from the user's request to `module`.
    pub chain: Vec<ChainLink>,
    /// Every constraint that applied to `module` at that point.
    pub constraints: Vec<String>,
}

impl Conflict {
    /// `module` requires a version of itself earlier in its own chain.
    pub fn is_cycle(&self) -> bool {
        match self.chain.split_last() {
            Some((_, earlier)) => earlier.iter().any(|link| link.name == self.module),
            None => false,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no version of '{}' fits", self.module)?;
        for link in &self.chain {
            write!(f, " <- {link}")?;
        }
        Ok(())
    }
}

/// Keeps the deepest conflict seen; the first one wins ties.
#[derive(Debug, Default)]
pub struct ConflictReport {
    deepest: Option<Conflict>,
    seen: usize,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: Conflict) {
        self.seen += 1;
        tracing::trace!("conflict at depth {}: {conflict}", conflict.depth);
        let deeper = self
            .deepest
            .as_ref()
            .map_or(true, |current| conflict.depth > current.depth);
        if deeper {
            self.deepest = Some(conflict);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.seen == 0
    }

    /// Number of conflicts recorded, not just kept.
    pub fn len(&self) -> usize {
        self.seen
    }

    pub fn deepest(&self) -> Option<&Conflict> {
        self.deepest.as_ref()
    }

    pub fn into_deepest(self) -> Option<Conflict> {
        self.deepest
    }
}

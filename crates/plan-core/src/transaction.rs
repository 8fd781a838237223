//! Transactions: an atomic overlay over a base [`Plan`] (spec §4.2,
//! "Transaction").
//!
//! A transaction here is a full working copy of the base plan plus a
//! log of the high-level operations applied to it. Because the
//! engine's control thread is single-threaded and cooperative (spec
//! §5), and a `Transaction` borrows nothing from the base plan while
//! it is being built, holding a private copy and replaying a revision
//! check at `commit` time gives the same externally-observable
//! guarantee as copy-on-write proxies ("no intermediate state is
//! observed by pollers") without needing per-object proxy plumbing.
//! See DESIGN.md for the open-question resolution.

use crate::deltas::PlanDelta;
use crate::error::{PlanError, Result};
use crate::ids::PlanObjectId;
use crate::plan::Plan;
use serde::{Deserialize, Serialize};

/// One step recorded while building a transaction, replayed as a
/// notification stream when the transaction commits (spec §4.4,
/// "Replacements inside transactions yield REPLACED").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TxOp {
    Added(PlanObjectId),
    Removed(PlanObjectId),
    Replaced { old: PlanObjectId, new: PlanObjectId },
}

pub struct Transaction {
    base_revision: u64,
    working: Plan,
    ops: Vec<TxOp>,
}

impl Transaction {
    pub fn begin(base: &Plan) -> Self {
        Transaction {
            base_revision: base.revision(),
            working: base.clone(),
            ops: Vec::new(),
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.working
    }

    pub fn plan_mut(&mut self) -> &mut Plan {
        &mut self.working
    }

    pub fn record(&mut self, op: TxOp) {
        self.ops.push(op);
    }

    /// Apply the transaction's working copy onto `base` atomically,
    /// provided `base` has not advanced past the revision this
    /// transaction was forked from. Returns the recorded ops plus
    /// every plan delta accumulated in the working copy, for the
    /// caller to forward to the log stream / job notifications.
    pub fn commit(self, base: &mut Plan) -> Result<(Vec<TxOp>, Vec<PlanDelta>)> {
        if base.revision() != self.base_revision {
            tracing::warn!(base_revision = self.base_revision, current = base.revision(), "transaction commit rejected, base advanced");
            return Err(PlanError::ConcurrentModification);
        }
        let mut working = self.working;
        let deltas = working.drain_deltas();
        working.revision += 1;
        *base = working;
        tracing::debug!(ops = self.ops.len(), deltas = deltas.len(), revision = base.revision(), "transaction committed");
        Ok((self.ops, deltas))
    }

    pub fn discard(self) -> Vec<TxOp> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn discard_leaves_base_untouched() {
        let base = Plan::new();
        let mut tx = Transaction::begin(&base);
        tx.plan_mut().add_task(Task::new("demo"), &[]).unwrap();
        assert_eq!(tx.discard().len(), 0);
        assert_eq!(base.tasks().count(), 0);
    }

    #[test]
    fn commit_applies_changes_and_bumps_revision() {
        let mut base = Plan::new();
        let mut tx = Transaction::begin(&base);
        let id = tx.plan_mut().add_task(Task::new("demo"), &[]).unwrap();
        tx.record(TxOp::Added(id));
        let before = base.revision();
        let (ops, _deltas) = tx.commit(&mut base).unwrap();
        assert_eq!(ops, vec![TxOp::Added(id)]);
        assert!(base.revision() > before);
        assert!(base.has(id));
    }

    #[test]
    fn commit_fails_after_concurrent_base_mutation() {
        let mut base = Plan::new();
        let tx = Transaction::begin(&base);
        base.add_task(Task::new("other"), &[]).unwrap();
        assert_eq!(tx.commit(&mut base), Err(PlanError::ConcurrentModification));
    }
}

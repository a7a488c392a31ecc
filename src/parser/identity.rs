//! Diagram identity across parse generations
//!
//! Identity is ordinal: the Nth block of a new generation inherits the id of
//! the Nth block of the previous one, whatever its content or type. Only
//! inserting or removing a block shifts the ids that follow it.

use log::trace;

use super::DiagramId;

/// Id assignment for one generation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// One id per new block, in block order
    pub ids: Vec<DiagramId>,
    /// Ids newly created for this generation
    pub minted: Vec<DiagramId>,
    /// Ids of the previous generation that no longer exist
    pub retired: Vec<DiagramId>,
}

/// Tracks the ids of the last published generation
///
/// Planning is separate from committing so that a generation discarded
/// before publication never disturbs the ids the next one inherits.
#[derive(Debug, Clone, Default)]
pub struct IdentityTracker {
    published: Vec<DiagramId>,
}

impl IdentityTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of the last committed generation
    #[must_use]
    pub fn current(&self) -> &[DiagramId] {
        &self.published
    }

    /// Plan ids for a generation of `count` blocks
    #[must_use]
    pub fn reconcile(&self, count: usize) -> Reconciliation {
        let kept = count.min(self.published.len());
        let minted: Vec<DiagramId> = (kept..count).map(|_| DiagramId::mint()).collect();
        let retired = self.published[kept..].to_vec();

        let mut ids = self.published[..kept].to_vec();
        ids.extend(minted.iter().cloned());

        trace!(
            kept = kept,
            minted = minted.len(),
            retired = retired.len();
            "Reconciled diagram ids"
        );

        Reconciliation {
            ids,
            minted,
            retired,
        }
    }

    /// Adopt a planned generation once it is published
    pub fn commit(&mut self, reconciliation: &Reconciliation) {
        self.published.clone_from(&reconciliation.ids);
    }

    /// Forget all ids, returning them as retired
    pub fn reset(&mut self) -> Vec<DiagramId> {
        std::mem::take(&mut self.published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(tracker: &mut IdentityTracker, count: usize) -> Reconciliation {
        let rec = tracker.reconcile(count);
        tracker.commit(&rec);
        rec
    }

    #[test]
    fn first_generation_mints_all() {
        let tracker = IdentityTracker::new();
        let rec = tracker.reconcile(3);

        assert_eq!(rec.ids.len(), 3);
        assert_eq!(rec.minted, rec.ids);
        assert!(rec.retired.is_empty());
    }

    #[test]
    fn same_count_keeps_every_id() {
        let mut tracker = IdentityTracker::new();
        let first = advance(&mut tracker, 2);
        let second = advance(&mut tracker, 2);

        assert_eq!(first.ids, second.ids);
        assert!(second.minted.is_empty());
        assert!(second.retired.is_empty());
    }

    #[test]
    fn growth_appends_fresh_ids() {
        let mut tracker = IdentityTracker::new();
        let first = advance(&mut tracker, 1);
        let second = advance(&mut tracker, 3);

        assert_eq!(second.ids[0], first.ids[0]);
        assert_eq!(second.minted.len(), 2);
        assert_eq!(&second.ids[1..], second.minted.as_slice());
    }

    #[test]
    fn shrink_retires_trailing_ids() {
        let mut tracker = IdentityTracker::new();
        let first = advance(&mut tracker, 3);
        let second = advance(&mut tracker, 1);

        assert_eq!(second.ids, vec![first.ids[0].clone()]);
        assert_eq!(second.retired, first.ids[1..].to_vec());
        assert_eq!(tracker.current().len(), 1);
    }

    #[test]
    fn uncommitted_plans_do_not_move_ids() {
        let mut tracker = IdentityTracker::new();
        let published = advance(&mut tracker, 3);

        let discarded = tracker.reconcile(1);
        assert_eq!(discarded.retired.len(), 2);

        let next = tracker.reconcile(3);
        assert_eq!(next.ids, published.ids);
        assert!(next.minted.is_empty());
    }

    #[test]
    fn reset_retires_everything() {
        let mut tracker = IdentityTracker::new();
        let first = advance(&mut tracker, 2);

        assert_eq!(tracker.reset(), first.ids);
        assert!(tracker.reconcile(0).ids.is_empty());
    }
}

// src/pipeline/reconcile.rs

//! Reconciliation of parsed course records against stored sections.
//!
//! Every record of a batch is upserted by its natural key. A section that was
//! stored with zero seats and now shows some produces a `Transition`.

use crate::error::Result;
use crate::models::{CourseRecord, Transition};
use crate::storage::{CourseStore, CourseTx};

/// Result of reconciling one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub inserted: usize,
    pub updated: usize,
    /// Sections that went from full to open, in record order.
    pub transitions: Vec<Transition>,
}

/// Applies batches of records to a store.
pub struct Reconciler<'a> {
    store: &'a dyn CourseStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn CourseStore) -> Self {
        Self { store }
    }

    /// Upsert one batch atomically.
    ///
    /// On error nothing from the batch is persisted and no transitions are
    /// reported.
    pub fn reconcile(&self, records: &[CourseRecord]) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();

        self.store.transaction(&mut |tx: &mut dyn CourseTx| {
            outcome = ReconcileOutcome::default();
            for record in records {
                apply(tx, record, &mut outcome)?;
            }
            Ok(())
        })?;

        Ok(outcome)
    }
}

fn apply(
    tx: &mut dyn CourseTx,
    record: &CourseRecord,
    outcome: &mut ReconcileOutcome,
) -> Result<()> {
    let Some(stored) = tx.find(&record.key())? else {
        tx.insert(record)?;
        outcome.inserted += 1;
        return Ok(());
    };

    tx.update(stored.id, record)?;
    outcome.updated += 1;

    if stored.record.available == 0 && record.available > 0 {
        outcome.transitions.push(Transition {
            course_id: stored.id,
            record: record.clone(),
            became_available: true,
        });
    }
    Ok(())
}

//! crates/taskboard_core/src/ordering.rs
//!
//! The ordering rules of the task board: how a new task gets its initial
//! position, and how a client-submitted arrangement is turned into a set of
//! per-task position writes.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::{DocumentId, UpdateOutcome};
use crate::ports::{PortError, PortResult};

/// Gap left between consecutive positions after a reorder.
pub const ORDER_SPACING: i64 = 1000;

/// The position a reorder assigns to the element at `index`.
pub fn spaced_order(index: usize) -> i64 {
    (index as i64 + 1) * ORDER_SPACING
}

//=========================================================================================
// Creation Stamps
//=========================================================================================

/// Hands out creation positions from the wall clock in milliseconds.
///
/// Stamps are strictly increasing within one process even when the clock stalls
/// or steps backwards. Separate processes may still collide; ties are allowed.
#[derive(Debug, Default)]
pub struct CreationClock {
    last: AtomicI64,
}

impl CreationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i64 {
        self.stamp_at(Utc::now().timestamp_millis())
    }

    pub fn stamp_at(&self, now_ms: i64) -> i64 {
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = now_ms.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

//=========================================================================================
// Reorder Planning
//=========================================================================================

/// Validates a submitted arrangement against the tasks currently stored and
/// assigns each one its new position.
///
/// The submission must be a permutation of `current`: no duplicates, no unknown
/// identifiers, nothing left out.
pub fn plan_reorder(
    current: &[DocumentId],
    submitted: &[DocumentId],
) -> PortResult<Vec<(DocumentId, i64)>> {
    let known: HashSet<DocumentId> = current.iter().copied().collect();
    let mut seen = HashSet::with_capacity(submitted.len());

    for id in submitted {
        if !seen.insert(*id) {
            return Err(PortError::InvalidReorderPayload(format!(
                "task {} appears more than once",
                id
            )));
        }
        if !known.contains(id) {
            return Err(PortError::InvalidReorderPayload(format!(
                "task {} does not exist",
                id
            )));
        }
    }

    let omitted = known.len() - seen.len();
    if omitted > 0 {
        return Err(PortError::InvalidReorderPayload(format!(
            "{} existing task(s) missing from the submitted order",
            omitted
        )));
    }

    Ok(submitted
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, spaced_order(index)))
        .collect())
}

//=========================================================================================
// Reorder Reporting
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReorderStatus {
    Applied,
    /// The task vanished between validation and the write.
    Missing,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReorderItem {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub order: i64,
    pub status: ReorderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The per-task outcome of a reorder, plus the aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderReport {
    pub matched_count: u64,
    pub modified_count: u64,
    pub items: Vec<ReorderItem>,
}

impl ReorderReport {
    pub fn record(&mut self, id: DocumentId, order: i64, outcome: PortResult<UpdateOutcome>) {
        let (status, error) = match outcome {
            Ok(outcome) if outcome.matched_count > 0 => {
                self.matched_count += outcome.matched_count;
                self.modified_count += outcome.modified_count;
                (ReorderStatus::Applied, None)
            }
            Ok(_) => (ReorderStatus::Missing, None),
            Err(e) => (ReorderStatus::Failed, Some(e.to_string())),
        };
        self.items.push(ReorderItem {
            id,
            order,
            status,
            error,
        });
    }

    /// True when every submitted task received its new position.
    pub fn is_complete(&self) -> bool {
        self.items
            .iter()
            .all(|item| item.status == ReorderStatus::Applied)
    }
}

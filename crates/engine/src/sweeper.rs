//! Periodic reassignment of stale work items.
//!
//! Each sweep loads the sheet's reassignment-enabled rules, finds the pending
//! items each rule owns, and reassigns every item that has exceeded one of
//! the rule's thresholds. Items are processed independently: one failure is
//! recorded and the sweep moves on. An item that changed after it was listed
//! is left to whoever changed it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rowdesk_core::assignment::reassignment::{due_reason, ReassignReason};
use rowdesk_core::assignment::RuleStatus;
use rowdesk_core::types::{DbId, Timestamp};
use tokio_util::sync::CancellationToken;

use crate::engine::{AttemptError, RuleEngine};
use crate::error::{EngineError, EngineResult, PersistenceError};
use crate::ports::{Collaborators, RuleRepository, WorkItemSource};
use crate::resolver::bounded;

/// What happened to one due item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassignmentStatus {
    Reassigned { from: Option<DbId>, to: DbId },
    /// The strategy had nobody besides the current assignee.
    NoCandidate,
    /// The item was reassigned or touched by another writer after this sweep
    /// listed it. Nothing was written.
    Superseded,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignmentOutcome {
    pub work_item_id: DbId,
    pub rule_id: DbId,
    pub reason: ReassignReason,
    pub status: ReassignmentStatus,
}

pub struct ReassignmentSweeper {
    engine: Arc<RuleEngine>,
    rules: Arc<dyn RuleRepository>,
    items: Arc<dyn WorkItemSource>,
    interval: Duration,
    lookup_timeout: Duration,
}

impl ReassignmentSweeper {
    pub fn new(engine: Arc<RuleEngine>, collaborators: &Collaborators) -> Self {
        let interval = engine.config().sweep_interval;
        let lookup_timeout = engine.config().lookup_timeout;
        Self {
            engine,
            rules: collaborators.rules.clone(),
            items: collaborators.items.clone(),
            interval,
            lookup_timeout,
        }
    }

    /// Reassign every due item of `sheet_id` as of `now`.
    ///
    /// Only items that were due appear in the result.
    pub async fn run_sweep(
        &self,
        sheet_id: DbId,
        now: Timestamp,
    ) -> EngineResult<Vec<ReassignmentOutcome>> {
        let rules = bounded(
            self.lookup_timeout,
            "rule store",
            self.rules.load_reassignment_rules(sheet_id),
        )
        .await
        .map_err(|source| EngineError::RuleLoad { sheet_id, source })?;

        let mut outcomes = Vec::new();
        for rule in rules
            .iter()
            .filter(|r| r.sheet_id == sheet_id && r.status == RuleStatus::Active)
            .filter(|r| r.reassignment.enabled)
        {
            let pending = bounded(
                self.lookup_timeout,
                "work item store",
                self.items.pending_items_for_rule(rule.id),
            );
            let items = match pending.await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(rule_id = rule.id, error = %e, "Failed to list pending items");
                    continue;
                }
            };

            for item in items {
                let Some(reason) = due_reason(&rule.reassignment, &item, now) else {
                    continue;
                };

                let status = match self.engine.reassign(rule, &item, reason, now).await {
                    Ok(Some(to)) => ReassignmentStatus::Reassigned {
                        from: item.assignee_id,
                        to,
                    },
                    Ok(None) => {
                        tracing::debug!(
                            rule_id = rule.id,
                            work_item_id = item.id,
                            "No other candidate for reassignment",
                        );
                        ReassignmentStatus::NoCandidate
                    }
                    Err(AttemptError::Persistence(PersistenceError::ItemChanged(_))) => {
                        tracing::debug!(
                            rule_id = rule.id,
                            work_item_id = item.id,
                            "Work item changed since it was listed, skipping",
                        );
                        ReassignmentStatus::Superseded
                    }
                    Err(e) => {
                        tracing::warn!(
                            rule_id = rule.id,
                            work_item_id = item.id,
                            error = %e,
                            "Reassignment failed",
                        );
                        ReassignmentStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };

                outcomes.push(ReassignmentOutcome {
                    work_item_id: item.id,
                    rule_id: rule.id,
                    reason,
                    status,
                });
            }
        }

        let reassigned = outcomes
            .iter()
            .filter(|o| matches!(o.status, ReassignmentStatus::Reassigned { .. }))
            .count();
        if outcomes.is_empty() {
            tracing::debug!(sheet_id, "Reassignment sweep: nothing due");
        } else {
            tracing::info!(
                sheet_id,
                due = outcomes.len(),
                reassigned,
                "Reassignment sweep finished",
            );
        }
        Ok(outcomes)
    }

    /// Sweep every sheet with reassignment enabled on a fixed interval until
    /// `cancel` is triggered. A sweep in progress is abandoned on cancellation;
    /// each item commit is atomic, so nothing is left half-written.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Reassignment sweeper started",
        );

        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reassignment sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            tracing::info!("Reassignment sweeper stopping mid-sweep");
                            break;
                        }
                        _ = self.sweep_all() => {}
                    }
                }
            }
        }
    }

    async fn sweep_all(&self) {
        let sheets = bounded(
            self.lookup_timeout,
            "rule store",
            self.rules.sheets_with_reassignment(),
        );
        let sheets = match sheets.await {
            Ok(sheets) => sheets,
            Err(e) => {
                tracing::error!(error = %e, "Reassignment sweeper: failed to list sheets");
                return;
            }
        };

        for sheet_id in sheets {
            if let Err(e) = self.run_sweep(sheet_id, Utc::now()).await {
                tracing::error!(sheet_id, error = %e, "Reassignment sweep failed");
            }
        }
    }
}

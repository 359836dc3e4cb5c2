//! Rule evaluation and assignment commit.
//!
//! [`RuleEngine::apply_rules`] walks a sheet's candidate rules in evaluation
//! order and commits the first assignee any matching rule produces. For each
//! rule the resolve and commit steps run inside that rule's critical section,
//! and the commit itself is a single atomic store call.

use std::sync::Arc;

use chrono::Utc;
use rowdesk_core::assignment::ordering;
use rowdesk_core::assignment::reassignment::ReassignReason;
use rowdesk_core::assignment::{
    matches, AssignmentRule, AssignmentStrategy, ReassignTarget, TriggerEvent, WorkItem,
};
use rowdesk_core::types::{DbId, Timestamp};
use rowdesk_events::{AssignmentEvent, AssignmentEventKind, EventBus};
use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, LookupError, PersistenceError};
use crate::locks::RuleLocks;
use crate::ports::{
    AssignmentCommit, AssignmentStore, Collaborators, ItemSnapshot, RuleRepository,
    StatisticsDelta, SuperiorKind,
};
use crate::resolver::{ResolveContext, Resolution, StrategyResolver};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A rule skipped because one of its lookups failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    pub rule_id: DbId,
    pub error: LookupError,
}

/// Result of [`RuleEngine::apply_rules`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentOutcome {
    pub applied: bool,
    pub rule_id: Option<DbId>,
    pub assignee_id: Option<DbId>,
    /// The winning rule's notification settings, passed through untouched.
    pub notifications: Option<Value>,
    pub lookup_failures: Vec<LookupFailure>,
}

impl AssignmentOutcome {
    fn unassigned(lookup_failures: Vec<LookupFailure>) -> Self {
        Self {
            applied: false,
            rule_id: None,
            assignee_id: None,
            notifications: None,
            lookup_failures,
        }
    }
}

/// Result of [`RuleEngine::preview_rules`]. Nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssignmentPreview {
    pub rule_id: Option<DbId>,
    pub assignee_id: Option<DbId>,
    pub lookup_failures: Vec<LookupFailure>,
}

/// Why a single rule could not produce a committed assignee.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Who the assignee is chosen by.
#[derive(Debug, Clone, Copy)]
enum Target {
    Strategy { exclude: Option<DbId> },
    Superior(SuperiorKind),
}

impl SuperiorKind {
    fn label(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Supervisor => "supervisor",
        }
    }
}

// ---------------------------------------------------------------------------
// RuleEngine
// ---------------------------------------------------------------------------

pub struct RuleEngine {
    rules: Arc<dyn RuleRepository>,
    store: Arc<dyn AssignmentStore>,
    resolver: StrategyResolver,
    locks: RuleLocks,
    events: Option<Arc<EventBus>>,
    config: EngineConfig,
}

impl RuleEngine {
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        let resolver = StrategyResolver::new(
            collaborators.workload,
            collaborators.directory,
            collaborators.rotation,
            &config,
        );
        Self {
            rules: collaborators.rules,
            store: collaborators.store,
            resolver,
            locks: RuleLocks::new(),
            events: None,
            config,
        }
    }

    /// Publish applied, reassigned, and lookup-failure events to `bus`.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate the sheet's rules for `event` and commit the first assignee found.
    ///
    /// Rules that fail a lookup are skipped and reported in
    /// [`AssignmentOutcome::lookup_failures`]. A storage failure aborts the
    /// whole call with nothing applied.
    pub async fn apply_rules(
        &self,
        sheet_id: DbId,
        item: &WorkItem,
        event: TriggerEvent,
    ) -> EngineResult<AssignmentOutcome> {
        let rules = self.load_candidates(sheet_id, event).await?;
        let mut lookup_failures = Vec::new();
        let now = Utc::now();

        for rule in &rules {
            if !matches(&rule.conditions, item) {
                tracing::trace!(rule_id = rule.id, work_item_id = item.id, "Conditions not met");
                continue;
            }

            let attempt = self
                .commit_under_lock(
                    rule,
                    item,
                    Target::Strategy { exclude: None },
                    StatisticsDelta::ASSIGNMENT,
                    None,
                    now,
                )
                .await;

            match attempt {
                Ok(Some(assignee_id)) => {
                    tracing::info!(
                        rule_id = rule.id,
                        work_item_id = item.id,
                        assignee_id,
                        strategy = rule.strategy.kind(),
                        trigger = event.as_str(),
                        "Assignment rule applied",
                    );
                    self.publish(
                        AssignmentEvent::new(AssignmentEventKind::Applied, item.id)
                            .with_rule(rule.id)
                            .with_assignee(assignee_id)
                            .with_previous_assignee(item.assignee_id)
                            .with_payload(json!({
                                "notifications": rule.notifications,
                                "trigger": event.as_str(),
                                "strategy": rule.strategy.kind(),
                            }))
                            .at(now),
                    );
                    return Ok(AssignmentOutcome {
                        applied: true,
                        rule_id: Some(rule.id),
                        assignee_id: Some(assignee_id),
                        notifications: Some(rule.notifications.clone()),
                        lookup_failures,
                    });
                }
                Ok(None) => {
                    tracing::debug!(
                        rule_id = rule.id,
                        work_item_id = item.id,
                        strategy = rule.strategy.kind(),
                        "Rule matched but produced no candidate",
                    );
                }
                Err(AttemptError::Lookup(error)) => {
                    self.record_lookup_failure(rule, item, error, &mut lookup_failures);
                }
                Err(AttemptError::Configuration(message)) => {
                    tracing::warn!(rule_id = rule.id, %message, "Rule skipped");
                }
                Err(AttemptError::Persistence(error)) => {
                    tracing::error!(
                        rule_id = rule.id,
                        work_item_id = item.id,
                        error = %error,
                        "Failed to commit assignment",
                    );
                    return Err(error.into());
                }
            }
        }

        tracing::debug!(
            sheet_id,
            work_item_id = item.id,
            candidates = rules.len(),
            "No assignment rule applied",
        );
        Ok(AssignmentOutcome::unassigned(lookup_failures))
    }

    /// Report which rule and assignee [`apply_rules`](Self::apply_rules)
    /// would pick right now, without committing anything or advancing any
    /// rotation cursor.
    pub async fn preview_rules(
        &self,
        sheet_id: DbId,
        item: &WorkItem,
        event: TriggerEvent,
    ) -> EngineResult<AssignmentPreview> {
        let rules = self.load_candidates(sheet_id, event).await?;
        let mut preview = AssignmentPreview::default();

        for rule in rules.iter().filter(|rule| matches(&rule.conditions, item)) {
            match self.resolve_for_item(rule, item, None).await {
                Ok(Some(resolution)) => {
                    preview.rule_id = Some(rule.id);
                    preview.assignee_id = Some(resolution.assignee_id);
                    break;
                }
                Ok(None) => {}
                Err(error) => preview.lookup_failures.push(LookupFailure {
                    rule_id: rule.id,
                    error,
                }),
            }
        }
        Ok(preview)
    }

    /// Hand `item` to a new assignee according to `rule`'s reassignment target.
    ///
    /// `next_in_pool` re-runs the rule's strategy without the current
    /// assignee. `manager` and `supervisor` escalate to the current
    /// assignee's superior and fail with a configuration error when none is
    /// on record. Returns `None` when the strategy has no other candidate.
    ///
    /// The commit applies only while the stored item still has the assignee
    /// and activity time of `item`; otherwise it fails with
    /// [`PersistenceError::ItemChanged`] and nothing is written.
    pub async fn reassign(
        &self,
        rule: &AssignmentRule,
        item: &WorkItem,
        reason: ReassignReason,
        now: Timestamp,
    ) -> Result<Option<DbId>, AttemptError> {
        let target = match rule.reassignment.reassign_to {
            ReassignTarget::NextInPool => Target::Strategy {
                exclude: item.assignee_id,
            },
            ReassignTarget::Manager => Target::Superior(SuperiorKind::Manager),
            ReassignTarget::Supervisor => Target::Superior(SuperiorKind::Supervisor),
        };

        let reassigned = self
            .commit_under_lock(
                rule,
                item,
                target,
                StatisticsDelta::REASSIGNMENT,
                Some(ItemSnapshot::of(item)),
                now,
            )
            .await?;

        if let Some(assignee_id) = reassigned {
            tracing::info!(
                rule_id = rule.id,
                work_item_id = item.id,
                from = ?item.assignee_id,
                to = assignee_id,
                "Work item reassigned",
            );
            self.publish(
                AssignmentEvent::new(AssignmentEventKind::Reassigned, item.id)
                    .with_rule(rule.id)
                    .with_assignee(assignee_id)
                    .with_previous_assignee(item.assignee_id)
                    .with_payload(json!({
                        "notifications": rule.notifications,
                        "reason": serde_json::to_value(reason).unwrap_or(Value::Null),
                        "reassign_to": rule.reassignment.reassign_to,
                    }))
                    .at(now),
            );
        }
        Ok(reassigned)
    }

    // -- internals ----------------------------------------------------------

    async fn load_candidates(
        &self,
        sheet_id: DbId,
        event: TriggerEvent,
    ) -> EngineResult<Vec<AssignmentRule>> {
        let mut rules = self
            .resolver
            .bounded("rule store", self.rules.load_rules(sheet_id, event))
            .await
            .map_err(|source| EngineError::RuleLoad { sheet_id, source })?;
        rules.retain(|rule| rule.sheet_id == sheet_id);
        Ok(ordering::candidates(rules, event))
    }

    /// Resolve and commit one rule under its lock, retrying on a stale
    /// rotation cursor up to the configured limit.
    async fn commit_under_lock(
        &self,
        rule: &AssignmentRule,
        item: &WorkItem,
        target: Target,
        delta: StatisticsDelta,
        expected_item: Option<ItemSnapshot>,
        now: Timestamp,
    ) -> Result<Option<DbId>, AttemptError> {
        let _section = self.locks.lock(rule.id).await;
        let mut conflicts = 0;

        loop {
            let resolution = match target {
                Target::Strategy { exclude } => self.resolve_for_item(rule, item, exclude).await?,
                Target::Superior(kind) => Some(self.resolve_superior(item, kind).await?),
            };
            let Some(resolution) = resolution else {
                return Ok(None);
            };

            let commit = AssignmentCommit {
                work_item_id: item.id,
                rule_id: rule.id,
                assignee_id: resolution.assignee_id,
                delta,
                applied_at: now,
                rotation: resolution.rotation,
                expected_item,
            };

            match self.store.commit(&commit).await {
                Ok(()) => return Ok(Some(resolution.assignee_id)),
                Err(PersistenceError::CursorConflict { .. })
                    if conflicts < self.config.commit_retry_limit =>
                {
                    conflicts += 1;
                    tracing::debug!(
                        rule_id = rule.id,
                        attempt = conflicts,
                        "Rotation cursor moved underneath us, retrying",
                    );
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Run the rule's strategy. The `creator` strategy resolves to the item's
    /// creator here.
    async fn resolve_for_item(
        &self,
        rule: &AssignmentRule,
        item: &WorkItem,
        exclude: Option<DbId>,
    ) -> Result<Option<Resolution>, LookupError> {
        if let AssignmentStrategy::Creator = rule.strategy {
            return Ok(item
                .creator_id
                .filter(|id| Some(*id) != exclude)
                .map(Resolution::plain));
        }
        self.resolver
            .resolve(
                &rule.strategy,
                ResolveContext {
                    rule_id: rule.id,
                    exclude,
                },
            )
            .await
    }

    async fn resolve_superior(
        &self,
        item: &WorkItem,
        kind: SuperiorKind,
    ) -> Result<Resolution, AttemptError> {
        let Some(current) = item.assignee_id else {
            return Err(AttemptError::Configuration(format!(
                "Work item {} has no assignee to escalate from",
                item.id
            )));
        };

        let superior = self
            .resolver
            .bounded(
                "staff directory",
                self.resolver.directory().find_superior(current, kind),
            )
            .await?;

        match superior {
            Some(member) if member.is_active && member.id != current => {
                Ok(Resolution::plain(member.id))
            }
            Some(member) => Err(AttemptError::Configuration(format!(
                "The {} of staff member {current} (staff member {}) cannot take assignments",
                kind.label(),
                member.id
            ))),
            None => Err(AttemptError::Configuration(format!(
                "Staff member {current} has no {} on record",
                kind.label()
            ))),
        }
    }

    fn record_lookup_failure(
        &self,
        rule: &AssignmentRule,
        item: &WorkItem,
        error: LookupError,
        failures: &mut Vec<LookupFailure>,
    ) {
        tracing::warn!(
            rule_id = rule.id,
            work_item_id = item.id,
            error = %error,
            "Lookup failed, skipping rule",
        );
        self.publish(
            AssignmentEvent::new(AssignmentEventKind::LookupFailed, item.id)
                .with_rule(rule.id)
                .with_payload(json!({ "error": error.to_string() })),
        );
        failures.push(LookupFailure {
            rule_id: rule.id,
            error,
        });
    }

    fn publish(&self, event: AssignmentEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

//! Strategy resolver.
//!
//! Turns an [`AssignmentStrategy`] into at most one concrete assignee. This
//! is the only place the engine performs external lookups, and every lookup
//! is bounded by the configured timeout.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rowdesk_core::assignment::AssignmentStrategy;
use rowdesk_core::types::DbId;

use crate::config::EngineConfig;
use crate::error::LookupError;
use crate::ports::{RotationAdvance, RotationStore, StaffDirectory, StaffFilter, WorkloadQuery};
use crate::rotation::RotationTracker;

/// Per-call inputs to resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext {
    pub rule_id: DbId,
    /// Never hand the item to this member (its current assignee on reassignment).
    pub exclude: Option<DbId>,
}

/// A chosen assignee and, for round-robin, the cursor advance claiming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub assignee_id: DbId,
    pub rotation: Option<RotationAdvance>,
}

impl Resolution {
    pub fn plain(assignee_id: DbId) -> Self {
        Self {
            assignee_id,
            rotation: None,
        }
    }
}

pub struct StrategyResolver {
    workload: Arc<dyn WorkloadQuery>,
    directory: Arc<dyn StaffDirectory>,
    rotation: RotationTracker,
    lookup_timeout: Duration,
    concurrency: usize,
}

impl StrategyResolver {
    pub fn new(
        workload: Arc<dyn WorkloadQuery>,
        directory: Arc<dyn StaffDirectory>,
        rotation: Arc<dyn RotationStore>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            workload,
            directory,
            rotation: RotationTracker::new(rotation),
            lookup_timeout: config.lookup_timeout,
            concurrency: config.lookup_concurrency.max(1),
        }
    }

    pub fn directory(&self) -> &Arc<dyn StaffDirectory> {
        &self.directory
    }

    /// Resolve `strategy` to a single assignee, or `None` if it has no candidate.
    ///
    /// The `creator` strategy always yields `None`; substituting the item's
    /// creator is the caller's decision.
    pub async fn resolve(
        &self,
        strategy: &AssignmentStrategy,
        ctx: ResolveContext,
    ) -> Result<Option<Resolution>, LookupError> {
        match strategy {
            AssignmentStrategy::RoundRobin { staff_pool } => {
                let pick = self
                    .bounded(
                        "rotation store",
                        self.rotation.next(ctx.rule_id, staff_pool, ctx.exclude),
                    )
                    .await?;
                Ok(pick.map(|p| Resolution {
                    assignee_id: p.assignee_id,
                    rotation: Some(p.advance),
                }))
            }
            AssignmentStrategy::LeastLoaded { staff_pool } => {
                self.least_loaded(staff_pool, ctx.exclude).await
            }
            AssignmentStrategy::ByRole { target_role } => {
                let filter = StaffFilter {
                    role: Some(target_role.clone()),
                    required_skills: Vec::new(),
                    exclude_id: ctx.exclude,
                };
                let found = self
                    .bounded("staff directory", self.directory.find_staff(&filter))
                    .await?;
                Ok(found.map(|member| Resolution::plain(member.id)))
            }
            AssignmentStrategy::BySkill {
                required_skills,
                staff_pool,
            } => self.by_skill(required_skills, staff_pool, ctx.exclude).await,
            AssignmentStrategy::ManualPool { staff_pool } => Ok(staff_pool
                .iter()
                .copied()
                .find(|id| Some(*id) != ctx.exclude)
                .map(Resolution::plain)),
            AssignmentStrategy::Creator => Ok(None),
        }
    }

    /// Strictly smallest open-item count wins; ties go to the earlier pool entry.
    async fn least_loaded(
        &self,
        pool: &[DbId],
        exclude: Option<DbId>,
    ) -> Result<Option<Resolution>, LookupError> {
        let candidates: Vec<DbId> = pool
            .iter()
            .copied()
            .filter(|id| Some(*id) != exclude)
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        // `buffered` keeps results in pool order regardless of completion order.
        let counts: Vec<(DbId, Result<i64, LookupError>)> = stream::iter(candidates)
            .map(|staff_id| async move {
                let count = self
                    .bounded("workload query", self.workload.count_open_items(staff_id))
                    .await;
                (staff_id, count)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut best: Option<(DbId, i64)> = None;
        for (staff_id, count) in counts {
            let count = count?;
            match best {
                Some((_, lowest)) if count >= lowest => {}
                _ => best = Some((staff_id, count)),
            }
        }
        Ok(best.map(|(staff_id, _)| Resolution::plain(staff_id)))
    }

    /// Members must hold every required skill. With a pool, the first
    /// qualifying active member in pool order wins; without one, the
    /// directory's lowest-id match.
    async fn by_skill(
        &self,
        required_skills: &[String],
        pool: &[DbId],
        exclude: Option<DbId>,
    ) -> Result<Option<Resolution>, LookupError> {
        if pool.is_empty() {
            let filter = StaffFilter {
                role: None,
                required_skills: required_skills.to_vec(),
                exclude_id: exclude,
            };
            let found = self
                .bounded("staff directory", self.directory.find_staff(&filter))
                .await?;
            return Ok(found.map(|member| Resolution::plain(member.id)));
        }

        let members: HashMap<DbId, _> = self
            .bounded("staff directory", self.directory.list_staff(pool))
            .await?
            .into_iter()
            .map(|member| (member.id, member))
            .collect();

        Ok(pool
            .iter()
            .filter(|id| Some(**id) != exclude)
            .filter_map(|id| members.get(id))
            .find(|member| member.is_active && member.has_all_skills(required_skills))
            .map(|member| Resolution::plain(member.id)))
    }

    /// Run an external lookup under the configured timeout.
    pub(crate) async fn bounded<T, F>(
        &self,
        service: &'static str,
        lookup: F,
    ) -> Result<T, LookupError>
    where
        F: Future<Output = Result<T, LookupError>>,
    {
        bounded(self.lookup_timeout, service, lookup).await
    }
}

/// Run `lookup`, failing with [`LookupError::Timeout`] once `timeout` elapses.
pub(crate) async fn bounded<T, F>(
    timeout: Duration,
    service: &'static str,
    lookup: F,
) -> Result<T, LookupError>
where
    F: Future<Output = Result<T, LookupError>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(result) => result,
        Err(_) => Err(LookupError::Timeout {
            service,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

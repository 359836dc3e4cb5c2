//! Durable assignment audit log.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and writes every received [`AssignmentEvent`] to the
//! `assignment_events` table. It shuts down when the bus sender is dropped.

use rowdesk_core::types::DbId;
use rowdesk_db::models::assignment_event::CreateAssignmentEvent;
use rowdesk_db::repositories::AssignmentEventRepo;
use rowdesk_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::AssignmentEvent;

/// Background service that persists assignment events.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<AssignmentEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = event.kind.as_str(),
                            work_item_id = event.work_item_id,
                            "Failed to persist assignment event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Assignment event persistence lagged, some events were not recorded"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, assignment event persistence shutting down");
                    break;
                }
            }
        }
    }

    async fn persist(pool: &DbPool, event: &AssignmentEvent) -> Result<DbId, sqlx::Error> {
        AssignmentEventRepo::insert(
            pool,
            &CreateAssignmentEvent {
                event_type: event.kind.as_str(),
                work_item_id: Some(event.work_item_id),
                rule_id: event.rule_id,
                assignee_id: event.assignee_id,
                previous_assignee_id: event.previous_assignee_id,
                payload: &event.payload,
                occurred_at: event.timestamp,
            },
        )
        .await
    }
}
